use super::test_helpers::{
    create_test_school, create_test_student, create_test_teacher, setup_test_db,
};
use super::*;
use chrono::{Duration, TimeZone, Utc};
use lingua_common::filters::{
    compile_query, parse_list_request, run_list_query, FilterDescriptor, ListError, PageWindow,
};

fn filter(column: &str, values: &[&str], operator: &str) -> FilterDescriptor {
    FilterDescriptor::new(
        column,
        values.iter().map(|v| v.to_string()).collect(),
        operator,
    )
}

async fn enroll_at(db: &Database, student_id: &str, cohort_id: &str, status: &str, days_ago: i64) {
    sqlx::query(
        "INSERT INTO enrollments (id, student_id, cohort_id, status, enrolled_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(student_id)
    .bind(cohort_id)
    .bind(status)
    .bind(Utc::now() - Duration::days(days_ago))
    .execute(db.pool())
    .await
    .unwrap();
}

async fn create_test_cohort(db: &Database, school_id: &str, name: &str) -> Cohort {
    db.create_cohort(
        school_id,
        &NewCohort {
            name: name.to_string(),
            language: "Spanish".to_string(),
            level: Some("A1".to_string()),
            teacher_id: None,
            starts_on: None,
            ends_on: None,
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_schema_applied() {
    let db = setup_test_db().await;
    assert!(db.check_schema_applied().await.unwrap());
}

#[tokio::test]
async fn test_create_and_get_school() {
    let db = setup_test_db().await;
    let school = db.create_school("  Escuela Sol  ").await.unwrap();
    assert_eq!(school.name, "Escuela Sol");

    let fetched = db.get_school(&school.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, school.id);
    assert!(db.get_school("missing").await.unwrap().is_none());
    assert!(db.create_school("   ").await.is_err());
}

#[tokio::test]
async fn test_student_email_is_normalized_and_unique_per_school() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let params = NewStudent {
        first_name: "Ana".to_string(),
        last_name: "Lopez".to_string(),
        email: " Ana.Lopez@Example.com ".to_string(),
        phone: None,
        status: None,
        level: Some("B1".to_string()),
    };
    let student = db.create_student(&school_id, &params).await.unwrap();
    assert_eq!(student.email, "ana.lopez@example.com");
    assert_eq!(student.status, "active");
    assert_eq!(student.enrollment_status, None);

    assert!(db.create_student(&school_id, &params).await.is_err());

    let other_school = create_test_school(&db).await;
    assert!(db.create_student(&other_school, &params).await.is_ok());
}

#[tokio::test]
async fn test_student_rejects_unknown_status() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let params = NewStudent {
        first_name: "Ana".to_string(),
        last_name: "Lopez".to_string(),
        email: "ana@example.com".to_string(),
        phone: None,
        status: Some("graduated".to_string()),
        level: None,
    };
    assert!(db.create_student(&school_id, &params).await.is_err());
}

#[tokio::test]
async fn test_enrollment_status_follows_latest_enrollment() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let spring = create_test_cohort(&db, &school_id, "Spring").await;
    let summer = create_test_cohort(&db, &school_id, "Summer").await;

    enroll_at(&db, &student.id, &spring.id, "withdrawn", 30).await;
    enroll_at(&db, &student.id, &summer.id, "paid", 1).await;

    let fetched = db.get_student(&school_id, &student.id).await.unwrap().unwrap();
    assert_eq!(fetched.enrollment_status.as_deref(), Some("paid"));
}

#[tokio::test]
async fn test_enrollment_requires_members_of_the_school() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let other_school = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let foreign_cohort = create_test_cohort(&db, &other_school, "Elsewhere").await;
    let cohort = create_test_cohort(&db, &school_id, "Spring").await;

    let err = db
        .create_enrollment(
            &school_id,
            &NewEnrollment {
                student_id: student.id.clone(),
                cohort_id: foreign_cohort.id.clone(),
                status: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does not belong"));

    let enrollment = db
        .create_enrollment(
            &school_id,
            &NewEnrollment {
                student_id: student.id.clone(),
                cohort_id: cohort.id.clone(),
                status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(enrollment.status, "interested");

    assert!(db
        .create_enrollment(
            &school_id,
            &NewEnrollment {
                student_id: student.id.clone(),
                cohort_id: cohort.id.clone(),
                status: Some("refunded".to_string()),
            },
        )
        .await
        .is_err());
}

#[tokio::test]
async fn test_update_enrollment_status_is_scoped_to_school() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let other_school = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let cohort = create_test_cohort(&db, &school_id, "Spring").await;
    let enrollment = db
        .create_enrollment(
            &school_id,
            &NewEnrollment {
                student_id: student.id.clone(),
                cohort_id: cohort.id.clone(),
                status: Some("paid".to_string()),
            },
        )
        .await
        .unwrap();

    let foreign = db
        .update_enrollment_status(&other_school, &enrollment.id, "enrolled")
        .await
        .unwrap();
    assert!(foreign.is_none());

    let updated = db
        .update_enrollment_status(&school_id, &enrollment.id, "enrolled")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "enrolled");
    let student = db.get_student(&school_id, &student.id).await.unwrap().unwrap();
    assert_eq!(student.enrollment_status.as_deref(), Some("enrolled"));
}

#[tokio::test]
async fn test_cohort_validation() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let other_school = create_test_school(&db).await;
    let foreign_teacher = create_test_teacher(&db, &other_school, "Luis", "Garcia").await;

    let mut params = NewCohort {
        name: "Evening A2".to_string(),
        language: "Spanish".to_string(),
        level: Some("A2".to_string()),
        teacher_id: Some(foreign_teacher.id.clone()),
        starts_on: None,
        ends_on: None,
    };
    assert!(db.create_cohort(&school_id, &params).await.is_err());

    params.teacher_id = None;
    params.starts_on = chrono::NaiveDate::from_ymd_opt(2024, 3, 1);
    params.ends_on = chrono::NaiveDate::from_ymd_opt(2024, 2, 1);
    assert!(db.create_cohort(&school_id, &params).await.is_err());

    params.ends_on = chrono::NaiveDate::from_ymd_opt(2024, 6, 30);
    let cohort = db.create_cohort(&school_id, &params).await.unwrap();
    assert_eq!(cohort.starts_on, chrono::NaiveDate::from_ymd_opt(2024, 3, 1));
}

#[tokio::test]
async fn test_student_list_pushdown_paginates_in_sql() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    for i in 0..7 {
        let student = create_test_student(&db, &school_id, "Student", &format!("N{}", i)).await;
        if i % 2 == 0 {
            sqlx::query("UPDATE students SET status = 'inactive' WHERE id = ?")
                .bind(&student.id)
                .execute(db.pool())
                .await
                .unwrap();
        }
    }
    // Noise from another tenant
    let other_school = create_test_school(&db).await;
    create_test_student(&db, &other_school, "Student", "Other").await;

    let compiled = compile_query(
        &STUDENT_LIST,
        &[filter("status", &["inactive"], "is")],
        None,
        None,
        PageWindow { page: 2, limit: 3 },
    )
    .unwrap();
    assert!(compiled.pushdown.window.is_some());

    let source = StudentSource {
        db: &db,
        school_id: &school_id,
    };
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 1);
    assert!(page.items.iter().all(|s| s.status == "inactive"));
}

#[tokio::test]
async fn test_windowed_fetch_count_matches_returned_rows() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    for last in ["A", "B", "C"] {
        create_test_student(&db, &school_id, "Student", last).await;
    }
    let source = StudentSource {
        db: &db,
        school_id: &school_id,
    };
    let compiled = compile_query(&STUDENT_LIST, &[], None, None, PageWindow { page: 1, limit: 10 }).unwrap();

    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, page.items.len() as u64);
    assert_eq!(page.total, 3);

    create_test_student(&db, &school_id, "Student", "D").await;
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.items.len(), 4);
}

#[tokio::test]
async fn test_enrollment_status_any_of_over_fifty_students() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let cohort = create_test_cohort(&db, &school_id, "Intensive").await;
    let statuses = ["paid", "enrolled", "interested", "withdrawn", ""];
    for i in 0..50 {
        let student = create_test_student(&db, &school_id, "Learner", &format!("L{:02}", i)).await;
        let status = statuses[i % statuses.len()];
        if !status.is_empty() {
            enroll_at(&db, &student.id, &cohort.id, status, 1).await;
        }
    }

    let compiled = compile_query(
        &STUDENT_LIST,
        &[filter("enrollment_status", &["paid", "enrolled"], "is_any_of")],
        None,
        None,
        PageWindow { page: 1, limit: 20 },
    )
    .unwrap();
    assert!(compiled.pushdown.window.is_none());

    let source = StudentSource {
        db: &db,
        school_id: &school_id,
    };
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 20);
    assert_eq!(page.items.len(), 20);
    assert_eq!(page.total_pages, 1);
    assert!(page.items.iter().all(|s| matches!(
        s.enrollment_status.as_deref(),
        Some("paid") | Some("enrolled")
    )));
}

#[tokio::test]
async fn test_student_search_escapes_like_wildcards() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    create_test_student(&db, &school_id, "Ana", "Lopez").await;
    create_test_student(&db, &school_id, "Anabel", "Ruiz").await;
    create_test_student(&db, &school_id, "Mark", "Stone").await;

    let source = StudentSource {
        db: &db,
        school_id: &school_id,
    };
    let request = parse_list_request(&STUDENT_LIST, "search=ana&sort_by=first_name&sort_order=asc");
    let compiled = compile_query(
        &STUDENT_LIST,
        &request.filters,
        request.search.as_deref(),
        request.sort.as_ref(),
        request.page,
    )
    .unwrap();
    let page = run_list_query(&source, &compiled).await.unwrap();
    let names: Vec<_> = page.items.iter().map(|s| s.first_name.as_str()).collect();
    assert_eq!(names, vec!["Ana", "Anabel"]);

    let compiled = compile_query(&STUDENT_LIST, &[], Some("a%"), None, PageWindow::default()).unwrap();
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_search_folds_accented_names_like_the_name_filter() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let elodie = db
        .create_student(
            &school_id,
            &NewStudent {
                first_name: "Élodie".to_string(),
                last_name: "Martin".to_string(),
                email: "em@example.com".to_string(),
                phone: None,
                status: None,
                level: None,
            },
        )
        .await
        .unwrap();
    create_test_student(&db, &school_id, "Elena", "Diaz").await;
    create_assessment_at(&db, &school_id, &elodie.id, "Oral exam", None).await;

    let source = StudentSource {
        db: &db,
        school_id: &school_id,
    };
    for term in ["élodie", "ÉLODIE", "Élodie Martin"] {
        let compiled = compile_query(&STUDENT_LIST, &[], Some(term), None, PageWindow::default()).unwrap();
        let page = run_list_query(&source, &compiled).await.unwrap();
        let total = page.total;
        if term.contains(' ') {
            // Fields are searched one at a time
            assert_eq!(total, 0);
        } else {
            assert_eq!(total, 1, "search {}", term);
            assert_eq!(page.items[0].id, elodie.id);
        }
    }

    let compiled = compile_query(
        &STUDENT_LIST,
        &[filter("name", &["élodie"], "contains")],
        None,
        None,
        PageWindow::default(),
    )
    .unwrap();
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 1);

    let compiled = compile_query(&ASSESSMENT_LIST, &[], Some("ÉLODIE"), None, PageWindow::default()).unwrap();
    let source = AssessmentSource {
        db: &db,
        school_id: &school_id,
        now: Utc::now(),
    };
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].student_id, elodie.id);
}

#[tokio::test]
async fn test_teacher_list_text_filter_runs_in_memory() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    create_test_teacher(&db, &school_id, "Luis", "Garcia").await;
    create_test_teacher(&db, &school_id, "Marta", "Garcia").await;
    create_test_teacher(&db, &school_id, "Peter", "Brown").await;

    let compiled = compile_query(
        &TEACHER_LIST,
        &[
            filter("status", &["active"], "is"),
            filter("name", &["garcia"], "contains"),
        ],
        None,
        None,
        PageWindow::default(),
    )
    .unwrap();
    let source = TeacherSource {
        db: &db,
        school_id: &school_id,
    };
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 2);
    // default sort is last name ascending, then id
    assert!(page.items.iter().all(|t| t.last_name == "Garcia"));
}

#[tokio::test]
async fn test_cohort_list_date_filter() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    for (name, start) in [("Jan", (2024, 1, 15)), ("Mar", (2024, 3, 1)), ("Undated", (0, 0, 0))] {
        db.create_cohort(
            &school_id,
            &NewCohort {
                name: name.to_string(),
                language: "French".to_string(),
                level: None,
                teacher_id: None,
                starts_on: chrono::NaiveDate::from_ymd_opt(start.0, start.1, start.2),
                ends_on: None,
            },
        )
        .await
        .unwrap();
    }

    let request = parse_list_request(
        &COHORT_LIST,
        "starts_on_from=2024-02-01&starts_on_to=2024-12-31&starts_on_operator=is_between",
    );
    let compiled = compile_query(
        &COHORT_LIST,
        &request.filters,
        None,
        None,
        request.page,
    )
    .unwrap();
    let source = CohortSource {
        db: &db,
        school_id: &school_id,
    };
    let page = run_list_query(&source, &compiled).await.unwrap();
    let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
    // undated cohorts are admitted by the include-nulls policy
    assert_eq!(page.total, 2);
    assert!(names.contains(&"Mar"));
    assert!(names.contains(&"Undated"));
}

async fn create_assessment_at(
    db: &Database,
    school_id: &str,
    student_id: &str,
    title: &str,
    scheduled_for: Option<chrono::DateTime<Utc>>,
) -> Assessment {
    db.create_assessment(
        school_id,
        &NewAssessment {
            student_id: student_id.to_string(),
            cohort_id: None,
            title: title.to_string(),
            kind: "progress".to_string(),
            scheduled_for,
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_overdue_assessments() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let now = Utc::now();

    let late = create_assessment_at(&db, &school_id, &student.id, "Late", Some(now - Duration::days(3))).await;
    create_assessment_at(&db, &school_id, &student.id, "Soon", Some(now + Duration::days(3))).await;
    create_assessment_at(&db, &school_id, &student.id, "Unscheduled", None).await;
    let done = create_assessment_at(&db, &school_id, &student.id, "Done", Some(now - Duration::days(10))).await;
    db.record_assessment_result(&school_id, &done.id, "passed", Some(88.0))
        .await
        .unwrap()
        .unwrap();

    let compiled = compile_query(
        &ASSESSMENT_LIST,
        &[filter("scheduled_status", &["overdue"], "is")],
        None,
        None,
        PageWindow::default(),
    )
    .unwrap();
    let source = AssessmentSource {
        db: &db,
        school_id: &school_id,
        now,
    };
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, late.id);
    assert_eq!(page.items[0].scheduled_status, "overdue");
    assert_eq!(page.items[0].student_name, "Ana Lopez");
}

#[tokio::test]
async fn test_scheduled_for_filter_excludes_unscheduled() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;

    let jan = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
    let feb = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();
    create_assessment_at(&db, &school_id, &student.id, "January", Some(jan)).await;
    create_assessment_at(&db, &school_id, &student.id, "February", Some(feb)).await;
    create_assessment_at(&db, &school_id, &student.id, "Unscheduled", None).await;

    let compiled = compile_query(
        &ASSESSMENT_LIST,
        &[filter(
            "scheduled_for",
            &["2024-01-01", "2024-01-31T23:59:59"],
            "is_not_between",
        )],
        None,
        None,
        PageWindow::default(),
    )
    .unwrap();
    let source = AssessmentSource {
        db: &db,
        school_id: &school_id,
        now: Utc::now(),
    };
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "February");
}

#[tokio::test]
async fn test_assessment_search_matches_student_name() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let ana = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let mark = create_test_student(&db, &school_id, "Mark", "Stone").await;
    create_assessment_at(&db, &school_id, &ana.id, "Oral exam", None).await;
    create_assessment_at(&db, &school_id, &mark.id, "Written exam", None).await;

    let compiled = compile_query(&ASSESSMENT_LIST, &[], Some("stone"), None, PageWindow::default()).unwrap();
    let source = AssessmentSource {
        db: &db,
        school_id: &school_id,
        now: Utc::now(),
    };
    let page = run_list_query(&source, &compiled).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].student_id, mark.id);
}

#[tokio::test]
async fn test_list_fetch_failure_maps_to_fetch_failed() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    sqlx::query("DROP TABLE assessments")
        .execute(db.pool())
        .await
        .unwrap();

    let compiled = compile_query(&ASSESSMENT_LIST, &[], None, None, PageWindow::default()).unwrap();
    let source = AssessmentSource {
        db: &db,
        school_id: &school_id,
        now: Utc::now(),
    };
    let err = run_list_query(&source, &compiled).await.unwrap_err();
    assert!(matches!(err, ListError::FetchFailed { entity: "assessments", .. }));
    assert_eq!(err.to_string(), "Failed to fetch assessments");
}

#[tokio::test]
async fn test_assessment_create_and_record_result() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let other_school = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;

    let mut params = NewAssessment {
        student_id: student.id.clone(),
        cohort_id: None,
        title: "Placement".to_string(),
        kind: "oral".to_string(),
        scheduled_for: None,
    };
    assert!(db.create_assessment(&school_id, &params).await.is_err());
    params.kind = "placement".to_string();
    assert!(db.create_assessment(&other_school, &params).await.is_err());

    let assessment = db.create_assessment(&school_id, &params).await.unwrap();
    assert_eq!(assessment.result, "scheduled");
    assert_eq!(assessment.scheduled_status, "upcoming");
    assert_eq!(assessment.score, None);

    assert!(db
        .record_assessment_result(&school_id, &assessment.id, "passed", Some(101.0))
        .await
        .is_err());
    assert!(db
        .record_assessment_result(&school_id, &assessment.id, "excellent", None)
        .await
        .is_err());
    assert!(db
        .record_assessment_result(&other_school, &assessment.id, "passed", None)
        .await
        .unwrap()
        .is_none());

    let updated = db
        .record_assessment_result(&school_id, &assessment.id, "failed", Some(41.5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.result, "failed");
    assert_eq!(updated.score, Some(41.5));
    assert_eq!(updated.scheduled_status, "completed");
}

fn new_message(sender: &str, recipient: &str, body: &str) -> NewMessage {
    NewMessage {
        sender_id: sender.to_string(),
        recipient_id: recipient.to_string(),
        body: body.to_string(),
        attachments: vec![],
    }
}

#[tokio::test]
async fn test_send_message_with_attachments() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let teacher = create_test_teacher(&db, &school_id, "Luis", "Garcia").await;

    let mut params = new_message(&student.id, &teacher.id, "Here is my homework");
    params.attachments = vec![NewAttachment {
        file_name: "homework.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        size_bytes: 2048,
        storage_url: "https://files.example.com/homework.pdf".to_string(),
    }];
    let sent = db.send_message(&school_id, &params).await.unwrap();
    assert_eq!(sent.sender.role, "student");
    assert_eq!(sent.recipient.role, "teacher");
    assert_eq!(sent.recipient.email, teacher.email);
    assert_eq!(sent.message.attachments.len(), 1);
    assert_eq!(sent.message.attachments[0].message_id, sent.message.id);

    let conversation = db
        .get_conversation(&school_id, &teacher.id, &student.id, 10, None)
        .await
        .unwrap();
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].attachments[0].file_name, "homework.pdf");
}

#[tokio::test]
async fn test_send_message_is_atomic() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let teacher = create_test_teacher(&db, &school_id, "Luis", "Garcia").await;
    // Fail the second attachment insert after the message row is written
    sqlx::query(
        "CREATE TRIGGER reject_broken BEFORE INSERT ON message_attachments
         WHEN NEW.file_name = 'broken.txt'
         BEGIN SELECT RAISE(ABORT, 'storage rejected'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let mut params = new_message(&student.id, &teacher.id, "Two files");
    params.attachments = vec![
        NewAttachment {
            file_name: "ok.txt".to_string(),
            content_type: "text/plain".to_string(),
            size_bytes: 10,
            storage_url: "https://files.example.com/ok.txt".to_string(),
        },
        NewAttachment {
            file_name: "broken.txt".to_string(),
            content_type: "text/plain".to_string(),
            size_bytes: 20,
            storage_url: "https://files.example.com/broken.txt".to_string(),
        },
    ];
    assert!(db.send_message(&school_id, &params).await.is_err());

    let messages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(db.pool())
        .await
        .unwrap();
    let attachments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM message_attachments")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(messages, 0);
    assert_eq!(attachments, 0);
}

#[tokio::test]
async fn test_send_message_rejects_bad_attachment_metadata() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let teacher = create_test_teacher(&db, &school_id, "Luis", "Garcia").await;

    let mut params = new_message(&student.id, &teacher.id, "See attached");
    params.attachments = vec![NewAttachment {
        file_name: "notes.txt".to_string(),
        content_type: "text/plain".to_string(),
        size_bytes: -5,
        storage_url: "https://files.example.com/notes.txt".to_string(),
    }];
    let err = db.send_message(&school_id, &params).await.unwrap_err();
    assert!(err.to_string().starts_with("Attachment 1: size"), "{}", err);
    assert!(!err.to_string().contains("CHECK constraint"));

    let messages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(messages, 0);
}

#[tokio::test]
async fn test_send_message_validation() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let other_school = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let teacher = create_test_teacher(&db, &school_id, "Luis", "Garcia").await;
    let outsider = create_test_teacher(&db, &other_school, "Eve", "Stone").await;

    assert!(db
        .send_message(&school_id, &new_message(&student.id, &teacher.id, "   "))
        .await
        .is_err());
    assert!(db
        .send_message(&school_id, &new_message(&student.id, &student.id, "Note to self"))
        .await
        .is_err());
    let err = db
        .send_message(&school_id, &new_message(&student.id, &outsider.id, "Hi"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Recipient"));
}

#[tokio::test]
async fn test_conversation_newest_first_with_before_cursor() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let teacher = create_test_teacher(&db, &school_id, "Luis", "Garcia").await;
    let bystander = create_test_student(&db, &school_id, "Mark", "Stone").await;

    let mut sent = Vec::new();
    for (i, (from, to)) in [
        (&student.id, &teacher.id),
        (&teacher.id, &student.id),
        (&student.id, &teacher.id),
    ]
    .into_iter()
    .enumerate()
    {
        let message = db
            .send_message(&school_id, &new_message(from, to, &format!("message {}", i)))
            .await
            .unwrap()
            .message;
        sent.push(message);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    db.send_message(&school_id, &new_message(&bystander.id, &teacher.id, "unrelated"))
        .await
        .unwrap();

    let all = db
        .get_conversation(&school_id, &student.id, &teacher.id, 50, None)
        .await
        .unwrap();
    let bodies: Vec<_> = all.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["message 2", "message 1", "message 0"]);

    let older = db
        .get_conversation(&school_id, &student.id, &teacher.id, 50, Some(sent[2].created_at))
        .await
        .unwrap();
    assert_eq!(older.len(), 2);
    assert_eq!(older[0].body, "message 1");

    let limited = db
        .get_conversation(&school_id, &student.id, &teacher.id, 1, None)
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_read_receipts_and_unread_count() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let teacher = create_test_teacher(&db, &school_id, "Luis", "Garcia").await;
    let colleague = create_test_teacher(&db, &school_id, "Marta", "Ruiz").await;

    for body in ["one", "two"] {
        db.send_message(&school_id, &new_message(&teacher.id, &student.id, body))
            .await
            .unwrap();
    }
    db.send_message(&school_id, &new_message(&colleague.id, &student.id, "three"))
        .await
        .unwrap();
    db.send_message(&school_id, &new_message(&student.id, &teacher.id, "reply"))
        .await
        .unwrap();

    assert_eq!(db.get_unread_count(&school_id, &student.id).await.unwrap(), 3);
    assert_eq!(db.get_unread_count(&school_id, &teacher.id).await.unwrap(), 1);

    let marked = db
        .mark_conversation_read(&school_id, &student.id, &teacher.id)
        .await
        .unwrap();
    assert_eq!(marked, 2);
    assert_eq!(db.get_unread_count(&school_id, &student.id).await.unwrap(), 1);

    // Already read messages are not counted twice
    let again = db
        .mark_conversation_read(&school_id, &student.id, &teacher.id)
        .await
        .unwrap();
    assert_eq!(again, 0);

    let conversation = db
        .get_conversation(&school_id, &student.id, &teacher.id, 50, None)
        .await
        .unwrap();
    for message in conversation {
        if message.recipient_id == student.id {
            assert!(message.read_at.is_some());
        } else {
            assert!(message.read_at.is_none());
        }
    }
}

#[tokio::test]
async fn test_find_participant() {
    let db = setup_test_db().await;
    let school_id = create_test_school(&db).await;
    let student = create_test_student(&db, &school_id, "Ana", "Lopez").await;
    let teacher = create_test_teacher(&db, &school_id, "Luis", "Garcia").await;

    let found = db.find_participant(&school_id, &student.id).await.unwrap().unwrap();
    assert_eq!(found.role, "student");
    assert_eq!(found.name, "Ana Lopez");
    let found = db.find_participant(&school_id, &teacher.id).await.unwrap().unwrap();
    assert_eq!(found.role, "teacher");

    let other_school = create_test_school(&db).await;
    assert!(db
        .find_participant(&other_school, &student.id)
        .await
        .unwrap()
        .is_none());
}
