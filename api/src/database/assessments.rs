use super::list_query::{fetch_list, search_text, ListSql};
use super::types::Database;
use crate::validation::validate_score;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingua_common::filters::{
    FetchedRows, FieldSpec, FieldValue, Filterable, ListSchema, NullDates, PushdownPredicate,
    RowSource, SortDirection,
};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

pub const ASSESSMENT_KINDS: &[&str] = &["placement", "progress", "final"];
pub const ASSESSMENT_RESULTS: &[&str] = &["scheduled", "passed", "failed", "no_show"];

#[derive(Debug, Clone, sqlx::FromRow)]
struct AssessmentRow {
    id: String,
    school_id: String,
    student_id: String,
    student_name: String,
    cohort_id: Option<String>,
    title: String,
    kind: String,
    scheduled_for: Option<DateTime<Utc>>,
    result: String,
    score: Option<f64>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct Assessment {
    pub id: String,
    pub school_id: String,
    pub student_id: String,
    pub student_name: String,
    pub cohort_id: Option<String>,
    pub title: String,
    pub kind: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub result: String,
    pub score: Option<f64>,
    /// `overdue`, `upcoming` or `completed`, relative to the request time
    pub scheduled_status: String,
    pub created_at: DateTime<Utc>,
}

/// Overdue means still `scheduled` with a date in the past; a scheduled
/// assessment without a date counts as upcoming.
pub fn scheduled_status(
    result: &str,
    scheduled_for: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> &'static str {
    if result != "scheduled" {
        return "completed";
    }
    match scheduled_for {
        Some(at) if at < now => "overdue",
        _ => "upcoming",
    }
}

impl AssessmentRow {
    fn into_assessment(self, now: DateTime<Utc>) -> Assessment {
        Assessment {
            scheduled_status: scheduled_status(&self.result, self.scheduled_for, now).to_string(),
            id: self.id,
            school_id: self.school_id,
            student_id: self.student_id,
            student_name: self.student_name,
            cohort_id: self.cohort_id,
            title: self.title,
            kind: self.kind,
            scheduled_for: self.scheduled_for,
            result: self.result,
            score: self.score,
            created_at: self.created_at,
        }
    }
}

impl Filterable for Assessment {
    fn field_value(&self, column_id: &str) -> FieldValue {
        match column_id {
            "result" => self.result.as_str().into(),
            "kind" => self.kind.as_str().into(),
            "student_id" => self.student_id.as_str().into(),
            "cohort_id" => self.cohort_id.clone().into(),
            "scheduled_status" => self.scheduled_status.as_str().into(),
            "title" => self.title.as_str().into(),
            "scheduled_for" => self.scheduled_for.into(),
            "created_at" => self.created_at.into(),
            _ => FieldValue::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct NewAssessment {
    pub student_id: String,
    pub cohort_id: Option<String>,
    pub title: String,
    pub kind: String,
    pub scheduled_for: Option<DateTime<Utc>>,
}

pub const ASSESSMENT_LIST: ListSchema = ListSchema {
    entity: "assessments",
    fields: &[
        FieldSpec::option("result", "a.result"),
        FieldSpec::option("kind", "a.kind"),
        FieldSpec::option("student_id", "a.student_id"),
        FieldSpec::option("cohort_id", "a.cohort_id"),
        FieldSpec::derived_option("scheduled_status"),
        FieldSpec::text("title"),
        FieldSpec::date("scheduled_for", NullDates::Exclude),
        FieldSpec::date("created_at", NullDates::Include),
    ],
    search_columns: &["a.search_text"],
    sort_columns: &[
        ("scheduled_for", "a.scheduled_for"),
        ("created_at", "a.created_at"),
        ("title", "a.title"),
    ],
    default_sort: ("scheduled_for", SortDirection::Descending),
};

const ASSESSMENT_SELECT: &str = "SELECT a.id, a.school_id, a.student_id, st.first_name || ' ' || st.last_name AS student_name, \
     a.cohort_id, a.title, a.kind, a.scheduled_for, a.result, a.score, a.created_at \
     FROM assessments a JOIN students st ON st.id = a.student_id";

const ASSESSMENT_SQL: ListSql = ListSql {
    select: ASSESSMENT_SELECT,
    count: "SELECT COUNT(*) FROM assessments a JOIN students st ON st.id = a.student_id",
    scope_column: "a.school_id",
    id_column: "a.id",
};

/// Assessments of one school; `now` decides which are overdue.
pub struct AssessmentSource<'a> {
    pub db: &'a Database,
    pub school_id: &'a str,
    pub now: DateTime<Utc>,
}

#[async_trait]
impl RowSource for AssessmentSource<'_> {
    type Row = Assessment;

    async fn fetch_rows(&self, predicate: &PushdownPredicate) -> Result<FetchedRows<Assessment>> {
        let fetched: FetchedRows<AssessmentRow> =
            fetch_list(&self.db.pool, &ASSESSMENT_SQL, self.school_id, predicate).await?;
        Ok(FetchedRows {
            rows: fetched
                .rows
                .into_iter()
                .map(|row| row.into_assessment(self.now))
                .collect(),
            exact_count: fetched.exact_count,
        })
    }
}

impl Database {
    pub async fn create_assessment(
        &self,
        school_id: &str,
        params: &NewAssessment,
    ) -> Result<Assessment> {
        if params.title.trim().is_empty() {
            bail!("Assessment title is required");
        }
        if !ASSESSMENT_KINDS.contains(&params.kind.as_str()) {
            bail!("Invalid assessment kind: {}", params.kind);
        }
        let Some(student) = self.get_student(school_id, &params.student_id).await? else {
            bail!("Student {} does not belong to this school", params.student_id);
        };
        if let Some(cohort_id) = params.cohort_id.as_deref() {
            if self.get_cohort(school_id, cohort_id).await?.is_none() {
                bail!("Cohort {} does not belong to this school", cohort_id);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO assessments (id, school_id, student_id, cohort_id, title, kind, scheduled_for, result, search_text, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, 'scheduled', ?, ?)",
        )
        .bind(&id)
        .bind(school_id)
        .bind(&params.student_id)
        .bind(params.cohort_id.as_deref())
        .bind(params.title.trim())
        .bind(&params.kind)
        .bind(params.scheduled_for)
        .bind(search_text([
            params.title.as_str(),
            student.first_name.as_str(),
            student.last_name.as_str(),
        ]))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get_assessment(school_id, &id, Utc::now())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Assessment {} vanished after insert", id))
    }

    pub async fn get_assessment(
        &self,
        school_id: &str,
        assessment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Assessment>> {
        let sql = format!("{} WHERE a.school_id = ? AND a.id = ?", ASSESSMENT_SELECT);
        let row = sqlx::query_as::<_, AssessmentRow>(&sql)
            .bind(school_id)
            .bind(assessment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.into_assessment(now)))
    }

    /// Records the outcome of an assessment. Scores are percentages.
    pub async fn record_assessment_result(
        &self,
        school_id: &str,
        assessment_id: &str,
        result: &str,
        score: Option<f64>,
    ) -> Result<Option<Assessment>> {
        if !ASSESSMENT_RESULTS.contains(&result) {
            bail!("Invalid assessment result: {}", result);
        }
        if let Some(score) = score {
            validate_score(score)?;
        }
        let updated = sqlx::query(
            "UPDATE assessments SET result = ?, score = ? WHERE school_id = ? AND id = ?",
        )
        .bind(result)
        .bind(score)
        .bind(school_id)
        .bind(assessment_id)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_assessment(school_id, assessment_id, Utc::now()).await
    }
}
