use super::list_query::{fetch_list, search_text, ListSql};
use super::types::Database;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingua_common::filters::{
    FetchedRows, FieldSpec, FieldValue, Filterable, ListSchema, NullDates, PushdownPredicate,
    RowSource, SortDirection,
};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

pub const STUDENT_STATUSES: &[&str] = &["active", "inactive", "archived"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct Student {
    pub id: String,
    pub school_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub level: Option<String>,
    /// Status of the most recent enrollment, if any
    pub enrollment_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Filterable for Student {
    fn field_value(&self, column_id: &str) -> FieldValue {
        match column_id {
            "status" => self.status.as_str().into(),
            "level" => self.level.clone().into(),
            "enrollment_status" => self.enrollment_status.clone().into(),
            "name" => self.full_name().into(),
            "email" => self.email.as_str().into(),
            "created_at" => self.created_at.into(),
            _ => FieldValue::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub level: Option<String>,
}

pub const STUDENT_LIST: ListSchema = ListSchema {
    entity: "students",
    fields: &[
        FieldSpec::option("status", "s.status"),
        FieldSpec::option("level", "s.level"),
        FieldSpec::derived_option("enrollment_status"),
        FieldSpec::text("name"),
        FieldSpec::text("email"),
        FieldSpec::date("created_at", NullDates::Include),
    ],
    search_columns: &["s.search_text"],
    sort_columns: &[
        ("first_name", "s.first_name"),
        ("last_name", "s.last_name"),
        ("email", "s.email"),
        ("created_at", "s.created_at"),
    ],
    default_sort: ("created_at", SortDirection::Descending),
};

const STUDENT_SELECT: &str = "SELECT s.id, s.school_id, s.first_name, s.last_name, s.email, s.phone, s.status, s.level, \
     (SELECT e.status FROM enrollments e WHERE e.student_id = s.id ORDER BY e.enrolled_at DESC, e.id DESC LIMIT 1) AS enrollment_status, \
     s.created_at FROM students s";

const STUDENT_SQL: ListSql = ListSql {
    select: STUDENT_SELECT,
    count: "SELECT COUNT(*) FROM students s",
    scope_column: "s.school_id",
    id_column: "s.id",
};

/// Students of one school as a filtered-list backend.
pub struct StudentSource<'a> {
    pub db: &'a Database,
    pub school_id: &'a str,
}

#[async_trait]
impl RowSource for StudentSource<'_> {
    type Row = Student;

    async fn fetch_rows(&self, predicate: &PushdownPredicate) -> Result<FetchedRows<Student>> {
        fetch_list(&self.db.pool, &STUDENT_SQL, self.school_id, predicate).await
    }
}

impl Database {
    pub async fn create_student(&self, school_id: &str, params: &NewStudent) -> Result<Student> {
        let status = params.status.as_deref().unwrap_or("active");
        if !STUDENT_STATUSES.contains(&status) {
            bail!("Invalid student status: {}", status);
        }
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();

        sqlx::query(
            "INSERT INTO students (id, school_id, first_name, last_name, email, phone, status, level, search_text, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(school_id)
        .bind(params.first_name.trim())
        .bind(params.last_name.trim())
        .bind(params.email.trim().to_lowercase())
        .bind(params.phone.as_deref())
        .bind(status)
        .bind(params.level.as_deref())
        .bind(search_text([
            params.first_name.as_str(),
            params.last_name.as_str(),
            params.email.as_str(),
            params.phone.as_deref().unwrap_or_default(),
        ]))
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        self.get_student(school_id, &id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Student {} vanished after insert", id))
    }

    pub async fn get_student(&self, school_id: &str, student_id: &str) -> Result<Option<Student>> {
        let sql = format!("{} WHERE s.school_id = ? AND s.id = ?", STUDENT_SELECT);
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(school_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(student)
    }

    pub async fn student_exists(&self, school_id: &str, student_id: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM students WHERE school_id = ? AND id = ?")
                .bind(school_id)
                .bind(student_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}
