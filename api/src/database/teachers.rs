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

pub const TEACHER_STATUSES: &[&str] = &["active", "inactive"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct Teacher {
    pub id: String,
    pub school_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialization: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Filterable for Teacher {
    fn field_value(&self, column_id: &str) -> FieldValue {
        match column_id {
            "status" => self.status.as_str().into(),
            "specialization" => self.specialization.clone().into(),
            "name" => format!("{} {}", self.first_name, self.last_name).into(),
            "email" => self.email.as_str().into(),
            "created_at" => self.created_at.into(),
            _ => FieldValue::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct NewTeacher {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialization: Option<String>,
    pub status: Option<String>,
}

pub const TEACHER_LIST: ListSchema = ListSchema {
    entity: "teachers",
    fields: &[
        FieldSpec::option("status", "t.status"),
        FieldSpec::option("specialization", "t.specialization"),
        FieldSpec::text("name"),
        FieldSpec::text("email"),
        FieldSpec::date("created_at", NullDates::Include),
    ],
    search_columns: &["t.search_text"],
    sort_columns: &[
        ("first_name", "t.first_name"),
        ("last_name", "t.last_name"),
        ("created_at", "t.created_at"),
    ],
    default_sort: ("last_name", SortDirection::Ascending),
};

const TEACHER_SELECT: &str = "SELECT t.id, t.school_id, t.first_name, t.last_name, t.email, t.specialization, t.status, t.created_at FROM teachers t";

const TEACHER_SQL: ListSql = ListSql {
    select: TEACHER_SELECT,
    count: "SELECT COUNT(*) FROM teachers t",
    scope_column: "t.school_id",
    id_column: "t.id",
};

pub struct TeacherSource<'a> {
    pub db: &'a Database,
    pub school_id: &'a str,
}

#[async_trait]
impl RowSource for TeacherSource<'_> {
    type Row = Teacher;

    async fn fetch_rows(&self, predicate: &PushdownPredicate) -> Result<FetchedRows<Teacher>> {
        fetch_list(&self.db.pool, &TEACHER_SQL, self.school_id, predicate).await
    }
}

impl Database {
    pub async fn create_teacher(&self, school_id: &str, params: &NewTeacher) -> Result<Teacher> {
        let status = params.status.as_deref().unwrap_or("active");
        if !TEACHER_STATUSES.contains(&status) {
            bail!("Invalid teacher status: {}", status);
        }
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO teachers (id, school_id, first_name, last_name, email, specialization, status, search_text, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(school_id)
        .bind(params.first_name.trim())
        .bind(params.last_name.trim())
        .bind(params.email.trim().to_lowercase())
        .bind(params.specialization.as_deref())
        .bind(status)
        .bind(search_text([
            params.first_name.as_str(),
            params.last_name.as_str(),
            params.email.as_str(),
        ]))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get_teacher(school_id, &id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Teacher {} vanished after insert", id))
    }

    pub async fn get_teacher(&self, school_id: &str, teacher_id: &str) -> Result<Option<Teacher>> {
        let sql = format!("{} WHERE t.school_id = ? AND t.id = ?", TEACHER_SELECT);
        let teacher = sqlx::query_as::<_, Teacher>(&sql)
            .bind(school_id)
            .bind(teacher_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(teacher)
    }
}
