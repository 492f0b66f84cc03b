use super::list_query::{fetch_list, search_text, ListSql};
use super::types::Database;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use lingua_common::filters::{
    FetchedRows, FieldSpec, FieldValue, Filterable, ListSchema, NullDates, PushdownPredicate,
    RowSource, SortDirection,
};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct Cohort {
    pub id: String,
    pub school_id: String,
    pub name: String,
    pub language: String,
    pub level: Option<String>,
    pub teacher_id: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

fn day_start(date: Option<NaiveDate>) -> FieldValue {
    date.map(|d| d.and_time(NaiveTime::MIN).and_utc()).into()
}

impl Filterable for Cohort {
    fn field_value(&self, column_id: &str) -> FieldValue {
        match column_id {
            "language" => self.language.as_str().into(),
            "level" => self.level.clone().into(),
            "teacher_id" => self.teacher_id.clone().into(),
            "name" => self.name.as_str().into(),
            "starts_on" => day_start(self.starts_on),
            "ends_on" => day_start(self.ends_on),
            _ => FieldValue::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct NewCohort {
    pub name: String,
    pub language: String,
    pub level: Option<String>,
    pub teacher_id: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
}

pub const COHORT_LIST: ListSchema = ListSchema {
    entity: "cohorts",
    fields: &[
        FieldSpec::option("language", "c.language"),
        FieldSpec::option("level", "c.level"),
        FieldSpec::option("teacher_id", "c.teacher_id"),
        FieldSpec::text("name"),
        FieldSpec::date("starts_on", NullDates::Include),
        FieldSpec::date("ends_on", NullDates::Include),
    ],
    search_columns: &["c.search_text"],
    sort_columns: &[("name", "c.name"), ("starts_on", "c.starts_on")],
    default_sort: ("starts_on", SortDirection::Descending),
};

const COHORT_SELECT: &str = "SELECT c.id, c.school_id, c.name, c.language, c.level, c.teacher_id, c.starts_on, c.ends_on, c.created_at FROM cohorts c";

const COHORT_SQL: ListSql = ListSql {
    select: COHORT_SELECT,
    count: "SELECT COUNT(*) FROM cohorts c",
    scope_column: "c.school_id",
    id_column: "c.id",
};

pub struct CohortSource<'a> {
    pub db: &'a Database,
    pub school_id: &'a str,
}

#[async_trait]
impl RowSource for CohortSource<'_> {
    type Row = Cohort;

    async fn fetch_rows(&self, predicate: &PushdownPredicate) -> Result<FetchedRows<Cohort>> {
        fetch_list(&self.db.pool, &COHORT_SQL, self.school_id, predicate).await
    }
}

impl Database {
    pub async fn create_cohort(&self, school_id: &str, params: &NewCohort) -> Result<Cohort> {
        if params.name.trim().is_empty() {
            bail!("Cohort name is required");
        }
        if params.language.trim().is_empty() {
            bail!("Cohort language is required");
        }
        if let (Some(starts), Some(ends)) = (params.starts_on, params.ends_on) {
            if ends < starts {
                bail!("Cohort cannot end ({}) before it starts ({})", ends, starts);
            }
        }
        if let Some(teacher_id) = params.teacher_id.as_deref() {
            if self.get_teacher(school_id, teacher_id).await?.is_none() {
                bail!("Teacher {} does not belong to this school", teacher_id);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO cohorts (id, school_id, name, language, level, teacher_id, starts_on, ends_on, search_text, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(school_id)
        .bind(params.name.trim())
        .bind(params.language.trim())
        .bind(params.level.as_deref())
        .bind(params.teacher_id.as_deref())
        .bind(params.starts_on)
        .bind(params.ends_on)
        .bind(search_text([params.name.as_str(), params.language.as_str()]))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get_cohort(school_id, &id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Cohort {} vanished after insert", id))
    }

    pub async fn get_cohort(&self, school_id: &str, cohort_id: &str) -> Result<Option<Cohort>> {
        let sql = format!("{} WHERE c.school_id = ? AND c.id = ?", COHORT_SELECT);
        let cohort = sqlx::query_as::<_, Cohort>(&sql)
            .bind(school_id)
            .bind(cohort_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(cohort)
    }
}
