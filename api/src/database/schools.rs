use super::types::Database;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct School {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    pub async fn create_school(&self, name: &str) -> Result<School> {
        let name = name.trim();
        if name.is_empty() {
            bail!("School name cannot be empty");
        }
        let school = School {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO schools (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&school.id)
            .bind(&school.name)
            .bind(school.created_at)
            .execute(&self.pool)
            .await?;
        Ok(school)
    }

    pub async fn get_school(&self, school_id: &str) -> Result<Option<School>> {
        let school = sqlx::query_as::<_, School>(
            "SELECT id, name, created_at FROM schools WHERE id = ?",
        )
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(school)
    }
}
