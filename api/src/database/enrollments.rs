use super::types::Database;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

pub const ENROLLMENT_STATUSES: &[&str] = &["interested", "paid", "enrolled", "withdrawn"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub cohort_id: String,
    pub status: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct NewEnrollment {
    pub student_id: String,
    pub cohort_id: String,
    pub status: Option<String>,
}

fn check_status(status: &str) -> Result<()> {
    if !ENROLLMENT_STATUSES.contains(&status) {
        bail!(
            "Invalid enrollment status: {} (expected one of {})",
            status,
            ENROLLMENT_STATUSES.join(", ")
        );
    }
    Ok(())
}

impl Database {
    /// Enrolls a student of the school into one of its cohorts.
    pub async fn create_enrollment(
        &self,
        school_id: &str,
        params: &NewEnrollment,
    ) -> Result<Enrollment> {
        let status = params.status.as_deref().unwrap_or("interested");
        check_status(status)?;
        if !self.student_exists(school_id, &params.student_id).await? {
            bail!("Student {} does not belong to this school", params.student_id);
        }
        if self.get_cohort(school_id, &params.cohort_id).await?.is_none() {
            bail!("Cohort {} does not belong to this school", params.cohort_id);
        }

        let enrollment = Enrollment {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: params.student_id.clone(),
            cohort_id: params.cohort_id.clone(),
            status: status.to_string(),
            enrolled_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO enrollments (id, student_id, cohort_id, status, enrolled_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&enrollment.id)
        .bind(&enrollment.student_id)
        .bind(&enrollment.cohort_id)
        .bind(&enrollment.status)
        .bind(enrollment.enrolled_at)
        .execute(&self.pool)
        .await?;
        Ok(enrollment)
    }

    /// Returns `None` when the enrollment is not part of the school.
    pub async fn update_enrollment_status(
        &self,
        school_id: &str,
        enrollment_id: &str,
        status: &str,
    ) -> Result<Option<Enrollment>> {
        check_status(status)?;
        let result = sqlx::query(
            "UPDATE enrollments SET status = ? WHERE id = ? AND student_id IN (SELECT id FROM students WHERE school_id = ?)",
        )
        .bind(status)
        .bind(enrollment_id)
        .bind(school_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT id, student_id, cohort_id, status, enrolled_at FROM enrollments WHERE id = ?",
        )
        .bind(enrollment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }
}
