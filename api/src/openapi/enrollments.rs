use super::common::{ApiResponse, ApiTags};
use crate::database::{Database, Enrollment, NewEnrollment};
use poem::web::Data;
use poem_openapi::{param::Path, payload::Json, Object, OpenApi};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub struct EnrollmentsApi;

#[derive(Debug, Serialize, Deserialize, Object)]
pub struct UpdateEnrollmentStatusRequest {
    /// `interested`, `paid`, `enrolled` or `withdrawn`
    pub status: String,
}

#[OpenApi]
impl EnrollmentsApi {
    /// Enroll student
    ///
    /// Student and cohort must both belong to the school. Status defaults to `interested`.
    #[oai(
        path = "/schools/:school_id/enrollments",
        method = "post",
        tag = "ApiTags::Enrollments"
    )]
    async fn create_enrollment(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        params: Json<NewEnrollment>,
    ) -> Json<ApiResponse<Enrollment>> {
        match db.create_enrollment(&school_id.0, &params.0).await {
            Ok(enrollment) => Json(ApiResponse {
                success: true,
                data: Some(enrollment),
                error: None,
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }

    /// Update enrollment status
    #[oai(
        path = "/schools/:school_id/enrollments/:enrollment_id/status",
        method = "put",
        tag = "ApiTags::Enrollments"
    )]
    async fn update_enrollment_status(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        enrollment_id: Path<String>,
        params: Json<UpdateEnrollmentStatusRequest>,
    ) -> Json<ApiResponse<Enrollment>> {
        match db
            .update_enrollment_status(&school_id.0, &enrollment_id.0, &params.status)
            .await
        {
            Ok(Some(enrollment)) => Json(ApiResponse {
                success: true,
                data: Some(enrollment),
                error: None,
            }),
            Ok(None) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some("Enrollment not found".to_string()),
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }
}
