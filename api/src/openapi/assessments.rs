use super::common::{list_endpoint, ApiResponse, ApiTags, ListApiResponse};
use crate::database::{Assessment, AssessmentSource, Database, NewAssessment, ASSESSMENT_LIST};
use chrono::Utc;
use poem::web::Data;
use poem_openapi::{param::Path, payload::Json, Object, OpenApi};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub struct AssessmentsApi;

#[derive(Debug, Serialize, Deserialize, Object)]
pub struct RecordResultRequest {
    /// `scheduled`, `passed`, `failed` or `no_show`
    pub result: String,
    /// Percentage between 0 and 100
    pub score: Option<f64>,
}

#[OpenApi]
impl AssessmentsApi {
    /// List assessments
    ///
    /// Filterable by `result`, `kind`, `student_id`, `cohort_id`,
    /// `scheduled_status` (`overdue`, `upcoming`, `completed`), `title`,
    /// `scheduled_for` and `created_at`. Unscheduled assessments never match
    /// a `scheduled_for` filter.
    #[oai(
        path = "/schools/:school_id/assessments",
        method = "get",
        tag = "ApiTags::Assessments"
    )]
    async fn list_assessments(
        &self,
        db: Data<&Arc<Database>>,
        req: &poem::Request,
        school_id: Path<String>,
    ) -> ListApiResponse<Assessment> {
        let source = AssessmentSource {
            db: db.0.as_ref(),
            school_id: &school_id.0,
            now: Utc::now(),
        };
        list_endpoint(&ASSESSMENT_LIST, &source, req.uri().query().unwrap_or("")).await
    }

    /// Schedule assessment
    #[oai(
        path = "/schools/:school_id/assessments",
        method = "post",
        tag = "ApiTags::Assessments"
    )]
    async fn create_assessment(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        params: Json<NewAssessment>,
    ) -> Json<ApiResponse<Assessment>> {
        match db.create_assessment(&school_id.0, &params.0).await {
            Ok(assessment) => Json(ApiResponse {
                success: true,
                data: Some(assessment),
                error: None,
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }

    /// Record assessment result
    #[oai(
        path = "/schools/:school_id/assessments/:assessment_id/result",
        method = "put",
        tag = "ApiTags::Assessments"
    )]
    async fn record_result(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        assessment_id: Path<String>,
        params: Json<RecordResultRequest>,
    ) -> Json<ApiResponse<Assessment>> {
        match db
            .record_assessment_result(&school_id.0, &assessment_id.0, &params.result, params.score)
            .await
        {
            Ok(Some(assessment)) => Json(ApiResponse {
                success: true,
                data: Some(assessment),
                error: None,
            }),
            Ok(None) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some("Assessment not found".to_string()),
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }
}
