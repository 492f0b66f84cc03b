use super::common::{list_endpoint, ApiResponse, ApiTags, ListApiResponse};
use crate::database::{Cohort, CohortSource, Database, NewCohort, COHORT_LIST};
use poem::web::Data;
use poem_openapi::{param::Path, payload::Json, OpenApi};
use std::sync::Arc;

pub struct CohortsApi;

#[OpenApi]
impl CohortsApi {
    /// List cohorts
    ///
    /// Filterable by `language`, `level`, `teacher_id`, `name`, `starts_on`
    /// and `ends_on`
    #[oai(
        path = "/schools/:school_id/cohorts",
        method = "get",
        tag = "ApiTags::Cohorts"
    )]
    async fn list_cohorts(
        &self,
        db: Data<&Arc<Database>>,
        req: &poem::Request,
        school_id: Path<String>,
    ) -> ListApiResponse<Cohort> {
        let source = CohortSource {
            db: db.0.as_ref(),
            school_id: &school_id.0,
        };
        list_endpoint(&COHORT_LIST, &source, req.uri().query().unwrap_or("")).await
    }

    /// Create cohort
    ///
    /// The teacher, when given, must belong to the same school
    #[oai(
        path = "/schools/:school_id/cohorts",
        method = "post",
        tag = "ApiTags::Cohorts"
    )]
    async fn create_cohort(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        params: Json<NewCohort>,
    ) -> Json<ApiResponse<Cohort>> {
        match db.create_cohort(&school_id.0, &params.0).await {
            Ok(cohort) => Json(ApiResponse {
                success: true,
                data: Some(cohort),
                error: None,
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }
}
