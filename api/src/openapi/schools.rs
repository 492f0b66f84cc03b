use super::common::{ApiResponse, ApiTags};
use crate::database::{Database, School};
use poem::web::Data;
use poem_openapi::{param::Path, payload::Json, Object, OpenApi};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub struct SchoolsApi;

#[derive(Debug, Serialize, Deserialize, Object)]
pub struct CreateSchoolRequest {
    pub name: String,
}

#[OpenApi]
impl SchoolsApi {
    /// Create school
    #[oai(path = "/schools", method = "post", tag = "ApiTags::Schools")]
    async fn create_school(
        &self,
        db: Data<&Arc<Database>>,
        params: Json<CreateSchoolRequest>,
    ) -> Json<ApiResponse<School>> {
        match db.create_school(&params.name).await {
            Ok(school) => Json(ApiResponse {
                success: true,
                data: Some(school),
                error: None,
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }

    /// Get school
    #[oai(path = "/schools/:school_id", method = "get", tag = "ApiTags::Schools")]
    async fn get_school(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
    ) -> Json<ApiResponse<School>> {
        match db.get_school(&school_id.0).await {
            Ok(Some(school)) => Json(ApiResponse {
                success: true,
                data: Some(school),
                error: None,
            }),
            Ok(None) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some("School not found".to_string()),
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }
}
