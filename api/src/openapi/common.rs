use lingua_common::filters::{
    compile_query, parse_list_request, run_list_query, ListError, ListSchema, ResultEnvelope,
    RowSource,
};
use poem_openapi::payload::Json;
use poem_openapi::types::{ParseFromJSON, ToJSON};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Object)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub environment: String,
}

#[derive(Debug, Serialize, Deserialize, Object)]
#[oai(skip_serializing_if_is_none)]
pub struct ApiResponse<T: ParseFromJSON + ToJSON> {
    pub success: bool,
    #[oai(skip_serializing_if_is_none)]
    pub data: Option<T>,
    #[oai(skip_serializing_if_is_none)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Object)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize, Deserialize, Object)]
pub struct ListResponse<T: ParseFromJSON + ToJSON> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

impl<T: ParseFromJSON + ToJSON> From<ResultEnvelope<T>> for ListResponse<T> {
    fn from(envelope: ResultEnvelope<T>) -> Self {
        Self {
            meta: ListMeta {
                page: envelope.page,
                limit: envelope.limit,
                total: envelope.total,
                total_pages: envelope.total_pages,
            },
            data: envelope.items,
        }
    }
}

#[derive(poem_openapi::ApiResponse)]
pub enum ListApiResponse<T: ParseFromJSON + ToJSON + Send + Sync> {
    #[oai(status = 200)]
    Ok(Json<ListResponse<T>>),
    /// Unknown filter column
    #[oai(status = 400)]
    BadRequest(Json<ErrorBody>),
    #[oai(status = 500)]
    InternalError(Json<ErrorBody>),
}

impl<T: ParseFromJSON + ToJSON + Send + Sync> From<ListError> for ListApiResponse<T> {
    fn from(err: ListError) -> Self {
        let body = Json(ErrorBody {
            error: err.to_string(),
        });
        match err.status_code() {
            400 => Self::BadRequest(body),
            _ => Self::InternalError(body),
        }
    }
}

/// Parses the raw query string against `schema`, compiles it and runs it
/// on `source`.
pub async fn list_endpoint<S>(
    schema: &ListSchema,
    source: &S,
    raw_query: &str,
) -> ListApiResponse<S::Row>
where
    S: RowSource,
    S::Row: ParseFromJSON + ToJSON + Send + Sync,
{
    let request = parse_list_request(schema, raw_query);
    let compiled = match compile_query(
        schema,
        &request.filters,
        request.search.as_deref(),
        request.sort.as_ref(),
        request.page,
    ) {
        Ok(compiled) => compiled,
        Err(e) => return e.into(),
    };
    match run_list_query(source, &compiled).await {
        Ok(envelope) => ListApiResponse::Ok(Json(envelope.into())),
        Err(e) => e.into(),
    }
}

pub fn default_conversation_limit() -> u32 {
    crate::database::messages::DEFAULT_CONVERSATION_LIMIT
}

#[derive(poem_openapi::Tags)]
pub enum ApiTags {
    /// System endpoints
    System,
    /// School (tenant) endpoints
    Schools,
    /// Student endpoints
    Students,
    /// Teacher endpoints
    Teachers,
    /// Cohort endpoints
    Cohorts,
    /// Enrollment endpoints
    Enrollments,
    /// Assessment endpoints
    Assessments,
    /// Direct messaging endpoints
    Messages,
}
