use super::common::{list_endpoint, ApiResponse, ApiTags, ListApiResponse};
use crate::database::{Database, NewTeacher, Teacher, TeacherSource, TEACHER_LIST};
use crate::validation::{validate_email, validate_person_name};
use poem::web::Data;
use poem_openapi::{param::Path, payload::Json, OpenApi};
use std::sync::Arc;

pub struct TeachersApi;

#[OpenApi]
impl TeachersApi {
    /// List teachers
    ///
    /// Filterable by `status`, `specialization`, `name`, `email` and `created_at`
    #[oai(
        path = "/schools/:school_id/teachers",
        method = "get",
        tag = "ApiTags::Teachers"
    )]
    async fn list_teachers(
        &self,
        db: Data<&Arc<Database>>,
        req: &poem::Request,
        school_id: Path<String>,
    ) -> ListApiResponse<Teacher> {
        let source = TeacherSource {
            db: db.0.as_ref(),
            school_id: &school_id.0,
        };
        list_endpoint(&TEACHER_LIST, &source, req.uri().query().unwrap_or("")).await
    }

    /// Create teacher
    #[oai(
        path = "/schools/:school_id/teachers",
        method = "post",
        tag = "ApiTags::Teachers"
    )]
    async fn create_teacher(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        params: Json<NewTeacher>,
    ) -> Json<ApiResponse<Teacher>> {
        let valid = validate_person_name("First name", &params.first_name)
            .and_then(|_| validate_person_name("Last name", &params.last_name))
            .and_then(|_| validate_email(params.email.trim()));
        if let Err(e) = valid {
            return Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            });
        }
        match db.create_teacher(&school_id.0, &params.0).await {
            Ok(teacher) => Json(ApiResponse {
                success: true,
                data: Some(teacher),
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
