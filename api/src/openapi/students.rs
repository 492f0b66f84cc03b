use super::common::{list_endpoint, ApiResponse, ApiTags, ListApiResponse};
use crate::database::{Database, NewStudent, Student, StudentSource, STUDENT_LIST};
use crate::validation::{validate_email, validate_person_name, validate_phone};
use poem::web::Data;
use poem_openapi::{param::Path, payload::Json, OpenApi};
use std::sync::Arc;

pub struct StudentsApi;

fn validate_new_student(params: &NewStudent) -> anyhow::Result<()> {
    validate_person_name("First name", &params.first_name)?;
    validate_person_name("Last name", &params.last_name)?;
    validate_email(params.email.trim())?;
    if let Some(phone) = params.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        validate_phone(phone)?;
    }
    Ok(())
}

#[OpenApi]
impl StudentsApi {
    /// List students
    ///
    /// Filterable by `status`, `level`, `enrollment_status`, `name`, `email`
    /// and `created_at`; each field takes `<field>_operator`, date fields
    /// take `<field>_from` / `<field>_to`. Also accepts `search`, `sort_by`,
    /// `sort_order`, `page` and `limit`.
    #[oai(
        path = "/schools/:school_id/students",
        method = "get",
        tag = "ApiTags::Students"
    )]
    async fn list_students(
        &self,
        db: Data<&Arc<Database>>,
        req: &poem::Request,
        school_id: Path<String>,
    ) -> ListApiResponse<Student> {
        let source = StudentSource {
            db: db.0.as_ref(),
            school_id: &school_id.0,
        };
        list_endpoint(&STUDENT_LIST, &source, req.uri().query().unwrap_or("")).await
    }

    /// Create student
    #[oai(
        path = "/schools/:school_id/students",
        method = "post",
        tag = "ApiTags::Students"
    )]
    async fn create_student(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        params: Json<NewStudent>,
    ) -> Json<ApiResponse<Student>> {
        if let Err(e) = validate_new_student(&params.0) {
            return Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            });
        }
        match db.create_student(&school_id.0, &params.0).await {
            Ok(student) => Json(ApiResponse {
                success: true,
                data: Some(student),
                error: None,
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }

    /// Get student
    ///
    /// Includes the status of the student's most recent enrollment
    #[oai(
        path = "/schools/:school_id/students/:student_id",
        method = "get",
        tag = "ApiTags::Students"
    )]
    async fn get_student(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        student_id: Path<String>,
    ) -> Json<ApiResponse<Student>> {
        match db.get_student(&school_id.0, &student_id.0).await {
            Ok(Some(student)) => Json(ApiResponse {
                success: true,
                data: Some(student),
                error: None,
            }),
            Ok(None) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some("Student not found".to_string()),
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }
}
