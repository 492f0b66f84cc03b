pub mod assessments;
pub mod cohorts;
pub mod common;
pub mod enrollments;
pub mod messages;
pub mod schools;
pub mod students;
pub mod system;
pub mod teachers;

pub use assessments::AssessmentsApi;
pub use cohorts::CohortsApi;
pub use enrollments::EnrollmentsApi;
pub use messages::MessagesApi;
pub use schools::SchoolsApi;
pub use students::StudentsApi;
pub use system::SystemApi;
pub use teachers::TeachersApi;

use poem_openapi::OpenApi;

/// Combines all API modules into a single OpenAPI specification
pub fn create_combined_api() -> impl OpenApi {
    (
        SystemApi,
        SchoolsApi,
        StudentsApi,
        TeachersApi,
        CohortsApi,
        EnrollmentsApi,
        AssessmentsApi,
        MessagesApi,
    )
}
