/// Default database URL for local development
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./lingua.db?mode=rwc";

pub mod assessments;
pub mod cohorts;
pub mod core;
pub mod enrollments;
pub(crate) mod list_query;
pub mod messages;
pub mod schools;
pub mod students;
pub mod teachers;
pub mod types;

// Re-export main types
pub use assessments::{Assessment, AssessmentSource, NewAssessment, ASSESSMENT_LIST};
pub use cohorts::{Cohort, CohortSource, NewCohort, COHORT_LIST};
pub use enrollments::{Enrollment, NewEnrollment};
pub use messages::{Message, NewAttachment, NewMessage, Participant, SentMessage};
pub use schools::School;
pub use students::{NewStudent, Student, StudentSource, STUDENT_LIST};
pub use teachers::{NewTeacher, Teacher, TeacherSource, TEACHER_LIST};
pub use types::Database;

#[cfg(test)]
pub mod test_helpers;

#[cfg(test)]
mod tests;
