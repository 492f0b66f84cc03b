/// Shared test helpers for database tests
use super::{Database, NewStudent, NewTeacher, Student, Teacher};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Set up a fresh in-memory database with all migrations applied.
/// A single connection keeps every query on the same in-memory schema.
pub async fn setup_test_db() -> Database {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid in-memory url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Migration failed");
    Database { pool }
}

pub async fn create_test_school(db: &Database) -> String {
    db.create_school("Test Language School")
        .await
        .expect("Failed to create school")
        .id
}

pub async fn create_test_student(db: &Database, school_id: &str, first: &str, last: &str) -> Student {
    db.create_student(
        school_id,
        &NewStudent {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}.{}@example.com", first, last).to_lowercase(),
            phone: None,
            status: None,
            level: None,
        },
    )
    .await
    .expect("Failed to create student")
}

pub async fn create_test_teacher(db: &Database, school_id: &str, first: &str, last: &str) -> Teacher {
    db.create_teacher(
        school_id,
        &NewTeacher {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}.{}@school.example.com", first, last).to_lowercase(),
            specialization: None,
            status: None,
        },
    )
    .await
    .expect("Failed to create teacher")
}
