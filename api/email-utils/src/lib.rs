pub mod email_service;

pub use email_service::{EmailService, MAILCHANNELS_API_URL};
