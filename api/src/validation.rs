use crate::database::NewAttachment;
use anyhow::{bail, Result};
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_MESSAGE_LENGTH: usize = 10_000;
pub const MAX_ATTACHMENTS: usize = 10;
const MAX_ATTACHMENT_BYTES: i64 = 25 * 1024 * 1024;
const MAX_FILE_NAME_LENGTH: usize = 255;
const MAX_NAME_LENGTH: usize = 100;
// Longest address an SMTP forward-path can carry
const MAX_EMAIL_LENGTH: usize = 254;

static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn name_regex() -> &'static Regex {
    // Letters from any script, plus the separators real names use
    NAME_REGEX.get_or_init(|| Regex::new(r"^[\p{L}\p{M}][\p{L}\p{M} .'-]*$").unwrap())
}

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_%+-]+(\.[A-Za-z0-9_%+-]+)*@([A-Za-z0-9-]+\.)+[A-Za-z]{2,}$").unwrap()
    })
}

/// Validates a student or teacher contact address. Notifications are sent
/// to it, so the domain must have at least one dot.
pub fn validate_email(email: &str) -> Result<()> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        bail!("Email cannot be empty");
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        bail!("Email is too long (max {} characters)", MAX_EMAIL_LENGTH);
    }
    if !email_regex().is_match(trimmed) {
        bail!("Invalid email format");
    }
    Ok(())
}

/// Validates a first or last name; `field` names the input in the error.
pub fn validate_person_name(field: &str, name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("{} cannot be empty", field);
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        bail!("{} is too long (max {} characters)", field, MAX_NAME_LENGTH);
    }
    if !name_regex().is_match(trimmed) {
        bail!("{} contains invalid characters", field);
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<()> {
    // Basic phone validation - allow digits, spaces, +, -, ()
    if !phone.chars().all(|c| c.is_ascii_digit() || " +()-".contains(c)) {
        bail!("Invalid phone number format");
    }
    let digit_count = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digit_count) {
        bail!("Phone number must have 7-15 digits");
    }
    Ok(())
}

pub fn validate_message_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        bail!("Message body cannot be empty");
    }
    if body.chars().count() > MAX_MESSAGE_LENGTH {
        bail!(
            "Message body is too long (max {} characters)",
            MAX_MESSAGE_LENGTH
        );
    }
    Ok(())
}

/// Checks the metadata of already uploaded files before a message stores it.
pub fn validate_attachments(attachments: &[NewAttachment]) -> Result<()> {
    if attachments.len() > MAX_ATTACHMENTS {
        bail!("A message can carry at most {} attachments", MAX_ATTACHMENTS);
    }
    for (i, attachment) in attachments.iter().enumerate() {
        let n = i + 1;
        let file_name = attachment.file_name.trim();
        if file_name.is_empty() {
            bail!("Attachment {}: file name cannot be empty", n);
        }
        if file_name.chars().count() > MAX_FILE_NAME_LENGTH {
            bail!(
                "Attachment {}: file name is too long (max {} characters)",
                n,
                MAX_FILE_NAME_LENGTH
            );
        }
        if attachment.content_type.trim().is_empty() {
            bail!("Attachment {}: content type cannot be empty", n);
        }
        if !(0..=MAX_ATTACHMENT_BYTES).contains(&attachment.size_bytes) {
            bail!(
                "Attachment {}: size must be between 0 and {} bytes",
                n,
                MAX_ATTACHMENT_BYTES
            );
        }
        let url = attachment.storage_url.trim();
        let is_http = url.starts_with("https://") || url.starts_with("http://");
        if !is_http || url.contains(char::is_whitespace) {
            bail!("Attachment {}: storage URL must be an http(s) URL", n);
        }
    }
    Ok(())
}

pub fn validate_score(score: f64) -> Result<()> {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        bail!("Score must be between 0 and 100");
    }
    Ok(())
}
