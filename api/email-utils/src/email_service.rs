use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const MAILCHANNELS_API_URL: &str = "https://api.mailchannels.net/tx/v1/send";

/// Parse RFC 2822 email address format: "Name <email@example.com>" or "email@example.com"
fn parse_email_address(addr: &str) -> Result<(String, String)> {
    let trimmed = addr.trim();

    if let Some(start) = trimmed.find('<') {
        if let Some(end) = trimmed.find('>') {
            let name = trimmed[..start].trim().to_string();
            let email = trimmed[start + 1..end].trim().to_string();
            Ok((email, name))
        } else {
            bail!("Invalid email address format: missing closing '>'");
        }
    } else {
        // Just an email address without name
        Ok((trimmed.to_string(), trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmailAddress {
    email: String,
    name: String,
}

#[derive(Debug, Clone, Serialize)]
struct EmailPersonalization {
    to: Vec<EmailAddress>,
}

#[derive(Debug, Clone, Serialize)]
struct EmailContent {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

#[derive(Debug, Clone, Serialize)]
struct EmailRequest {
    personalizations: Vec<EmailPersonalization>,
    from: EmailAddress,
    subject: String,
    content: Vec<EmailContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmailErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Client for a MailChannels-compatible transactional email API.
#[derive(Clone)]
pub struct EmailService {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Send a plain-text email. One attempt, no retries.
    pub async fn send_email(
        &self,
        from_addr: &str,
        to_addr: &str,
        subject: impl Into<String>,
        body: &str,
    ) -> Result<()> {
        let (to_email, to_name) =
            parse_email_address(to_addr).context("Failed to parse recipient address")?;
        let (from_email, from_name) =
            parse_email_address(from_addr).context("Failed to parse sender address")?;

        let request = EmailRequest {
            personalizations: vec![EmailPersonalization {
                to: vec![EmailAddress {
                    email: to_email,
                    name: to_name,
                }],
            }],
            from: EmailAddress {
                email: from_email,
                name: from_name,
            },
            subject: subject.into(),
            content: vec![EmailContent {
                content_type: "text/plain".to_string(),
                value: body.to_string(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("X-Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send email request")?;

        let status = response.status();

        // MailChannels returns 202 Accepted with empty/minimal body on success
        if status.is_success() {
            tracing::debug!(to = %request.personalizations[0].to[0].email, "Email accepted");
            return Ok(());
        }

        let response_text = response
            .text()
            .await
            .context("Failed to read error response body")?;

        let error_msg =
            if let Ok(err_response) = serde_json::from_str::<EmailErrorResponse>(&response_text) {
                format!("{:?}", err_response.errors)
            } else {
                response_text
            };

        bail!("Email send failed (status: {}): {}", status, error_msg)
    }
}
