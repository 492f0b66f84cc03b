//! Email notifications for new direct messages.

use crate::config::EmailConfig;
use crate::database::{Message, Participant, SentMessage};
use anyhow::Result;
use email_utils::EmailService;
use tokio::task::JoinHandle;

const PREVIEW_CHARS: usize = 200;

/// Sends "you have a new message" emails. Delivery is best-effort: one
/// attempt per message, failures are only logged.
#[derive(Clone)]
pub struct MessageNotifier {
    email: Option<(EmailService, String)>,
}

impl MessageNotifier {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            email: Some((
                EmailService::new(&config.api_url, &config.api_key),
                config.from.clone(),
            )),
        }
    }

    /// A notifier that never sends anything.
    pub fn disabled() -> Self {
        Self { email: None }
    }

    /// Spawns the notification and returns immediately. The handle is only
    /// awaited in tests.
    pub fn notify_new_message(&self, sent: &SentMessage) -> Option<JoinHandle<()>> {
        let (service, from) = self.email.clone()?;
        let sent = sent.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = send_new_message_email(&service, &from, &sent).await {
                tracing::warn!(
                    message_id = %sent.message.id,
                    recipient_id = %sent.recipient.id,
                    error = %e,
                    "Failed to send new message notification"
                );
            }
        }))
    }
}

async fn send_new_message_email(service: &EmailService, from: &str, sent: &SentMessage) -> Result<()> {
    let to = format!("{} <{}>", sent.recipient.name, sent.recipient.email);
    let subject = format!("New message from {}", sent.sender.name);
    let body = render_body(&sent.sender, &sent.recipient, &sent.message);
    service.send_email(from, &to, subject, &body).await?;
    tracing::info!(
        message_id = %sent.message.id,
        recipient_id = %sent.recipient.id,
        "New message notification sent"
    );
    Ok(())
}

fn render_body(sender: &Participant, recipient: &Participant, message: &Message) -> String {
    let mut preview: String = message.body.chars().take(PREVIEW_CHARS).collect();
    if message.body.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    let mut body = format!(
        "Hello {},\n\n{} ({}) sent you a message:\n\n{}\n",
        recipient.name, sender.name, sender.role, preview
    );
    if !message.attachments.is_empty() {
        body.push_str(&format!("\nAttachments: {}\n", message.attachments.len()));
    }
    body
}
