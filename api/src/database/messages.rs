use super::types::Database;
use crate::validation::{validate_attachments, validate_message_body};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_CONVERSATION_LIMIT: u32 = 50;
pub const MAX_CONVERSATION_LIMIT: u32 = 200;

/// A student or teacher who can send and receive messages.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    /// `student` or `teacher`
    pub role: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub message_id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_url: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct MessageRow {
    id: String,
    school_id: String,
    sender_id: String,
    recipient_id: String,
    body: String,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub school_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub attachments: Vec<Attachment>,
}

impl MessageRow {
    fn with_attachments(self, attachments: Vec<Attachment>) -> Message {
        Message {
            id: self.id,
            school_id: self.school_id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            body: self.body,
            created_at: self.created_at,
            read_at: self.read_at,
            attachments,
        }
    }
}

/// Metadata of an already uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct NewAttachment {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct NewMessage {
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    #[serde(default)]
    #[oai(default)]
    pub attachments: Vec<NewAttachment>,
}

/// A stored message together with both resolved participants.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub sender: Participant,
    pub recipient: Participant,
}

const MESSAGE_COLUMNS: &str =
    "id, school_id, sender_id, recipient_id, body, created_at, read_at";

impl Database {
    /// Finds a student or teacher of the school by id.
    pub async fn find_participant(
        &self,
        school_id: &str,
        participant_id: &str,
    ) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT id, 'student' AS role, first_name || ' ' || last_name AS name, email FROM students WHERE school_id = ? AND id = ?
             UNION ALL
             SELECT id, 'teacher' AS role, first_name || ' ' || last_name AS name, email FROM teachers WHERE school_id = ? AND id = ?
             LIMIT 1",
        )
        .bind(school_id)
        .bind(participant_id)
        .bind(school_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(participant)
    }

    /// Stores a message and its attachments atomically.
    pub async fn send_message(&self, school_id: &str, params: &NewMessage) -> Result<SentMessage> {
        validate_message_body(&params.body)?;
        validate_attachments(&params.attachments)?;
        if params.sender_id == params.recipient_id {
            bail!("Sender and recipient must be different participants");
        }
        let Some(sender) = self.find_participant(school_id, &params.sender_id).await? else {
            bail!("Sender {} is not a member of this school", params.sender_id);
        };
        let Some(recipient) = self
            .find_participant(school_id, &params.recipient_id)
            .await?
        else {
            bail!(
                "Recipient {} is not a member of this school",
                params.recipient_id
            );
        };

        let row = MessageRow {
            id: uuid::Uuid::new_v4().to_string(),
            school_id: school_id.to_string(),
            sender_id: sender.id.clone(),
            recipient_id: recipient.id.clone(),
            body: params.body.clone(),
            created_at: Utc::now(),
            read_at: None,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO messages (id, school_id, sender_id, recipient_id, body, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.school_id)
        .bind(&row.sender_id)
        .bind(&row.recipient_id)
        .bind(&row.body)
        .bind(row.created_at)
        .execute(&mut *tx)
        .await?;

        let mut attachments = Vec::with_capacity(params.attachments.len());
        for new in &params.attachments {
            let attachment = Attachment {
                id: uuid::Uuid::new_v4().to_string(),
                message_id: row.id.clone(),
                file_name: new.file_name.clone(),
                content_type: new.content_type.clone(),
                size_bytes: new.size_bytes,
                storage_url: new.storage_url.clone(),
            };
            // Dropping `tx` on error rolls back the message insert
            sqlx::query(
                "INSERT INTO message_attachments (id, message_id, file_name, content_type, size_bytes, storage_url) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&attachment.id)
            .bind(&attachment.message_id)
            .bind(&attachment.file_name)
            .bind(&attachment.content_type)
            .bind(attachment.size_bytes)
            .bind(&attachment.storage_url)
            .execute(&mut *tx)
            .await?;
            attachments.push(attachment);
        }

        tx.commit().await?;

        tracing::debug!(
            message_id = %row.id,
            school_id,
            attachments = attachments.len(),
            "Stored message"
        );

        Ok(SentMessage {
            message: row.with_attachments(attachments),
            sender,
            recipient,
        })
    }

    /// Messages exchanged between two participants, newest first.
    /// `before` pages backwards through older history.
    pub async fn get_conversation(
        &self,
        school_id: &str,
        participant_a: &str,
        participant_b: &str,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        let limit = limit.clamp(1, MAX_CONVERSATION_LIMIT);
        let sql = format!(
            "SELECT {} FROM messages
             WHERE school_id = ?
               AND ((sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?))
               AND (? IS NULL OR created_at < ?)
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
            MESSAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(school_id)
            .bind(participant_a)
            .bind(participant_b)
            .bind(participant_b)
            .bind(participant_a)
            .bind(before)
            .bind(before)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        let mut attachments = self.attachments_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let files = attachments.remove(&row.id).unwrap_or_default();
                row.with_attachments(files)
            })
            .collect())
    }

    async fn attachments_for(&self, message_ids: &[&str]) -> Result<HashMap<String, Vec<Attachment>>> {
        let mut grouped: HashMap<String, Vec<Attachment>> = HashMap::new();
        if message_ids.is_empty() {
            return Ok(grouped);
        }
        let placeholders = vec!["?"; message_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, message_id, file_name, content_type, size_bytes, storage_url
             FROM message_attachments WHERE message_id IN ({}) ORDER BY file_name, id",
            placeholders
        );
        let mut query = sqlx::query_as::<_, Attachment>(&sql);
        for id in message_ids {
            query = query.bind(*id);
        }
        for attachment in query.fetch_all(&self.pool).await? {
            grouped
                .entry(attachment.message_id.clone())
                .or_default()
                .push(attachment);
        }
        Ok(grouped)
    }

    /// Marks everything `counterpart_id` sent to `reader_id` as read.
    /// Returns how many messages changed state.
    pub async fn mark_conversation_read(
        &self,
        school_id: &str,
        reader_id: &str,
        counterpart_id: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = ?
             WHERE school_id = ? AND recipient_id = ? AND sender_id = ? AND read_at IS NULL",
        )
        .bind(Utc::now())
        .bind(school_id)
        .bind(reader_id)
        .bind(counterpart_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_unread_count(&self, school_id: &str, participant_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE school_id = ? AND recipient_id = ? AND read_at IS NULL",
        )
        .bind(school_id)
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
