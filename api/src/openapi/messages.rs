use super::common::{default_conversation_limit, ApiResponse, ApiTags};
use crate::database::{Database, Message, NewMessage};
use crate::notifications::MessageNotifier;
use chrono::{DateTime, Utc};
use poem::web::Data;
use poem_openapi::{
    param::{Path, Query},
    payload::Json,
    Object, OpenApi,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub struct MessagesApi;

#[derive(Debug, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub reader_id: String,
    pub counterpart_id: String,
}

#[derive(Debug, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub marked: u64,
}

#[derive(Debug, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[OpenApi]
impl MessagesApi {
    /// Send message
    ///
    /// Sender and recipient must be students or teachers of the school. The
    /// recipient is notified by email in the background when email is configured.
    #[oai(
        path = "/schools/:school_id/messages",
        method = "post",
        tag = "ApiTags::Messages"
    )]
    async fn send_message(
        &self,
        db: Data<&Arc<Database>>,
        notifier: Data<&Arc<MessageNotifier>>,
        school_id: Path<String>,
        params: Json<NewMessage>,
    ) -> Json<ApiResponse<Message>> {
        match db.send_message(&school_id.0, &params.0).await {
            Ok(sent) => {
                notifier.notify_new_message(&sent);
                Json(ApiResponse {
                    success: true,
                    data: Some(sent.message),
                    error: None,
                })
            }
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }

    /// Get conversation
    ///
    /// Messages between two participants, newest first. Pass the oldest
    /// `createdAt` seen as `before` to load earlier history.
    #[oai(
        path = "/schools/:school_id/conversations/:participant_a/:participant_b",
        method = "get",
        tag = "ApiTags::Messages"
    )]
    async fn get_conversation(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        participant_a: Path<String>,
        participant_b: Path<String>,
        #[oai(default = "default_conversation_limit")] limit: Query<u32>,
        before: Query<Option<DateTime<Utc>>>,
    ) -> Json<ApiResponse<Vec<Message>>> {
        match db
            .get_conversation(&school_id.0, &participant_a.0, &participant_b.0, limit.0, before.0)
            .await
        {
            Ok(messages) => Json(ApiResponse {
                success: true,
                data: Some(messages),
                error: None,
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }

    /// Mark conversation read
    ///
    /// Marks every unread message from the counterpart to the reader as read
    #[oai(
        path = "/schools/:school_id/messages/read",
        method = "post",
        tag = "ApiTags::Messages"
    )]
    async fn mark_read(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        params: Json<MarkReadRequest>,
    ) -> Json<ApiResponse<MarkReadResponse>> {
        match db
            .mark_conversation_read(&school_id.0, &params.reader_id, &params.counterpart_id)
            .await
        {
            Ok(marked) => Json(ApiResponse {
                success: true,
                data: Some(MarkReadResponse { marked }),
                error: None,
            }),
            Err(e) => Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }

    /// Get unread message count
    #[oai(
        path = "/schools/:school_id/participants/:participant_id/unread-count",
        method = "get",
        tag = "ApiTags::Messages"
    )]
    async fn get_unread_count(
        &self,
        db: Data<&Arc<Database>>,
        school_id: Path<String>,
        participant_id: Path<String>,
    ) -> Json<ApiResponse<UnreadCountResponse>> {
        match db.get_unread_count(&school_id.0, &participant_id.0).await {
            Ok(count) => Json(ApiResponse {
                success: true,
                data: Some(UnreadCountResponse { count }),
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
