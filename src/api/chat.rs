//! Simulated assistant chat
//!
//! No model is called; the reply echoes the message under the chosen
//! assistant's name.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{ApiError, ApiResult};

/// Assistants the dashboard can pick from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatModel {
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "claude-3")]
    Claude3,
    #[serde(rename = "llama-3")]
    Llama3,
}

impl ChatModel {
    pub fn display_name(self) -> &'static str {
        match self {
            ChatModel::Gpt4 => "GPT-4",
            ChatModel::Gpt35Turbo => "GPT-3.5 Turbo",
            ChatModel::Claude3 => "Claude 3",
            ChatModel::Llama3 => "Llama 3",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub model: ChatModel,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/chat
pub async fn chat(payload: Result<Json<ChatRequest>, JsonRejection>) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload?;
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }

    Ok(Json(ChatResponse {
        id: Uuid::new_v4(),
        content: format!(
            "[{} simulated] You said: {}",
            request.model.display_name(),
            message
        ),
        timestamp: Utc::now(),
    }))
}
