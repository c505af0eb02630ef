//! Chat, personality, and session endpoints.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::service::state::{Message, Personality};

use super::AppState;

/// One chat turn
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: String,
    pub input: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub messages: Vec<Message>,
}

/// Run one full turn of the conversation and return the updated history
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> ServiceResult<Json<ChatResponse>> {
    if request.input.trim().is_empty() {
        return Err(ServiceError::InvalidRequest {
            message: "input must not be empty".to_string(),
        });
    }

    let messages = state
        .service
        .advance_conversation(&request.user_id, &request.input)
        .await?;

    Ok(Json(ChatResponse { messages }))
}

/// Personality reset request. Accepts either an explicit personality
/// selector or raw survey answers to resolve one from.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityRequest {
    pub user_id: String,
    pub personality: Option<Personality>,
    pub survey_answers: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct AckResponse {
    pub message: String,
}

/// Replace the session's personality and start a fresh conversation
pub async fn personality_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PersonalityRequest>,
) -> ServiceResult<Json<AckResponse>> {
    let personality = request
        .personality
        .unwrap_or_else(|| Personality::from_survey(request.survey_answers.as_deref()));

    state
        .service
        .reset_personality(&request.user_id, personality)
        .await?;

    Ok(Json(AckResponse {
        message: "Personality updated".to_string(),
    }))
}

/// Session creation request (login or signup)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub user_id: String,
    pub survey_answers: Option<Vec<String>>,
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRequest>,
) -> ServiceResult<Json<AckResponse>> {
    create_session(&state, &request)?;
    Ok(Json(AckResponse {
        message: "Login successful".to_string(),
    }))
}

pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRequest>,
) -> ServiceResult<Json<AckResponse>> {
    create_session(&state, &request)?;
    Ok(Json(AckResponse {
        message: "Signup successful".to_string(),
    }))
}

fn create_session(state: &AppState, request: &SessionRequest) -> ServiceResult<()> {
    if request.user_id.is_empty() {
        return Err(ServiceError::InvalidRequest {
            message: "userId is required".to_string(),
        });
    }

    state
        .service
        .create_session(&request.user_id, request.survey_answers.as_deref());
    info!(user_id = %request.user_id, "Session ready");
    Ok(())
}
