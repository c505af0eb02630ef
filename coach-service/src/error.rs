use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Completion(#[from] CompletionError),

    #[error("{0}")]
    Todo(#[from] TodoServiceError),

    #[error("Invalid tool arguments: {message}")]
    ToolArgument { message: String },

    #[error("No session for user: {user_id}")]
    UnknownUser { user_id: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Completion service errors (network, API, malformed responses)
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Connection failed to completion service at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Completion request failed (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from completion service: {message}")]
    InvalidResponse { message: String },

    #[error("Structured output did not parse as a task list")]
    MalformedStructuredOutput {
        #[source]
        source: serde_json::Error,
    },
}

impl CompletionError {
    fn is_timeout(&self) -> bool {
        matches!(self, CompletionError::Connection { source, .. } if source.is_timeout())
    }
}

/// Todo backend errors
#[derive(Error, Debug)]
pub enum TodoServiceError {
    #[error("Connection failed to todo service at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Todo service request failed (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response from todo service")]
    InvalidResponse {
        #[source]
        source: reqwest::Error,
    },
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UnknownUser { .. } => StatusCode::NOT_FOUND,
            ServiceError::InvalidRequest { .. } | ServiceError::ToolArgument { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Completion(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Completion(_) | ServiceError::Todo(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Config { .. } | ServiceError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Completion(CompletionError::Connection { .. }) => {
                "completion_connection"
            }
            ServiceError::Completion(CompletionError::Api { .. }) => "completion_api",
            ServiceError::Completion(CompletionError::InvalidResponse { .. }) => {
                "completion_invalid_response"
            }
            ServiceError::Completion(CompletionError::MalformedStructuredOutput { .. }) => {
                "completion_malformed_output"
            }
            ServiceError::Todo(TodoServiceError::Connection { .. }) => "todo_connection",
            ServiceError::Todo(TodoServiceError::Status { .. }) => "todo_status",
            ServiceError::Todo(TodoServiceError::InvalidResponse { .. }) => {
                "todo_invalid_response"
            }
            ServiceError::ToolArgument { .. } => "tool_argument",
            ServiceError::UnknownUser { .. } => "unknown_user",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(code),
            details: None,
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
