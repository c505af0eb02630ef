//! Client for the external chat-completion service (OpenAI-style API).

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CompletionConfig;
use crate::error::{CompletionError, ServiceError, ServiceResult};
use crate::service::state::Message;
use crate::todo::TaskList;
use crate::tools::ToolDefinition;

/// Tool-usage mode for a completion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    /// The model may answer in text or request a tool call
    Auto,
    /// The model must produce a textual reply
    None,
}

impl ToolMode {
    fn as_str(&self) -> &'static str {
        match self {
            ToolMode::Auto => "auto",
            ToolMode::None => "none",
        }
    }
}

/// Outcome of one completion exchange
#[derive(Debug, Clone)]
pub enum CompletionResult {
    TextReply { content: String },
    ToolRequest(crate::tools::ToolCall),
}

/// Interface the orchestration loop uses to reach the completion service.
/// Tests substitute scripted implementations.
pub trait CompletionApi: Sync {
    fn request_completion(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        mode: ToolMode,
    ) -> impl Future<Output = ServiceResult<CompletionResult>> + Send;

    fn decompose_tasks(&self, description: &str)
    -> impl Future<Output = ServiceResult<TaskList>> + Send;
}

/// Completion service HTTP client
pub struct CompletionClient {
    client: Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                ServiceError::Completion(CompletionError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }

    /// Check if the completion service is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.config.base_url);
        let mut request = self.client.get(&url);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Completion service health check failed");
                false
            }
        }
    }

    async fn chat(&self, request: &ChatCompletionRequest<'_>) -> ServiceResult<ResponseMessage> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut http_request = self.client.post(&url).json(request);
        if !self.config.api_key.is_empty() {
            http_request = http_request.bearer_auth(&self.config.api_key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| CompletionError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Completion(CompletionError::Api {
                status,
                message,
            }));
        }

        let body: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| CompletionError::InvalidResponse {
                    message: format!("undecodable completion body: {e}"),
                })?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| {
                ServiceError::Completion(CompletionError::InvalidResponse {
                    message: "completion returned no choices".to_string(),
                })
            })
    }
}

impl CompletionApi for CompletionClient {
    async fn request_completion(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        mode: ToolMode,
    ) -> ServiceResult<CompletionResult> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            tools: Some(tools),
            tool_choice: Some(mode.as_str()),
            response_format: None,
        };

        debug!(
            model = %self.config.model,
            message_count = messages.len(),
            tool_mode = mode.as_str(),
            "Requesting completion"
        );

        let message = self.chat(&request).await?;
        parse_completion(message)
    }

    async fn decompose_tasks(&self, description: &str) -> ServiceResult<TaskList> {
        const DECOMPOSE_PROMPT: &str = include_str!("../prompts/decompose.txt");

        let messages = [Message::system(DECOMPOSE_PROMPT), Message::user(description)];
        let request = ChatCompletionRequest {
            model: &self.config.decompose_model,
            messages: &messages,
            tools: None,
            tool_choice: None,
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let message = self.chat(&request).await?;
        let content = message.content.unwrap_or_default();

        debug!(content_length = content.len(), "Task decomposition returned");

        let list: TaskList = serde_json::from_str(&content)
            .map_err(|e| CompletionError::MalformedStructuredOutput { source: e })?;
        Ok(list)
    }
}

/// Interpret a completion message as either a text reply or one tool request.
/// Multiple tool calls in one response are out of contract; only the first
/// is honored.
fn parse_completion(message: ResponseMessage) -> ServiceResult<CompletionResult> {
    if let Some(calls) = message.tool_calls
        && let Some(call) = calls.into_iter().next()
    {
        let arguments = serde_json::from_str(&call.function.arguments).map_err(|e| {
            ServiceError::ToolArgument {
                message: format!("arguments for {} are not valid JSON: {e}", call.function.name),
            }
        })?;
        return Ok(CompletionResult::ToolRequest(crate::tools::ToolCall {
            name: call.function.name,
            arguments,
        }));
    }

    match message.content {
        Some(content) if !content.is_empty() => Ok(CompletionResult::TextReply { content }),
        _ => Err(ServiceError::Completion(CompletionError::InvalidResponse {
            message: "completion had neither content nor a tool call".to_string(),
        })),
    }
}

// Wire types for the completion API

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireFunctionCall,
}

#[derive(Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded arguments object, as the API delivers it
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_reply() {
        let message = ResponseMessage {
            content: Some("You have three tasks left.".to_string()),
            tool_calls: None,
        };
        match parse_completion(message).unwrap() {
            CompletionResult::TextReply { content } => {
                assert_eq!(content, "You have three tasks left.")
            }
            other => panic!("expected text reply, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_tool_request() {
        let message = ResponseMessage {
            content: None,
            tool_calls: Some(vec![WireToolCall {
                function: WireFunctionCall {
                    name: "appendTasks".to_string(),
                    arguments: r#"{"taskDescription": "clean room"}"#.to_string(),
                },
            }]),
        };
        match parse_completion(message).unwrap() {
            CompletionResult::ToolRequest(call) => {
                assert_eq!(call.name, "appendTasks");
                assert_eq!(call.arguments["taskDescription"], "clean room");
            }
            other => panic!("expected tool request, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed_tool_arguments() {
        let message = ResponseMessage {
            content: None,
            tool_calls: Some(vec![WireToolCall {
                function: WireFunctionCall {
                    name: "appendTasks".to_string(),
                    arguments: "{not json".to_string(),
                },
            }]),
        };
        assert!(matches!(
            parse_completion(message),
            Err(ServiceError::ToolArgument { .. })
        ));
    }

    #[test]
    fn test_parse_empty_message_is_invalid() {
        let message = ResponseMessage {
            content: None,
            tool_calls: None,
        };
        assert!(matches!(
            parse_completion(message),
            Err(ServiceError::Completion(
                CompletionError::InvalidResponse { .. }
            ))
        ));
    }

    #[test]
    fn test_only_first_tool_call_is_honored() {
        let message = ResponseMessage {
            content: None,
            tool_calls: Some(vec![
                WireToolCall {
                    function: WireFunctionCall {
                        name: "fetchTasks".to_string(),
                        arguments: "{}".to_string(),
                    },
                },
                WireToolCall {
                    function: WireFunctionCall {
                        name: "overwriteTasks".to_string(),
                        arguments: "{}".to_string(),
                    },
                },
            ]),
        };
        match parse_completion(message).unwrap() {
            CompletionResult::ToolRequest(call) => assert_eq!(call.name, "fetchTasks"),
            other => panic!("expected tool request, got {other:?}"),
        }
    }
}
