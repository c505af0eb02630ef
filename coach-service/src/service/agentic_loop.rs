//! The per-turn orchestration loop.
//!
//! One turn: append the user message, then trim -> request completion ->
//! dispatch tool -> fold result, repeating until the model produces a
//! textual reply. The iteration counter bounds the worst case at
//! `function_call_limit` tool executions and `function_call_limit + 1`
//! completion requests per turn.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{CompletionError, ServiceError, ServiceResult};
use crate::llm::{CompletionApi, CompletionResult, ToolMode};
use crate::todo::TodoApi;
use crate::tokens::estimate_tokens;
use crate::tools::{ToolRegistry, ToolResult};

use super::dispatch;
use super::state::{Conversation, Message};

/// Limits applied to every turn
#[derive(Debug, Clone)]
pub(crate) struct TurnLimits {
    pub model: String,
    pub max_tokens: usize,
    pub function_call_limit: u32,
}

/// Drop the oldest non-system messages until the history fits the budget.
///
/// The system message at index 0 is exempt. If it alone exceeds the cap the
/// history is left as-is and the request proceeds; that degenerate case is
/// accepted rather than crashed on. A no-op on histories already under
/// budget, so repeated calls converge.
pub(crate) fn trim_history(model: &str, history: &mut Vec<Message>, max_tokens: usize) {
    let before = history.len();
    while history.len() > 1 && estimate_tokens(model, history) >= max_tokens {
        history.remove(1);
    }
    if history.len() < before {
        debug!(
            removed = before - history.len(),
            remaining = history.len(),
            "Trimmed history to token budget"
        );
    }
}

/// Run one full turn of the conversation.
///
/// Mutates `conversation` in place; the caller owns atomicity (it hands in
/// a working copy and writes back on the outcomes that keep history).
pub(crate) async fn run_turn<C, T>(
    completion: &C,
    todo: &T,
    registry: &ToolRegistry,
    limits: &TurnLimits,
    conversation: &mut Conversation,
    input: &str,
) -> ServiceResult<()>
where
    C: CompletionApi,
    T: TodoApi,
{
    conversation.history.push(Message::user(input));

    let definitions = registry.definitions();
    let mut tool_calls_made: u32 = 0;
    let mut force_text = false;

    loop {
        trim_history(&limits.model, &mut conversation.history, limits.max_tokens);

        let mode = if force_text || tool_calls_made >= limits.function_call_limit {
            ToolMode::None
        } else {
            ToolMode::Auto
        };

        debug!(
            user_id = %conversation.user_id,
            tool_calls_made,
            tool_mode = ?mode,
            message_count = conversation.history.len(),
            "Requesting completion"
        );

        match completion
            .request_completion(&conversation.history, &definitions, mode)
            .await?
        {
            CompletionResult::TextReply { content } => {
                conversation.history.push(Message::assistant(content));
                conversation.updated_at = Utc::now();
                info!(
                    user_id = %conversation.user_id,
                    tool_calls_made,
                    "Turn complete"
                );
                return Ok(());
            }
            CompletionResult::ToolRequest(call) => {
                if mode == ToolMode::None {
                    return Err(ServiceError::Completion(CompletionError::InvalidResponse {
                        message: format!(
                            "model requested tool {} while tool use was disabled",
                            call.name
                        ),
                    }));
                }

                let name =
                    registry
                        .parse(&call.name)
                        .ok_or_else(|| ServiceError::ToolArgument {
                            message: format!("unknown tool: {}", call.name),
                        })?;

                tool_calls_made += 1;
                info!(
                    user_id = %conversation.user_id,
                    tool = %name,
                    iteration = tool_calls_made,
                    "Executing tool"
                );

                let result = match dispatch::execute_tool(
                    completion,
                    todo,
                    name,
                    &call,
                    &conversation.user_id,
                )
                .await
                {
                    Ok(value) => ToolResult::success(name.to_string(), value),
                    // Todo-backend failures are relayed to the model as a
                    // failed tool result so it can inform the user.
                    Err(ServiceError::Todo(e)) => {
                        warn!(
                            user_id = %conversation.user_id,
                            tool = %name,
                            error = %e,
                            "Tool execution failed against todo backend"
                        );
                        ToolResult::error(name.to_string(), e.to_string())
                    }
                    Err(e) => return Err(e),
                };

                conversation.history.push(Message::tool(
                    name.to_string(),
                    serde_json::to_string(&result).unwrap_or_default(),
                ));

                if name.mutates_list() {
                    force_text = true;
                }
            }
        }
    }
}
