//! Tool execution against the completion and todo backends.

use serde_json::json;
use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::llm::CompletionApi;
use crate::todo::{TaskList, TodoApi};
use crate::tools::{ToolCall, ToolName};

/// Execute a model-requested tool and return the payload to fold back into
/// the conversation as a tool message.
///
/// Error policy: missing or ill-typed arguments raise `ToolArgument`;
/// decomposition failures raise `Completion`; todo-backend failures raise
/// `Todo`. The loop decides which of these fail the turn and which are
/// relayed to the model as a failed tool result.
pub(crate) async fn execute_tool<C, T>(
    completion: &C,
    todo: &T,
    name: ToolName,
    call: &ToolCall,
    user_id: &str,
) -> ServiceResult<serde_json::Value>
where
    C: CompletionApi,
    T: TodoApi,
{
    match name {
        ToolName::AppendTasks => {
            let description = task_description(call)?;
            let list = decompose(completion, description).await?;
            info!(user_id, task_count = list.tasklist.len(), "Appending tasks");
            let message = todo.append(&list, user_id).await?;
            Ok(json!({ "message": message }))
        }
        ToolName::OverwriteTasks => {
            let description = task_description(call)?;
            let list = decompose(completion, description).await?;
            info!(
                user_id,
                task_count = list.tasklist.len(),
                "Overwriting task list"
            );
            let message = todo.overwrite(&list, user_id).await?;
            Ok(json!({ "message": message }))
        }
        ToolName::FetchTasks => {
            let list = todo.fetch(user_id).await?;
            debug!(user_id, task_count = list.tasklist.len(), "Fetched tasks");
            Ok(json!({ "tasklist": list.tasklist }))
        }
    }
}

fn task_description(call: &ToolCall) -> ServiceResult<&str> {
    call.arguments
        .get("taskDescription")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::ToolArgument {
            message: format!("{} requires a taskDescription string", call.name),
        })
}

/// Run the single-purpose decomposition call and normalize the result:
/// every task starts uncompleted regardless of what the model emitted.
async fn decompose<C: CompletionApi>(completion: &C, description: &str) -> ServiceResult<TaskList> {
    let mut list = completion.decompose_tasks(description).await?;
    for task in &mut list.tasklist {
        task.completed = false;
    }
    Ok(list)
}
