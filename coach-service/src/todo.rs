//! HTTP client for the external todo-list backend.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TodoConfig;
use crate::error::{ServiceError, ServiceResult, TodoServiceError};

/// One todo entry. `length` is minutes as a string, matching the todo
/// backend's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoTask {
    pub task: String,
    pub length: String,
    pub completed: bool,
}

/// Task list exchanged with the todo backend and the decomposition call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub tasklist: Vec<TodoTask>,
}

/// Interface the dispatcher uses to reach the todo backend.
/// Tests substitute an in-memory implementation.
pub trait TodoApi: Sync {
    fn append(
        &self,
        list: &TaskList,
        user_id: &str,
    ) -> impl Future<Output = ServiceResult<String>> + Send;

    fn overwrite(
        &self,
        list: &TaskList,
        user_id: &str,
    ) -> impl Future<Output = ServiceResult<String>> + Send;

    fn fetch(&self, user_id: &str) -> impl Future<Output = ServiceResult<TaskList>> + Send;
}

/// Todo backend HTTP client
pub struct TodoClient {
    client: Client,
    config: TodoConfig,
}

impl TodoClient {
    pub fn new(config: TodoConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                ServiceError::Todo(TodoServiceError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }

    async fn post_tasklist(
        &self,
        endpoint: &str,
        list: &TaskList,
        user_id: &str,
    ) -> ServiceResult<String> {
        let url = format!("{}/{}", self.config.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .json(&ModifyRequest {
                tasklist: &list.tasklist,
                user_id,
            })
            .send()
            .await
            .map_err(|e| TodoServiceError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Todo(TodoServiceError::Status {
                status,
                message,
            }));
        }

        let body: ModifyResponse = response
            .json()
            .await
            .map_err(|e| TodoServiceError::InvalidResponse { source: e })?;

        debug!(endpoint, user_id, message = %body.message, "Todo list updated");
        Ok(body.message)
    }
}

impl TodoApi for TodoClient {
    async fn append(&self, list: &TaskList, user_id: &str) -> ServiceResult<String> {
        self.post_tasklist("append", list, user_id).await
    }

    async fn overwrite(&self, list: &TaskList, user_id: &str) -> ServiceResult<String> {
        self.post_tasklist("overwrite", list, user_id).await
    }

    async fn fetch(&self, user_id: &str) -> ServiceResult<TaskList> {
        let url = format!("{}/fetch/{}", self.config.base_url, user_id);

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|e| TodoServiceError::Connection {
                    url: url.clone(),
                    source: e,
                })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Todo(TodoServiceError::Status {
                status,
                message,
            }));
        }

        let body: FetchResponse = response
            .json()
            .await
            .map_err(|e| TodoServiceError::InvalidResponse { source: e })?;

        Ok(body.todolist)
    }
}

// Wire types for the todo backend

#[derive(Serialize)]
struct ModifyRequest<'a> {
    tasklist: &'a [TodoTask],
    #[serde(rename = "userId")]
    user_id: &'a str,
}

#[derive(Deserialize)]
struct ModifyResponse {
    message: String,
}

#[derive(Deserialize)]
struct FetchResponse {
    todolist: TaskList,
}
