use serde::Deserialize;
use std::time::Duration;

/// Static configuration loaded at startup from config file and environment
#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_completion")]
    pub completion: CompletionConfig,

    #[serde(default = "default_todo")]
    pub todo: TodoConfig,

    #[serde(default = "default_agentic_loop")]
    pub agentic_loop: AgenticLoopConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Completion service (OpenAI-style chat API) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub base_url: String,

    /// Bearer token for the completion service. Empty disables the header
    /// (e.g. a local OpenAI-compatible server).
    #[serde(default)]
    pub api_key: String,

    /// Model driving the conversation loop
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for the single-purpose task decomposition call
    #[serde(default = "default_decompose_model")]
    pub decompose_model: String,

    /// Approximate context budget enforced by history trimming
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_completion_timeout")]
    pub request_timeout_secs: u64,
}

impl CompletionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Todo backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TodoConfig {
    #[serde(default = "default_todo_url")]
    pub base_url: String,

    #[serde(default = "default_todo_timeout")]
    pub request_timeout_secs: u64,
}

impl TodoConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Agentic loop limits
#[derive(Debug, Clone, Deserialize)]
pub struct AgenticLoopConfig {
    /// Maximum tool executions per user turn
    #[serde(default = "default_function_call_limit")]
    pub function_call_limit: u32,
}

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_completion() -> CompletionConfig {
    CompletionConfig {
        base_url: default_completion_url(),
        api_key: String::new(),
        model: default_model(),
        decompose_model: default_decompose_model(),
        max_tokens: default_max_tokens(),
        request_timeout_secs: default_completion_timeout(),
    }
}

fn default_completion_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_decompose_model() -> String {
    "gpt-4-1106-preview".to_string()
}

fn default_max_tokens() -> usize {
    31_000
}

fn default_completion_timeout() -> u64 {
    60
}

fn default_todo() -> TodoConfig {
    TodoConfig {
        base_url: default_todo_url(),
        request_timeout_secs: default_todo_timeout(),
    }
}

fn default_todo_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_todo_timeout() -> u64 {
    10
}

fn default_agentic_loop() -> AgenticLoopConfig {
    AgenticLoopConfig {
        function_call_limit: default_function_call_limit(),
    }
}

fn default_function_call_limit() -> u32 {
    3
}
