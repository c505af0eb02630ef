//! Service coordinator: session store, entry points for the HTTP layer,
//! and ownership of the completion/todo clients.

mod agentic_loop;
mod dispatch;
pub mod prompts;
pub mod state;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::StaticConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::llm::{CompletionApi, CompletionClient};
use crate::todo::{TodoApi, TodoClient};
use crate::tools::ToolRegistry;

use agentic_loop::{TurnLimits, run_turn};
use state::{Conversation, Message, Personality};

/// Process-wide mapping from user id to conversation state.
///
/// Each entry is behind its own mutex: concurrent turns for different users
/// never contend, while concurrent turns for the same user are serialized.
/// The raw map is never handed out.
pub struct SessionStore {
    inner: DashMap<String, Arc<Mutex<Conversation>>>,
}

impl SessionStore {
    fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Create (or overwrite) a session for the user
    fn create(&self, user_id: &str, personality: Personality) -> Arc<Mutex<Conversation>> {
        let slot = Arc::new(Mutex::new(Conversation::new(user_id, personality)));
        self.inner.insert(user_id.to_string(), slot.clone());
        slot
    }

    fn get(&self, user_id: &str) -> Option<Arc<Mutex<Conversation>>> {
        self.inner.get(user_id).map(|entry| entry.clone())
    }

    fn get_or_create(&self, user_id: &str, personality: Personality) -> Arc<Mutex<Conversation>> {
        self.inner
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Conversation::new(user_id, personality))))
            .clone()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Main service coordinator
pub struct CoachService<C = CompletionClient, T = TodoClient> {
    completion: C,
    todo: T,
    registry: ToolRegistry,
    sessions: SessionStore,
    limits: TurnLimits,
}

impl CoachService {
    /// Create a service instance with real HTTP clients
    pub fn new(config: &StaticConfig) -> ServiceResult<Self> {
        info!("Initializing coach service");

        let completion = CompletionClient::new(config.completion.clone())?;
        let todo = TodoClient::new(config.todo.clone())?;
        let limits = TurnLimits {
            model: config.completion.model.clone(),
            max_tokens: config.completion.max_tokens,
            function_call_limit: config.agentic_loop.function_call_limit,
        };

        Self::with_clients(completion, todo, limits)
    }

    /// Check if the completion service is reachable
    pub async fn completion_available(&self) -> bool {
        self.completion.health_check().await
    }
}

impl<C, T> CoachService<C, T>
where
    C: CompletionApi + Send + Sync,
    T: TodoApi + Send + Sync,
{
    fn with_clients(completion: C, todo: T, limits: TurnLimits) -> ServiceResult<Self> {
        let registry = ToolRegistry::new();
        registry
            .validate()
            .map_err(|message| ServiceError::Config { message })?;

        Ok(Self {
            completion,
            todo,
            registry,
            sessions: SessionStore::new(),
            limits,
        })
    }

    /// Run one full turn for the user and return the updated history.
    ///
    /// Creates a session with the default personality if the user has none.
    /// The turn runs on a working copy: a completed turn writes back
    /// atomically, a failed completion leaves stored history untouched, and
    /// a tool-argument failure preserves history up to the failure point.
    pub async fn advance_conversation(
        &self,
        user_id: &str,
        input: &str,
    ) -> ServiceResult<Vec<Message>> {
        let turn_id = Uuid::new_v4();
        let slot = self.sessions.get_or_create(user_id, Personality::default());
        let mut guard = slot.lock().await;

        let mut working = guard.clone();
        let span = info_span!("turn", user_id, %turn_id);
        let outcome = run_turn(
            &self.completion,
            &self.todo,
            &self.registry,
            &self.limits,
            &mut working,
            input,
        )
        .instrument(span)
        .await;

        match outcome {
            Ok(()) => {
                *guard = working;
                Ok(guard.history.clone())
            }
            Err(e @ ServiceError::ToolArgument { .. }) => {
                *guard = working;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Create (or refresh) a session for the user, resolving the
    /// personality from signup survey answers when present.
    pub fn create_session(&self, user_id: &str, survey_answers: Option<&[String]>) {
        let personality = Personality::from_survey(survey_answers);
        self.sessions.create(user_id, personality);
        info!(
            user_id,
            ?personality,
            session_count = self.sessions.len(),
            "Session created"
        );
    }

    /// Replace the session's personality: re-composes the system message
    /// and discards prior history. A personality change starts a new
    /// conversation, not a patch to the old one.
    pub async fn reset_personality(
        &self,
        user_id: &str,
        personality: Personality,
    ) -> ServiceResult<()> {
        let slot = self
            .sessions
            .get(user_id)
            .ok_or_else(|| ServiceError::UnknownUser {
                user_id: user_id.to_string(),
            })?;

        let mut guard = slot.lock().await;
        *guard = Conversation::new(user_id, personality);
        info!(user_id, ?personality, "Personality reset, history cleared");
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use crate::llm::{CompletionResult, ToolMode};
    use crate::service::state::MessageRole;
    use crate::todo::TaskList;
    use crate::tools::ToolDefinition;
    use std::sync::Mutex as StdMutex;

    /// Replies with a fixed text, or fails when `fail` is set
    struct FixedCompletion {
        reply: &'static str,
        fail: bool,
        calls: StdMutex<u32>,
    }

    impl FixedCompletion {
        fn text(reply: &'static str) -> Self {
            Self {
                reply,
                fail: false,
                calls: StdMutex::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: "",
                fail: true,
                calls: StdMutex::new(0),
            }
        }
    }

    impl CompletionApi for FixedCompletion {
        async fn request_completion(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _mode: ToolMode,
        ) -> ServiceResult<CompletionResult> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(ServiceError::Completion(CompletionError::Api {
                    status: 429,
                    message: "rate limited".to_string(),
                }));
            }
            Ok(CompletionResult::TextReply {
                content: self.reply.to_string(),
            })
        }

        async fn decompose_tasks(&self, _description: &str) -> ServiceResult<TaskList> {
            Ok(TaskList::default())
        }
    }

    struct NoopTodo;

    impl TodoApi for NoopTodo {
        async fn append(&self, _list: &TaskList, _user_id: &str) -> ServiceResult<String> {
            Ok("ok".to_string())
        }

        async fn overwrite(&self, _list: &TaskList, _user_id: &str) -> ServiceResult<String> {
            Ok("ok".to_string())
        }

        async fn fetch(&self, _user_id: &str) -> ServiceResult<TaskList> {
            Ok(TaskList::default())
        }
    }

    fn service(completion: FixedCompletion) -> CoachService<FixedCompletion, NoopTodo> {
        CoachService::with_clients(
            completion,
            NoopTodo,
            TurnLimits {
                model: "gpt-4".to_string(),
                max_tokens: 31_000,
                function_call_limit: 3,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_advance_creates_session_with_default_personality() {
        let svc = service(FixedCompletion::text("Let's get to work."));

        let history = svc.advance_conversation("user-1", "hello").await.unwrap();

        assert_eq!(svc.session_count(), 1);
        assert_eq!(history[0].role, MessageRole::System);
        assert!(
            history[0]
                .content
                .contains(Personality::ToughLove.clause())
        );
        assert_eq!(history.last().unwrap().role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_unchanged() {
        let svc = service(FixedCompletion::failing());
        svc.create_session("user-1", None);

        let result = svc.advance_conversation("user-1", "hello").await;
        assert!(matches!(result, Err(ServiceError::Completion(_))));

        // The failed turn must not have advanced the stored history.
        let slot = svc.sessions.get("user-1").unwrap();
        let guard = slot.lock().await;
        assert_eq!(guard.history.len(), 1);
        assert_eq!(guard.history[0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn test_reset_personality_recomposes_and_clears() {
        let svc = service(FixedCompletion::text("Noted."));
        svc.create_session("user-1", None);
        svc.advance_conversation("user-1", "hello").await.unwrap();

        svc.reset_personality("user-1", Personality::Stern)
            .await
            .unwrap();

        let slot = svc.sessions.get("user-1").unwrap();
        let guard = slot.lock().await;
        assert_eq!(guard.history.len(), 1);
        assert_eq!(guard.personality, Personality::Stern);
        assert!(guard.history[0].content.contains(Personality::Stern.clause()));
    }

    #[tokio::test]
    async fn test_reset_personality_unknown_user() {
        let svc = service(FixedCompletion::text("Noted."));
        let result = svc.reset_personality("ghost", Personality::Stern).await;
        assert!(matches!(result, Err(ServiceError::UnknownUser { .. })));
    }

    #[tokio::test]
    async fn test_create_session_resolves_survey_personality() {
        let svc = service(FixedCompletion::text("Noted."));
        let answers: Vec<String> = ["a", "b", "c", "d", "Kind and supportive"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        svc.create_session("user-1", Some(&answers));

        let slot = svc.sessions.get("user-1").unwrap();
        let guard = slot.lock().await;
        assert_eq!(guard.personality, Personality::KindAndSupportive);
    }

    #[tokio::test]
    async fn test_system_message_survives_every_turn() {
        let svc = service(FixedCompletion::text("Keep going."));
        for i in 0..5 {
            let history = svc
                .advance_conversation("user-1", &format!("message {i}"))
                .await
                .unwrap();
            assert_eq!(history[0].role, MessageRole::System);
        }
    }
}
