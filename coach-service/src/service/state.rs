//! Conversation state: the message vocabulary, per-user session state,
//! and the coaching personality selector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role tag for a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry in a conversation. The ordered sequence of these is the
/// literal context window sent to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    /// Tool identifier, present only on tool-result messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            name: None,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            name: None,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            name: None,
            content: content.into(),
        }
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            name: Some(name.into()),
            content: content.into(),
        }
    }
}

/// Per-user conversation state, owned by the session store.
///
/// Invariant: `history[0]` is always the composed system message. Trimming
/// never evicts it, and a personality reset replaces it wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub user_id: String,
    pub personality: Personality,
    pub history: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: impl Into<String>, personality: Personality) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            personality,
            history: vec![Message::system(super::prompts::compose_system_prompt(
                personality,
            ))],
            created_at: now,
            updated_at: now,
        }
    }
}

/// Coaching personality appended to the base system instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Personality {
    #[default]
    ToughLove,
    KindAndSupportive,
    Stern,
    DoucheyAndObnoxious,
}

/// Index of the personality question in the signup survey
const SURVEY_PERSONALITY_INDEX: usize = 4;

impl Personality {
    /// Resolve a personality from raw survey answers.
    ///
    /// This is the only resolver: absent survey, short answer list, or an
    /// unrecognized answer all fall back to the default.
    pub fn from_survey(answers: Option<&[String]>) -> Self {
        answers
            .and_then(|a| a.get(SURVEY_PERSONALITY_INDEX))
            .and_then(|answer| Self::from_answer(answer))
            .unwrap_or_default()
    }

    /// Map a survey answer to a personality by exact match
    pub fn from_answer(answer: &str) -> Option<Self> {
        match answer {
            "Tough love" => Some(Personality::ToughLove),
            "Kind and supportive" => Some(Personality::KindAndSupportive),
            "Stern" => Some(Personality::Stern),
            "Douchey and obnoxious" => Some(Personality::DoucheyAndObnoxious),
            _ => None,
        }
    }

    /// Behavioral clause appended to the base system instruction
    pub fn clause(&self) -> &'static str {
        match self {
            Personality::ToughLove => {
                "Coach the human with tough love: be blunt about procrastination and \
                 push them hard to commit to their tasks, but always in their corner."
            }
            Personality::KindAndSupportive => {
                "Coach the human kindly and supportively: celebrate small wins, be \
                 gentle about setbacks, and encourage them warmly."
            }
            Personality::Stern => {
                "Coach the human sternly: be formal, direct, and no-nonsense. Do not \
                 coddle them, and keep the conversation focused on getting work done."
            }
            Personality::DoucheyAndObnoxious => {
                "Coach the human with obnoxious bravado: tease them relentlessly about \
                 unfinished tasks and brag about how you would have finished already."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey_with_answer(answer: &str) -> Vec<String> {
        let mut answers = vec!["a".to_string(); SURVEY_PERSONALITY_INDEX];
        answers.push(answer.to_string());
        answers
    }

    #[test]
    fn test_resolution_absent_survey_defaults() {
        assert_eq!(Personality::from_survey(None), Personality::ToughLove);
    }

    #[test]
    fn test_resolution_short_survey_defaults() {
        let answers = vec!["yes".to_string(), "no".to_string()];
        assert_eq!(
            Personality::from_survey(Some(&answers)),
            Personality::ToughLove
        );
    }

    #[test]
    fn test_resolution_unrecognized_answer_defaults() {
        let answers = survey_with_answer("Surprise me");
        assert_eq!(
            Personality::from_survey(Some(&answers)),
            Personality::ToughLove
        );
    }

    #[test]
    fn test_resolution_exact_matches() {
        for (answer, expected) in [
            ("Tough love", Personality::ToughLove),
            ("Kind and supportive", Personality::KindAndSupportive),
            ("Stern", Personality::Stern),
            ("Douchey and obnoxious", Personality::DoucheyAndObnoxious),
        ] {
            let answers = survey_with_answer(answer);
            assert_eq!(Personality::from_survey(Some(&answers)), expected);
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let answers = survey_with_answer("Stern");
        let first = Personality::from_survey(Some(&answers));
        let second = Personality::from_survey(Some(&answers));
        assert_eq!(first, second);
    }

    #[test]
    fn test_new_conversation_starts_with_system_message() {
        let conversation = Conversation::new("user-1", Personality::Stern);
        assert_eq!(conversation.history.len(), 1);
        assert_eq!(conversation.history[0].role, MessageRole::System);
        assert!(conversation.history[0].content.contains("sternly"));
    }
}
