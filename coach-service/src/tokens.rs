//! Approximate token accounting for conversation histories.
//!
//! The trimming loop only needs a deterministic, monotonic estimate, not an
//! exact count. Each message costs a fixed overhead plus the encoded length
//! of its fields; encoding is a per-model character heuristic with a generic
//! fallback for unrecognized models.

use crate::service::state::{Message, MessageRole};

/// Fixed per-message overhead (role/content framing tokens)
const MESSAGE_OVERHEAD: usize = 4;

/// Tokens reserved for the assistant reply primer
const REPLY_PRIMER: usize = 2;

/// A named message is framed one token cheaper than an unnamed one
const NAME_DISCOUNT: usize = 1;

/// Character-based token encoding scheme
#[derive(Debug, Clone, Copy)]
struct Encoding {
    chars_per_token: usize,
}

impl Encoding {
    fn encoded_len(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// Generic fallback scheme: conservative, so trimming errs toward shorter
/// histories rather than overflowing the context window.
const GENERIC_ENCODING: Encoding = Encoding { chars_per_token: 3 };

/// Known model families and their approximate character density
const MODEL_ENCODINGS: &[(&str, Encoding)] = &[
    ("gpt-4", Encoding { chars_per_token: 4 }),
    ("gpt-3.5", Encoding { chars_per_token: 4 }),
];

fn encoding_for_model(model: &str) -> Encoding {
    MODEL_ENCODINGS
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, encoding)| *encoding)
        .unwrap_or(GENERIC_ENCODING)
}

fn role_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

/// Estimate the token cost of sending `messages` to `model`.
///
/// Deterministic and side-effect-free; strictly monotonic in content length
/// and in message count, which the trimming loop relies on to converge.
pub fn estimate_tokens(model: &str, messages: &[Message]) -> usize {
    let encoding = encoding_for_model(model);

    let mut num_tokens = 0;
    for message in messages {
        num_tokens += MESSAGE_OVERHEAD;
        num_tokens += encoding.encoded_len(role_str(message.role));
        num_tokens += encoding.encoded_len(&message.content);
        if let Some(name) = &message.name {
            num_tokens += encoding.encoded_len(name);
            num_tokens -= NAME_DISCOUNT;
        }
    }
    num_tokens + REPLY_PRIMER
}
