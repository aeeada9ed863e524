use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Speaker of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
        }
    }
}

/// One finished utterance of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub role: Role,
    pub content: String,
    pub call_id: String,
}

impl Utterance {
    pub fn new(role: Role, content: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            call_id: call_id.into(),
        }
    }
}

/// Destination for finished utterances.
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Publish an utterance. Must not block the caller on downstream work.
    fn emit(&self, utterance: Utterance);

    /// Wait until every utterance emitted so far is visible to `fetch`.
    async fn flush(&self) {}

    /// Utterances recorded for `call_id`, oldest first.
    async fn fetch(&self, call_id: &str) -> Vec<Utterance>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_wire_format() {
        let utterance = Utterance::new(Role::Agent, "Hello there", "abc123");
        let json = serde_json::to_value(&utterance).unwrap();
        assert_eq!(json["role"], "agent");
        assert_eq!(json["content"], "Hello there");
        assert_eq!(json["callId"], "abc123");
    }
}
