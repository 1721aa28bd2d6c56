use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::calculator::FootprintResult;
use crate::core::factors::Region;

pub const GREETINGS: &[&str] = &[
    "Hello! I'm your carbon footprint assistant. How can I help you today?",
    "Welcome to the Carbon Calculator! I'm here to help you understand and reduce your carbon footprint.",
    "Hi there! Ready to calculate your environmental impact? I'm here to assist!",
];

pub fn random_greeting() -> &'static str {
    GREETINGS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(GREETINGS[0])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One user's session: the chat transcript plus the latest calculation.
///
/// Messages are append-only. The footprint is `None` until the first
/// calculation and is replaced wholesale on every recalculation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    footprint: Option<FootprintResult>,
    region: Region,
}

impl ConversationState {
    pub fn new(region: Region) -> Self {
        ConversationState {
            messages: Vec::new(),
            footprint: None,
            region,
        }
    }

    /// A fresh session opened by one of the assistant's greetings.
    pub fn with_greeting(region: Region) -> Self {
        let mut state = Self::new(region);
        state.push(ChatMessage::assistant(random_greeting()));
        state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn footprint(&self) -> Option<&FootprintResult> {
        self.footprint.as_ref()
    }

    pub fn is_calculated(&self) -> bool {
        self.footprint.is_some()
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn record_footprint(&mut self, region: Region, result: FootprintResult) {
        self.region = region;
        self.footprint = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_uncalculated() {
        let state = ConversationState::new(Region::EuropeanUnion);
        assert!(state.messages().is_empty());
        assert!(!state.is_calculated());
        assert_eq!(state.region(), Region::EuropeanUnion);
    }

    #[test]
    fn test_with_greeting_seeds_one_assistant_message() {
        let state = ConversationState::with_greeting(Region::India);
        assert_eq!(state.messages().len(), 1);

        let greeting = state.last_message().unwrap();
        assert_eq!(greeting.role, Role::Assistant);
        assert!(GREETINGS.contains(&greeting.content.as_str()));
    }

    #[test]
    fn test_record_footprint_replaces_previous() {
        let mut state = ConversationState::new(Region::India);
        let first = FootprintResult {
            transportation: 1.0,
            electricity: 1.0,
            diet: 1.0,
            waste: 1.0,
            total: 4.0,
        };
        let second = FootprintResult { total: 2.0, ..first };

        state.record_footprint(Region::India, first);
        state.record_footprint(Region::UnitedStates, second);

        assert_eq!(state.footprint(), Some(&second));
        assert_eq!(state.region(), Region::UnitedStates);
    }

    #[test]
    fn test_messages_keep_insertion_order() {
        let mut state = ConversationState::new(Region::India);
        state.push(ChatMessage::user("first"));
        state.push(ChatMessage::assistant("second"));
        state.push(ChatMessage::user("third"));

        let contents: Vec<_> = state.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(Role::User.to_string(), "user");
    }
}
