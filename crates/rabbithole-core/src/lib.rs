use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_\s-]").expect("Invalid regex pattern"));
static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_-]+").expect("Invalid regex pattern"));

/// One of the two fixed participants of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "rabbit-1")]
    Rabbit1,
    #[serde(rename = "rabbit-2")]
    Rabbit2,
}

impl Speaker {
    pub const ALL: [Speaker; 2] = [Speaker::Rabbit1, Speaker::Rabbit2];

    /// Speaker tag, also the CSS class of the message element.
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Rabbit1 => "rabbit-1",
            Speaker::Rabbit2 => "rabbit-2",
        }
    }

    /// Class of the nested element holding the message text.
    pub fn text_class(&self) -> &'static str {
        match self {
            Speaker::Rabbit1 => "rabbit-1-text",
            Speaker::Rabbit2 => "rabbit-2-text",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Speaker {
    type Err = RabbitHoleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rabbit-1" => Ok(Speaker::Rabbit1),
            "rabbit-2" => Ok(Speaker::Rabbit2),
            other => Err(RabbitHoleError::InvalidInput(format!(
                "unknown speaker '{other}', expected rabbit-1 or rabbit-2"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub speaker: Speaker,
    pub text: String,
}

impl Message {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// A stored chat unit. Serialized with the camelCase field names the site
/// has always kept in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Build a record from a draft, assigning a fresh id and timestamps.
    pub fn from_draft(draft: ConversationDraft) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), draft)
    }

    /// Build a record with a caller-chosen id (seeding keeps the markup ids).
    pub fn with_id(id: impl Into<String>, draft: ConversationDraft) -> Self {
        let now = Utc::now();
        let slug = draft.slug.unwrap_or_else(|| slugify(&draft.title));
        Self {
            id: id.into(),
            title: draft.title,
            slug,
            messages: draft.messages,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge the fields present in `patch` and advance `updated_at`.
    pub fn apply_patch(&mut self, patch: ConversationPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(slug) = patch.slug {
            self.slug = slug;
        }
        if let Some(messages) = patch.messages {
            self.messages = messages;
        }
        self.updated_at = next_timestamp(self.updated_at);
    }

    /// Title, a space, then the message texts joined by spaces. The space
    /// after the title is present even without messages.
    pub fn search_text(&self) -> String {
        let texts: Vec<&str> = self.messages.iter().map(|m| m.text.as_str()).collect();
        format!("{} {}", self.title, texts.join(" "))
    }

    /// Case-insensitive substring match over [`Conversation::search_text`].
    pub fn matches(&self, query: &str) -> bool {
        self.search_text()
            .to_lowercase()
            .contains(&query.to_lowercase())
    }

    pub fn has_speaker(&self, speaker: Speaker) -> bool {
        self.messages.iter().any(|m| m.speaker == speaker)
    }
}

/// Input to `create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, speaker: Speaker, text: impl Into<String>) -> Self {
        self.messages.push(Message::new(speaker, text));
        self
    }
}

/// Input to `update`; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

impl ConversationPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.slug.is_none() && self.messages.is_none()
    }
}

/// Lowercase, strip punctuation, and join words with single hyphens.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
    let joined = SLUG_SEPARATORS.replace_all(&stripped, "-");
    joined.trim_matches('-').to_string()
}

/// Current time, but never earlier than or equal to `previous`.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

#[derive(Error, Debug)]
pub enum RabbitHoleError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Storage quota exceeded for '{key}': {size} bytes exceeds limit of {limit}")]
    QuotaExceeded { key: String, size: usize, limit: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Seed error: {0}")]
    SeedError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RabbitHoleError>;

/// Async CRUD + search over the conversation collection.
#[async_trait::async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Conversation>>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Conversation>>;
    async fn search(&self, query: &str) -> Result<Vec<Conversation>>;
    async fn create(&self, draft: ConversationDraft) -> Result<Conversation>;
    async fn update(&self, id: &str, patch: ConversationPatch) -> Result<Option<Conversation>>;
    async fn delete(&self, id: &str) -> Result<bool>;
    /// Replace the whole collection, as seeding from markup does.
    async fn replace_all(&self, conversations: Vec<Conversation>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Down the Rabbit Hole!"), "down-the-rabbit-hole");
        assert_eq!(slugify("  --Hello__World--  "), "hello-world");
        assert_eq!(slugify("What's up? (part 2)"), "whats-up-part-2");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_speaker_serde() {
        let message = Message::new(Speaker::Rabbit2, "hi");
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"speaker":"rabbit-2","text":"hi"}"#);
        assert_eq!("rabbit-1".parse::<Speaker>().unwrap(), Speaker::Rabbit1);
        assert!("rabbit-3".parse::<Speaker>().is_err());
    }

    #[test]
    fn test_conversation_wire_format() {
        let conv = Conversation::with_id(
            "fermi",
            ConversationDraft::new("Fermi Paradox").with_message(Speaker::Rabbit1, "Where is everybody?"),
        );
        let value = serde_json::to_value(&conv).unwrap();
        assert_eq!(value["slug"], "fermi-paradox");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());

        let back: Conversation = serde_json::from_value(value).unwrap();
        assert_eq!(back, conv);
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let conv = Conversation::from_draft(
            ConversationDraft::new("Octopus Minds").with_message(Speaker::Rabbit2, "Nine BRAINS, apparently"),
        );
        assert!(conv.matches("octopus"));
        assert!(conv.matches("nine brains"));
        assert!(conv.matches("MINDS nine"));
        assert!(!conv.matches("squid"));
    }

    #[test]
    fn test_search_text_without_messages_keeps_separator() {
        let empty = Conversation::from_draft(ConversationDraft::new("Octopus Minds"));
        assert_eq!(empty.search_text(), "Octopus Minds ");
        assert!(empty.matches("minds "));

        let conv = Conversation::from_draft(
            ConversationDraft::new("Octopus Minds")
                .with_message(Speaker::Rabbit1, "Nine brains")
                .with_message(Speaker::Rabbit2, "apparently"),
        );
        assert_eq!(conv.search_text(), "Octopus Minds Nine brains apparently");
    }

    #[test]
    fn test_apply_patch_advances_timestamp() {
        let mut conv = Conversation::from_draft(ConversationDraft::new("Old"));
        let before = conv.clone();
        conv.apply_patch(ConversationPatch {
            title: Some("New".into()),
            ..Default::default()
        });
        assert_eq!(conv.title, "New");
        assert_eq!(conv.slug, before.slug);
        assert_eq!(conv.created_at, before.created_at);
        assert!(conv.updated_at > before.updated_at);
    }

    #[test]
    fn test_next_timestamp_is_strictly_later() {
        let future = Utc::now() + Duration::hours(1);
        assert!(next_timestamp(future) > future);
    }
}
