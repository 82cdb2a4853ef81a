use rabbithole_core::{Conversation, Speaker};
use std::fmt;

/// Value of a filter button's `data-filter` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    /// Conversations in which this participant speaks at least once.
    Speaker(Speaker),
    /// Not understood; shows everything.
    Other(String),
}

impl Filter {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "all" => Filter::All,
            other => other
                .parse::<Speaker>()
                .map(Filter::Speaker)
                .unwrap_or_else(|_| Filter::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Filter::All => "all",
            Filter::Speaker(speaker) => speaker.as_str(),
            Filter::Other(value) => value.as_str(),
        }
    }

    pub fn matches(&self, conversation: &Conversation) -> bool {
        match self {
            Filter::All | Filter::Other(_) => true,
            Filter::Speaker(speaker) => conversation.has_speaker(*speaker),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
