//! Seeding the store from the site's static markup.
//!
//! The HTML that ships with the site is the authoritative initial content.
//! A [`SeedSource`] turns a structured document into [`SeedBlock`]s, and
//! [`seed_repository`] replaces the stored collection with them.

use rabbithole_config::SeedSettings;
use rabbithole_core::{
    Conversation, ConversationDraft, ConversationRepository, Message, RabbitHoleError, Result,
    Speaker,
};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// One conversation block found in a seed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedBlock {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
}

impl SeedBlock {
    pub fn into_conversation(self) -> Conversation {
        let draft = ConversationDraft {
            title: self.title,
            slug: None,
            messages: self.messages,
        };
        Conversation::with_id(self.id, draft)
    }
}

/// Anything that can produce the initial conversation blocks.
pub trait SeedSource: Send + Sync {
    fn load(&self) -> Result<Vec<SeedBlock>>;
}

/// Reads conversation blocks out of site markup.
#[derive(Debug, Clone)]
pub struct HtmlSeedLoader {
    html: String,
    settings: SeedSettings,
}

impl HtmlSeedLoader {
    pub fn new(html: impl Into<String>) -> Self {
        Self::with_settings(html, SeedSettings::default())
    }

    pub fn with_settings(html: impl Into<String>, settings: SeedSettings) -> Self {
        Self {
            html: html.into(),
            settings,
        }
    }

    pub fn from_file(path: impl AsRef<Path>, settings: SeedSettings) -> Result<Self> {
        let html = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::with_settings(html, settings))
    }

    fn parse_block(
        block: ElementRef<'_>,
        id: &str,
        title_selector: &Selector,
        message_selector: &Selector,
        text_selectors: &[(Speaker, Selector)],
    ) -> SeedBlock {
        let title = block
            .select(title_selector)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| id.to_string());

        let mut messages = Vec::new();
        for element in block.select(message_selector) {
            let Some((speaker, text_selector)) = text_selectors
                .iter()
                .find(|(speaker, _)| element.value().classes().any(|c| c == speaker.as_str()))
            else {
                continue;
            };

            let text = element
                .select(text_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();
            if !text.is_empty() {
                messages.push(Message::new(*speaker, text));
            }
        }

        SeedBlock {
            id: id.to_string(),
            title,
            messages,
        }
    }
}

impl SeedSource for HtmlSeedLoader {
    fn load(&self) -> Result<Vec<SeedBlock>> {
        let block_selector = parse_selector(&self.settings.block_selector)?;
        let title_selector = parse_selector(&self.settings.title_selector)?;
        let message_selector = parse_selector(
            &Speaker::ALL
                .iter()
                .map(|s| format!(".{}", s.as_str()))
                .collect::<Vec<_>>()
                .join(", "),
        )?;
        let text_selectors = Speaker::ALL
            .iter()
            .map(|s| parse_selector(&format!(".{}", s.text_class())).map(|sel| (*s, sel)))
            .collect::<Result<Vec<_>>>()?;

        let document = Html::parse_document(&self.html);
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();

        for block in document.select(&block_selector) {
            let Some(id) = block.value().id().filter(|id| !id.is_empty()) else {
                warn!("Skipping conversation block without an id");
                continue;
            };
            if !seen.insert(id.to_string()) {
                warn!("Skipping duplicate conversation block '{}'", id);
                continue;
            }

            let parsed = Self::parse_block(
                block,
                id,
                &title_selector,
                &message_selector,
                &text_selectors,
            );
            if parsed.messages.is_empty() {
                debug!("Skipping conversation block '{}' with no messages", id);
                continue;
            }
            blocks.push(parsed);
        }

        debug!("Found {} conversation blocks in markup", blocks.len());
        Ok(blocks)
    }
}

/// Replace the repository contents with the seed document's conversations.
pub async fn seed_repository(
    repository: &dyn ConversationRepository,
    source: &dyn SeedSource,
) -> Result<Vec<Conversation>> {
    let conversations: Vec<Conversation> = source
        .load()?
        .into_iter()
        .map(SeedBlock::into_conversation)
        .collect();

    repository.replace_all(conversations.clone()).await?;
    info!("Seeded {} conversations from markup", conversations.len());
    Ok(conversations)
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| RabbitHoleError::SeedError(format!("invalid selector '{selector}': {e:?}")))
}

/// Text content of an element with surrounding whitespace removed.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
