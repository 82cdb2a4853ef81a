//! Static structure of the page plus host-supplied geometry.

use rabbithole_config::SeedSettings;
use rabbithole_conversation::parse_selector;
use rabbithole_core::Result;
use scraper::Html;
use std::collections::HashSet;

/// A navigation link pointing at a conversation block by hash fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub href: String,
}

impl NavLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    /// Block id this link points at, without the leading `#`.
    pub fn target(&self) -> Option<&str> {
        self.href.strip_prefix('#').filter(|t| !t.is_empty())
    }
}

/// Block ids, navigation links and filter buttons, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub blocks: Vec<String>,
    pub nav_links: Vec<NavLink>,
    pub filters: Vec<String>,
}

impl Page {
    pub fn new(blocks: Vec<String>, nav_links: Vec<NavLink>, filters: Vec<String>) -> Self {
        Self {
            blocks,
            nav_links,
            filters,
        }
    }

    pub fn from_html(html: &str, settings: &SeedSettings) -> Result<Self> {
        let block_selector = parse_selector(&settings.block_selector)?;
        let nav_selector = parse_selector(&settings.nav_link_selector)?;
        let filter_selector = parse_selector(&settings.filter_selector)?;

        let document = Html::parse_document(html);

        let mut seen = HashSet::new();
        let blocks = document
            .select(&block_selector)
            .filter_map(|el| el.value().id())
            .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
            .map(str::to_string)
            .collect();

        let nav_links = document
            .select(&nav_selector)
            .filter_map(|el| el.value().attr("href"))
            .map(NavLink::new)
            .collect();

        let filters = document
            .select(&filter_selector)
            .filter_map(|el| el.value().attr("data-filter"))
            .map(str::to_string)
            .collect();

        Ok(Self::new(blocks, nav_links, filters))
    }
}

/// Vertical placement of one conversation block.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionGeometry {
    pub id: String,
    pub top: f64,
    pub height: f64,
}

impl SectionGeometry {
    pub fn new(id: impl Into<String>, top: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            top,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.top && position < self.bottom()
    }
}

/// Section geometry as measured by whatever renders the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub sections: Vec<SectionGeometry>,
}

impl Layout {
    pub fn new(sections: Vec<SectionGeometry>) -> Self {
        Self { sections }
    }

    /// Sections stacked back to back, each `height` tall, starting at `top`.
    pub fn stacked<'a>(ids: impl IntoIterator<Item = &'a str>, top: f64, height: f64) -> Self {
        let sections = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| SectionGeometry::new(id, top + i as f64 * height, height))
            .collect();
        Self { sections }
    }

    pub fn section(&self, id: &str) -> Option<&SectionGeometry> {
        self.sections.iter().find(|s| s.id == id)
    }
}
