//! What the page should currently look like.

use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

use crate::page::Page;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Rendered,
}

/// Transient error message, hidden once `expires_at` passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub expires_at: Instant,
}

impl Banner {
    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView {
    pub id: String,
    pub visible: bool,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLinkView {
    pub href: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterButtonView {
    pub filter: String,
    pub active: bool,
}

/// Blocks are toggled in place; the view never adds, removes or reorders them.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub blocks: Vec<BlockView>,
    pub nav_links: Vec<NavLinkView>,
    pub filter_buttons: Vec<FilterButtonView>,
    pub nav_scrolled: bool,
    pub theme: Theme,
    pub state: LoadState,
    pub banner: Option<Banner>,
    pub no_results: Option<String>,
    /// Block the host should bring into view, consumed by the host.
    pub scroll_into_view: Option<String>,
}

impl PageView {
    pub fn new(page: &Page, theme: Theme) -> Self {
        Self {
            blocks: page
                .blocks
                .iter()
                .map(|id| BlockView {
                    id: id.clone(),
                    visible: true,
                    highlighted: false,
                })
                .collect(),
            nav_links: page
                .nav_links
                .iter()
                .map(|link| NavLinkView {
                    href: link.href.clone(),
                    active: false,
                })
                .collect(),
            filter_buttons: page
                .filters
                .iter()
                .map(|filter| FilterButtonView {
                    filter: filter.clone(),
                    active: filter == "all",
                })
                .collect(),
            nav_scrolled: false,
            theme,
            state: LoadState::Idle,
            banner: None,
            no_results: None,
            scroll_into_view: None,
        }
    }

    /// Value of the document-level `data-theme` attribute.
    pub fn theme_attribute(&self) -> &'static str {
        self.theme.as_str()
    }

    pub fn set_visible(&mut self, ids: &HashSet<&str>) {
        for block in &mut self.blocks {
            block.visible = ids.contains(block.id.as_str());
        }
    }

    pub fn set_highlighted(&mut self, ids: &HashSet<&str>) {
        for block in &mut self.blocks {
            block.highlighted = ids.contains(block.id.as_str());
        }
    }

    pub fn clear_highlights(&mut self) {
        self.blocks.iter_mut().for_each(|b| b.highlighted = false);
    }

    pub fn set_active_link(&mut self, target: Option<&str>) {
        let active_href = target.map(|id| format!("#{id}"));
        for link in &mut self.nav_links {
            link.active = active_href.as_deref() == Some(link.href.as_str());
        }
    }

    pub fn set_active_filter(&mut self, filter: &str) {
        for button in &mut self.filter_buttons {
            button.active = button.filter == filter;
        }
    }

    pub fn show_error(&mut self, message: impl Into<String>, now: Instant, ttl: Duration) {
        self.state = LoadState::Idle;
        self.banner = Some(Banner {
            message: message.into(),
            expires_at: now + ttl,
        });
    }

    /// Drop the banner once its time is up.
    pub fn expire_banner(&mut self, now: Instant) -> bool {
        match &self.banner {
            Some(banner) if !banner.is_visible(now) => {
                self.banner = None;
                true
            }
            _ => false,
        }
    }

    pub fn banner_message(&self, now: Instant) -> Option<&str> {
        self.banner
            .as_ref()
            .filter(|b| b.is_visible(now))
            .map(|b| b.message.as_str())
    }

    pub fn visible_ids(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter(|b| b.visible)
            .map(|b| b.id.as_str())
            .collect()
    }

    pub fn highlighted_ids(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter(|b| b.highlighted)
            .map(|b| b.id.as_str())
            .collect()
    }

    pub fn active_link(&self) -> Option<&str> {
        self.nav_links
            .iter()
            .find(|l| l.active)
            .map(|l| l.href.as_str())
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.filter_buttons
            .iter()
            .find(|b| b.active)
            .map(|b| b.filter.as_str())
    }
}
