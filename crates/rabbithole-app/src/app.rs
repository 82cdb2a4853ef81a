use rabbithole_conversation::{seed_repository, SeedSource};
use rabbithole_core::{Conversation, ConversationRepository};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::context::AppContext;
use crate::filter::Filter;
use crate::nav::{active_section, scroll_target, ScrollTracker};
use crate::page::{Layout, Page};
use crate::search::{SearchCoordinator, SearchOutcome, SearchRequest};
use crate::theme::Theme;
use crate::view::{LoadState, PageView};

const LOAD_FAILED: &str = "Failed to load conversations";
const SEARCH_FAILED: &str = "Search failed";

/// Controller for one page session, from `start` to `shutdown`.
pub struct RabbitHoleApp {
    ctx: AppContext,
    page: Page,
    conversations: Vec<Conversation>,
    view: PageView,
    filter: Filter,
    search_query: String,
    searches: SearchCoordinator,
    scroll: ScrollTracker,
}

impl RabbitHoleApp {
    pub fn new(ctx: AppContext, page: Page) -> Self {
        let theme = Theme::load(ctx.store.as_ref());
        let view = PageView::new(&page, theme);
        Self {
            ctx,
            page,
            conversations: Vec::new(),
            view,
            filter: Filter::All,
            search_query: String::new(),
            searches: SearchCoordinator::new(),
            scroll: ScrollTracker::new(),
        }
    }

    /// Build the controller and run the startup sequence.
    pub async fn start(ctx: AppContext, page: Page, seed: &dyn SeedSource) -> Self {
        let mut app = Self::new(ctx, page);
        app.init(seed).await;
        app
    }

    /// Seed from markup, load, render, apply the theme.
    #[instrument(skip(self, seed))]
    pub async fn init(&mut self, seed: &dyn SeedSource) {
        if let Err(e) = seed_repository(self.ctx.repository.as_ref(), seed).await {
            warn!("Seeding from markup failed, keeping stored conversations: {}", e);
        }
        self.load_conversations().await;
        self.render();
        self.apply_theme(self.view.theme);
        info!(
            "Page ready: {} conversations, {} blocks",
            self.conversations.len(),
            self.page.blocks.len()
        );
    }

    pub async fn load_conversations(&mut self) {
        self.view.state = LoadState::Loading;
        match self.ctx.repository.get_all().await {
            Ok(conversations) => {
                debug!("Loaded {} conversations", conversations.len());
                self.conversations = conversations;
                self.view.state = LoadState::Rendered;
            }
            Err(e) => {
                error!("Loading conversations failed: {}", e);
                self.show_error(LOAD_FAILED);
            }
        }
    }

    /// Show every cached conversation that passes the filter, dropping
    /// search highlights.
    pub fn render(&mut self) {
        self.view.clear_highlights();
        self.view.no_results = None;
        self.view.scroll_into_view = None;

        let visible: HashSet<&str> = self
            .conversations
            .iter()
            .filter(|c| self.filter.matches(c))
            .map(|c| c.id.as_str())
            .collect();
        self.view.set_visible(&visible);
    }

    /// Search input changed: run the search to completion.
    pub async fn handle_search(&mut self, query: &str) {
        if let Some(request) = self.begin_search(query) {
            let outcome = request.run().await;
            self.apply_search(outcome);
        }
    }

    /// Start a search for `query`, superseding any search in flight. An empty
    /// query restores full visibility and returns `None`.
    pub fn begin_search(&mut self, query: &str) -> Option<SearchRequest> {
        self.search_query = query.to_string();

        if query.is_empty() {
            self.searches.cancel();
            self.render();
            self.view.state = LoadState::Rendered;
            return None;
        }

        self.view.state = LoadState::Loading;
        let request = self.searches.begin(query, Arc::clone(&self.ctx.repository));
        debug!("Search #{} started for '{}'", request.generation(), request.query());
        Some(request)
    }

    /// Apply a finished search. Outcomes from superseded searches are
    /// dropped; returns whether the view changed.
    pub fn apply_search(&mut self, outcome: SearchOutcome) -> bool {
        if !self.searches.finish(outcome.generation()) {
            debug!("Discarding stale search #{}", outcome.generation());
            return false;
        }

        match outcome {
            SearchOutcome::Completed { query, result: Ok(results), .. } => {
                self.display_search_results(&results, &query);
                self.view.state = LoadState::Rendered;
            }
            SearchOutcome::Completed { result: Err(e), .. } => {
                error!("Search failed: {}", e);
                self.show_error(SEARCH_FAILED);
            }
            SearchOutcome::Cancelled { .. } => return false,
        }
        true
    }

    fn display_search_results(&mut self, results: &[Conversation], query: &str) {
        self.view.clear_highlights();
        self.view.scroll_into_view = None;

        let matches: Vec<&str> = results
            .iter()
            .filter(|c| self.filter.matches(c))
            .map(|c| c.id.as_str())
            .collect();
        let ids: HashSet<&str> = matches.iter().copied().collect();
        self.view.set_visible(&ids);

        if matches.is_empty() {
            self.view.no_results = Some(format!("No conversations found for \"{query}\""));
            return;
        }

        self.view.no_results = None;
        self.view.set_highlighted(&ids);
        self.view.scroll_into_view = self
            .page
            .blocks
            .iter()
            .find(|block| ids.contains(block.as_str()))
            .cloned();
    }

    /// A filter button was clicked.
    pub fn handle_filter(&mut self, value: &str) {
        self.filter = Filter::parse(value);
        if let Filter::Other(other) = &self.filter {
            warn!("Unknown filter '{}', showing everything", other);
        }
        self.view.set_active_filter(value);
        self.render();
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.view.theme.toggled();
        theme.persist(self.ctx.store.as_ref());
        self.apply_theme(theme);
        theme
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.view.theme = theme;
        debug!("Theme set to {}", theme);
    }

    /// A `#id` navigation link was clicked. Returns the scroll position the
    /// host should move to.
    pub fn click_nav_link(&self, href: &str, layout: &Layout) -> Option<f64> {
        scroll_target(layout, href, self.ctx.config.ui.nav_height)
    }

    /// Returns `true` when the host must request an animation frame.
    pub fn on_scroll(&mut self, scroll_y: f64) -> bool {
        self.scroll.on_scroll(scroll_y)
    }

    /// Recompute nav state for the latest scroll position, if any scroll
    /// happened since the previous frame.
    pub fn on_animation_frame(&mut self, layout: &Layout) -> bool {
        let Some(scroll_y) = self.scroll.take_frame() else {
            return false;
        };
        self.update_nav(scroll_y, layout);
        true
    }

    fn update_nav(&mut self, scroll_y: f64, layout: &Layout) {
        let ui = &self.ctx.config.ui;
        self.view.nav_scrolled = scroll_y > ui.shrink_threshold;
        let current = active_section(layout, scroll_y, ui.active_offset);
        self.view.set_active_link(current);
    }

    /// Timer tick: hide an expired error banner.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.view.expire_banner(now)
    }

    fn show_error(&mut self, message: &str) {
        let ttl = self.ctx.config.ui.error_banner_duration();
        self.view.show_error(message, Instant::now(), ttl);
    }

    /// End of the page session; anything in flight is cancelled.
    pub fn shutdown(&mut self) {
        self.searches.cancel();
        debug!("Page session closed");
    }

    pub fn view(&self) -> &PageView {
        &self.view
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn repository(&self) -> Arc<dyn ConversationRepository> {
        Arc::clone(&self.ctx.repository)
    }
}

impl Drop for RabbitHoleApp {
    fn drop(&mut self) {
        self.searches.cancel();
    }
}
