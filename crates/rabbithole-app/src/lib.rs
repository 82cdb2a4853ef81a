//! Presentation controller for the Rabbit Hole Findings page.
//!
//! [`RabbitHoleApp`] drives a [`PageView`]: which conversation blocks are
//! visible or highlighted, the active navigation link, the theme, and any
//! transient error banner. The host feeds it user events (keystrokes,
//! clicks, scrolls, animation frames, timer ticks) and renders the view.

pub mod app;
pub mod context;
pub mod filter;
pub mod nav;
pub mod page;
pub mod search;
pub mod theme;
pub mod view;

pub use app::RabbitHoleApp;
pub use context::AppContext;
pub use filter::Filter;
pub use nav::{active_section, scroll_target, ScrollTracker};
pub use page::{Layout, NavLink, Page, SectionGeometry};
pub use search::{SearchCoordinator, SearchOutcome, SearchRequest};
pub use theme::Theme;
pub use view::{Banner, BlockView, LoadState, PageView};
