use crate::page::{Layout, NavLink};

/// Coalesces scroll events so the expensive work runs at most once per
/// animation frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollTracker {
    pending: bool,
    scroll_y: f64,
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scroll position. Returns `true` when the caller must request
    /// an animation frame, `false` when one is already pending.
    pub fn on_scroll(&mut self, scroll_y: f64) -> bool {
        self.scroll_y = scroll_y;
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    /// Latest scroll position if a frame was requested, clearing the flag.
    pub fn take_frame(&mut self) -> Option<f64> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some(self.scroll_y)
    }
}

/// Id of the section under `scroll_y + offset`. Later sections win when
/// several overlap.
pub fn active_section(layout: &Layout, scroll_y: f64, offset: f64) -> Option<&str> {
    let position = scroll_y + offset;
    layout
        .sections
        .iter()
        .rev()
        .find(|s| s.contains(position))
        .map(|s| s.id.as_str())
}

/// Where to scroll for a `#id` link so the section clears the sticky nav.
pub fn scroll_target(layout: &Layout, href: &str, nav_height: f64) -> Option<f64> {
    let link = NavLink::new(href);
    let section = layout.section(link.target()?)?;
    Some((section.top - nav_height).max(0.0))
}
