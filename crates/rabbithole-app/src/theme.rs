use rabbithole_storage::{KeyValueStore, THEME_KEY};
use std::fmt;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Unknown or missing values read as light.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Glyph on the toggle button: the mode a click switches to.
    pub fn glyph(&self) -> &'static str {
        match self {
            Theme::Light => "🌙",
            Theme::Dark => "☀️",
        }
    }

    pub fn toggle_label(&self) -> String {
        format!("Switch to {} mode", self.toggled())
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(THEME_KEY) {
            Ok(value) => Self::parse(value.as_deref()),
            Err(e) => {
                error!("Error reading theme from storage: {}", e);
                Theme::Light
            }
        }
    }

    /// Failures are logged; the theme still applies for this session.
    pub fn persist(&self, store: &dyn KeyValueStore) {
        match store.set(THEME_KEY, self.as_str()) {
            Ok(()) => debug!("Persisted theme '{}'", self),
            Err(e) => error!("Error saving theme to storage: {}", e),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rabbithole_storage::MemoryStore;

    #[test]
    fn test_parse_defaults_to_light() {
        assert_eq!(Theme::parse(None), Theme::Light);
        assert_eq!(Theme::parse(Some("dark")), Theme::Dark);
        assert_eq!(Theme::parse(Some("solarized")), Theme::Light);
    }

    #[test]
    fn test_glyph_and_label() {
        assert_eq!(Theme::Light.glyph(), "🌙");
        assert_eq!(Theme::Light.toggle_label(), "Switch to dark mode");
        assert_eq!(Theme::Dark.glyph(), "☀️");
        assert_eq!(Theme::Dark.toggle_label(), "Switch to light mode");
    }

    #[test]
    fn test_load_and_persist() {
        let store = MemoryStore::new();
        assert_eq!(Theme::load(&store), Theme::Light);

        Theme::Dark.persist(&store);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(Theme::load(&store), Theme::Dark);
    }
}
