use rabbithole_config::AppConfig;
use rabbithole_conversation::ConversationService;
use rabbithole_core::ConversationRepository;
use rabbithole_storage::{FileStore, KeyValueStore, MemoryStore};
use std::sync::Arc;
use tracing::debug;

/// Everything the controller needs, handed over explicitly at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    /// Slots for controller state such as the theme.
    pub store: Arc<dyn KeyValueStore>,
    pub repository: Arc<dyn ConversationRepository>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        repository: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            repository,
        }
    }

    /// File-backed store with a [`ConversationService`] over the same slots.
    pub fn from_config(config: AppConfig) -> Self {
        debug!("Opening file store at {:?}", config.storage.dir);
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::from_settings(&config.storage));
        Self::with_store(config, store)
    }

    /// Nothing outlives the process.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let repository = Arc::new(ConversationService::new(Arc::clone(&store)));
        Self::new(config, store, repository)
    }
}
