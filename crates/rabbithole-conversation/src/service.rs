use async_trait::async_trait;
use rabbithole_config::StorageSettings;
use rabbithole_core::{
    Conversation, ConversationDraft, ConversationPatch, ConversationRepository, Result,
};
use rabbithole_storage::{FileStore, KeyValueStore, CONVERSATIONS_KEY};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Conversation collection held in memory and mirrored, as a single JSON
/// array, into one key-value slot on every mutation.
pub struct ConversationService {
    store: Arc<dyn KeyValueStore>,
    conversations: RwLock<Vec<Conversation>>,
}

impl ConversationService {
    /// Load the collection from `store`. Unreadable or corrupt data yields an
    /// empty collection.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let conversations = Self::load_from_storage(store.as_ref());
        Self {
            store,
            conversations: RwLock::new(conversations),
        }
    }

    /// Service over a [`FileStore`] rooted at the configured directory.
    pub fn open(settings: &StorageSettings) -> Self {
        Self::new(Arc::new(FileStore::from_settings(settings)))
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    fn load_from_storage(store: &dyn KeyValueStore) -> Vec<Conversation> {
        let raw = match store.get(CONVERSATIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored conversations, starting empty");
                return Vec::new();
            }
            Err(e) => {
                error!("Error loading conversations from storage: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Conversation>>(&raw) {
            Ok(conversations) => {
                info!("Loaded {} conversations from storage", conversations.len());
                conversations
            }
            Err(e) => {
                error!("Error parsing stored conversations: {}", e);
                Vec::new()
            }
        }
    }

    /// Write the collection to its slot. Failures are logged and the
    /// in-memory state stays authoritative for the session.
    fn save_to_storage(&self, conversations: &[Conversation]) {
        let json = match serde_json::to_string(conversations) {
            Ok(json) => json,
            Err(e) => {
                error!("Error serializing conversations: {}", e);
                return;
            }
        };

        match self.store.set(CONVERSATIONS_KEY, &json) {
            Ok(()) => debug!("Persisted {} conversations", conversations.len()),
            Err(e) => error!("Error saving conversations to storage: {}", e),
        }
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ConversationRepository for ConversationService {
    async fn get_all(&self) -> Result<Vec<Conversation>> {
        Ok(self.conversations.read().await.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn search(&self, query: &str) -> Result<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let results: Vec<Conversation> = conversations
            .iter()
            .filter(|c| c.matches(query))
            .cloned()
            .collect();

        debug!("Search '{}' matched {} conversations", query, results.len());
        Ok(results)
    }

    async fn create(&self, draft: ConversationDraft) -> Result<Conversation> {
        let mut conversations = self.conversations.write().await;

        let mut conversation = Conversation::from_draft(draft);
        // Ids stay unique within the collection.
        while conversations.iter().any(|c| c.id == conversation.id) {
            conversation.id = Uuid::new_v4().to_string();
        }

        conversations.push(conversation.clone());
        self.save_to_storage(&conversations);

        info!("Created conversation {} ({})", conversation.id, conversation.slug);
        Ok(conversation)
    }

    async fn update(&self, id: &str, patch: ConversationPatch) -> Result<Option<Conversation>> {
        let mut conversations = self.conversations.write().await;

        let Some(conversation) = conversations.iter_mut().find(|c| c.id == id) else {
            warn!("Update skipped, conversation {} not found", id);
            return Ok(None);
        };
        conversation.apply_patch(patch);
        let updated = conversation.clone();

        self.save_to_storage(&conversations);
        debug!("Updated conversation {}", id);
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut conversations = self.conversations.write().await;

        let Some(index) = conversations.iter().position(|c| c.id == id) else {
            debug!("Delete skipped, conversation {} not found", id);
            return Ok(false);
        };
        conversations.remove(index);

        self.save_to_storage(&conversations);
        info!("Deleted conversation {}", id);
        Ok(true)
    }

    async fn replace_all(&self, replacement: Vec<Conversation>) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        *conversations = replacement;
        self.save_to_storage(&conversations);

        info!("Replaced collection with {} conversations", conversations.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use rabbithole_core::{RabbitHoleError, Speaker};
    use rabbithole_storage::MemoryStore;

    mock! {
        pub Store {}
        impl KeyValueStore for Store {
            fn get(&self, key: &str) -> Result<Option<String>>;
            fn set(&self, key: &str, value: &str) -> Result<()>;
            fn remove(&self, key: &str) -> Result<()>;
        }
    }

    fn draft(title: &str, text: &str) -> ConversationDraft {
        ConversationDraft::new(title).with_message(Speaker::Rabbit1, text)
    }

    #[tokio::test]
    async fn test_corrupt_storage_falls_back_to_empty() {
        let store = MemoryStore::new();
        store.set(CONVERSATIONS_KEY, "{not json").unwrap();

        let service = ConversationService::new(Arc::new(store));
        assert!(service.is_empty().await);
    }

    #[tokio::test]
    async fn test_unreadable_storage_falls_back_to_empty() {
        let mut store = MockStore::new();
        store
            .expect_get()
            .returning(|_| Err(RabbitHoleError::StorageError("denied".into())));

        let service = ConversationService::new(Arc::new(store));
        assert!(service.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_state() {
        let mut store = MockStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_set().times(2).returning(|key, value| {
            Err(RabbitHoleError::QuotaExceeded {
                key: key.to_string(),
                size: value.len(),
                limit: 0,
            })
        });

        let service = ConversationService::new(Arc::new(store));
        let created = service.create(draft("Kept", "in memory")).await.unwrap();
        assert_eq!(service.len().await, 1);

        let updated = service
            .update(
                &created.id,
                ConversationPatch {
                    title: Some("Still kept".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Still kept");
    }

    #[tokio::test]
    async fn test_every_mutation_persists_whole_collection() {
        let store = Arc::new(MemoryStore::new());
        let service = ConversationService::new(store.clone());

        let a = service.create(draft("A", "one")).await.unwrap();
        service.create(draft("B", "two")).await.unwrap();

        let stored: Vec<Conversation> =
            serde_json::from_str(&store.get(CONVERSATIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, a.id);

        assert!(service.delete(&a.id).await.unwrap());
        let stored: Vec<Conversation> =
            serde_json::from_str(&store.get(CONVERSATIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "B");
    }

    #[tokio::test]
    async fn test_update_missing_returns_none_without_writing() {
        let mut store = MockStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_set().never();

        let service = ConversationService::new(Arc::new(store));
        let result = service
            .update("missing", ConversationPatch::default())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(!service.delete("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_all_swaps_collection() {
        let store = Arc::new(MemoryStore::new());
        let service = ConversationService::new(store.clone());
        service.create(draft("Old", "gone soon")).await.unwrap();

        let seeded = vec![Conversation::with_id("fermi", draft("Fermi", "where"))];
        service.replace_all(seeded).await.unwrap();

        let all = service.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "fermi");
        assert!(service.get_by_id("fermi").await.unwrap().is_some());
    }
}
