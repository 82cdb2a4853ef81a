use std::sync::Arc;

use rabbithole_conversation::{seed_repository, ConversationService, HtmlSeedLoader};
use rabbithole_core::{
    ConversationDraft, ConversationPatch, ConversationRepository, Message, Speaker,
};
use rabbithole_storage::{FileStore, KeyValueStore, MemoryStore, CONVERSATIONS_KEY};
use tempfile::TempDir;

fn hello_draft() -> ConversationDraft {
    ConversationDraft::new("Test").with_message(Speaker::Rabbit1, "hello world")
}

#[tokio::test]
async fn create_then_get_round_trips_fields() {
    let service = ConversationService::new(Arc::new(MemoryStore::new()));

    let draft = ConversationDraft::new("Tardigrades Survive Space")
        .with_message(Speaker::Rabbit1, "They came back from orbit?")
        .with_message(Speaker::Rabbit2, "Dehydrated, yes.");
    let created = service.create(draft.clone()).await.unwrap();
    let fetched = service.get_by_id(&created.id).await.unwrap().unwrap();

    assert_eq!(fetched.title, draft.title);
    assert_eq!(fetched.messages, draft.messages);
    assert_eq!(fetched.slug, "tardigrades-survive-space");
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn created_ids_are_unique() {
    let service = ConversationService::new(Arc::new(MemoryStore::new()));
    let a = service.create(hello_draft()).await.unwrap();
    let b = service.create(hello_draft()).await.unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(service.get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn deleting_missing_id_is_a_no_op() {
    let service = ConversationService::new(Arc::new(MemoryStore::new()));
    service.create(hello_draft()).await.unwrap();
    let before = service.get_all().await.unwrap();

    assert!(!service.delete("does-not-exist").await.unwrap());
    assert_eq!(service.get_all().await.unwrap(), before);
}

#[tokio::test]
async fn update_merges_only_given_fields() {
    let service = ConversationService::new(Arc::new(MemoryStore::new()));
    let created = service.create(hello_draft()).await.unwrap();

    let patch = ConversationPatch {
        messages: Some(vec![Message::new(Speaker::Rabbit2, "goodbye")]),
        ..Default::default()
    };
    let updated = service.update(&created.id, patch).await.unwrap().unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, created.title);
    assert_eq!(updated.slug, created.slug);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.messages, vec![Message::new(Speaker::Rabbit2, "goodbye")]);
    assert!(updated.updated_at > created.updated_at);

    // Consecutive updates keep advancing.
    let again = service
        .update(&created.id, ConversationPatch::default())
        .await
        .unwrap()
        .unwrap();
    assert!(again.updated_at > updated.updated_at);
}

#[tokio::test]
async fn search_ignores_case_in_title_and_messages() {
    let service = ConversationService::new(Arc::new(MemoryStore::new()));
    let created = service
        .create(
            ConversationDraft::new("Mantis Shrimp")
                .with_message(Speaker::Rabbit2, "Sixteen Photoreceptors"),
        )
        .await
        .unwrap();

    let by_title = service.search("mANTIS").await.unwrap();
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].id, created.id);

    let by_message = service.search("photoRECEPTORS").await.unwrap();
    assert_eq!(by_message.len(), 1);
}

#[tokio::test]
async fn hello_scenario() {
    let service = ConversationService::new(Arc::new(MemoryStore::new()));
    let created = service.create(hello_draft()).await.unwrap();

    let results = service.search("HELLO").await.unwrap();
    assert!(results.iter().any(|c| c.id == created.id));

    assert!(service.search("zzz").await.unwrap().is_empty());
}

#[tokio::test]
async fn collection_survives_reconstruction() {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(temp_dir.path()));

    let service = ConversationService::new(store.clone());
    let kept = service.create(hello_draft()).await.unwrap();
    let dropped = service
        .create(ConversationDraft::new("Temporary").with_message(Speaker::Rabbit2, "bye"))
        .await
        .unwrap();
    service
        .update(
            &kept.id,
            ConversationPatch {
                title: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    service.delete(&dropped.id).await.unwrap();
    let last_state = service.get_all().await.unwrap();
    drop(service);

    let reloaded = ConversationService::new(Arc::new(FileStore::new(temp_dir.path())));
    assert_eq!(reloaded.get_all().await.unwrap(), last_state);
}

#[tokio::test]
async fn seeding_replaces_stored_collection() {
    let store = Arc::new(MemoryStore::new());
    let service = ConversationService::new(store.clone());
    service.create(hello_draft()).await.unwrap();

    let html = r#"
        <div class="rabbit-hole-chat-wrapper" id="axolotl">
          <h2>Axolotl Regeneration</h2>
          <div class="rabbit-2"><span class="rabbit-2-text">They regrow hearts.</span></div>
          <div class="rabbit-1"><span class="rabbit-1-text">Hearts?!</span></div>
        </div>"#;
    let seeded = seed_repository(&service, &HtmlSeedLoader::new(html))
        .await
        .unwrap();

    assert_eq!(seeded.len(), 1);
    let all = service.get_all().await.unwrap();
    assert_eq!(all, seeded);
    assert_eq!(all[0].slug, "axolotl-regeneration");
    assert_eq!(all[0].messages[0].speaker, Speaker::Rabbit2);
    assert!(store.get(CONVERSATIONS_KEY).unwrap().unwrap().contains("axolotl"));
}
