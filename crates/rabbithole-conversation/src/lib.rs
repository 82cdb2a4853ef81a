pub mod seed;
pub mod service;

pub use seed::{parse_selector, seed_repository, HtmlSeedLoader, SeedBlock, SeedSource};
pub use service::ConversationService;
