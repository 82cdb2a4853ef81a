use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rabbithole_app::{AppContext, Layout, Page, RabbitHoleApp, Theme};
use rabbithole_config::AppConfig;
use rabbithole_conversation::{seed_repository, ConversationService, HtmlSeedLoader};
use rabbithole_core::{
    Conversation, ConversationDraft, ConversationPatch, ConversationRepository, Message, Speaker,
};
use rabbithole_storage::FileStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rabbithole")]
#[command(about = "Manage and preview Rabbit Hole Findings conversations", long_about = None)]
struct Cli {
    /// Config file (defaults to $HOME_DIR/config.yaml or ~/.rabbithole/config.yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the stored conversations with the ones in an HTML page
    Seed {
        /// Site page containing conversation blocks
        html: PathBuf,
    },

    /// List stored conversations
    List {
        /// Print records as JSON
        #[arg(long, action = clap::ArgAction::SetTrue)]
        json: bool,
    },

    /// Show one conversation
    Get {
        id: String,

        #[arg(long, action = clap::ArgAction::SetTrue)]
        json: bool,
    },

    /// Case-insensitive search over titles and messages
    Search { query: String },

    /// Create a conversation
    Create {
        #[arg(short, long)]
        title: String,

        /// Slug override; derived from the title when omitted
        #[arg(long)]
        slug: Option<String>,

        /// Message as SPEAKER:TEXT, e.g. rabbit-1:hello (repeatable)
        #[arg(short, long = "message", value_name = "SPEAKER:TEXT")]
        messages: Vec<String>,
    },

    /// Update fields of a conversation
    Update {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        /// Replacement messages as SPEAKER:TEXT (repeatable)
        #[arg(short, long = "message", value_name = "SPEAKER:TEXT")]
        messages: Vec<String>,
    },

    /// Delete a conversation
    Delete { id: String },

    /// Show or toggle the stored theme
    Theme {
        #[arg(long, action = clap::ArgAction::SetTrue)]
        toggle: bool,
    },

    /// Run the page controller over an HTML page and print what it shows
    Render {
        html: PathBuf,

        #[arg(short, long)]
        query: Option<String>,

        #[arg(short, long)]
        filter: Option<String>,

        /// Simulated scroll position
        #[arg(long)]
        scroll_y: Option<f64>,

        /// Height assumed for every conversation block
        #[arg(long, default_value_t = 600.0)]
        section_height: f64,
    },

    /// Print the backend endpoint map
    Endpoints,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config_path = cli.config.unwrap_or_else(AppConfig::default_config_path);
    let config = if config_path.exists() {
        info!("Loading configuration from: {:?}", config_path);
        AppConfig::from_yaml(&config_path)?
    } else {
        info!("Using default configuration");
        AppConfig::load_default()?
    };

    match cli.command {
        Commands::Seed { html } => seed(&config, html).await?,
        Commands::List { json } => list(&config, json).await?,
        Commands::Get { id, json } => get(&config, &id, json).await?,
        Commands::Search { query } => search(&config, &query).await?,
        Commands::Create { title, slug, messages } => {
            let draft = ConversationDraft {
                title,
                slug,
                messages: parse_messages(&messages)?,
            };
            let created = ConversationService::open(&config.storage).create(draft).await?;
            println!("✅ Created {}", created.id);
            print_conversation(&created);
        }
        Commands::Update { id, title, slug, messages } => {
            let patch = ConversationPatch {
                title,
                slug,
                messages: if messages.is_empty() {
                    None
                } else {
                    Some(parse_messages(&messages)?)
                },
            };
            match ConversationService::open(&config.storage).update(&id, patch).await? {
                Some(updated) => {
                    println!("✅ Updated {}", updated.id);
                    print_conversation(&updated);
                }
                None => println!("❌ No conversation with id {id}"),
            }
        }
        Commands::Delete { id } => {
            if ConversationService::open(&config.storage).delete(&id).await? {
                println!("🗑️  Deleted {id}");
            } else {
                println!("❌ No conversation with id {id}");
            }
        }
        Commands::Theme { toggle } => theme(&config, toggle),
        Commands::Render { html, query, filter, scroll_y, section_height } => {
            render(config, html, query, filter, scroll_y, section_height).await?;
        }
        Commands::Endpoints => endpoints(&config),
    }

    Ok(())
}

async fn seed(config: &AppConfig, html: PathBuf) -> Result<()> {
    let loader = HtmlSeedLoader::from_file(&html, config.seed.clone())
        .with_context(|| format!("Failed to read {}", html.display()))?;
    let store = FileStore::from_settings(&config.storage);
    let location = store.base_dir().display().to_string();
    let service = ConversationService::new(Arc::new(store));

    let seeded = seed_repository(&service, &loader).await?;
    println!(
        "🌱 Seeded {} conversations from {} into {}",
        seeded.len(),
        html.display(),
        location
    );
    for conversation in &seeded {
        println!("  {} ({} messages)", conversation.id, conversation.messages.len());
    }
    Ok(())
}

async fn list(config: &AppConfig, json: bool) -> Result<()> {
    let conversations = ConversationService::open(&config.storage).get_all().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    println!("\n🐰 {} conversations", conversations.len());
    println!("═══════════════════════════════════════");
    for conversation in &conversations {
        print_summary(conversation);
    }
    Ok(())
}

async fn get(config: &AppConfig, id: &str, json: bool) -> Result<()> {
    match ConversationService::open(&config.storage).get_by_id(id).await? {
        Some(conversation) if json => {
            println!("{}", serde_json::to_string_pretty(&conversation)?)
        }
        Some(conversation) => print_conversation(&conversation),
        None => println!("❌ No conversation with id {id}"),
    }
    Ok(())
}

async fn search(config: &AppConfig, query: &str) -> Result<()> {
    let results = ConversationService::open(&config.storage).search(query).await?;
    if results.is_empty() {
        println!("No conversations found for \"{query}\"");
        return Ok(());
    }

    println!("\n🔍 {} matches for \"{}\"", results.len(), query);
    println!("═══════════════════════════════════════");
    for conversation in &results {
        print_summary(conversation);
    }
    Ok(())
}

fn theme(config: &AppConfig, toggle: bool) {
    let store = FileStore::from_settings(&config.storage);
    let mut theme = Theme::load(&store);
    if toggle {
        theme = theme.toggled();
        theme.persist(&store);
    }
    println!("{} {} ({})", theme.glyph(), theme, theme.toggle_label());
}

async fn render(
    config: AppConfig,
    html: PathBuf,
    query: Option<String>,
    filter: Option<String>,
    scroll_y: Option<f64>,
    section_height: f64,
) -> Result<()> {
    let markup = std::fs::read_to_string(&html)
        .with_context(|| format!("Failed to read {}", html.display()))?;
    let page = Page::from_html(&markup, &config.seed)?;
    let loader = HtmlSeedLoader::with_settings(markup, config.seed.clone());
    let layout = Layout::stacked(
        page.blocks.iter().map(String::as_str),
        config.ui.nav_height,
        section_height,
    );

    let mut app = RabbitHoleApp::start(AppContext::from_config(config), page, &loader).await;
    if let Some(filter) = filter {
        app.handle_filter(&filter);
    }
    if let Some(query) = query {
        app.handle_search(&query).await;
    }
    if let Some(y) = scroll_y {
        app.on_scroll(y);
        app.on_animation_frame(&layout);
    }

    let view = app.view();
    println!("\n📄 Page view (theme: {} {})", view.theme_attribute(), view.theme.glyph());
    println!("═══════════════════════════════════════");
    for block in &view.blocks {
        let marker = match (block.visible, block.highlighted) {
            (true, true) => "★",
            (true, false) => "●",
            (false, _) => "○",
        };
        println!("{marker} {}", block.id);
    }
    if let Some(message) = &view.no_results {
        println!("\n{message}");
    }
    if let Some(message) = view.banner_message(tokio::time::Instant::now()) {
        println!("\n⚠️  {message}");
    }
    if let Some(target) = &view.scroll_into_view {
        println!("\nScroll into view: #{target}");
    }
    if let Some(active) = view.active_link() {
        println!("Active nav link: {active}");
    }
    if view.nav_scrolled {
        println!("Nav: compact");
    }

    app.shutdown();
    Ok(())
}

fn endpoints(config: &AppConfig) {
    let api = &config.api;
    let endpoints = api.endpoints();

    println!("\n🌐 {} backend endpoints (not called)", config.site.name);
    println!("═══════════════════════════════════════");
    println!("  list:    GET    {}", api.url(&endpoints.conversations()));
    println!("  get:     GET    {}", api.url(&endpoints.conversation("{id}")));
    println!("  search:  GET    {}", api.url(&endpoints.search()));
    println!("  create:  POST   {}", api.url(&endpoints.create()));
    println!("  update:  PUT    {}", api.url(&endpoints.update("{id}")));
    println!("  delete:  DELETE {}", api.url(&endpoints.delete("{id}")));
    println!("  timeout: {:?}", api.timeout());
}

fn parse_messages(raw: &[String]) -> Result<Vec<Message>> {
    raw.iter()
        .map(|entry| {
            let (speaker, text) = entry
                .split_once(':')
                .ok_or_else(|| anyhow!("message '{entry}' must look like SPEAKER:TEXT"))?;
            let speaker: Speaker = speaker.trim().parse()?;
            Ok(Message::new(speaker, text.trim()))
        })
        .collect()
}

fn print_summary(conversation: &Conversation) {
    println!(
        "\n📦 {} [{}]\n   id: {} | {} messages | updated {}",
        conversation.title,
        conversation.slug,
        conversation.id,
        conversation.messages.len(),
        conversation.updated_at.to_rfc3339()
    );
}

fn print_conversation(conversation: &Conversation) {
    println!("\n📋 {}", conversation.title);
    println!("═══════════════════════════════════════");
    println!("ID: {}", conversation.id);
    println!("Slug: {}", conversation.slug);
    println!("Created: {}", conversation.created_at.to_rfc3339());
    println!("Updated: {}", conversation.updated_at.to_rfc3339());
    println!("\n💬 Messages:");
    for message in &conversation.messages {
        println!("[{}]: {}", message.speaker, message.text);
    }
    println!();
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
