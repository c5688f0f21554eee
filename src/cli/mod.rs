pub mod auth;
pub mod cache;
pub mod completions;
pub mod conversations;
pub mod files;
pub mod output;
pub mod search;
pub mod users;
pub mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use slack_hub::cache::Cache;
use slack_hub::config::Config;
use slack_hub::service::{CacheLock, Onboarding, TeamRegistry};
use slack_hub::store::Store;
use slack_hub::{api, SlackConnector, TeamHub};

/// Slack client that works across every team you are signed in to
#[derive(Parser, Debug)]
#[command(name = "slack-hub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (defaults to output.default_format from the config)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Team and token management
    Auth(auth::AuthCommand),

    /// Channels, private groups and direct messages
    Conversations(conversations::ConversationsCommand),

    /// User operations
    Users(users::UsersCommand),

    /// Files and starred items
    Files(files::FilesCommand),

    /// Search messages and files in every team
    Search(search::SearchCommand),

    /// Local cache maintenance
    Cache(cache::CacheCommand),

    /// Generate shell completions
    Completions(completions::CompletionsCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Table output (best for humans)
    #[default]
    Table,
    /// Plain output (minimal, for scripting)
    Plain,
}

impl OutputFormat {
    /// Flag value, else the configured default, else table
    pub fn resolve(flag: Option<Self>, config: &Config) -> Self {
        flag.or_else(|| Self::from_str(&config.output.default_format, true).ok())
            .unwrap_or_default()
    }
}

/// Wire the hub over the on-disk cache and the registered teams
pub fn open_hub(config: &Config) -> Result<TeamHub> {
    let cache = Cache::new()?;
    let icon_dir = cache.icon_dir();
    let store: Arc<dyn Store> = Arc::new(cache);
    let registry = TeamRegistry::new(store.clone());
    let connector = Arc::new(SlackConnector::new(
        config.api.clone(),
        store.clone(),
        icon_dir,
    ));
    let onboarding = Onboarding::new(
        Arc::new(api::SlackVerifier::new(config.api.clone())),
        connector.clone(),
        registry.clone(),
        store.clone(),
    );
    let lock = Arc::new(CacheLock::with_store(store));

    Ok(TeamHub::open(registry, connector.as_ref(), lock)?
        .with_policy(config.broadcast.failure_policy)
        .with_onboarding(onboarding))
}
