mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, OutputFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slack_hub::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slack_hub=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;
    if !config.output.color {
        colored::control::set_override(false);
    }
    let format = OutputFormat::resolve(cli.format, &config);

    match cli.command {
        Commands::Auth(cmd) => cli::auth::execute(cmd, &config, format).await,
        Commands::Conversations(cmd) => cli::conversations::execute(cmd, &config, format).await,
        Commands::Users(cmd) => cli::users::execute(cmd, &config, format).await,
        Commands::Files(cmd) => cli::files::execute(cmd, &config, format).await,
        Commands::Search(cmd) => cli::search::execute(cmd, &config, format).await,
        Commands::Cache(cmd) => cli::cache::execute(cmd, &config).await,
        Commands::Completions(cmd) => cli::completions::execute(cmd),
    }
}
