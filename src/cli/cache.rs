use anyhow::Result;
use clap::{Args, Subcommand};

use slack_hub::cache::Cache;
use slack_hub::service::CacheLock;
use slack_hub::Config;

use super::open_hub;
use super::output::{print_error, print_info, print_success, print_warning};

#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// Refetch channels, groups, ims and users for every team
    Refresh,

    /// Show whether a refresh is running
    Status,

    /// Delete cached lists and icons (teams and tokens are kept)
    Clear,
}

pub async fn execute(cmd: CacheCommand, config: &Config) -> Result<()> {
    match cmd.command {
        CacheSubcommand::Refresh => refresh(config).await,
        CacheSubcommand::Status => status(),
        CacheSubcommand::Clear => {
            Cache::new()?.clear()?;
            print_success("Cache cleared");
            Ok(())
        }
    }
}

async fn refresh(config: &Config) -> Result<()> {
    let hub = open_hub(config)?;
    print_info(&format!("Refreshing {} team(s)...", hub.team_ids().len()));

    let report = hub.refresh_cache().await?;
    for team_id in &report.refreshed {
        print_success(&format!("Team {} refreshed", team_id));
    }
    for (team_id, e) in &report.failed {
        print_error(&format!("Team {} failed: {}", team_id, e));
    }
    Ok(())
}

fn status() -> Result<()> {
    let cache = Cache::new()?;
    if CacheLock::is_persisted_locked(&cache)? {
        print_warning("A cache refresh is in progress");
        print_info("If no refresh is running, clear the cache to reset the lock.");
    } else {
        print_success("Cache is idle");
    }
    Ok(())
}
