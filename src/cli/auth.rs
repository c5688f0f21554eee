use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use slack_hub::error::OnboardError;
use slack_hub::{Config, TeamHub};

use super::output::{print_info, print_output, print_success};
use super::{open_hub, OutputFormat};

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Add a team by its user token (xoxp-...)
    Add {
        /// Slack token
        #[arg(env = "SLACK_TOKEN")]
        token: String,
    },

    /// List registered teams
    List,
}

#[derive(Debug, Serialize, Tabled)]
struct TeamRow {
    #[tabled(rename = "Team ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Connected")]
    connected: bool,
}

pub async fn execute(cmd: AuthCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let hub = open_hub(config)?;
    match cmd.command {
        AuthSubcommand::Add { token } => add(&hub, &token).await,
        AuthSubcommand::List => list(&hub, format),
    }
}

async fn add(hub: &TeamHub, token: &str) -> Result<()> {
    match hub.add_token(token).await {
        Ok(team) => {
            print_success(&format!(
                "Added team {} ({})",
                team.team_name, team.team_id
            ));
            print_info("Run 'slack-hub cache refresh' to fill the local cache.");
            Ok(())
        }
        Err(OnboardError::AuthFailed(reason)) => {
            bail!("Slack rejected the token: {}", reason)
        }
        Err(e) => Err(e.into()),
    }
}

fn list(hub: &TeamHub, format: OutputFormat) -> Result<()> {
    let connected = hub.team_ids();
    let rows: Vec<TeamRow> = hub
        .teams()?
        .into_iter()
        .map(|team| TeamRow {
            connected: connected.contains(&team.team_id),
            id: team.team_id.to_string(),
            name: team.team_name,
        })
        .collect();

    print_output(&rows, format)
}
