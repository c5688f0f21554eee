use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use slack_hub::Config;

use super::output::{print_output, print_single};
use super::utils::{flatten_text, format_ts, truncate};
use super::{open_hub, OutputFormat};

#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Search query
    pub query: String,

    /// Maximum number of results per category
    #[arg(short, long, default_value = "10")]
    pub limit: usize,
}

#[derive(Debug, Serialize, Tabled)]
pub struct SearchRow {
    #[tabled(rename = "Team")]
    pub team: String,
    #[tabled(rename = "Type")]
    pub result_type: String,
    #[tabled(rename = "Where")]
    pub location: String,
    #[tabled(rename = "Match")]
    pub text: String,
}

pub async fn execute(cmd: SearchCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let hub = open_hub(config)?;
    let results = hub.search(&cmd.query).await?;

    if results.messages.is_empty() && results.files.is_empty() {
        println!("No results found for '{}'", cmd.query);
        return Ok(());
    }

    if let OutputFormat::Json = format {
        return print_single(&results);
    }

    let mut rows = Vec::new();
    for m in results.messages.into_iter().take(cmd.limit) {
        let location = m
            .channel
            .as_ref()
            .and_then(|c| c.name.clone())
            .map(|name| format!("#{}", name))
            .unwrap_or_else(|| format_ts(&m.ts));
        rows.push(SearchRow {
            team: m.auth.team.clone(),
            result_type: "MESSAGE".to_string(),
            location,
            text: truncate(&flatten_text(&m.text), 60),
        });
    }
    for f in results.files.into_iter().take(cmd.limit) {
        rows.push(SearchRow {
            team: f.auth.team.clone(),
            result_type: "FILE".to_string(),
            location: f.filetype.clone().unwrap_or_default(),
            text: truncate(f.title.as_deref().unwrap_or(&f.name), 60),
        });
    }

    print_output(&rows, format)
}
