use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use slack_hub::Config;

use super::output::{print_error, print_output, print_single};
use super::utils::truncate;
use super::{open_hub, OutputFormat};

#[derive(Args, Debug)]
pub struct FilesCommand {
    #[command(subcommand)]
    pub command: FilesSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum FilesSubcommand {
    /// List recent files across all teams
    List,

    /// Show file details
    Show {
        /// File ID
        file_id: String,
    },

    /// Download a file thumbnail and print its path
    Icon {
        /// File ID
        file_id: String,
    },

    /// List starred items across all teams
    Stars,
}

#[derive(Debug, Serialize, Tabled)]
struct FileRow {
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    filetype: String,
}

#[derive(Debug, Serialize, Tabled)]
struct StarRow {
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Type")]
    item_type: String,
    #[tabled(rename = "Item")]
    item: String,
}

pub async fn execute(cmd: FilesCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let hub = open_hub(config)?;
    match cmd.command {
        FilesSubcommand::List => {
            let rows: Vec<FileRow> = hub
                .files()
                .await?
                .into_iter()
                .map(|f| FileRow {
                    team: f.auth.team.clone(),
                    name: truncate(f.title.as_deref().unwrap_or(&f.name), 40),
                    filetype: f.filetype.unwrap_or_default(),
                    id: f.id,
                })
                .collect();
            print_output(&rows, format)
        }
        FilesSubcommand::Show { file_id } => {
            let Some(file) = hub.files().await?.into_iter().find(|f| f.id == file_id) else {
                bail!("File not found: {}", file_id);
            };
            print_single(&hub.file(&file).await?)
        }
        FilesSubcommand::Icon { file_id } => {
            let Some(file) = hub.files().await?.into_iter().find(|f| f.id == file_id) else {
                bail!("File not found: {}", file_id);
            };
            match hub.file_icon(&file).await {
                Some(icon) => println!("{}", icon.path.display()),
                None => print_error(&format!("No thumbnail for {}", file_id)),
            }
            Ok(())
        }
        FilesSubcommand::Stars => {
            let rows: Vec<StarRow> = hub
                .starred_items()
                .await?
                .into_iter()
                .map(|s| {
                    let item = match (&s.message, &s.file, &s.channel) {
                        (Some(m), _, _) => truncate(&m.text, 50),
                        (None, Some(f), _) => f.name.clone(),
                        (None, None, Some(c)) => c.clone(),
                        _ => String::new(),
                    };
                    StarRow {
                        team: s.auth.team.clone(),
                        item_type: s.item_type,
                        item,
                    }
                })
                .collect();
            print_output(&rows, format)
        }
    }
}
