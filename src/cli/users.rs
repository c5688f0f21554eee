use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use slack_hub::types::User;
use slack_hub::{Config, TeamHub};

use super::output::{print_error, print_output, print_single, print_success};
use super::{open_hub, OutputFormat};

#[derive(Args, Debug)]
pub struct UsersCommand {
    #[command(subcommand)]
    pub command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum UsersSubcommand {
    /// List users across all teams
    List {
        /// Hide deactivated users
        #[arg(long)]
        exclude_deleted: bool,
    },

    /// Show user details
    Show {
        /// User ID or handle
        user: String,
    },

    /// Download a user's profile picture and print its path
    Icon {
        /// User ID or handle
        user: String,
    },

    /// Open a direct message with a user
    Dm {
        /// User ID or handle
        user: String,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
}

pub async fn execute(cmd: UsersCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let hub = open_hub(config)?;
    match cmd.command {
        UsersSubcommand::List { exclude_deleted } => {
            let rows: Vec<UserRow> = hub
                .users(exclude_deleted)
                .await?
                .into_iter()
                .map(|u| UserRow {
                    team: u.auth.team.clone(),
                    name: u.display_name().to_string(),
                    email: u.profile.email.clone().unwrap_or_default(),
                    id: u.id,
                    handle: u.name,
                })
                .collect();
            print_output(&rows, format)
        }
        UsersSubcommand::Show { user } => print_single(&find_user(&hub, &user).await?),
        UsersSubcommand::Icon { user } => {
            let user = find_user(&hub, &user).await?;
            match hub.profile_icon(&user).await {
                Some(icon) => {
                    println!("{}", icon.path.display());
                    Ok(())
                }
                None => {
                    print_error(&format!("No profile picture for {}", user.name));
                    Ok(())
                }
            }
        }
        UsersSubcommand::Dm { user } => {
            let user = find_user(&hub, &user).await?;
            let im = match hub.im_id_for_user(&user).await {
                Ok(id) => id,
                Err(_) => hub.open_im(&user).await?,
            };
            print_success(&format!("Direct message with @{}: {}", user.name, im));
            Ok(())
        }
    }
}

async fn find_user(hub: &TeamHub, needle: &str) -> Result<User> {
    let handle = needle.trim_start_matches('@');
    let mut matches: Vec<User> = hub
        .users(false)
        .await?
        .into_iter()
        .filter(|u| u.id == needle || u.name == handle)
        .collect();

    match matches.len() {
        0 => bail!("User not found: {}", needle),
        1 => Ok(matches.remove(0)),
        n => bail!("{} users match '{}', use the user ID", n, needle),
    }
}
