use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use slack_hub::types::{AuthInfo, Channel, Group, Im, Message, SendResult, TeamScoped};
use slack_hub::{Config, TeamHub};

use super::output::{print_output, print_single, print_success};
use super::utils::{flatten_text, format_ts, truncate};
use super::{open_hub, OutputFormat};

#[derive(Args, Debug)]
pub struct ConversationsCommand {
    #[command(subcommand)]
    pub command: ConversationsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ConversationsSubcommand {
    /// List public channels across all teams
    Channels {
        /// Hide archived channels
        #[arg(long)]
        exclude_archived: bool,
    },

    /// List private channels across all teams
    Groups {
        /// Hide archived groups
        #[arg(long)]
        exclude_archived: bool,
    },

    /// List direct-message channels across all teams
    Ims {
        /// Hide conversations with deleted users
        #[arg(long)]
        exclude_deleted: bool,
    },

    /// Show recent messages of a conversation
    History {
        /// Conversation name or ID
        conversation: String,

        /// Restrict lookup to one team
        #[arg(short, long)]
        team: Option<String>,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Post a message to a conversation
    Post {
        /// Conversation name or ID
        conversation: String,

        /// Message text
        message: String,

        /// Restrict lookup to one team
        #[arg(short, long)]
        team: Option<String>,

        /// Post as the bot rather than as yourself
        #[arg(long)]
        as_bot: bool,
    },

    /// Mark a conversation (or everything) as read
    Read {
        /// Conversation name or ID
        #[arg(required_unless_present = "all")]
        conversation: Option<String>,

        /// Restrict lookup to one team
        #[arg(short, long)]
        team: Option<String>,

        /// Mark every conversation in every team as read
        #[arg(long, conflicts_with = "conversation")]
        all: bool,
    },

    /// Set presence on every team
    Presence {
        /// away or auto
        #[arg(value_enum)]
        state: PresenceState,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum PresenceState {
    Away,
    Auto,
}

#[derive(Debug, Serialize, Tabled)]
struct ConversationRow {
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Archived")]
    archived: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct MessageRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Text")]
    text: String,
}

/// A conversation found by name or id
enum Target {
    Channel(Channel),
    Group(Group),
    Im(Im),
}

impl Target {
    async fn history(&self, hub: &TeamHub) -> Result<Vec<Message>> {
        Ok(match self {
            Target::Channel(c) => hub.channel_history(c).await?,
            Target::Group(g) => hub.group_history(g).await?,
            Target::Im(im) => hub.im_history(im).await?,
        })
    }

    async fn post(&self, hub: &TeamHub, text: &str, as_bot: bool) -> Result<SendResult> {
        Ok(match self {
            Target::Channel(c) => hub.post_message(c, text, as_bot).await?,
            Target::Group(g) => hub.post_message(g, text, as_bot).await?,
            Target::Im(im) => hub.post_message(im, text, as_bot).await?,
        })
    }

    async fn mark_read(&self, hub: &TeamHub) -> Result<()> {
        match self {
            Target::Channel(c) => hub.mark_channel_read(c).await?,
            Target::Group(g) => hub.mark_group_read(g).await?,
            Target::Im(im) => hub.mark_im_read(im).await?,
        }
        Ok(())
    }
}

pub async fn execute(
    cmd: ConversationsCommand,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let hub = open_hub(config)?;
    match cmd.command {
        ConversationsSubcommand::Channels { exclude_archived } => {
            let rows = hub
                .channels(exclude_archived)
                .await?
                .into_iter()
                .map(|c| ConversationRow {
                    team: c.auth.team.clone(),
                    id: c.id,
                    name: format!("#{}", c.name),
                    archived: c.is_archived,
                })
                .collect::<Vec<_>>();
            print_output(&rows, format)
        }
        ConversationsSubcommand::Groups { exclude_archived } => {
            let rows = hub
                .groups(exclude_archived)
                .await?
                .into_iter()
                .map(|g| ConversationRow {
                    team: g.auth.team.clone(),
                    id: g.id,
                    name: g.name,
                    archived: g.is_archived,
                })
                .collect::<Vec<_>>();
            print_output(&rows, format)
        }
        ConversationsSubcommand::Ims { exclude_deleted } => {
            let users = hub.users(false).await?;
            let rows = hub
                .ims(exclude_deleted)
                .await?
                .into_iter()
                .map(|im| {
                    let name = users
                        .iter()
                        .find(|u| u.id == im.user && u.team_id() == im.team_id())
                        .map(|u| format!("@{}", u.display_name()))
                        .unwrap_or_else(|| im.user.clone());
                    ConversationRow {
                        team: im.auth.team.clone(),
                        id: im.id,
                        name,
                        archived: im.is_user_deleted,
                    }
                })
                .collect::<Vec<_>>();
            print_output(&rows, format)
        }
        ConversationsSubcommand::History {
            conversation,
            team,
            limit,
        } => {
            let target = resolve(&hub, &conversation, team.as_deref()).await?;
            let messages = target.history(&hub).await?;
            match format {
                OutputFormat::Json => print_single(&messages),
                _ => {
                    let rows: Vec<MessageRow> = messages
                        .into_iter()
                        .take(limit)
                        .map(|m| MessageRow {
                            time: format_ts(&m.ts),
                            from: m.user.or(m.username).unwrap_or_default(),
                            text: truncate(&flatten_text(&m.text), 60),
                        })
                        .collect();
                    print_output(&rows, format)
                }
            }
        }
        ConversationsSubcommand::Post {
            conversation,
            message,
            team,
            as_bot,
        } => {
            let target = resolve(&hub, &conversation, team.as_deref()).await?;
            let sent = target.post(&hub, &message, as_bot).await?;
            print_success(&format!("Message sent to {} ({})", sent.channel, sent.ts));
            Ok(())
        }
        ConversationsSubcommand::Read {
            conversation,
            team,
            all,
        } => {
            if all {
                hub.mark_all_read().await?;
                print_success("Marked everything as read");
                return Ok(());
            }
            let conversation = conversation.ok_or_else(|| anyhow!("No conversation given"))?;
            let target = resolve(&hub, &conversation, team.as_deref()).await?;
            target.mark_read(&hub).await?;
            print_success(&format!("Marked {} as read", conversation));
            Ok(())
        }
        ConversationsSubcommand::Presence { state } => {
            hub.set_presence(matches!(state, PresenceState::Away)).await?;
            print_success(&format!("Presence set to {:?} on every team", state));
            Ok(())
        }
    }
}

/// Find a conversation by id or name, optionally within one team
async fn resolve(hub: &TeamHub, needle: &str, team: Option<&str>) -> Result<Target> {
    let name = needle.trim_start_matches(['#', '@']);
    let in_team = |auth: &AuthInfo| {
        team.is_none_or(|t| auth.team_id.as_str() == t || auth.team == t)
    };

    let mut found: Vec<Target> = Vec::new();
    found.extend(
        hub.channels(false)
            .await?
            .into_iter()
            .filter(|c| (c.id == needle || c.name == name) && in_team(&c.auth))
            .map(Target::Channel),
    );
    found.extend(
        hub.groups(false)
            .await?
            .into_iter()
            .filter(|g| (g.id == needle || g.name == name) && in_team(&g.auth))
            .map(Target::Group),
    );

    if found.is_empty() {
        let users = hub.users(false).await?;
        for im in hub.ims(false).await? {
            let matches_user = users.iter().any(|u| {
                u.id == im.user && u.team_id() == im.team_id() && (u.name == name || u.id == name)
            });
            if (im.id == needle || matches_user) && in_team(&im.auth) {
                found.push(Target::Im(im));
            }
        }
    }

    match found.len() {
        0 => bail!("Conversation not found: {}", needle),
        1 => Ok(found.remove(0)),
        n => bail!(
            "{} conversations match '{}', pick one with --team",
            n,
            needle
        ),
    }
}
