use serde::{Deserialize, Serialize};

use super::{AuthInfo, File};

/// Channel reference embedded in search matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    pub name: Option<String>,
}

/// Message in a conversation history or a search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub ts: String,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub subtype: Option<String>,
    pub user: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub text: String,
    pub channel: Option<ChannelRef>,
    pub permalink: Option<String>,
    #[serde(default)]
    pub auth: AuthInfo,
}

/// Starred item: a message, a file or a whole conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarredItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub channel: Option<String>,
    pub message: Option<Message>,
    pub file: Option<File>,
    #[serde(default)]
    pub auth: AuthInfo,
}

/// Merged results of a full-text search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub messages: Vec<Message>,
    pub files: Vec<File>,
}

impl SearchResults {
    pub fn extend(&mut self, other: SearchResults) {
        self.messages.extend(other.messages);
        self.files.extend(other.files);
    }
}

/// Result of `chat.postMessage`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub channel: String,
    pub ts: String,
}
