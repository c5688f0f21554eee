mod file;
mod message;
mod team;
mod user;

pub use file::*;
pub use message::*;
pub use team::*;
pub use user::*;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// A downloaded image on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub path: PathBuf,
}

/// Conversation id of a direct-message channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImId(pub String);

impl std::fmt::Display for ImId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entity that belongs to exactly one team
pub trait TeamScoped {
    fn auth(&self) -> &AuthInfo;

    fn team_id(&self) -> &TeamId {
        &self.auth().team_id
    }
}

/// A conversation messages can be posted to
pub trait Conversation: TeamScoped {
    fn conversation_id(&self) -> &str;
}

macro_rules! team_scoped {
    ($($ty:ty),+ $(,)?) => {
        $(impl TeamScoped for $ty {
            fn auth(&self) -> &AuthInfo {
                &self.auth
            }
        })+
    };
}

team_scoped!(User, Channel, Group, Im, File, StarredItem);

impl Conversation for Channel {
    fn conversation_id(&self) -> &str {
        &self.id
    }
}

impl Conversation for Group {
    fn conversation_id(&self) -> &str {
        &self.id
    }
}

impl Conversation for Im {
    fn conversation_id(&self) -> &str {
        &self.id
    }
}

// Helper deserializers

/// Slack sends some flags as `null`, treat them as false
pub fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(b),
        Some(Value::Number(n)) => Ok(n.as_i64().is_some_and(|n| n != 0)),
        Some(_) => Err(serde::de::Error::custom("Unexpected type for flag")),
    }
}
