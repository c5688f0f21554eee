use serde::{Deserialize, Serialize};

use super::null_as_false;

/// Slack team (workspace) identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Registered team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: TeamId,
    #[serde(rename = "team")]
    pub team_name: String,
}

impl Team {
    pub fn new(team_id: impl Into<TeamId>, team_name: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            team_name: team_name.into(),
        }
    }
}

impl From<String> for TeamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Team context attached to every entity a team service returns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub team_id: TeamId,
    pub team: String,
}

impl From<&Team> for AuthInfo {
    fn from(team: &Team) -> Self {
        Self {
            team_id: team.team_id.clone(),
            team: team.team_name.clone(),
        }
    }
}

/// `auth.test` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub team_id: TeamId,
    pub team: String,
    pub user_id: String,
    pub user: Option<String>,
    pub url: Option<String>,
}

impl Identity {
    pub fn team(&self) -> Team {
        Team::new(self.team_id.clone(), self.team.clone())
    }
}

/// Topic or purpose of a channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelTopic {
    #[serde(default)]
    pub value: String,
}

/// Public channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_archived: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_member: bool,
    pub topic: Option<ChannelTopic>,
    #[serde(default)]
    pub auth: AuthInfo,
}

/// Private channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_archived: bool,
    pub topic: Option<ChannelTopic>,
    #[serde(default)]
    pub auth: AuthInfo,
}

/// Direct-message channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Im {
    pub id: String,
    pub user: String,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_user_deleted: bool,
    #[serde(default)]
    pub auth: AuthInfo,
}
