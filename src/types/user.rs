use serde::{Deserialize, Serialize};

use super::{null_as_false, AuthInfo};

/// User profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: Option<String>,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub status_text: Option<String>,
    pub image_72: Option<String>,
    pub image_192: Option<String>,
}

/// Slack user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub team_id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub real_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub deleted: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_bot: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_admin: bool,
    pub tz: Option<String>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub auth: AuthInfo,
}

impl User {
    /// Best name to show for this user
    pub fn display_name(&self) -> &str {
        self.profile
            .display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.real_name.as_deref())
            .unwrap_or(&self.name)
    }
}
