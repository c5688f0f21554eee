use serde::{Deserialize, Serialize};

use super::AuthInfo;

/// Uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub title: Option<String>,
    pub mimetype: Option<String>,
    pub filetype: Option<String>,
    pub user: Option<String>,
    pub created: Option<i64>,
    pub size: Option<u64>,
    pub url_private: Option<String>,
    pub permalink: Option<String>,
    pub thumb_64: Option<String>,
    #[serde(default)]
    pub auth: AuthInfo,
}
