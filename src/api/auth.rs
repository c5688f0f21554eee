use async_trait::async_trait;
use tracing::debug;

use super::SlackApi;
use crate::config::ApiConfig;
use crate::error::ServiceError;
use crate::service::TokenVerifier;
use crate::types::Identity;

/// Check a token with `auth.test` and return who it belongs to
pub async fn test_token(config: &ApiConfig, token: &str) -> Result<Identity, ServiceError> {
    let api = SlackApi::new(config, token)?;
    let identity: Identity = api.call("auth.test", &[]).await?;
    debug!(
        "Token belongs to {} on team {}",
        identity.user_id, identity.team_id
    );
    Ok(identity)
}

/// Verifies tokens against the Slack Web API with a throwaway client
pub struct SlackVerifier {
    config: ApiConfig,
}

impl SlackVerifier {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TokenVerifier for SlackVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, ServiceError> {
        test_token(&self.config, token).await
    }
}
