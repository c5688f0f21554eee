use std::sync::Arc;

use tracing::{info, warn};

use super::{ServiceConnector, ServiceMap, TeamRegistry, TokenVerifier};
use crate::cache::token_key;
use crate::error::{OnboardError, ServiceError, StoreError};
use crate::store::Store;
use crate::types::Team;

/// Turns a freshly supplied token into a registered, connected team
pub struct Onboarding {
    verifier: Arc<dyn TokenVerifier>,
    connector: Arc<dyn ServiceConnector>,
    registry: TeamRegistry,
    store: Arc<dyn Store>,
}

impl Onboarding {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        connector: Arc<dyn ServiceConnector>,
        registry: TeamRegistry,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            verifier,
            connector,
            registry,
            store,
        }
    }

    /// Verify `token`, persist it and make its team available in `services`.
    ///
    /// Nothing is registered unless the credential was durably stored.
    pub async fn onboard(&self, token: &str, services: &ServiceMap) -> Result<Team, OnboardError> {
        let identity = self.verifier.verify(token).await.map_err(|e| match e {
            ServiceError::Api { error, .. } => OnboardError::AuthFailed(error),
            other => OnboardError::Verification(other),
        })?;
        let team = identity.team();
        let key = token_key(team.team_id.as_str());

        self.store_credential(&key, token)
            .map_err(|source| OnboardError::StorageFailed {
                team_id: team.team_id.clone(),
                source,
            })?;

        if self.registry.add(&team).map_err(OnboardError::Registry)? {
            info!("Registered team {} ({})", team.team_name, team.team_id);
        } else {
            info!("Team {} already registered, credential updated", team.team_id);
        }

        // Plain copy from older setups; absent is fine
        if let Err(e) = self.store.delete(&key) {
            warn!("Failed to remove plain token for {}: {}", team.team_id, e);
        }

        let service = self
            .connector
            .connect(&team)
            .map_err(|source| OnboardError::Connect {
                team_id: team.team_id.clone(),
                source,
            })?;
        services.insert(team.team_id.clone(), service);

        Ok(team)
    }

    fn store_credential(&self, key: &str, token: &str) -> Result<(), StoreError> {
        self.store.set_password(key, token)?;
        match self.store.password(key)? {
            Some(stored) if stored == token => Ok(()),
            _ => Err(StoreError::Unverified {
                key: key.to_string(),
            }),
        }
    }
}
