use thiserror::Error;

use crate::types::TeamId;

/// Errors raised by a [`Store`](crate::store::Store) backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize {key}: {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Secret {key} could not be verified after write")]
    Unverified { key: String },
}

/// Errors raised by a single team's service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack API error on {method}: {error}")]
    Api { method: String, error: String },

    #[error("Failed to parse {method} response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// True when the remote service rejected the request itself
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}

/// Single-route dispatch could not find a service for an entity
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("No service registered for team {0}")]
    UnknownTeam(TeamId),
}

/// Errors surfaced by hub operations
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("Team {team_id} failed: {source}")]
    Service {
        team_id: TeamId,
        #[source]
        source: ServiceError,
    },
}

impl DispatchError {
    pub fn service(team_id: &TeamId, source: ServiceError) -> Self {
        Self::Service {
            team_id: team_id.clone(),
            source,
        }
    }
}

/// Errors surfaced while onboarding a new token
#[derive(Debug, Error)]
pub enum OnboardError {
    #[error("Token rejected by Slack: {0}")]
    AuthFailed(String),

    #[error("Failed to store credential for team {team_id}: {source}")]
    StorageFailed {
        team_id: TeamId,
        #[source]
        source: StoreError,
    },

    #[error("Token verification failed: {0}")]
    Verification(#[source] ServiceError),

    #[error("Failed to register team: {0}")]
    Registry(#[source] StoreError),

    #[error("Onboarding is not configured for this hub")]
    Unavailable,

    #[error("Failed to connect team {team_id}: {source}")]
    Connect {
        team_id: TeamId,
        #[source]
        source: ServiceError,
    },
}

/// Errors surfaced by a full cache refresh
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("A cache refresh is already in progress")]
    InProgress,

    #[error("Failed to publish cache lock: {0}")]
    Lock(#[from] StoreError),
}
