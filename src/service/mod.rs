//! Multi-team dispatch: the per-team service contract, the live service map
//! and the components built on top of them.

pub mod hub;
pub mod onboarding;
pub mod refresh;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use hub::TeamHub;
pub use onboarding::Onboarding;
pub use refresh::{CacheLock, CacheRefresher, RefreshReport};
pub use registry::TeamRegistry;

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use async_trait::async_trait;

use crate::error::{RoutingError, ServiceError};
use crate::types::*;

/// Operations available on one authenticated team
#[async_trait]
pub trait TeamService: Send + Sync {
    /// Profile image of `user`, `None` when this team cannot serve it
    async fn profile_icon(&self, user: &User) -> Result<Option<Icon>, ServiceError>;

    /// Thumbnail of a file, `None` when this team cannot serve it
    async fn file_icon(&self, file_id: &str) -> Result<Option<Icon>, ServiceError>;

    async fn channels(&self, exclude_archived: bool) -> Result<Vec<Channel>, ServiceError>;

    async fn groups(&self, exclude_archived: bool) -> Result<Vec<Group>, ServiceError>;

    async fn ims(&self, exclude_deleted: bool) -> Result<Vec<Im>, ServiceError>;

    async fn users(&self, exclude_deleted: bool) -> Result<Vec<User>, ServiceError>;

    async fn files(&self) -> Result<Vec<File>, ServiceError>;

    async fn file(&self, file: &File) -> Result<File, ServiceError>;

    async fn starred_items(&self) -> Result<Vec<StarredItem>, ServiceError>;

    async fn search(&self, query: &str) -> Result<SearchResults, ServiceError>;

    /// Open (or reuse) the direct-message channel with `user`
    async fn open_im(&self, user: &User) -> Result<ImId, ServiceError>;

    async fn im_id_by_user_id(&self, user_id: &str) -> Result<ImId, ServiceError>;

    async fn set_presence(&self, away: bool) -> Result<(), ServiceError>;

    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        as_bot: bool,
    ) -> Result<SendResult, ServiceError>;

    async fn channel_history(&self, channel: &Channel) -> Result<Vec<Message>, ServiceError>;

    async fn group_history(&self, group: &Group) -> Result<Vec<Message>, ServiceError>;

    async fn im_history(&self, im: &Im) -> Result<Vec<Message>, ServiceError>;

    /// Rebuild this team's local caches
    async fn refresh_cache(&self) -> Result<(), ServiceError>;

    async fn mark_channel_read(&self, channel: &Channel) -> Result<(), ServiceError>;

    async fn mark_group_read(&self, group: &Group) -> Result<(), ServiceError>;

    async fn mark_im_read(&self, im: &Im) -> Result<(), ServiceError>;

    async fn mark_all_read(&self) -> Result<(), ServiceError>;
}

/// Opens a [`TeamService`] for a registered team
pub trait ServiceConnector: Send + Sync {
    fn connect(&self, team: &Team) -> Result<Arc<dyn TeamService>, ServiceError>;
}

/// Checks a bare token against the remote service
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, ServiceError>;
}

type Services = BTreeMap<TeamId, Arc<dyn TeamService>>;

/// Live services keyed by team id.
///
/// The map only holds `Arc` handles and every write is a single insert, so a
/// poisoned lock still guards a consistent map and is recovered.
#[derive(Default)]
pub struct ServiceMap {
    services: RwLock<Services>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Services> {
        self.services.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, team_id: TeamId, service: Arc<dyn TeamService>) {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(team_id, service);
    }

    pub fn get(&self, team_id: &TeamId) -> Result<Arc<dyn TeamService>, RoutingError> {
        self.read()
            .get(team_id)
            .cloned()
            .ok_or_else(|| RoutingError::UnknownTeam(team_id.clone()))
    }

    pub fn contains(&self, team_id: &TeamId) -> bool {
        self.read().contains_key(team_id)
    }

    pub fn team_ids(&self) -> Vec<TeamId> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles to every service, in team id order; the lock is released on return
    pub fn snapshot(&self) -> Vec<(TeamId, Arc<dyn TeamService>)> {
        self.read()
            .iter()
            .map(|(id, service)| (id.clone(), Arc::clone(service)))
            .collect()
    }
}
