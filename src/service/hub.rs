//! The multi-team facade.
//!
//! Every operation takes one of three shapes:
//!
//! - **broadcast**: run on every team concurrently and concatenate the results
//!   in team id order (lists, search, presence, mark-all-read);
//! - **single route**: run on the one team the entity belongs to (history,
//!   posting, marking a conversation read, ...);
//! - **first match**: probe teams in order and keep the first icon found,
//!   ignoring the entity's own team since assets may be served elsewhere.

use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tracing::{debug, warn};

use super::{
    CacheLock, CacheRefresher, Onboarding, RefreshReport, ServiceConnector, ServiceMap,
    TeamRegistry, TeamService,
};
use crate::config::FailurePolicy;
use crate::error::{DispatchError, OnboardError, RefreshError, ServiceError, StoreError};
use crate::types::*;

/// One facade over every registered team
pub struct TeamHub {
    registry: TeamRegistry,
    services: ServiceMap,
    refresher: CacheRefresher,
    policy: FailurePolicy,
    onboarding: Option<Onboarding>,
}

impl TeamHub {
    /// Open a service for every registered team.
    ///
    /// Teams whose service cannot be opened are left out of the map.
    pub fn open(
        registry: TeamRegistry,
        connector: &dyn ServiceConnector,
        lock: Arc<CacheLock>,
    ) -> Result<Self, StoreError> {
        let services = ServiceMap::new();
        for team in registry.list()? {
            match connector.connect(&team) {
                Ok(service) => services.insert(team.team_id.clone(), service),
                Err(e) => warn!("Skipping team {}: {}", team.team_id, e),
            }
        }
        Ok(Self::with_services(registry, services, lock))
    }

    /// Build a hub from already opened services
    pub fn with_services(registry: TeamRegistry, services: ServiceMap, lock: Arc<CacheLock>) -> Self {
        Self {
            registry,
            services,
            refresher: CacheRefresher::new(lock),
            policy: FailurePolicy::default(),
            onboarding: None,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_onboarding(mut self, onboarding: Onboarding) -> Self {
        self.onboarding = Some(onboarding);
        self
    }

    pub fn teams(&self) -> Result<Vec<Team>, StoreError> {
        self.registry.list()
    }

    /// Teams with a live service
    pub fn team_ids(&self) -> Vec<TeamId> {
        self.services.team_ids()
    }

    /// Onboard a new token; the team is usable immediately
    pub async fn add_token(&self, token: &str) -> Result<Team, OnboardError> {
        match &self.onboarding {
            Some(onboarding) => onboarding.onboard(token, &self.services).await,
            None => Err(OnboardError::Unavailable),
        }
    }

    // Dispatch strategies

    /// Run `call` on every team concurrently, applying the failure policy
    async fn broadcast<R, F, Fut>(&self, op: &'static str, call: F) -> Result<Vec<R>, DispatchError>
    where
        F: Fn(Arc<dyn TeamService>) -> Fut,
        Fut: Future<Output = Result<R, ServiceError>>,
    {
        let services = self.services.snapshot();
        debug!("Broadcasting {} to {} team(s)", op, services.len());

        let calls = services.into_iter().map(|(team_id, service)| {
            let fut = call(service);
            async move { (team_id, fut.await) }
        });

        match self.policy {
            FailurePolicy::FailFast => {
                try_join_all(calls.map(|pending| async move {
                    let (team_id, result) = pending.await;
                    result.map_err(|source| DispatchError::Service { team_id, source })
                }))
                .await
            }
            FailurePolicy::SkipFailed => {
                let mut merged = Vec::new();
                for (team_id, result) in join_all(calls).await {
                    match result {
                        Ok(value) => merged.push(value),
                        Err(e) => warn!("{} failed for team {}, skipping: {}", op, team_id, e),
                    }
                }
                Ok(merged)
            }
        }
    }

    /// Broadcast a list operation and concatenate the per-team lists
    async fn gather<T, F, Fut>(&self, op: &'static str, call: F) -> Result<Vec<T>, DispatchError>
    where
        F: Fn(Arc<dyn TeamService>) -> Fut,
        Fut: Future<Output = Result<Vec<T>, ServiceError>>,
    {
        Ok(self.broadcast(op, call).await?.into_iter().flatten().collect())
    }

    /// Service owning `entity`
    fn route(&self, entity: &impl TeamScoped) -> Result<(TeamId, Arc<dyn TeamService>), DispatchError> {
        let team_id = entity.team_id();
        let service = self.services.get(team_id)?;
        debug!("Routing to team {}", team_id);
        Ok((team_id.clone(), service))
    }

    /// Probe teams in order and keep the first icon found
    async fn first_icon<F, Fut>(&self, op: &'static str, probe: F) -> Option<Icon>
    where
        F: Fn(Arc<dyn TeamService>) -> Fut,
        Fut: Future<Output = Result<Option<Icon>, ServiceError>>,
    {
        for (team_id, service) in self.services.snapshot() {
            match probe(service).await {
                Ok(Some(icon)) => return Some(icon),
                Ok(None) => {}
                Err(e) => debug!("{} failed for team {}: {}", op, team_id, e),
            }
        }
        None
    }

    // Icons

    pub async fn profile_icon(&self, user: &User) -> Option<Icon> {
        self.first_icon("profile_icon", |service| async move {
            service.profile_icon(user).await
        })
        .await
    }

    pub async fn file_icon(&self, file: &File) -> Option<Icon> {
        self.first_icon("file_icon", |service| async move {
            service.file_icon(&file.id).await
        })
        .await
    }

    // Broadcast lists

    pub async fn channels(&self, exclude_archived: bool) -> Result<Vec<Channel>, DispatchError> {
        self.gather("channels", |service| async move {
            service.channels(exclude_archived).await
        })
        .await
    }

    pub async fn groups(&self, exclude_archived: bool) -> Result<Vec<Group>, DispatchError> {
        self.gather("groups", |service| async move {
            service.groups(exclude_archived).await
        })
        .await
    }

    pub async fn ims(&self, exclude_deleted: bool) -> Result<Vec<Im>, DispatchError> {
        self.gather("ims", |service| async move { service.ims(exclude_deleted).await })
            .await
    }

    pub async fn users(&self, exclude_deleted: bool) -> Result<Vec<User>, DispatchError> {
        self.gather("users", |service| async move {
            service.users(exclude_deleted).await
        })
        .await
    }

    pub async fn files(&self) -> Result<Vec<File>, DispatchError> {
        self.gather("files", |service| async move { service.files().await })
            .await
    }

    pub async fn starred_items(&self) -> Result<Vec<StarredItem>, DispatchError> {
        self.gather("starred_items", |service| async move {
            service.starred_items().await
        })
        .await
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults, DispatchError> {
        let per_team = self
            .broadcast("search", |service| async move { service.search(query).await })
            .await?;
        Ok(per_team
            .into_iter()
            .fold(SearchResults::default(), |mut merged, results| {
                merged.extend(results);
                merged
            }))
    }

    // Broadcast side effects

    pub async fn set_presence(&self, away: bool) -> Result<(), DispatchError> {
        self.broadcast("set_presence", |service| async move {
            service.set_presence(away).await
        })
        .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<(), DispatchError> {
        self.broadcast("mark_all_read", |service| async move {
            service.mark_all_read().await
        })
        .await?;
        Ok(())
    }

    // Single route

    pub async fn open_im(&self, user: &User) -> Result<ImId, DispatchError> {
        let (team_id, service) = self.route(user)?;
        service
            .open_im(user)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    pub async fn file(&self, file: &File) -> Result<File, DispatchError> {
        let (team_id, service) = self.route(file)?;
        service
            .file(file)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    pub async fn im_id_for_user(&self, user: &User) -> Result<ImId, DispatchError> {
        let (team_id, service) = self.route(user)?;
        service
            .im_id_by_user_id(&user.id)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    pub async fn post_message(
        &self,
        conversation: &impl Conversation,
        text: &str,
        as_bot: bool,
    ) -> Result<SendResult, DispatchError> {
        let (team_id, service) = self.route(conversation)?;
        service
            .post_message(conversation.conversation_id(), text, as_bot)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    pub async fn channel_history(&self, channel: &Channel) -> Result<Vec<Message>, DispatchError> {
        let (team_id, service) = self.route(channel)?;
        service
            .channel_history(channel)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    pub async fn group_history(&self, group: &Group) -> Result<Vec<Message>, DispatchError> {
        let (team_id, service) = self.route(group)?;
        service
            .group_history(group)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    pub async fn im_history(&self, im: &Im) -> Result<Vec<Message>, DispatchError> {
        let (team_id, service) = self.route(im)?;
        service
            .im_history(im)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    pub async fn mark_channel_read(&self, channel: &Channel) -> Result<(), DispatchError> {
        let (team_id, service) = self.route(channel)?;
        service
            .mark_channel_read(channel)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    pub async fn mark_group_read(&self, group: &Group) -> Result<(), DispatchError> {
        let (team_id, service) = self.route(group)?;
        service
            .mark_group_read(group)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    pub async fn mark_im_read(&self, im: &Im) -> Result<(), DispatchError> {
        let (team_id, service) = self.route(im)?;
        service
            .mark_im_read(im)
            .await
            .map_err(|e| DispatchError::service(&team_id, e))
    }

    // Cache

    pub async fn refresh_cache(&self) -> Result<RefreshReport, RefreshError> {
        self.refresher.refresh_all(&self.services).await
    }

    pub fn is_cache_locked(&self) -> bool {
        self.refresher.is_locked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoutingError;
    use crate::service::testing::{MockConnector, MockTeam, MockVerifier};
    use crate::store::{MemoryStore, Store};

    fn hub(teams: &[&MockTeam]) -> TeamHub {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let registry = TeamRegistry::new(store);
        let services = ServiceMap::new();
        for team in teams {
            let info = team.team();
            registry.add(&info).unwrap();
            services.insert(info.team_id, team.arc());
        }
        TeamHub::with_services(registry, services, Arc::new(CacheLock::new()))
    }

    #[tokio::test]
    async fn test_channels_concatenate_across_teams() {
        let t1 = MockTeam::new("T1").with_channels(3);
        let t2 = MockTeam::new("T2").with_channels(2);
        let hub = hub(&[&t1, &t2]);

        let channels = hub.channels(false).await.unwrap();

        assert_eq!(channels.len(), 5);
        assert_eq!(channels[0].team_id().as_str(), "T1");
        assert_eq!(channels[4].team_id().as_str(), "T2");
    }

    #[tokio::test]
    async fn test_merge_length_is_sum_of_parts() {
        for sizes in [vec![], vec![0], vec![4], vec![1, 0, 7], vec![2, 2, 2, 2]] {
            let teams: Vec<MockTeam> = sizes
                .iter()
                .enumerate()
                .map(|(i, n)| {
                    MockTeam::new(&format!("T{}", i))
                        .with_users(*n)
                        .with_files(*n)
                        .with_groups(*n)
                })
                .collect();
            let hub = hub(&teams.iter().collect::<Vec<_>>());
            let total: usize = sizes.iter().sum();

            assert_eq!(hub.users(false).await.unwrap().len(), total);
            assert_eq!(hub.ims(false).await.unwrap().len(), total);
            assert_eq!(hub.groups(false).await.unwrap().len(), total);
            assert_eq!(hub.files().await.unwrap().len(), total);
            assert_eq!(hub.starred_items().await.unwrap().len(), total);
        }
    }

    #[tokio::test]
    async fn test_search_merges_both_sequences() {
        let t1 = MockTeam::new("T1").with_files(2);
        let t2 = MockTeam::new("T2").with_files(1);
        let hub = hub(&[&t1, &t2]);

        let results = hub.search("deploy").await.unwrap();

        assert_eq!(results.messages.len(), 2);
        assert_eq!(results.files.len(), 3);
    }

    #[tokio::test]
    async fn test_failing_team_is_skipped_by_default() {
        let t1 = MockTeam::new("T1").with_channels(3);
        let t2 = MockTeam::new("T2").with_channels(2).failing();
        let hub = hub(&[&t1, &t2]);

        let channels = hub.channels(false).await.unwrap();

        assert_eq!(channels.len(), 3);
        assert_eq!(t2.calls(), vec!["channels"]);
    }

    #[tokio::test]
    async fn test_failing_team_fails_aggregate_when_fail_fast() {
        let t1 = MockTeam::new("T1").with_channels(3);
        let t2 = MockTeam::new("T2").with_channels(2).failing();
        let hub = hub(&[&t1, &t2]).with_policy(FailurePolicy::FailFast);

        let err = hub.channels(false).await.unwrap_err();

        match err {
            DispatchError::Service { team_id, source } => {
                assert_eq!(team_id.as_str(), "T2");
                assert!(source.is_rejection());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_side_effect_broadcasts_reach_every_team() {
        let t1 = MockTeam::new("T1");
        let t2 = MockTeam::new("T2");
        let hub = hub(&[&t1, &t2]);

        hub.set_presence(true).await.unwrap();
        hub.mark_all_read().await.unwrap();

        for team in [&t1, &t2] {
            assert_eq!(team.calls(), vec!["set_presence:away", "mark_all_read"]);
        }
    }

    #[tokio::test]
    async fn test_single_route_hits_only_owning_team() {
        let t1 = MockTeam::new("T1");
        let t2 = MockTeam::new("T2");
        let hub = hub(&[&t1, &t2]);
        let channel = t2.channel("C1");
        let group = t2.group("G1");
        let im = t2.im("D1", "U1");
        let user = t2.user("U1");
        let file = t2.file("F1");

        hub.channel_history(&channel).await.unwrap();
        hub.group_history(&group).await.unwrap();
        hub.im_history(&im).await.unwrap();
        hub.mark_channel_read(&channel).await.unwrap();
        hub.mark_group_read(&group).await.unwrap();
        hub.mark_im_read(&im).await.unwrap();
        let sent = hub.post_message(&channel, "hello", false).await.unwrap();
        let im_id = hub.im_id_for_user(&user).await.unwrap();
        let opened = hub.open_im(&user).await.unwrap();
        let fetched = hub.file(&file).await.unwrap();

        assert_eq!(sent.channel, "C1");
        assert_eq!(im_id, ImId("T2-D-U1".to_string()));
        assert_eq!(opened, ImId("T2-D-U1".to_string()));
        assert_eq!(fetched.id, "F1");
        assert!(t1.calls().is_empty());
        assert_eq!(t2.calls().len(), 10);
    }

    #[tokio::test]
    async fn test_unknown_team_is_a_routing_error() {
        let t1 = MockTeam::new("T1");
        let stranger = MockTeam::new("T404");
        let hub = hub(&[&t1]);

        let err = hub.channel_history(&stranger.channel("C1")).await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Routing(RoutingError::UnknownTeam(ref id)) if id.as_str() == "T404"
        ));
        assert!(t1.calls().is_empty());
    }

    #[tokio::test]
    async fn test_icons_fall_back_to_any_team() {
        let t1 = MockTeam::new("T1");
        let t2 = MockTeam::new("T2").with_icon("/icons/t2.png");
        let hub = hub(&[&t1, &t2]);
        let user = t1.user("U1");

        let icon = hub.profile_icon(&user).await.unwrap();
        assert_eq!(icon.path.to_str(), Some("/icons/t2.png"));

        let icon = hub.file_icon(&t1.file("F1")).await.unwrap();
        assert_eq!(icon.path.to_str(), Some("/icons/t2.png"));
    }

    #[tokio::test]
    async fn test_icons_stop_at_first_match() {
        let t1 = MockTeam::new("T1").with_icon("/icons/t1.png");
        let t2 = MockTeam::new("T2").with_icon("/icons/t2.png");
        let hub = hub(&[&t1, &t2]);

        let icon = hub.profile_icon(&t2.user("U1")).await.unwrap();

        assert_eq!(icon.path.to_str(), Some("/icons/t1.png"));
        assert!(t2.calls().is_empty());
    }

    #[tokio::test]
    async fn test_icons_not_found_anywhere() {
        let t1 = MockTeam::new("T1");
        let t2 = MockTeam::new("T2").failing();
        let hub = hub(&[&t1, &t2]);

        assert!(hub.profile_icon(&t1.user("U1")).await.is_none());
        assert!(hub.file_icon(&t1.file("F1")).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_through_hub_releases_lock() {
        let t1 = MockTeam::new("T1");
        let t2 = MockTeam::new("T2").failing();
        let hub = hub(&[&t1, &t2]);

        assert!(!hub.is_cache_locked());
        let report = hub.refresh_cache().await.unwrap();
        assert!(!hub.is_cache_locked());
        assert_eq!(report.failed.len(), 1);
    }

    #[tokio::test]
    async fn test_open_builds_services_from_registry() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let registry = TeamRegistry::new(store.clone());
        registry.add(&Team::new("T1", "One")).unwrap();
        registry.add(&Team::new("T2", "Two")).unwrap();
        let connector = MockConnector::default();

        let hub = TeamHub::open(registry, &connector, Arc::new(CacheLock::new())).unwrap();

        assert_eq!(hub.team_ids(), vec![TeamId::from("T1"), TeamId::from("T2")]);
        assert_eq!(hub.channels(true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_added_token_is_usable_immediately() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let registry = TeamRegistry::new(store.clone());
        let onboarding = Onboarding::new(
            Arc::new(MockVerifier::accepting("T9", "Nine")),
            Arc::new(MockConnector::default()),
            registry.clone(),
            store,
        );
        let hub = TeamHub::with_services(registry, ServiceMap::new(), Arc::new(CacheLock::new()))
            .with_onboarding(onboarding);
        assert!(hub.channels(false).await.unwrap().is_empty());

        let team = hub.add_token("xoxp-9").await.unwrap();

        assert_eq!(team.team_id.as_str(), "T9");
        assert_eq!(hub.teams().unwrap(), vec![team]);
        assert_eq!(hub.channels(false).await.unwrap().len(), 1);
    }
}
