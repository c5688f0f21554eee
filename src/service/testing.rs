//! Scriptable in-memory [`TeamService`] for hub, onboarding and refresh tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{CacheLock, ServiceConnector, TeamService, TokenVerifier};
use crate::error::ServiceError;
use crate::types::*;

#[derive(Clone, Default)]
pub struct MockTeam {
    auth: AuthInfo,
    channels: usize,
    groups: usize,
    users: usize,
    files: usize,
    icon: Option<Icon>,
    failing: bool,
    hanging: bool,
    calls: Arc<Mutex<Vec<String>>>,
    observed: Option<Arc<CacheLock>>,
    lock_seen: Arc<Mutex<Option<bool>>>,
}

impl MockTeam {
    pub fn new(team_id: &str) -> Self {
        Self {
            auth: AuthInfo::from(&Team::new(team_id, format!("Team {}", team_id))),
            ..Self::default()
        }
    }

    pub fn with_channels(mut self, count: usize) -> Self {
        self.channels = count;
        self
    }

    pub fn with_groups(mut self, count: usize) -> Self {
        self.groups = count;
        self
    }

    pub fn with_users(mut self, count: usize) -> Self {
        self.users = count;
        self
    }

    pub fn with_files(mut self, count: usize) -> Self {
        self.files = count;
        self
    }

    pub fn with_icon(mut self, path: &str) -> Self {
        self.icon = Some(Icon {
            path: PathBuf::from(path),
        });
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// `refresh_cache` never completes
    pub fn hanging(mut self) -> Self {
        self.hanging = true;
        self
    }

    /// Record the lock state seen while `refresh_cache` runs
    pub fn observing(mut self, lock: Arc<CacheLock>) -> Self {
        self.observed = Some(lock);
        self
    }

    pub fn team(&self) -> Team {
        Team::new(self.auth.team_id.clone(), self.auth.team.clone())
    }

    pub fn arc(&self) -> Arc<dyn TeamService> {
        Arc::new(self.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lock_seen_during_refresh(&self) -> Option<bool> {
        *self.lock_seen.lock().unwrap()
    }

    fn record(&self, call: &str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.failing {
            return Err(ServiceError::Api {
                method: call.to_string(),
                error: "mock_failure".to_string(),
            });
        }
        Ok(())
    }

    pub fn user(&self, id: &str) -> User {
        serde_json::from_value::<User>(serde_json::json!({ "id": id, "name": id }))
            .map(|mut user| {
                user.auth = self.auth.clone();
                user
            })
            .unwrap()
    }

    pub fn channel(&self, id: &str) -> Channel {
        Channel {
            id: id.to_string(),
            name: id.to_lowercase(),
            is_archived: false,
            is_member: true,
            topic: None,
            auth: self.auth.clone(),
        }
    }

    pub fn group(&self, id: &str) -> Group {
        Group {
            id: id.to_string(),
            name: id.to_lowercase(),
            is_archived: false,
            topic: None,
            auth: self.auth.clone(),
        }
    }

    pub fn im(&self, id: &str, user: &str) -> Im {
        Im {
            id: id.to_string(),
            user: user.to_string(),
            is_user_deleted: false,
            auth: self.auth.clone(),
        }
    }

    pub fn file(&self, id: &str) -> File {
        serde_json::from_value::<File>(serde_json::json!({ "id": id, "name": id }))
            .map(|mut file| {
                file.auth = self.auth.clone();
                file
            })
            .unwrap()
    }

    fn message(&self, ts: &str) -> Message {
        serde_json::from_value::<Message>(serde_json::json!({ "ts": ts, "text": self.auth.team_id }))
            .unwrap()
    }

    fn prefix(&self) -> &str {
        self.auth.team_id.as_str()
    }
}

#[async_trait]
impl TeamService for MockTeam {
    async fn profile_icon(&self, _user: &User) -> Result<Option<Icon>, ServiceError> {
        self.record("profile_icon")?;
        Ok(self.icon.clone())
    }

    async fn file_icon(&self, _file_id: &str) -> Result<Option<Icon>, ServiceError> {
        self.record("file_icon")?;
        Ok(self.icon.clone())
    }

    async fn channels(&self, _exclude_archived: bool) -> Result<Vec<Channel>, ServiceError> {
        self.record("channels")?;
        Ok((0..self.channels)
            .map(|i| self.channel(&format!("{}-C{}", self.prefix(), i)))
            .collect())
    }

    async fn groups(&self, _exclude_archived: bool) -> Result<Vec<Group>, ServiceError> {
        self.record("groups")?;
        Ok((0..self.groups)
            .map(|i| self.group(&format!("{}-G{}", self.prefix(), i)))
            .collect())
    }

    async fn ims(&self, _exclude_deleted: bool) -> Result<Vec<Im>, ServiceError> {
        self.record("ims")?;
        Ok((0..self.users)
            .map(|i| self.im(&format!("{}-D{}", self.prefix(), i), &format!("U{}", i)))
            .collect())
    }

    async fn users(&self, _exclude_deleted: bool) -> Result<Vec<User>, ServiceError> {
        self.record("users")?;
        Ok((0..self.users)
            .map(|i| self.user(&format!("{}-U{}", self.prefix(), i)))
            .collect())
    }

    async fn files(&self) -> Result<Vec<File>, ServiceError> {
        self.record("files")?;
        Ok((0..self.files)
            .map(|i| self.file(&format!("{}-F{}", self.prefix(), i)))
            .collect())
    }

    async fn file(&self, file: &File) -> Result<File, ServiceError> {
        self.record("file")?;
        Ok(file.clone())
    }

    async fn starred_items(&self) -> Result<Vec<StarredItem>, ServiceError> {
        self.record("starred_items")?;
        Ok((0..self.files)
            .map(|i| StarredItem {
                item_type: "file".to_string(),
                channel: None,
                message: None,
                file: Some(self.file(&format!("{}-F{}", self.prefix(), i))),
                auth: self.auth.clone(),
            })
            .collect())
    }

    async fn search(&self, _query: &str) -> Result<SearchResults, ServiceError> {
        self.record("search")?;
        Ok(SearchResults {
            messages: vec![self.message("1.0")],
            files: (0..self.files)
                .map(|i| self.file(&format!("{}-F{}", self.prefix(), i)))
                .collect(),
        })
    }

    async fn open_im(&self, user: &User) -> Result<ImId, ServiceError> {
        self.record("open_im")?;
        Ok(ImId(format!("{}-D-{}", self.prefix(), user.id)))
    }

    async fn im_id_by_user_id(&self, user_id: &str) -> Result<ImId, ServiceError> {
        self.record("im_id_by_user_id")?;
        Ok(ImId(format!("{}-D-{}", self.prefix(), user_id)))
    }

    async fn set_presence(&self, away: bool) -> Result<(), ServiceError> {
        self.record(if away { "set_presence:away" } else { "set_presence:auto" })
    }

    async fn post_message(
        &self,
        channel_id: &str,
        _text: &str,
        _as_bot: bool,
    ) -> Result<SendResult, ServiceError> {
        self.record("post_message")?;
        Ok(SendResult {
            channel: channel_id.to_string(),
            ts: "1.0".to_string(),
        })
    }

    async fn channel_history(&self, _channel: &Channel) -> Result<Vec<Message>, ServiceError> {
        self.record("channel_history")?;
        Ok(vec![self.message("1.0"), self.message("2.0")])
    }

    async fn group_history(&self, _group: &Group) -> Result<Vec<Message>, ServiceError> {
        self.record("group_history")?;
        Ok(vec![self.message("1.0")])
    }

    async fn im_history(&self, _im: &Im) -> Result<Vec<Message>, ServiceError> {
        self.record("im_history")?;
        Ok(vec![self.message("1.0")])
    }

    async fn refresh_cache(&self) -> Result<(), ServiceError> {
        if let Some(lock) = &self.observed {
            *self.lock_seen.lock().unwrap() = Some(lock.is_locked());
        }
        self.record("refresh_cache")?;
        if self.hanging {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn mark_channel_read(&self, _channel: &Channel) -> Result<(), ServiceError> {
        self.record("mark_channel_read")
    }

    async fn mark_group_read(&self, _group: &Group) -> Result<(), ServiceError> {
        self.record("mark_group_read")
    }

    async fn mark_im_read(&self, _im: &Im) -> Result<(), ServiceError> {
        self.record("mark_im_read")
    }

    async fn mark_all_read(&self) -> Result<(), ServiceError> {
        self.record("mark_all_read")
    }
}

/// Connector that hands out fresh mock services and remembers what it opened
#[derive(Default)]
pub struct MockConnector {
    pub opened: Mutex<Vec<TeamId>>,
}

impl ServiceConnector for MockConnector {
    fn connect(&self, team: &Team) -> Result<Arc<dyn TeamService>, ServiceError> {
        self.opened.lock().unwrap().push(team.team_id.clone());
        Ok(MockTeam::new(team.team_id.as_str()).with_channels(1).arc())
    }
}

/// Verifier that answers from a fixed identity or rejects every token
pub struct MockVerifier {
    pub identity: Option<Identity>,
}

impl MockVerifier {
    pub fn accepting(team_id: &str, team: &str) -> Self {
        Self {
            identity: Some(Identity {
                team_id: TeamId::from(team_id),
                team: team.to_string(),
                user_id: "U1".to_string(),
                user: None,
                url: None,
            }),
        }
    }

    pub fn rejecting() -> Self {
        Self { identity: None }
    }
}

#[async_trait]
impl TokenVerifier for MockVerifier {
    async fn verify(&self, _token: &str) -> Result<Identity, ServiceError> {
        self.identity.clone().ok_or_else(|| ServiceError::Api {
            method: "auth.test".to_string(),
            error: "invalid_auth".to_string(),
        })
    }
}
