use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{list_key, token_key};
use crate::config::ApiConfig;
use crate::error::ServiceError;
use crate::service::{ServiceConnector, TeamService};
use crate::store::{Store, StoreExt};
use crate::types::*;

const PAGE_SIZE: &str = "200";

/// Authenticated access to the Slack Web API for one token
#[derive(Clone)]
pub struct SlackApi {
    http: Client,
    base_url: String,
    token: String,
}

impl SlackApi {
    pub fn new(config: &ApiConfig, token: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            http: Client::builder()
                .timeout(Duration::from_secs(config.timeout))
                .build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, ServiceError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|_| {
            ServiceError::Api {
                method: "auth".to_string(),
                error: "invalid_token_format".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Call a Web API method and decode its envelope
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}/{}", self.base_url, method);
        debug!("Calling {}", method);

        let res = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .form(params)
            .send()
            .await?;

        let body = res.error_for_status()?.text().await?;
        let envelope: Value = serde_json::from_str(&body).map_err(|source| ServiceError::Decode {
            method: method.to_string(),
            source,
        })?;

        if envelope.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = envelope
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(ServiceError::Api {
                method: method.to_string(),
                error: error.to_string(),
            });
        }

        serde_json::from_value(envelope).map_err(|source| ServiceError::Decode {
            method: method.to_string(),
            source,
        })
    }

    /// Follow `response_metadata.next_cursor` until exhausted
    async fn paginate<P: Paged>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<P::Item>, ServiceError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut page_params = params.to_vec();
            page_params.push(("limit", PAGE_SIZE.to_string()));
            if let Some(cursor) = &cursor {
                page_params.push(("cursor", cursor.clone()));
            }

            let (page, next) = self.call::<P>(method, &page_params).await?.into_parts();
            items.extend(page);

            match next.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(items)
    }

    /// Whether `url` may receive this team's token: Slack hosts over https,
    /// or the API host itself
    fn sends_token(&self, url: &Url) -> bool {
        let slack_host = url.scheme() == "https"
            && url
                .host_str()
                .is_some_and(|host| host == "slack.com" || host.ends_with(".slack.com"));
        slack_host || Url::parse(&self.base_url).is_ok_and(|base| base.origin() == url.origin())
    }

    /// Download an asset to `path`, authenticating only against Slack
    async fn download(&self, url: &str, path: &Path) -> Result<(), ServiceError> {
        let url = Url::parse(url).map_err(|_| ServiceError::InvalidUrl(url.to_string()))?;
        let mut request = self.http.get(url.clone());
        if self.sends_token(&url) {
            request = request.headers(self.headers()?);
        } else {
            debug!("Fetching {} without credentials", url.host_str().unwrap_or_default());
        }
        let bytes = request
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }
}

// Response shapes

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

trait Paged: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Deserialize)]
struct ConversationsPage<T> {
    #[serde(default = "Vec::new")]
    channels: Vec<T>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

impl<T: DeserializeOwned> Paged for ConversationsPage<T> {
    type Item = T;

    fn into_parts(self) -> (Vec<T>, Option<String>) {
        (self.channels, self.response_metadata.next_cursor)
    }
}

#[derive(Deserialize)]
struct MembersPage {
    #[serde(default)]
    members: Vec<User>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

impl Paged for MembersPage {
    type Item = User;

    fn into_parts(self) -> (Vec<User>, Option<String>) {
        (self.members, self.response_metadata.next_cursor)
    }
}

#[derive(Deserialize)]
struct FilesList {
    #[serde(default)]
    files: Vec<File>,
}

#[derive(Deserialize)]
struct FileInfo {
    file: File,
}

#[derive(Deserialize)]
struct StarsList {
    #[serde(default)]
    items: Vec<StarredItem>,
}

#[derive(Deserialize)]
struct Matches<T> {
    #[serde(default = "Vec::new")]
    matches: Vec<T>,
}

impl<T> Default for Matches<T> {
    fn default() -> Self {
        Self {
            matches: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct SearchAll {
    #[serde(default)]
    messages: Matches<Message>,
    #[serde(default)]
    files: Matches<File>,
}

#[derive(Deserialize)]
struct OpenedConversation {
    channel: ConversationId,
}

#[derive(Deserialize)]
struct ConversationId {
    id: String,
}

#[derive(Deserialize)]
struct History {
    #[serde(default)]
    messages: Vec<Message>,
}

/// Entities that get stamped with the owning team
trait Stamp {
    fn stamp(&mut self, auth: &AuthInfo);
}

macro_rules! stamp {
    ($($ty:ty),+ $(,)?) => {
        $(impl Stamp for $ty {
            fn stamp(&mut self, auth: &AuthInfo) {
                self.auth = auth.clone();
            }
        })+
    };
}

stamp!(User, Channel, Group, Im, File, Message);

impl Stamp for StarredItem {
    fn stamp(&mut self, auth: &AuthInfo) {
        self.auth = auth.clone();
        if let Some(message) = &mut self.message {
            message.stamp(auth);
        }
        if let Some(file) = &mut self.file {
            file.stamp(auth);
        }
    }
}

fn stamped<T: Stamp>(mut items: Vec<T>, auth: &AuthInfo) -> Vec<T> {
    for item in &mut items {
        item.stamp(auth);
    }
    items
}

/// Slack client for one team, with a read-through list cache
pub struct SlackClient {
    api: SlackApi,
    auth: AuthInfo,
    store: Arc<dyn Store>,
    icon_dir: PathBuf,
}

impl SlackClient {
    pub fn new(api: SlackApi, team: &Team, store: Arc<dyn Store>, icon_dir: PathBuf) -> Self {
        Self {
            api,
            auth: AuthInfo::from(team),
            store,
            icon_dir,
        }
    }

    fn cache_key(&self, list: &str) -> String {
        list_key(self.auth.team_id.as_str(), list)
    }

    async fn fetch_conversations<T: DeserializeOwned + Stamp>(
        &self,
        types: &str,
    ) -> Result<Vec<T>, ServiceError> {
        let items = self
            .api
            .paginate::<ConversationsPage<T>>(
                "conversations.list",
                &[
                    ("types", types.to_string()),
                    ("exclude_archived", "false".to_string()),
                ],
            )
            .await?;
        Ok(stamped(items, &self.auth))
    }

    async fn fetch_users(&self) -> Result<Vec<User>, ServiceError> {
        let users = self.api.paginate::<MembersPage>("users.list", &[]).await?;
        Ok(stamped(users, &self.auth))
    }

    async fn cached_channels(&self) -> Result<Vec<Channel>, ServiceError> {
        let key = self.cache_key("channels");
        if let Some(channels) = self.store.load(&key)? {
            return Ok(channels);
        }
        let channels = self.fetch_conversations("public_channel").await?;
        self.store.save(&key, &channels)?;
        Ok(channels)
    }

    async fn cached_groups(&self) -> Result<Vec<Group>, ServiceError> {
        let key = self.cache_key("groups");
        if let Some(groups) = self.store.load(&key)? {
            return Ok(groups);
        }
        let groups = self.fetch_conversations("private_channel").await?;
        self.store.save(&key, &groups)?;
        Ok(groups)
    }

    async fn cached_ims(&self) -> Result<Vec<Im>, ServiceError> {
        let key = self.cache_key("ims");
        if let Some(ims) = self.store.load(&key)? {
            return Ok(ims);
        }
        let ims = self.fetch_conversations("im").await?;
        self.store.save(&key, &ims)?;
        Ok(ims)
    }

    async fn cached_users(&self) -> Result<Vec<User>, ServiceError> {
        let key = self.cache_key("users");
        if let Some(users) = self.store.load(&key)? {
            return Ok(users);
        }
        let users = self.fetch_users().await?;
        self.store.save(&key, &users)?;
        Ok(users)
    }

    async fn history(&self, conversation_id: &str, limit: usize) -> Result<Vec<Message>, ServiceError> {
        let history: History = self
            .api
            .call(
                "conversations.history",
                &[
                    ("channel", conversation_id.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(stamped(history.messages, &self.auth))
    }

    /// Mark a conversation read up to its latest message
    async fn mark_read(&self, conversation_id: &str) -> Result<(), ServiceError> {
        let Some(latest) = self.history(conversation_id, 1).await?.into_iter().next() else {
            return Ok(());
        };
        let _: Value = self
            .api
            .call(
                "conversations.mark",
                &[
                    ("channel", conversation_id.to_string()),
                    ("ts", latest.ts),
                ],
            )
            .await?;
        Ok(())
    }

    async fn icon(&self, url: &str, name: &str) -> Result<Icon, ServiceError> {
        let path = self.icon_dir.join(format!("{}.png", name));
        if !path.exists() {
            self.api.download(url, &path).await?;
        }
        Ok(Icon { path })
    }
}

#[async_trait]
impl TeamService for SlackClient {
    async fn profile_icon(&self, user: &User) -> Result<Option<Icon>, ServiceError> {
        let users = self.cached_users().await?;
        let Some(known) = users.iter().find(|u| u.id == user.id) else {
            return Ok(None);
        };
        match known.profile.image_72.as_deref() {
            Some(url) => self
                .icon(url, &format!("{}_{}", self.auth.team_id, known.id))
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    async fn file_icon(&self, file_id: &str) -> Result<Option<Icon>, ServiceError> {
        let info: FileInfo = match self
            .api
            .call("files.info", &[("file", file_id.to_string())])
            .await
        {
            Ok(info) => info,
            Err(ServiceError::Api { error, .. }) if error == "file_not_found" => return Ok(None),
            Err(e) => return Err(e),
        };
        match info.file.thumb_64.as_deref() {
            Some(url) => self.icon(url, &info.file.id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn channels(&self, exclude_archived: bool) -> Result<Vec<Channel>, ServiceError> {
        let channels = self.cached_channels().await?;
        Ok(channels
            .into_iter()
            .filter(|c| !(exclude_archived && c.is_archived))
            .collect())
    }

    async fn groups(&self, exclude_archived: bool) -> Result<Vec<Group>, ServiceError> {
        let groups = self.cached_groups().await?;
        Ok(groups
            .into_iter()
            .filter(|g| !(exclude_archived && g.is_archived))
            .collect())
    }

    async fn ims(&self, exclude_deleted: bool) -> Result<Vec<Im>, ServiceError> {
        let ims = self.cached_ims().await?;
        Ok(ims
            .into_iter()
            .filter(|im| !(exclude_deleted && im.is_user_deleted))
            .collect())
    }

    async fn users(&self, exclude_deleted: bool) -> Result<Vec<User>, ServiceError> {
        let users = self.cached_users().await?;
        Ok(users
            .into_iter()
            .filter(|u| !(exclude_deleted && u.deleted))
            .collect())
    }

    async fn files(&self) -> Result<Vec<File>, ServiceError> {
        let list: FilesList = self
            .api
            .call("files.list", &[("count", "100".to_string())])
            .await?;
        Ok(stamped(list.files, &self.auth))
    }

    async fn file(&self, file: &File) -> Result<File, ServiceError> {
        let mut info: FileInfo = self
            .api
            .call("files.info", &[("file", file.id.clone())])
            .await?;
        info.file.stamp(&self.auth);
        Ok(info.file)
    }

    async fn starred_items(&self) -> Result<Vec<StarredItem>, ServiceError> {
        let stars: StarsList = self.api.call("stars.list", &[]).await?;
        Ok(stamped(stars.items, &self.auth))
    }

    async fn search(&self, query: &str) -> Result<SearchResults, ServiceError> {
        let results: SearchAll = self
            .api
            .call("search.all", &[("query", query.to_string())])
            .await?;
        Ok(SearchResults {
            messages: stamped(results.messages.matches, &self.auth),
            files: stamped(results.files.matches, &self.auth),
        })
    }

    async fn open_im(&self, user: &User) -> Result<ImId, ServiceError> {
        let opened: OpenedConversation = self
            .api
            .call("conversations.open", &[("users", user.id.clone())])
            .await?;
        Ok(ImId(opened.channel.id))
    }

    async fn im_id_by_user_id(&self, user_id: &str) -> Result<ImId, ServiceError> {
        self.cached_ims()
            .await?
            .into_iter()
            .find(|im| im.user == user_id)
            .map(|im| ImId(im.id))
            .ok_or_else(|| ServiceError::NotFound(format!("direct message with {}", user_id)))
    }

    async fn set_presence(&self, away: bool) -> Result<(), ServiceError> {
        let presence = if away { "away" } else { "auto" };
        let _: Value = self
            .api
            .call("users.setPresence", &[("presence", presence.to_string())])
            .await?;
        Ok(())
    }

    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        as_bot: bool,
    ) -> Result<SendResult, ServiceError> {
        self.api
            .call(
                "chat.postMessage",
                &[
                    ("channel", channel_id.to_string()),
                    ("text", text.to_string()),
                    ("as_user", (!as_bot).to_string()),
                ],
            )
            .await
    }

    async fn channel_history(&self, channel: &Channel) -> Result<Vec<Message>, ServiceError> {
        self.history(&channel.id, 100).await
    }

    async fn group_history(&self, group: &Group) -> Result<Vec<Message>, ServiceError> {
        self.history(&group.id, 100).await
    }

    async fn im_history(&self, im: &Im) -> Result<Vec<Message>, ServiceError> {
        self.history(&im.id, 100).await
    }

    async fn refresh_cache(&self) -> Result<(), ServiceError> {
        let (channels, groups, ims, users) = futures::try_join!(
            self.fetch_conversations::<Channel>("public_channel"),
            self.fetch_conversations::<Group>("private_channel"),
            self.fetch_conversations::<Im>("im"),
            self.fetch_users(),
        )?;
        self.store.save(&self.cache_key("channels"), &channels)?;
        self.store.save(&self.cache_key("groups"), &groups)?;
        self.store.save(&self.cache_key("ims"), &ims)?;
        self.store.save(&self.cache_key("users"), &users)?;
        debug!(
            "Team {} cached: {} channels, {} groups, {} ims, {} users",
            self.auth.team_id,
            channels.len(),
            groups.len(),
            ims.len(),
            users.len()
        );
        Ok(())
    }

    async fn mark_channel_read(&self, channel: &Channel) -> Result<(), ServiceError> {
        self.mark_read(&channel.id).await
    }

    async fn mark_group_read(&self, group: &Group) -> Result<(), ServiceError> {
        self.mark_read(&group.id).await
    }

    async fn mark_im_read(&self, im: &Im) -> Result<(), ServiceError> {
        self.mark_read(&im.id).await
    }

    async fn mark_all_read(&self) -> Result<(), ServiceError> {
        let mut ids: Vec<String> = self
            .channels(true)
            .await?
            .into_iter()
            .filter(|c| c.is_member)
            .map(|c| c.id)
            .collect();
        ids.extend(self.groups(true).await?.into_iter().map(|g| g.id));
        ids.extend(self.ims(true).await?.into_iter().map(|im| im.id));

        for id in ids {
            self.mark_read(&id).await?;
        }
        Ok(())
    }
}

/// Opens a [`SlackClient`] from the token stored for a team
pub struct SlackConnector {
    config: ApiConfig,
    store: Arc<dyn Store>,
    icon_dir: PathBuf,
}

impl SlackConnector {
    pub fn new(config: ApiConfig, store: Arc<dyn Store>, icon_dir: PathBuf) -> Self {
        Self {
            config,
            store,
            icon_dir,
        }
    }

    fn token(&self, team: &Team) -> Result<String, ServiceError> {
        let key = token_key(team.team_id.as_str());
        if let Some(token) = self.store.password(&key)? {
            return Ok(token);
        }
        // Plain copy left by older setups
        self.store
            .load::<String>(&key)?
            .ok_or_else(|| ServiceError::NotFound(format!("credential for team {}", team.team_id)))
    }
}

impl ServiceConnector for SlackConnector {
    fn connect(&self, team: &Team) -> Result<Arc<dyn TeamService>, ServiceError> {
        let api = SlackApi::new(&self.config, &self.token(team)?)?;
        Ok(Arc::new(SlackClient::new(
            api,
            team,
            Arc::clone(&self.store),
            self.icon_dir.clone(),
        )))
    }
}
