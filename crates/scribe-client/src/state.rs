//! Application state shared by every component of the client.
//!
//! [`AppState`] is the single mutable structure; [`Store`] is the handle the
//! UI holds. Components are `impl Store` blocks in their own modules and all
//! reach the state through the same lock, which is never held across an
//! `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{info, warn};

use scribe_gateway::{Gateway, HttpGateway, Remote};
use scribe_shared::constants::CONFIG_KEYS;
use scribe_shared::{AiProvider, Post, ServiceKind, ServiceStatus, TrendData, User};
use scribe_store::Database;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::{EventBus, StoreEvent};
use crate::session::AccountCheck;
use crate::sync::ConfigStore;

/// Last known status of one background service plus the sequence numbers
/// used to discard superseded replies.
#[derive(Debug, Clone)]
pub struct ServiceState {
    pub status: ServiceStatus,
    /// Sequence of the most recently issued status fetch.
    pub issued: u64,
    /// Sequence of the fetch whose reply is currently displayed.
    pub applied: u64,
}

impl ServiceState {
    fn new(kind: ServiceKind) -> Self {
        Self {
            status: ServiceStatus::stopped(kind.default_port()),
            issued: 0,
            applied: 0,
        }
    }
}

/// Central application state.
pub struct AppState {
    /// The account all user-scoped operations act on.
    pub current_user: Option<User>,

    /// Every bound account, as last reported by the backend.
    pub users: Vec<User>,

    /// Validation status per phone.
    pub account_checks: HashMap<String, AccountCheck>,

    /// Provider registry, always a copy of the backend's list.
    pub providers: Vec<AiProvider>,

    /// The in-progress composition.
    pub current_post: Post,

    /// Bumped whenever `current_post` is replaced by another post.
    pub post_generation: u64,

    /// Drafts of `drafts_owner`.
    pub drafts: Vec<Post>,
    pub drafts_owner: Option<i64>,

    pub mcp: ServiceState,
    pub api: ServiceState,

    /// Cached HTTP API key, `None` until loaded or when none exists.
    pub api_key: Option<String>,

    pub trends: TrendData,
    pub trends_loading: bool,

    /// Set once the MCP auto start has been attempted in this process.
    pub mcp_auto_start_attempted: bool,

    /// Local on-disk store. `None` when running without one.
    pub local: Option<Database>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            current_user: None,
            users: Vec::new(),
            account_checks: HashMap::new(),
            providers: Vec::new(),
            current_post: Post::default(),
            post_generation: 0,
            drafts: Vec::new(),
            drafts_owner: None,
            mcp: ServiceState::new(ServiceKind::Mcp),
            api: ServiceState::new(ServiceKind::Api),
            api_key: None,
            trends: TrendData::new(),
            trends_loading: false,
            mcp_auto_start_attempted: false,
            local: None,
        }
    }

    pub fn service(&self, kind: ServiceKind) -> &ServiceState {
        match kind {
            ServiceKind::Mcp => &self.mcp,
            ServiceKind::Api => &self.api,
        }
    }

    pub fn service_mut(&mut self, kind: ServiceKind) -> &mut ServiceState {
        match kind {
            ServiceKind::Mcp => &mut self.mcp,
            ServiceKind::Api => &mut self.api,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the application state container. Cheap to clone; every clone
/// observes the same state.
#[derive(Clone)]
pub struct Store {
    state: Arc<Mutex<AppState>>,
    remote: Remote,
    config: ConfigStore,
    events: EventBus,
    settings: Arc<ClientConfig>,
}

impl Store {
    /// Build a store over `gateway` with default settings and no local store.
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::with_config(gateway, ClientConfig::default())
    }

    pub fn with_config(gateway: Arc<dyn Gateway>, settings: ClientConfig) -> Self {
        let remote = Remote::new(gateway);
        let events = EventBus::new();
        let config = ConfigStore::new(remote.clone(), events.clone());
        Self {
            state: Arc::new(Mutex::new(AppState::new())),
            remote,
            config,
            events,
            settings: Arc::new(settings),
        }
    }

    /// Build a store talking to the HTTP backend named in `settings`, with
    /// the local store opened in the configured (or platform) data dir.
    pub fn connect(settings: ClientConfig) -> Result<Self> {
        let local = match &settings.data_dir {
            Some(dir) => Database::open_in_dir(dir)?,
            None => Database::new()?,
        };
        info!(url = %settings.gateway_url, db = ?local.path(), "connecting client");

        let gateway = Arc::new(HttpGateway::new(settings.gateway_url.clone()));
        Ok(Self::with_config(gateway, settings).with_local_store(local))
    }

    /// Attach the local on-disk store.
    pub fn with_local_store(self, local: Database) -> Self {
        self.lock().local = Some(local);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> &ClientConfig {
        &self.settings
    }

    /// The config sync store backing preferences and selections.
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub(crate) fn remote(&self) -> &Remote {
        &self.remote
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn emit(&self, event: StoreEvent) {
        self.events.emit(event);
    }

    /// Load every known config key once, concurrently.
    pub async fn load_initial_config(&self) {
        self.config.load_all(&CONFIG_KEYS).await;
    }

    /// Startup sequence: config, roster, providers and API key. Each step
    /// logs its own failure and the rest still run.
    pub async fn initialize(&self) {
        self.load_initial_config().await;

        if let Err(e) = self.fetch_users().await {
            warn!(error = %e, "initial roster fetch failed");
        }
        if let Err(e) = self.fetch_providers().await {
            warn!(error = %e, "initial provider fetch failed");
        }
        if let Err(e) = self.load_api_key().await {
            warn!(error = %e, "initial api key load failed");
        }
        info!(users = self.users().len(), "client initialised");
    }
}

#[cfg(test)]
mod tests {
    use scribe_gateway::MemoryBackend;
    use scribe_shared::constants::KEY_THEME_MODE;
    use scribe_shared::{ModelType, ThemeMode};

    use super::*;

    #[tokio::test]
    async fn initialize_loads_roster_providers_and_config() {
        let backend = Arc::new(MemoryBackend::new());
        backend.bind_user("alice", "111");
        backend.insert_provider(AiProvider::new("A", "k").with_model("gpt-x", ModelType::Text));
        backend.set_config(KEY_THEME_MODE, "dark");

        let store = Store::new(backend.clone());
        store.initialize().await;

        assert_eq!(store.users().len(), 1);
        assert_eq!(store.providers().len(), 1);
        assert_eq!(store.theme_mode(), ThemeMode::Dark);
        assert!(store.current_user().is_none());
    }

    #[tokio::test]
    async fn initialize_survives_backend_failures() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail(scribe_gateway::Operation::GetUsers, "backend down");

        let store = Store::new(backend);
        store.initialize().await;
        assert!(store.users().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let store = Store::new(Arc::new(MemoryBackend::new()));
        let other = store.clone();
        store.lock().api_key = Some("k".into());
        assert_eq!(other.lock().api_key.as_deref(), Some("k"));
    }

    #[test]
    fn local_store_attaches() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        let store = Store::new(Arc::new(MemoryBackend::new())).with_local_store(db);
        assert!(store.lock().local.is_some());
    }
}
