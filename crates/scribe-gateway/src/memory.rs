//! In-process backend honouring the full operation contract.
//!
//! Keeps the roster, drafts, config, provider registry and service state in
//! memory. It also lets callers inject failures and per-call latency, which
//! is how the client's race and error paths are exercised without a real
//! backend.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use scribe_shared::constants::{
    ALREADY_LOGGED_IN_PREFIX, DEFAULT_API_PORT, DEFAULT_MCP_PORT, KEY_ANALYTICS_AI_MODEL,
};
use scribe_shared::{
    AiProvider, ModelSelection, ModelTestResult, ModelType, Post, ServiceKind, ServiceStatus,
    TrendData, User, UserAnalytics,
};

use crate::error::{GatewayError, Result};
use crate::gateway::Gateway;
use crate::ops::*;

/// Code accepted by `submit_verification_code` unless changed.
pub const DEFAULT_VERIFICATION_CODE: &str = "123456";

const API_KEY_CONFIG: &str = "api_key";

#[derive(Debug, Clone)]
struct Account {
    user: User,
    credential_valid: bool,
}

#[derive(Debug, Clone)]
struct StoredPost {
    user_id: i64,
    post: Post,
}

#[derive(Debug, Clone)]
struct Failure {
    message: String,
    once: bool,
}

#[derive(Debug, Default)]
struct BackendState {
    accounts: Vec<Account>,
    next_user_id: i64,
    pending_logins: HashSet<String>,
    verification_code: String,

    posts: Vec<StoredPost>,
    next_post_id: i64,

    config: HashMap<String, String>,

    providers: Vec<AiProvider>,
    next_provider_id: i64,
    next_model_id: i64,
    probe_reply: String,

    mcp: Option<ServiceStatus>,
    api: Option<ServiceStatus>,

    trends: TrendData,
    analytics: HashMap<String, UserAnalytics>,
    images: Vec<String>,
    published: Vec<PublishPostArgs>,

    failures: HashMap<Operation, Failure>,
    delays: HashMap<Operation, VecDeque<Duration>>,
    calls: HashMap<Operation, usize>,
}

/// An in-memory [`Gateway`].
pub struct MemoryBackend {
    state: Mutex<BackendState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let state = BackendState {
            next_user_id: 1,
            next_post_id: 1,
            next_provider_id: 1,
            next_model_id: 1,
            verification_code: DEFAULT_VERIFICATION_CODE.to_string(),
            probe_reply: "connection ok".to_string(),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- seeding --

    /// Bind an account directly, skipping the login flow.
    pub fn bind_user(&self, nickname: &str, phone: &str) -> User {
        let mut state = self.lock();
        state.upsert_account(nickname, phone, None)
    }

    /// Add a provider as if saved earlier; returns its assigned id.
    pub fn insert_provider(&self, provider: AiProvider) -> i64 {
        let mut state = self.lock();
        state.store_provider(provider)
    }

    pub fn set_trends(&self, trends: TrendData) {
        self.lock().trends = trends;
    }

    /// Figures returned by `fetch_user_analytics` for `phone`.
    pub fn set_user_analytics(&self, phone: &str, analytics: UserAnalytics) {
        self.lock().analytics.insert(phone.to_string(), analytics);
    }

    pub fn set_config(&self, key: &str, value: &str) {
        self.lock().config.insert(key.to_string(), value.to_string());
    }

    // -- remote-side mutations --

    pub fn set_credential_valid(&self, phone: &str, valid: bool) {
        if let Some(account) = self.lock().account_mut(phone) {
            account.credential_valid = valid;
        }
    }

    pub fn rename_user(&self, phone: &str, nickname: &str) {
        if let Some(account) = self.lock().account_mut(phone) {
            account.user.nickname = nickname.to_string();
        }
    }

    pub fn set_verification_code(&self, code: &str) {
        self.lock().verification_code = code.to_string();
    }

    pub fn set_probe_reply(&self, reply: &str) {
        self.lock().probe_reply = reply.to_string();
    }

    /// Change service state behind the client's back.
    pub fn set_service_status(&self, kind: ServiceKind, status: ServiceStatus) {
        let mut state = self.lock();
        match kind {
            ServiceKind::Mcp => state.mcp = Some(status),
            ServiceKind::Api => state.api = Some(status),
        }
    }

    // -- fault injection --

    /// Reject every call to `operation` with `message` until cleared.
    pub fn fail(&self, operation: Operation, message: &str) {
        self.lock().failures.insert(
            operation,
            Failure {
                message: message.to_string(),
                once: false,
            },
        );
    }

    /// Reject only the next call to `operation`.
    pub fn fail_once(&self, operation: Operation, message: &str) {
        self.lock().failures.insert(
            operation,
            Failure {
                message: message.to_string(),
                once: true,
            },
        );
    }

    pub fn clear_failure(&self, operation: Operation) {
        self.lock().failures.remove(&operation);
    }

    /// Delay the reply of the next call to `operation`. The reply is computed
    /// when the call arrives, so a delayed reply reflects earlier state.
    pub fn delay_next(&self, operation: Operation, delay: Duration) {
        self.lock()
            .delays
            .entry(operation)
            .or_default()
            .push_back(delay);
    }

    // -- inspection --

    pub fn calls(&self, operation: Operation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn config_value(&self, key: &str) -> Option<String> {
        self.lock().config.get(key).cloned()
    }

    pub fn posts_for(&self, user_id: i64) -> Vec<Post> {
        self.lock().posts_of(user_id)
    }

    pub fn published(&self) -> Vec<PublishPostArgs> {
        self.lock().published.clone()
    }

    fn dispatch(&self, operation: Operation, args: Value) -> (Result<Value>, Option<Duration>) {
        let mut state = self.lock();
        *state.calls.entry(operation).or_default() += 1;
        let delay = state
            .delays
            .get_mut(&operation)
            .and_then(|queue| queue.pop_front());

        if let Some(failure) = state.failures.get(&operation).cloned() {
            if failure.once {
                state.failures.remove(&operation);
            }
            return (Err(GatewayError::Rejected(failure.message)), delay);
        }

        (state.handle(operation, args), delay)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for MemoryBackend {
    async fn invoke(&self, operation: Operation, args: Value) -> Result<Value> {
        let (reply, delay) = self.dispatch(operation, args);
        if let Some(delay) = delay {
            debug!(op = %operation, ?delay, "delaying reply");
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

// ---------------------------------------------------------------------------
// Operation handlers
// ---------------------------------------------------------------------------

fn parse<A: DeserializeOwned>(operation: Operation, args: Value) -> Result<A> {
    serde_json::from_value(args).map_err(|e| GatewayError::Decode {
        operation: operation.as_str(),
        message: e.to_string(),
    })
}

/// Per-model checks fail softly: the reply carries the failure.
fn check_model(args: &ModelTestArgs, response: String) -> ModelTestResult {
    let error = if args.provider.api_key.trim().is_empty() {
        Some("API key is missing".to_string())
    } else if args.provider.model(&args.model_name).is_none() {
        Some(format!("Model {} is not offered by this provider", args.model_name))
    } else {
        None
    };
    ModelTestResult {
        model_name: args.model_name.clone(),
        success: error.is_none(),
        response: error.is_none().then_some(response),
        error_message: error,
    }
}

fn reply<T: Serialize>(operation: Operation, value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| GatewayError::Decode {
        operation: operation.as_str(),
        message: e.to_string(),
    })
}

impl BackendState {
    fn handle(&mut self, op: Operation, args: Value) -> Result<Value> {
        match op {
            Operation::GetUsers => {
                let users: Vec<User> = self.accounts.iter().map(|a| a.user.clone()).collect();
                reply(op, users)
            }
            Operation::ValidateLoginStatus => {
                let args: PhoneArgs = parse(op, args)?;
                let user = self.validate(&args.phone)?;
                reply(op, user)
            }
            Operation::LogoutUser => {
                let args: PhoneArgs = parse(op, args)?;
                if let Some(pos) = self.accounts.iter().position(|a| a.user.phone == args.phone) {
                    let removed = self.accounts.remove(pos);
                    self.posts.retain(|p| p.user_id != removed.user.id);
                }
                self.pending_logins.remove(&args.phone);
                Ok(Value::Null)
            }
            Operation::StartLoginProcess => {
                let args: PhoneArgs = parse(op, args)?;
                if let Ok(user) = self.validate(&args.phone) {
                    let json = serde_json::to_string(&user).unwrap_or_default();
                    return reply(op, format!("{ALREADY_LOGGED_IN_PREFIX}{json}"));
                }
                self.pending_logins.insert(args.phone);
                reply(op, "Verification code sent")
            }
            Operation::SubmitVerificationCode => {
                let args: VerificationArgs = parse(op, args)?;
                if !self.pending_logins.contains(&args.phone) {
                    return Err(GatewayError::rejected("No active login session found"));
                }
                if args.code != self.verification_code {
                    return Err(GatewayError::rejected("Invalid verification code"));
                }
                self.pending_logins.remove(&args.phone);
                let nickname = default_nickname(&args.phone);
                let user = self.upsert_account(&nickname, &args.phone, None);
                reply(op, user)
            }
            Operation::GetPosts => {
                let args: UserIdArgs = parse(op, args)?;
                reply(op, self.posts_of(args.user_id))
            }
            Operation::SavePost => {
                let args: SavePostArgs = parse(op, args)?;
                reply(op, self.save_post(args))
            }
            Operation::DeletePost => {
                let args: PostIdArgs = parse(op, args)?;
                self.posts.retain(|p| p.post.id != Some(args.post_id));
                Ok(Value::Null)
            }
            Operation::GetConfigValue => {
                let args: ConfigKeyArgs = parse(op, args)?;
                reply(op, self.config.get(&args.key))
            }
            Operation::SaveConfig => {
                let args: SaveConfigArgs = parse(op, args)?;
                self.config.insert(args.key, args.value);
                Ok(Value::Null)
            }
            Operation::GetAiProviders => reply(op, &self.providers),
            Operation::SaveAiProvider => {
                let args: ProviderArgs = parse(op, args)?;
                if args.provider.name.trim().is_empty() {
                    return Err(GatewayError::rejected("Provider name is required"));
                }
                if let Some(id) = args.provider.id {
                    if !self.providers.iter().any(|p| p.id == Some(id)) {
                        return Err(GatewayError::Rejected(format!("Provider {id} not found")));
                    }
                }
                let id = self.store_provider(args.provider);
                reply(op, id)
            }
            Operation::DeleteAiProvider => {
                let args: ProviderIdArgs = parse(op, args)?;
                self.providers.retain(|p| p.id != Some(args.id));
                Ok(Value::Null)
            }
            Operation::TestAiProvider => {
                let args: ProviderArgs = parse(op, args)?;
                if !args.provider.has_model_of_type(ModelType::Text) {
                    return Err(GatewayError::rejected(
                        "No text model configured; add a text model first",
                    ));
                }
                reply(op, &self.probe_reply)
            }
            Operation::TestModelChat => {
                let args: ModelTestArgs = parse(op, args)?;
                let response = format!("[{}] test ok", args.model_name);
                reply(op, check_model(&args, response))
            }
            Operation::TestModelStructuredOutput => {
                let args: ModelTestArgs = parse(op, args)?;
                reply(op, check_model(&args, "name=test, age=25".to_string()))
            }
            Operation::GenerateAiText => {
                let args: GenerateTextArgs = parse(op, args)?;
                reply(op, format!("[{}] {}", args.model_name, args.prompt))
            }
            Operation::PolishTitleWithOptions => {
                let args: PolishTitleArgs = parse(op, args)?;
                let options: Vec<String> =
                    (1..=5).map(|i| format!("{} #{i}", args.title)).collect();
                reply(op, options)
            }
            Operation::GenerateAiImage => {
                let args: GenerateImageArgs = parse(op, args)?;
                let size = args.size.unwrap_or_else(|| "1024x1024".to_string());
                reply(op, format!("images/{}-{size}.png", args.model_name))
            }
            Operation::AnalyzeLocalImage => {
                let args: AnalyzeImageArgs = parse(op, args)?;
                reply(op, format!("[{}] analysis of {}", args.model_name, args.image_path))
            }
            Operation::FetchUserAnalytics => {
                let args: PhoneArgs = parse(op, args)?;
                self.validate(&args.phone)?;
                self.analytics_provider()?;
                let analytics = self.analytics.get(&args.phone).cloned().unwrap_or_default();
                reply(op, analytics)
            }
            Operation::GetMcpStatus => reply(op, self.status(ServiceKind::Mcp)),
            Operation::StartMcpServer => {
                let args: StartMcpArgs = parse(op, args)?;
                if self.status(ServiceKind::Mcp).is_running {
                    return Err(GatewayError::rejected("MCP server is already running"));
                }
                let token = args
                    .token
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                self.mcp = Some(ServiceStatus {
                    is_running: true,
                    port: args.port,
                    token: Some(token),
                });
                Ok(Value::Null)
            }
            Operation::StopMcpServer => {
                self.mcp = Some(ServiceStatus::stopped(0));
                Ok(Value::Null)
            }
            Operation::GetApiStatus => reply(op, self.status(ServiceKind::Api)),
            Operation::StartApiServer => {
                let args: PortArgs = parse(op, args)?;
                if self.status(ServiceKind::Api).is_running {
                    return Err(GatewayError::rejected("API server is already running"));
                }
                self.config
                    .entry(API_KEY_CONFIG.to_string())
                    .or_insert_with(|| uuid::Uuid::new_v4().to_string());
                self.api = Some(ServiceStatus {
                    is_running: true,
                    port: args.port,
                    token: None,
                });
                Ok(Value::Null)
            }
            Operation::StopApiServer => {
                if !self.status(ServiceKind::Api).is_running {
                    return Err(GatewayError::rejected("API server is not running"));
                }
                self.api = None;
                Ok(Value::Null)
            }
            Operation::GetApiKey => reply(op, self.config.get(API_KEY_CONFIG)),
            Operation::SaveApiKey => {
                let args: ApiKeyArgs = parse(op, args)?;
                self.config.insert(API_KEY_CONFIG.to_string(), args.key);
                Ok(Value::Null)
            }
            Operation::GenerateApiKey => {
                let key = uuid::Uuid::new_v4().to_string();
                self.config.insert(API_KEY_CONFIG.to_string(), key.clone());
                reply(op, key)
            }
            Operation::GetTrends => Ok(json!({ "code": 200, "data": self.trends })),
            Operation::ListLocalImages => reply(op, &self.images),
            Operation::ImportLocalImages => {
                let args: ImportImagesArgs = parse(op, args)?;
                for path in args.paths {
                    let name = path.rsplit(['/', '\\']).next().unwrap_or(&path).to_string();
                    let stored = format!("images/{name}");
                    if !self.images.contains(&stored) {
                        self.images.push(stored);
                    }
                }
                Ok(Value::Null)
            }
            Operation::DeleteLocalImage => {
                let args: ImagePathArgs = parse(op, args)?;
                self.images.retain(|p| *p != args.path);
                Ok(Value::Null)
            }
            Operation::PublishPost => {
                let args: PublishPostArgs = parse(op, args)?;
                self.validate(&args.phone)?;
                self.published.push(args);
                Ok(Value::Null)
            }
        }
    }

    /// The provider named by the stored analytics selection.
    fn analytics_provider(&self) -> Result<&AiProvider> {
        let raw = self
            .config
            .get(KEY_ANALYTICS_AI_MODEL)
            .ok_or_else(|| GatewayError::rejected("Analytics model is not configured"))?;
        let selection: ModelSelection = serde_json::from_str(raw)
            .map_err(|e| GatewayError::Rejected(format!("Invalid analytics model config: {e}")))?;
        self.providers
            .iter()
            .find(|p| p.id == Some(selection.provider_id))
            .ok_or_else(|| GatewayError::rejected("Configured analytics provider not found"))
    }

    fn account_mut(&mut self, phone: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.user.phone == phone)
    }

    fn validate(&self, phone: &str) -> Result<User> {
        let account = self
            .accounts
            .iter()
            .find(|a| a.user.phone == phone)
            .ok_or_else(|| GatewayError::Rejected(format!("Account {phone} is not bound")))?;
        if !account.credential_valid {
            return Err(GatewayError::Rejected(format!(
                "Login for {phone} has expired"
            )));
        }
        Ok(account.user.clone())
    }

    fn upsert_account(&mut self, nickname: &str, phone: &str, avatar: Option<String>) -> User {
        if let Some(account) = self.account_mut(phone) {
            account.credential_valid = true;
            return account.user.clone();
        }
        let user = User {
            id: self.next_user_id,
            nickname: nickname.to_string(),
            phone: phone.to_string(),
            avatar,
            created_at: Some(now()),
        };
        self.next_user_id += 1;
        self.accounts.push(Account {
            user: user.clone(),
            credential_valid: true,
        });
        user
    }

    fn posts_of(&self, user_id: i64) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.post.clone())
            .collect();
        // newest first
        posts.sort_by(|a, b| b.id.cmp(&a.id));
        posts
    }

    fn save_post(&mut self, args: SavePostArgs) -> i64 {
        if let Some(post_id) = args.post_id {
            if let Some(stored) = self
                .posts
                .iter_mut()
                .find(|p| p.user_id == args.user_id && p.post.id == Some(post_id))
            {
                stored.post.title = args.title;
                stored.post.content = args.content;
                stored.post.images = args.images;
                stored.post.cover_image = args.cover_image;
                return post_id;
            }
        }

        let id = self.next_post_id;
        self.next_post_id += 1;
        self.posts.push(StoredPost {
            user_id: args.user_id,
            post: Post {
                id: Some(id),
                title: args.title,
                content: args.content,
                images: args.images,
                cover_image: args.cover_image,
                status: Some("draft".to_string()),
                created_at: Some(now()),
            },
        });
        id
    }

    fn store_provider(&mut self, mut provider: AiProvider) -> i64 {
        for model in &mut provider.models {
            if model.id.is_none() {
                model.id = Some(self.next_model_id);
                self.next_model_id += 1;
            }
        }

        match provider.id {
            Some(id) => {
                if let Some(existing) = self.providers.iter_mut().find(|p| p.id == Some(id)) {
                    *existing = provider;
                } else {
                    self.next_provider_id = self.next_provider_id.max(id + 1);
                    self.providers.push(provider);
                }
                id
            }
            None => {
                let id = self.next_provider_id;
                self.next_provider_id += 1;
                provider.id = Some(id);
                self.providers.push(provider);
                id
            }
        }
    }

    fn status(&self, kind: ServiceKind) -> ServiceStatus {
        let current = match kind {
            ServiceKind::Mcp => &self.mcp,
            ServiceKind::Api => &self.api,
        };
        current.clone().unwrap_or_else(|| match kind {
            ServiceKind::Mcp => ServiceStatus::stopped(DEFAULT_MCP_PORT),
            ServiceKind::Api => ServiceStatus::stopped(DEFAULT_API_PORT),
        })
    }
}

fn default_nickname(phone: &str) -> String {
    let tail: String = phone
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("user-{tail}")
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
