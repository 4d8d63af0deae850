//! Write-through cache over the backend's string key/value config.
//!
//! Reads are served from memory. A read of a key that has never been loaded
//! falls back to the key's default and schedules a load. A write updates
//! memory at once, notifies observers, and persists in the background; the
//! returned [`PendingWrite`] may be awaited for the outcome or dropped.
//!
//! A failed persist is logged and the key is reported as unsaved until a
//! later write of the same key succeeds. The in-memory value is never
//! reverted.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use scribe_gateway::{GatewayError, Remote};
use scribe_shared::constants::*;
use scribe_shared::{ImageSize, ModelSelection, Prompt, ThemeMode};

use crate::error::{ClientError, Result};
use crate::events::{EventBus, StoreEvent};

/// A value that can live in the config store as a string.
pub trait ConfigValue: Clone + Send + 'static {
    /// The string to persist, or `None` when nothing should be written.
    fn encode(&self) -> Option<String>;

    /// Parse a stored string. `None` means the stored text is unusable and
    /// the key's default applies.
    fn decode(raw: &str) -> Option<Self>;
}

/// A typed config key together with the default its consumers use when the
/// key is absent.
pub struct ConfigKey<T> {
    name: &'static str,
    default: fn() -> T,
    _value: PhantomData<fn() -> T>,
}

impl<T> ConfigKey<T> {
    pub const fn new(name: &'static str, default: fn() -> T) -> Self {
        Self {
            name,
            default,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Remote,
    Local,
}

#[derive(Debug, Clone)]
struct Slot {
    raw: Option<String>,
    origin: Origin,
}

#[derive(Debug, Default)]
struct Cache {
    slots: HashMap<&'static str, Slot>,
    requested: HashSet<&'static str>,
    write_seq: HashMap<&'static str, u64>,
    unsaved: HashSet<&'static str>,
}

#[derive(Clone)]
pub struct ConfigStore {
    remote: Remote,
    cache: Arc<Mutex<Cache>>,
    events: EventBus,
}

impl ConfigStore {
    pub fn new(remote: Remote, events: EventBus) -> Self {
        Self {
            remote,
            cache: Arc::new(Mutex::new(Cache::default())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current value of `key`: the cached value, or the default while the
    /// key is absent. The first read of a never-loaded key schedules a load.
    pub fn get<T: ConfigValue>(&self, key: &ConfigKey<T>) -> T {
        let (raw, needs_load) = {
            let mut cache = self.lock();
            let raw = cache.slots.get(key.name).and_then(|s| s.raw.clone());
            let needs_load =
                !cache.slots.contains_key(key.name) && cache.requested.insert(key.name);
            (raw, needs_load)
        };

        if needs_load {
            self.spawn_load(key.name);
        }

        match raw {
            Some(raw) => T::decode(&raw).unwrap_or_else(|| {
                warn!(key = key.name, value = %raw, "unusable config value, using default");
                key.default_value()
            }),
            None => key.default_value(),
        }
    }

    /// Raw cached string for `name`, if any.
    pub fn raw(&self, name: &str) -> Option<String> {
        self.lock().slots.get(name).and_then(|s| s.raw.clone())
    }

    fn spawn_load(&self, name: &'static str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(key = name, "no runtime, deferring config load");
            self.lock().requested.remove(name);
            return;
        };
        let this = self.clone();
        handle.spawn(async move {
            if let Err(e) = this.load(name).await {
                warn!(key = name, error = %e, "config load failed");
            }
        });
    }

    /// Fetch `name` from the backend. A value set locally in the meantime
    /// wins over the fetched one.
    pub async fn load(&self, name: &'static str) -> std::result::Result<(), GatewayError> {
        self.lock().requested.insert(name);

        let value = self.remote.get_config_value(name).await?;

        let changed = {
            let mut cache = self.lock();
            match (cache.slots.get(name).map(|s| s.origin), value) {
                (Some(Origin::Local), _) => {
                    debug!(key = name, "keeping locally set value over loaded one");
                    false
                }
                (_, Some(raw)) => {
                    cache.slots.insert(
                        name,
                        Slot {
                            raw: Some(raw),
                            origin: Origin::Remote,
                        },
                    );
                    true
                }
                (_, None) => false,
            }
        };

        if changed {
            self.events.emit(StoreEvent::ConfigChanged { key: name });
        }
        Ok(())
    }

    /// Load every key in `names` concurrently. Failures are logged and the
    /// affected keys keep their defaults.
    pub async fn load_all(&self, names: &[&'static str]) {
        let results = join_all(names.iter().map(|name| self.load(*name))).await;
        for (name, result) in names.iter().zip(results) {
            if let Err(e) = result {
                warn!(key = *name, error = %e, "failed to load config key");
            }
        }
    }

    /// Set `key` to `value`. Memory and observers see the change before this
    /// returns; persistence runs in the background.
    pub fn set<T: ConfigValue>(&self, key: &ConfigKey<T>, value: &T) -> PendingWrite {
        let raw = value.encode();

        let seq = {
            let mut cache = self.lock();
            cache.slots.insert(
                key.name,
                Slot {
                    raw: raw.clone(),
                    origin: Origin::Local,
                },
            );
            cache.requested.insert(key.name);
            let seq = cache.write_seq.entry(key.name).or_insert(0);
            *seq += 1;
            *seq
        };

        self.events.emit(StoreEvent::ConfigChanged { key: key.name });

        match raw {
            Some(raw) => self.persist(key.name, raw, seq),
            None => PendingWrite::local_only(),
        }
    }

    fn persist(&self, name: &'static str, raw: String, seq: u64) -> PendingWrite {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(key = name, "no runtime, config change kept in memory only");
            self.lock().unsaved.insert(name);
            return PendingWrite::unavailable();
        };

        let this = self.clone();
        let task = handle.spawn(async move {
            let result = this.remote.save_config(name, &raw).await;
            this.settle(name, seq, &result);
            result
        });

        PendingWrite {
            inner: Pending::Spawned(task),
        }
    }

    // only the latest write of a key decides whether it is unsaved
    fn settle(&self, name: &'static str, seq: u64, result: &std::result::Result<(), GatewayError>) {
        let mut cache = self.lock();
        if cache.write_seq.get(name).copied() != Some(seq) {
            debug!(key = name, seq, "superseded config write settled");
            return;
        }
        match result {
            Ok(()) => {
                cache.unsaved.remove(name);
            }
            Err(e) => {
                warn!(key = name, error = %e, "config persist failed, keeping in-memory value");
                cache.unsaved.insert(name);
            }
        }
    }

    /// Keys whose latest write has not reached the backend.
    pub fn unsaved_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.lock().unsaved.iter().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.lock().unsaved.is_empty()
    }
}

#[derive(Debug)]
enum Pending {
    LocalOnly,
    Unavailable,
    Spawned(JoinHandle<std::result::Result<(), GatewayError>>),
}

/// Outcome handle of a config write.
#[derive(Debug)]
#[must_use = "await `settled()` to observe persistence, or drop to fire and forget"]
pub struct PendingWrite {
    inner: Pending,
}

impl PendingWrite {
    fn local_only() -> Self {
        Self {
            inner: Pending::LocalOnly,
        }
    }

    fn unavailable() -> Self {
        Self {
            inner: Pending::Unavailable,
        }
    }

    /// True when the write changed memory only and nothing was sent.
    pub fn is_local_only(&self) -> bool {
        matches!(self.inner, Pending::LocalOnly)
    }

    /// Wait for the backend to acknowledge or reject the write.
    pub async fn settled(self) -> Result<()> {
        match self.inner {
            Pending::LocalOnly => Ok(()),
            Pending::Unavailable => Err(ClientError::Remote(GatewayError::Transport(
                "no async runtime to persist config".to_string(),
            ))),
            Pending::Spawned(task) => match task.await {
                Ok(result) => result.map_err(ClientError::from),
                Err(e) => Err(ClientError::Remote(GatewayError::Transport(e.to_string()))),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Value encodings
// ---------------------------------------------------------------------------

impl ConfigValue for String {
    fn encode(&self) -> Option<String> {
        Some(self.clone())
    }

    fn decode(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl ConfigValue for bool {
    fn encode(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn decode(raw: &str) -> Option<Self> {
        match raw {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

impl ConfigValue for ThemeMode {
    fn encode(&self) -> Option<String> {
        Some(self.as_str().to_string())
    }

    fn decode(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl ConfigValue for ImageSize {
    fn encode(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn decode(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

// clearing a selection is not written; the config path has no delete
impl ConfigValue for Option<ModelSelection> {
    fn encode(&self) -> Option<String> {
        self.as_ref().and_then(|s| serde_json::to_string(s).ok())
    }

    fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str::<ModelSelection>(raw).ok().map(Some)
    }
}

impl ConfigValue for Vec<Prompt> {
    fn encode(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

// ---------------------------------------------------------------------------
// Known keys
// ---------------------------------------------------------------------------

pub mod keys {
    use super::*;

    fn no_selection() -> Option<ModelSelection> {
        None
    }

    fn headless_default() -> bool {
        true
    }

    pub const SELECTED_TEXT_MODEL: ConfigKey<Option<ModelSelection>> =
        ConfigKey::new(KEY_SELECTED_TEXT_MODEL, no_selection);
    pub const SELECTED_IMAGE_MODEL: ConfigKey<Option<ModelSelection>> =
        ConfigKey::new(KEY_SELECTED_IMAGE_MODEL, no_selection);
    pub const ANALYTICS_AI_MODEL: ConfigKey<Option<ModelSelection>> =
        ConfigKey::new(KEY_ANALYTICS_AI_MODEL, no_selection);
    pub const IMAGE_SIZE: ConfigKey<ImageSize> = ConfigKey::new(KEY_IMAGE_SIZE, ImageSize::default);
    pub const THEME_MODE: ConfigKey<ThemeMode> = ConfigKey::new(KEY_THEME_MODE, ThemeMode::default);
    pub const CUSTOM_PROMPTS: ConfigKey<Vec<Prompt>> = ConfigKey::new(KEY_CUSTOM_PROMPTS, Vec::new);
    pub const HEADLESS_MODE: ConfigKey<bool> = ConfigKey::new(KEY_HEADLESS_MODE, headless_default);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scribe_gateway::{MemoryBackend, Operation};

    use super::*;

    fn store() -> (Arc<MemoryBackend>, ConfigStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = ConfigStore::new(Remote::new(backend.clone()), EventBus::new());
        (backend, store)
    }

    #[tokio::test]
    async fn set_is_visible_before_persist_completes() {
        let (backend, store) = store();
        backend.delay_next(Operation::SaveConfig, std::time::Duration::from_millis(50));

        let pending = store.set(&keys::THEME_MODE, &ThemeMode::Dark);
        assert_eq!(store.get(&keys::THEME_MODE), ThemeMode::Dark);

        pending.settled().await.unwrap();
        assert_eq!(backend.config_value(KEY_THEME_MODE).as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn failed_persist_keeps_value_and_marks_unsaved() {
        let (backend, store) = store();
        backend.fail_once(Operation::SaveConfig, "disk full");

        let err = store
            .set(&keys::HEADLESS_MODE, &false)
            .settled()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(!store.get(&keys::HEADLESS_MODE));
        assert_eq!(store.unsaved_keys(), vec![KEY_HEADLESS_MODE]);

        store.set(&keys::HEADLESS_MODE, &false).settled().await.unwrap();
        assert!(!store.has_unsaved_changes());
    }

    #[tokio::test]
    async fn absent_keys_use_consumer_defaults() {
        let (_backend, store) = store();
        store.load_all(&CONFIG_KEYS).await;

        assert!(store.get(&keys::HEADLESS_MODE));
        assert_eq!(store.get(&keys::IMAGE_SIZE).to_string(), "1024x1024");
        assert_eq!(store.get(&keys::SELECTED_TEXT_MODEL), None);
        assert!(store.get(&keys::CUSTOM_PROMPTS).is_empty());
    }

    #[tokio::test]
    async fn load_does_not_clobber_local_write() {
        let (backend, store) = store();
        backend.set_config(KEY_THEME_MODE, "light");
        backend.delay_next(Operation::GetConfigValue, std::time::Duration::from_millis(50));

        let load = {
            let store = store.clone();
            tokio::spawn(async move { store.load(KEY_THEME_MODE).await })
        };
        let _ = store.set(&keys::THEME_MODE, &ThemeMode::Dark);
        load.await.unwrap().unwrap();

        assert_eq!(store.get(&keys::THEME_MODE), ThemeMode::Dark);
    }

    #[tokio::test]
    async fn clearing_selection_writes_nothing() {
        let (backend, store) = store();
        let pending = store.set(&keys::SELECTED_TEXT_MODEL, &None);
        assert!(pending.is_local_only());
        pending.settled().await.unwrap();
        assert_eq!(backend.calls(Operation::SaveConfig), 0);
    }

    #[test]
    fn corrupt_values_fall_back_to_default() {
        assert_eq!(<Option<ModelSelection>>::decode("{not json"), None);
        assert_eq!(bool::decode("maybe"), None);
        assert_eq!(ImageSize::decode("1024x1024").unwrap().to_string(), "1024x1024");
    }
}
