//! Change notification for views observing the store.
//!
//! Every synchronous mutation publishes a [`StoreEvent`] before returning.
//! Views subscribe through [`Store::subscribe`](crate::Store::subscribe) and
//! re-read whatever state the event names.

use serde::Serialize;
use tokio::sync::broadcast;

use scribe_shared::{ServiceKind, ServiceStatus, User};

use crate::providers::SelectionSlot;
use crate::session::AccountStatus;

pub const EVENT_SESSION_CHANGED: &str = "session-changed";
pub const EVENT_ROSTER_UPDATED: &str = "roster-updated";
pub const EVENT_ACCOUNT_STATUS_CHANGED: &str = "account-status-changed";
pub const EVENT_CURRENT_POST_CHANGED: &str = "current-post-changed";
pub const EVENT_DRAFTS_UPDATED: &str = "drafts-updated";
pub const EVENT_PROVIDERS_UPDATED: &str = "providers-updated";
pub const EVENT_SELECTION_CHANGED: &str = "selection-changed";
pub const EVENT_CONFIG_CHANGED: &str = "config-changed";
pub const EVENT_SERVICE_STATUS_CHANGED: &str = "service-status-changed";
pub const EVENT_TRENDS_UPDATED: &str = "trends-updated";

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum StoreEvent {
    SessionChanged { user: Option<User> },
    RosterUpdated { count: usize },
    AccountStatusChanged { phone: String, status: AccountStatus },
    CurrentPostChanged,
    DraftsUpdated { user_id: i64, count: usize },
    ProvidersUpdated { count: usize },
    SelectionChanged { slot: SelectionSlot },
    ConfigChanged { key: &'static str },
    ServiceStatusChanged { kind: ServiceKind, status: ServiceStatus },
    TrendsUpdated { loading: bool },
}

impl StoreEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionChanged { .. } => EVENT_SESSION_CHANGED,
            Self::RosterUpdated { .. } => EVENT_ROSTER_UPDATED,
            Self::AccountStatusChanged { .. } => EVENT_ACCOUNT_STATUS_CHANGED,
            Self::CurrentPostChanged => EVENT_CURRENT_POST_CHANGED,
            Self::DraftsUpdated { .. } => EVENT_DRAFTS_UPDATED,
            Self::ProvidersUpdated { .. } => EVENT_PROVIDERS_UPDATED,
            Self::SelectionChanged { .. } => EVENT_SELECTION_CHANGED,
            Self::ConfigChanged { .. } => EVENT_CONFIG_CHANGED,
            Self::ServiceStatusChanged { .. } => EVENT_SERVICE_STATUS_CHANGED,
            Self::TrendsUpdated { .. } => EVENT_TRENDS_UPDATED,
        }
    }
}

/// Fan-out of [`StoreEvent`]s to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: StoreEvent) {
        // no subscribers is the normal state before any view mounts
        if self.tx.send(event).is_err() {
            tracing::trace!("event dropped, no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(StoreEvent::CurrentPostChanged);
        bus.emit(StoreEvent::RosterUpdated { count: 2 });

        assert_eq!(rx.try_recv().unwrap().name(), EVENT_CURRENT_POST_CHANGED);
        assert_eq!(rx.try_recv().unwrap().name(), EVENT_ROSTER_UPDATED);
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(StoreEvent::ConfigChanged { key: "theme_mode" }).unwrap();
        assert_eq!(json["event"], "config-changed");
        assert_eq!(json["key"], "theme_mode");
    }
}
