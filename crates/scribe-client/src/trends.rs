use tracing::{info, warn};

use scribe_shared::constants::TRENDS_OK_CODE;
use scribe_shared::TrendData;

use crate::error::Result;
use crate::events::StoreEvent;
use crate::state::Store;

impl Store {
    pub fn trends(&self) -> TrendData {
        self.lock().trends.clone()
    }

    pub fn trends_loading(&self) -> bool {
        self.lock().trends_loading
    }

    fn set_trends_loading(&self, loading: bool) {
        self.lock().trends_loading = loading;
        self.emit(StoreEvent::TrendsUpdated { loading });
    }

    /// Fetch trend lists. Data is only replaced when the envelope reports
    /// success; otherwise the previous lists stay.
    pub async fn fetch_trends(&self) -> Result<()> {
        self.set_trends_loading(true);
        let result = self.remote().get_trends().await;

        if let Ok(envelope) = &result {
            match (&envelope.data, envelope.code) {
                (Some(data), TRENDS_OK_CODE) => {
                    info!(sources = data.len(), "trends fetched");
                    self.lock().trends = data.clone();
                }
                (_, code) => warn!(code, "trends fetch returned no usable data"),
            }
        }

        self.set_trends_loading(false);
        result.map(|_| ()).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use scribe_gateway::{Gateway, GatewayError, MemoryBackend, Operation};
    use scribe_shared::TrendItem;

    use super::*;

    fn item(title: &str) -> TrendItem {
        TrendItem {
            id: None,
            index: 1,
            url: "https://example.com".into(),
            title: title.into(),
            img: None,
            desc: None,
            user: None,
            user_id: None,
            user_face: None,
            reason: None,
            sorting: None,
            time: None,
        }
    }

    #[tokio::test]
    async fn successful_fetch_replaces_data() {
        let backend = Arc::new(MemoryBackend::new());
        let mut data = TrendData::new();
        data.insert("weibo".into(), vec![item("first")]);
        backend.set_trends(data.clone());

        let store = Store::new(backend);
        let mut rx = store.subscribe();
        store.fetch_trends().await.unwrap();

        assert_eq!(store.trends(), data);
        assert!(!store.trends_loading());
        let loading: Vec<bool> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                StoreEvent::TrendsUpdated { loading } => Some(loading),
                _ => None,
            })
            .collect();
        assert_eq!(loading, vec![true, false]);
    }

    struct FailingTrends;

    #[async_trait]
    impl Gateway for FailingTrends {
        async fn invoke(
            &self,
            _operation: Operation,
            _args: Value,
        ) -> scribe_gateway::error::Result<Value> {
            Ok(json!({ "code": 500, "data": { "weibo": [] } }))
        }
    }

    #[tokio::test]
    async fn error_code_keeps_previous_data() {
        let store = Store::new(Arc::new(FailingTrends));
        let mut previous = TrendData::new();
        previous.insert("zhihu".into(), vec![item("kept")]);
        store.lock().trends = previous.clone();

        store.fetch_trends().await.unwrap();
        assert_eq!(store.trends(), previous);
        assert!(!store.trends_loading());
    }

    #[tokio::test]
    async fn transport_failure_clears_loading_flag() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_once(Operation::GetTrends, "offline");
        let store = Store::new(backend);

        let err = store.fetch_trends().await.unwrap_err();
        assert!(matches!(err, crate::error::ClientError::Remote(GatewayError::Rejected(_))));
        assert!(!store.trends_loading());
    }
}
