//! AI provider registry and model selection resolution.
//!
//! The registry is a copy of the backend's list and is rebuilt from it after
//! every mutation. Selections are references into it and are resolved on
//! every read, so a deleted or renamed model shows up as dangling at once.

use serde::Serialize;
use tracing::{debug, info};

use scribe_gateway::ops::ModelTestArgs;
use scribe_shared::{AiModel, AiProvider, ModelSelection, ModelTestResult, ModelType};

use crate::error::{Result, ValidationError};
use crate::events::StoreEvent;
use crate::state::Store;
use crate::sync::{keys, ConfigKey, PendingWrite};

/// Places in the app that hold a model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSlot {
    Text,
    Image,
    Analytics,
}

impl SelectionSlot {
    pub const ALL: [SelectionSlot; 3] = [Self::Text, Self::Image, Self::Analytics];

    /// The model type a selection in this slot must point at.
    pub fn model_type(self) -> ModelType {
        match self {
            Self::Text | Self::Analytics => ModelType::Text,
            Self::Image => ModelType::Image,
        }
    }

    fn key(self) -> &'static ConfigKey<Option<ModelSelection>> {
        match self {
            Self::Text => &keys::SELECTED_TEXT_MODEL,
            Self::Image => &keys::SELECTED_IMAGE_MODEL,
            Self::Analytics => &keys::ANALYTICS_AI_MODEL,
        }
    }
}

/// One entry of a model picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidate {
    pub provider_id: i64,
    pub provider_name: String,
    pub model_name: String,
}

impl ModelCandidate {
    pub fn selection(&self) -> ModelSelection {
        ModelSelection::new(self.provider_id, self.model_name.clone())
    }
}

/// Picker entries of one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateGroup {
    pub provider_id: i64,
    pub provider_name: String,
    pub model_names: Vec<String>,
}

/// A slot's selection checked against the live registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Unset,
    /// Points at a provider or model that does not exist, or at a model of
    /// the wrong type for the slot.
    Dangling(ModelSelection),
    Resolved {
        selection: ModelSelection,
        provider: AiProvider,
        model: AiModel,
    },
}

impl Selection {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn resolved(&self) -> Option<(&AiProvider, &AiModel)> {
        match self {
            Self::Resolved { provider, model, .. } => Some((provider, model)),
            Self::Unset | Self::Dangling(_) => None,
        }
    }
}

/// Every model of `model_type`, in registry order. Providers without such a
/// model (or not yet persisted) contribute nothing.
pub fn list_models(providers: &[AiProvider], model_type: ModelType) -> Vec<ModelCandidate> {
    providers
        .iter()
        .filter_map(|p| p.id.map(|id| (id, p)))
        .flat_map(|(id, p)| {
            p.models
                .iter()
                .filter(move |m| m.model_type == model_type)
                .map(move |m| ModelCandidate {
                    provider_id: id,
                    provider_name: p.name.clone(),
                    model_name: m.name.clone(),
                })
        })
        .collect()
}

/// [`list_models`] grouped by provider, empty groups omitted.
pub fn group_models(providers: &[AiProvider], model_type: ModelType) -> Vec<CandidateGroup> {
    let mut groups: Vec<CandidateGroup> = Vec::new();
    for candidate in list_models(providers, model_type) {
        match groups.last_mut() {
            Some(group) if group.provider_id == candidate.provider_id => {
                group.model_names.push(candidate.model_name);
            }
            _ => groups.push(CandidateGroup {
                provider_id: candidate.provider_id,
                provider_name: candidate.provider_name,
                model_names: vec![candidate.model_name],
            }),
        }
    }
    groups
}

/// Find the provider and model a selection points at. Model type is not
/// considered here.
pub fn resolve<'a>(
    providers: &'a [AiProvider],
    selection: &ModelSelection,
) -> Option<(&'a AiProvider, &'a AiModel)> {
    let provider = providers
        .iter()
        .find(|p| p.id == Some(selection.provider_id))?;
    let model = provider.model(&selection.model_name)?;
    Some((provider, model))
}

fn classify(
    providers: &[AiProvider],
    slot: SelectionSlot,
    stored: Option<ModelSelection>,
) -> Selection {
    let Some(selection) = stored else {
        return Selection::Unset;
    };
    match resolve(providers, &selection) {
        Some((provider, model)) if model.model_type == slot.model_type() => Selection::Resolved {
            provider: provider.clone(),
            model: model.clone(),
            selection,
        },
        _ => Selection::Dangling(selection),
    }
}

impl Store {
    pub fn providers(&self) -> Vec<AiProvider> {
        self.lock().providers.clone()
    }

    pub fn list_models(&self, model_type: ModelType) -> Vec<ModelCandidate> {
        list_models(&self.lock().providers, model_type)
    }

    pub fn grouped_models(&self, model_type: ModelType) -> Vec<CandidateGroup> {
        group_models(&self.lock().providers, model_type)
    }

    pub fn resolve(&self, selection: &ModelSelection) -> Option<(AiProvider, AiModel)> {
        let state = self.lock();
        resolve(&state.providers, selection).map(|(p, m)| (p.clone(), m.clone()))
    }

    /// The stored selection of `slot`, resolved against the registry now.
    pub fn selection(&self, slot: SelectionSlot) -> Selection {
        let stored = self.config().get(slot.key());
        classify(&self.lock().providers, slot, stored)
    }

    /// Store a selection for `slot`. No check is made that it resolves;
    /// consumers re-resolve on read. `None` clears it in memory only.
    pub fn set_selection(
        &self,
        slot: SelectionSlot,
        selection: Option<ModelSelection>,
    ) -> PendingWrite {
        debug!(?slot, ?selection, "selection set");
        let pending = self.config().set(slot.key(), &selection);
        self.emit(StoreEvent::SelectionChanged { slot });
        pending
    }

    /// Replace the registry with the backend's list.
    pub async fn fetch_providers(&self) -> Result<()> {
        let providers = self.remote().get_ai_providers().await?;
        let count = providers.len();
        self.lock().providers = providers;
        self.emit(StoreEvent::ProvidersUpdated { count });
        Ok(())
    }

    /// Create or update a provider, then rebuild the registry. Returns the
    /// provider's id as assigned by the backend.
    pub async fn save_provider(&self, provider: &AiProvider) -> Result<i64> {
        if provider.name.trim().is_empty() {
            return Err(ValidationError::MissingProviderName.into());
        }
        let id = self.remote().save_ai_provider(provider).await?;
        info!(provider_id = id, name = %provider.name, "provider saved");
        self.fetch_providers().await?;
        Ok(id)
    }

    pub async fn delete_provider(&self, id: i64) -> Result<()> {
        self.remote().delete_ai_provider(id).await?;
        info!(provider_id = id, "provider deleted");
        self.fetch_providers().await
    }

    /// Probe a provider's connectivity. Returns the backend's reply text;
    /// the registry is not touched.
    pub async fn test_provider(&self, provider: &AiProvider) -> Result<String> {
        let reply = self.remote().test_ai_provider(provider).await?;
        info!(name = %provider.name, "provider probe succeeded");
        Ok(reply)
    }

    /// Check that one model of `provider` answers a chat request. A failing
    /// model is reported in the result, not as an error.
    pub async fn test_model_chat(
        &self,
        provider: &AiProvider,
        model_name: &str,
    ) -> Result<ModelTestResult> {
        let args = ModelTestArgs {
            provider: provider.clone(),
            model_name: model_name.to_string(),
        };
        let result = self.remote().test_model_chat(&args).await?;
        info!(model = %model_name, success = result.success, "model chat check");
        Ok(result)
    }

    /// Check that one model of `provider` can produce structured output.
    pub async fn test_model_structured_output(
        &self,
        provider: &AiProvider,
        model_name: &str,
    ) -> Result<ModelTestResult> {
        let args = ModelTestArgs {
            provider: provider.clone(),
            model_name: model_name.to_string(),
        };
        let result = self.remote().test_model_structured_output(&args).await?;
        info!(model = %model_name, success = result.success, "model structured output check");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scribe_gateway::{MemoryBackend, Operation};
    use scribe_shared::constants::KEY_SELECTED_TEXT_MODEL;

    use super::*;

    fn registry() -> Vec<AiProvider> {
        let mut a = AiProvider::new("A", "k").with_model("gpt-x", ModelType::Text);
        a.id = Some(1);
        let mut b = AiProvider::new("B", "k");
        b.id = Some(2);
        vec![a, b]
    }

    #[test]
    fn candidates_only_include_matching_models() {
        let providers = registry();
        let text = list_models(&providers, ModelType::Text);
        assert_eq!(
            text,
            vec![ModelCandidate {
                provider_id: 1,
                provider_name: "A".into(),
                model_name: "gpt-x".into(),
            }]
        );
        assert!(list_models(&providers, ModelType::Image).is_empty());
    }

    #[test]
    fn candidates_keep_registry_order() {
        let mut providers = registry();
        providers[1] = providers[1]
            .clone()
            .with_model("b-img", ModelType::Image)
            .with_model("b-chat", ModelType::Text)
            .with_model("b-chat-2", ModelType::Text);

        let groups = group_models(&providers, ModelType::Text);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].model_names, vec!["gpt-x"]);
        assert_eq!(groups[1].model_names, vec!["b-chat", "b-chat-2"]);
    }

    #[test]
    fn resolve_requires_provider_and_exact_model_name() {
        let providers = registry();
        assert!(resolve(&providers, &ModelSelection::new(1, "gpt-x")).is_some());
        assert!(resolve(&providers, &ModelSelection::new(9, "gpt-x")).is_none());
        assert!(resolve(&providers, &ModelSelection::new(1, "GPT-X")).is_none());
        assert!(resolve(&providers, &ModelSelection::new(2, "gpt-x")).is_none());
    }

    #[test]
    fn slot_type_mismatch_is_dangling() {
        let providers = registry();
        let sel = ModelSelection::new(1, "gpt-x");
        assert!(resolve(&providers, &sel).is_some());
        assert_eq!(
            classify(&providers, SelectionSlot::Image, Some(sel.clone())),
            Selection::Dangling(sel.clone())
        );
        assert!(classify(&providers, SelectionSlot::Analytics, Some(sel)).is_resolved());
        assert_eq!(classify(&providers, SelectionSlot::Text, None), Selection::Unset);
    }

    fn store() -> (Arc<MemoryBackend>, Store) {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());
        (backend, store)
    }

    #[tokio::test]
    async fn deleting_a_provider_leaves_selection_dangling() {
        let (backend, store) = store();
        let id =
            backend.insert_provider(AiProvider::new("A", "k").with_model("gpt-x", ModelType::Text));
        store.fetch_providers().await.unwrap();

        let selection = ModelSelection::new(id, "gpt-x");
        store
            .set_selection(SelectionSlot::Text, Some(selection.clone()))
            .settled()
            .await
            .unwrap();
        assert!(store.selection(SelectionSlot::Text).is_resolved());
        assert_eq!(
            backend.config_value(KEY_SELECTED_TEXT_MODEL).as_deref(),
            Some(r#"{"providerId":1,"modelName":"gpt-x"}"#)
        );

        store.delete_provider(id).await.unwrap();
        assert_eq!(store.selection(SelectionSlot::Text), Selection::Dangling(selection));
    }

    #[tokio::test]
    async fn save_rebuilds_registry_from_backend() {
        let (backend, store) = store();
        let provider = AiProvider::new("A", "k")
            .with_model("gpt-x", ModelType::Text)
            .with_model("painter", ModelType::Image);

        let id = store.save_provider(&provider).await.unwrap();
        let providers = store.providers();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].id, Some(id));
        assert!(providers[0].models.iter().all(|m| m.id.is_some()));
        assert_eq!(backend.calls(Operation::GetAiProviders), 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_registry() {
        let (backend, store) = store();
        backend.insert_provider(AiProvider::new("A", "k"));
        store.fetch_providers().await.unwrap();
        backend.fail_once(Operation::SaveAiProvider, "duplicate name");

        let err = store.save_provider(&AiProvider::new("A", "k")).await.unwrap_err();
        assert_eq!(err.to_string(), "duplicate name");
        assert_eq!(store.providers().len(), 1);
    }

    #[tokio::test]
    async fn provider_name_is_checked_locally() {
        let (backend, store) = store();
        let err = store.save_provider(&AiProvider::new(" ", "k")).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(backend.calls(Operation::SaveAiProvider), 0);
    }

    #[tokio::test]
    async fn probe_does_not_touch_registry() {
        let (backend, store) = store();
        let provider = AiProvider::new("A", "k").with_model("gpt-x", ModelType::Text);
        assert_eq!(store.test_provider(&provider).await.unwrap(), "connection ok");

        let image_only = AiProvider::new("B", "k").with_model("img", ModelType::Image);
        assert!(store.test_provider(&image_only).await.is_err());
        assert!(store.providers().is_empty());
        assert_eq!(backend.calls(Operation::GetAiProviders), 0);
    }

    #[tokio::test]
    async fn model_checks_report_per_model_and_leave_registry_alone() {
        let (backend, store) = store();
        let mut draft = AiProvider::new("unsaved", "k").with_model("gpt-x", ModelType::Text);

        let ok = store.test_model_chat(&draft, "gpt-x").await.unwrap();
        assert!(ok.success);
        assert_eq!(ok.model_name, "gpt-x");
        assert!(ok.response.is_some());

        let missing = store.test_model_structured_output(&draft, "ghost").await.unwrap();
        assert!(!missing.success);
        assert!(missing.error_message.is_some());

        draft.api_key.clear();
        let no_key = store.test_model_structured_output(&draft, "gpt-x").await.unwrap();
        assert_eq!(no_key.error_message.as_deref(), Some("API key is missing"));

        assert!(store.providers().is_empty());
        assert_eq!(backend.calls(Operation::GetAiProviders), 0);
        assert_eq!(backend.calls(Operation::SaveAiProvider), 0);
    }

    #[tokio::test]
    async fn selection_is_stored_without_validation() {
        let (_backend, store) = store();
        let selection = ModelSelection::new(42, "ghost");
        let _ = store.set_selection(SelectionSlot::Image, Some(selection.clone()));
        assert_eq!(store.selection(SelectionSlot::Image), Selection::Dangling(selection));

        let _ = store.set_selection(SelectionSlot::Image, None);
        assert_eq!(store.selection(SelectionSlot::Image), Selection::Unset);
    }
}
