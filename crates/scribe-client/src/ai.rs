//! AI calls. Each resolves its selection slot first and refuses to call the
//! backend without a resolved model.

use tracing::{info, warn};

use scribe_gateway::ops::{AnalyzeImageArgs, GenerateImageArgs, GenerateTextArgs, PolishTitleArgs};
use scribe_shared::{AiModel, AiProvider, UserAnalytics};

use crate::error::{Result, ValidationError};
use crate::providers::{Selection, SelectionSlot};
use crate::state::Store;

impl Store {
    fn resolved_model(&self, slot: SelectionSlot) -> Result<(AiProvider, AiModel)> {
        match self.selection(slot) {
            Selection::Resolved { provider, model, .. } => Ok((provider, model)),
            Selection::Unset | Selection::Dangling(_) => {
                Err(ValidationError::NoModelSelected(slot.model_type()).into())
            }
        }
    }

    pub async fn generate_text(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let (provider, model) = self.resolved_model(SelectionSlot::Text)?;
        let args = GenerateTextArgs {
            prompt: prompt.to_string(),
            system: system.map(str::to_string),
            provider,
            model_name: model.name,
        };
        let text = self.remote().generate_ai_text(&args).await?;
        info!(model = %args.model_name, chars = text.len(), "text generated");
        Ok(text)
    }

    /// Ask for alternative titles.
    pub async fn polish_title(
        &self,
        title: &str,
        instruction: Option<&str>,
    ) -> Result<Vec<String>> {
        let (provider, model) = self.resolved_model(SelectionSlot::Text)?;
        let args = PolishTitleArgs {
            title: title.to_string(),
            instruction: instruction.map(str::to_string),
            provider,
            model_name: model.name,
        };
        Ok(self.remote().polish_title_with_options(&args).await?)
    }

    /// Generate an image at the preferred size. Returns the image's path.
    pub async fn generate_image(&self, prompt: &str) -> Result<String> {
        let (provider, model) = self.resolved_model(SelectionSlot::Image)?;
        let args = GenerateImageArgs {
            prompt: prompt.to_string(),
            provider,
            model_name: model.name,
            size: Some(self.image_size().to_string()),
        };
        let path = self.remote().generate_ai_image(&args).await?;
        info!(model = %args.model_name, path = %path, "image generated");
        Ok(path)
    }

    /// Describe a local image with the text model.
    pub async fn analyze_image(&self, image_path: &str, prompt: &str) -> Result<String> {
        let (provider, model) = self.resolved_model(SelectionSlot::Text)?;
        let args = AnalyzeImageArgs {
            image_path: image_path.to_string(),
            prompt: prompt.to_string(),
            provider,
            model_name: model.name,
        };
        Ok(self.remote().analyze_local_image(&args).await?)
    }

    /// Collect the creator dashboard figures of the account bound to
    /// `phone`. The backend extracts them with the analytics model, so that
    /// selection must resolve first.
    pub async fn fetch_user_analytics(&self, phone: &str) -> Result<UserAnalytics> {
        if phone.trim().is_empty() {
            return Err(ValidationError::MissingPhone.into());
        }
        let (_, model) = self.resolved_model(SelectionSlot::Analytics)?;

        match self.remote().fetch_user_analytics(phone).await {
            Ok(analytics) => {
                info!(
                    phone = %phone,
                    model = %model.name,
                    period = %analytics.period,
                    "analytics fetched"
                );
                Ok(analytics)
            }
            Err(e) => {
                warn!(phone = %phone, error = %e, "analytics fetch failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scribe_gateway::{MemoryBackend, Operation};
    use scribe_shared::{ImageSize, ModelSelection, ModelType};

    use super::*;
    use crate::error::ClientError;

    async fn store_with_models() -> (Arc<MemoryBackend>, Store, i64) {
        let backend = Arc::new(MemoryBackend::new());
        let id = backend.insert_provider(
            AiProvider::new("A", "k")
                .with_model("gpt-x", ModelType::Text)
                .with_model("painter", ModelType::Image),
        );
        let store = Store::new(backend.clone());
        store.fetch_providers().await.unwrap();
        (backend, store, id)
    }

    #[tokio::test]
    async fn calls_need_a_resolved_selection() {
        let (backend, store, id) = store_with_models().await;

        let err = store.generate_text("hi", None).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::NoModelSelected(ModelType::Text))
        ));

        let _ = store.set_selection(SelectionSlot::Image, Some(ModelSelection::new(id, "gpt-x")));
        assert!(store.generate_image("cat").await.unwrap_err().is_validation());
        assert_eq!(backend.calls(Operation::GenerateAiImage), 0);
    }

    #[tokio::test]
    async fn text_calls_use_selected_model() {
        let (backend, store, id) = store_with_models().await;
        assert!(store.analyze_image("a.png", "describe").await.is_err());

        let gpt = ModelSelection::new(id, "gpt-x");
        let _ = store.set_selection(SelectionSlot::Analytics, Some(gpt));
        assert!(store.analyze_image("a.png", "describe").await.is_err());
        assert_eq!(backend.calls(Operation::AnalyzeLocalImage), 0);

        let _ = store.set_selection(SelectionSlot::Text, Some(ModelSelection::new(id, "gpt-x")));
        assert_eq!(store.generate_text("hi", Some("be kind")).await.unwrap(), "[gpt-x] hi");
        assert_eq!(store.polish_title("Title", None).await.unwrap().len(), 5);
        assert_eq!(
            store.analyze_image("a.png", "describe").await.unwrap(),
            "[gpt-x] analysis of a.png"
        );
    }

    #[tokio::test]
    async fn analytics_need_the_analytics_model() {
        let (backend, store, id) = store_with_models().await;
        let user = backend.bind_user("alice", "111");
        backend.set_user_analytics(
            &user.phone,
            UserAnalytics {
                followers_count: 42,
                period: "01-08 to 02-06".into(),
                ..Default::default()
            },
        );

        let _ = store.set_selection(SelectionSlot::Text, Some(ModelSelection::new(id, "gpt-x")));
        let err = store.fetch_user_analytics("111").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(backend.calls(Operation::FetchUserAnalytics), 0);

        store
            .set_selection(SelectionSlot::Analytics, Some(ModelSelection::new(id, "gpt-x")))
            .settled()
            .await
            .unwrap();
        let analytics = store.fetch_user_analytics("111").await.unwrap();
        assert_eq!(analytics.followers_count, 42);
        assert_eq!(analytics.period, "01-08 to 02-06");

        let err = store.fetch_user_analytics("999").await.unwrap_err();
        assert_eq!(err.to_string(), "Account 999 is not bound");
    }

    #[tokio::test]
    async fn image_generation_uses_preferred_size() {
        let (_backend, store, id) = store_with_models().await;
        let _ = store.set_selection(SelectionSlot::Image, Some(ModelSelection::new(id, "painter")));
        let _ = store.set_image_size(ImageSize::new(512, 512));

        assert_eq!(
            store.generate_image("cat").await.unwrap(),
            "images/painter-512x512.png"
        );
    }
}
