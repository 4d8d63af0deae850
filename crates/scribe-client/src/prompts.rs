//! Custom prompts. The whole list is one config value and every change
//! rewrites it.

use tracing::debug;
use uuid::Uuid;

use scribe_shared::{Prompt, PromptPatch};

use crate::error::{Result, ValidationError};
use crate::state::Store;
use crate::sync::{keys, PendingWrite};

impl Store {
    pub fn prompts(&self) -> Vec<Prompt> {
        self.config().get(&keys::CUSTOM_PROMPTS)
    }

    pub fn add_prompt(
        &self,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> (Prompt, PendingWrite) {
        let prompt = Prompt {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            content: content.into(),
        };
        let mut prompts = self.prompts();
        prompts.push(prompt.clone());
        debug!(id = %prompt.id, "prompt added");
        (prompt, self.config().set(&keys::CUSTOM_PROMPTS, &prompts))
    }

    pub fn update_prompt(&self, id: &str, patch: PromptPatch) -> Result<PendingWrite> {
        let mut prompts = self.prompts();
        let prompt = prompts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ValidationError::UnknownPrompt(id.to_string()))?;
        if let Some(name) = patch.name {
            prompt.name = name;
        }
        if let Some(content) = patch.content {
            prompt.content = content;
        }
        Ok(self.config().set(&keys::CUSTOM_PROMPTS, &prompts))
    }

    pub fn delete_prompt(&self, id: &str) -> Result<PendingWrite> {
        let mut prompts = self.prompts();
        let before = prompts.len();
        prompts.retain(|p| p.id != id);
        if prompts.len() == before {
            return Err(ValidationError::UnknownPrompt(id.to_string()).into());
        }
        Ok(self.config().set(&keys::CUSTOM_PROMPTS, &prompts))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scribe_gateway::MemoryBackend;
    use scribe_shared::constants::KEY_CUSTOM_PROMPTS;

    use super::*;

    #[tokio::test]
    async fn prompt_list_persists_as_json() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());

        let (first, pending) = store.add_prompt("tone", "be brief");
        pending.settled().await.unwrap();
        let (second, _) = store.add_prompt("emoji", "add emoji");

        store
            .update_prompt(&first.id, PromptPatch {
                content: Some("be very brief".into()),
                ..Default::default()
            })
            .unwrap()
            .settled()
            .await
            .unwrap();

        let stored: Vec<Prompt> =
            serde_json::from_str(&backend.config_value(KEY_CUSTOM_PROMPTS).unwrap()).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].content, "be very brief");

        store.delete_prompt(&second.id).unwrap().settled().await.unwrap();
        assert_eq!(store.prompts().len(), 1);
    }

    #[tokio::test]
    async fn unknown_prompt_is_rejected() {
        let store = Store::new(Arc::new(MemoryBackend::new()));
        assert!(store.delete_prompt("missing").unwrap_err().is_validation());
        assert!(store
            .update_prompt("missing", PromptPatch::default())
            .unwrap_err()
            .is_validation());
    }
}
