//! Local image library, passed straight through to the backend.

use tracing::info;

use crate::error::Result;
use crate::state::Store;

impl Store {
    pub async fn list_local_images(&self) -> Result<Vec<String>> {
        Ok(self.remote().list_local_images().await?)
    }

    pub async fn import_local_images(&self, paths: Vec<String>) -> Result<()> {
        let count = paths.len();
        self.remote().import_local_images(paths).await?;
        info!(count, "images imported");
        Ok(())
    }

    pub async fn delete_local_image(&self, path: &str) -> Result<()> {
        self.remote().delete_local_image(path).await?;
        info!(path = %path, "image deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scribe_gateway::MemoryBackend;

    use super::*;

    #[tokio::test]
    async fn import_list_and_delete() {
        let store = Store::new(Arc::new(MemoryBackend::new()));
        store
            .import_local_images(vec!["/tmp/a.png".into(), "C:\\pics\\b.png".into()])
            .await
            .unwrap();
        assert_eq!(
            store.list_local_images().await.unwrap(),
            vec!["images/a.png", "images/b.png"]
        );

        store.delete_local_image("images/a.png").await.unwrap();
        assert_eq!(store.list_local_images().await.unwrap(), vec!["images/b.png"]);
    }
}
