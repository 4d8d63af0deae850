//! The current post and the current account's drafts.
//!
//! Edits to the current post are in memory only. The draft list always
//! belongs to the current account: a reply for an account that is no
//! longer current is dropped.

use tracing::{debug, info, warn};

use scribe_gateway::ops::{PublishPostArgs, SavePostArgs};
use scribe_shared::constants::MAX_POST_IMAGES;
use scribe_shared::{Post, PostPatch};

use crate::error::{Result, ValidationError};
use crate::events::StoreEvent;
use crate::state::Store;

impl Store {
    pub fn current_post(&self) -> Post {
        self.lock().current_post.clone()
    }

    pub fn drafts(&self) -> Vec<Post> {
        self.lock().drafts.clone()
    }

    fn edit_current_post(&self, edit: impl FnOnce(&mut Post)) {
        edit(&mut self.lock().current_post);
        self.emit(StoreEvent::CurrentPostChanged);
    }

    /// Merge `patch` into the current post.
    pub fn set_current_post(&self, patch: PostPatch) {
        self.edit_current_post(|post| post.apply(patch));
    }

    fn replace_current_post(&self, post: Post) {
        {
            let mut state = self.lock();
            state.current_post = post;
            state.post_generation += 1;
        }
        self.emit(StoreEvent::CurrentPostChanged);
    }

    /// Start over with an empty, unsaved post. Drafts are untouched.
    pub fn new_post(&self) {
        self.replace_current_post(Post::default());
    }

    /// Attach an image. A path already attached is not added twice.
    pub fn add_image(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        {
            let mut state = self.lock();
            let images = &mut state.current_post.images;
            if images.contains(&path) {
                return Ok(());
            }
            if images.len() >= MAX_POST_IMAGES {
                return Err(ValidationError::TooManyImages(MAX_POST_IMAGES).into());
            }
            images.push(path);
        }
        self.emit(StoreEvent::CurrentPostChanged);
        Ok(())
    }

    /// Detach an image; the cover goes with it when it was that image.
    pub fn remove_image(&self, path: &str) {
        self.edit_current_post(|post| {
            post.images.retain(|p| p != path);
            if post.cover_image.as_deref() == Some(path) {
                post.cover_image = None;
            }
        });
    }

    pub fn set_cover_image(&self, path: Option<String>) {
        self.edit_current_post(|post| post.cover_image = path);
    }

    /// Load a listed draft into the current post for editing.
    pub fn open_draft(&self, id: i64) -> Result<()> {
        let draft = self
            .lock()
            .drafts
            .iter()
            .find(|d| d.id == Some(id))
            .cloned()
            .ok_or(ValidationError::UnknownDraft(id))?;
        self.replace_current_post(draft);
        Ok(())
    }

    /// Persist the current post as a draft of the current account. A post
    /// that already aliases a draft updates it in place. Returns the id.
    ///
    /// The id is only recorded on the current post when it is still the post
    /// that was sent; a post opened or started meanwhile stays as it is.
    pub async fn save_draft(&self) -> Result<i64> {
        let (user, post, generation) = {
            let state = self.lock();
            let user = state
                .current_user
                .clone()
                .ok_or(ValidationError::NoCurrentUser)?;
            (user, state.current_post.clone(), state.post_generation)
        };

        let args = SavePostArgs {
            user_id: user.id,
            post_id: post.id,
            title: post.title,
            content: post.content,
            images: post.images,
            cover_image: post.cover_image,
        };
        let id = self.remote().save_post(&args).await?;
        info!(user_id = user.id, post_id = id, "draft saved");

        let kept = {
            let mut state = self.lock();
            let kept = state.post_generation == generation;
            if kept {
                state.current_post.id = Some(id);
            }
            kept
        };
        if kept {
            self.emit(StoreEvent::CurrentPostChanged);
        } else {
            debug!(post_id = id, "current post replaced during save, id not applied");
        }

        self.fetch_drafts().await;
        Ok(id)
    }

    /// Replace the draft list with the current account's drafts. Without a
    /// current account nothing happens. Failures are logged.
    pub async fn fetch_drafts(&self) {
        let Some(user) = self.current_user() else {
            debug!("no current account, draft fetch skipped");
            return;
        };

        let drafts = match self.remote().get_posts(user.id).await {
            Ok(drafts) => drafts,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "draft fetch failed");
                return;
            }
        };

        let count = drafts.len();
        {
            let mut state = self.lock();
            if state.current_user.as_ref().map(|u| u.id) != Some(user.id) {
                debug!(user_id = user.id, "account changed during draft fetch, reply dropped");
                return;
            }
            state.drafts = drafts;
            state.drafts_owner = Some(user.id);
        }
        self.emit(StoreEvent::DraftsUpdated {
            user_id: user.id,
            count,
        });
    }

    /// Delete a draft and refetch the list. A current post aliasing it keeps
    /// its now stale id.
    pub async fn delete_draft(&self, id: i64) -> Result<()> {
        self.remote().delete_post(id).await?;
        info!(post_id = id, "draft deleted");
        self.fetch_drafts().await;
        Ok(())
    }

    /// Publish the current post under the current account.
    pub async fn publish_current_post(&self) -> Result<()> {
        let (user, post) = {
            let state = self.lock();
            let user = state
                .current_user
                .clone()
                .ok_or(ValidationError::NoCurrentUser)?;
            (user, state.current_post.clone())
        };
        if post.title.trim().is_empty() || post.content.trim().is_empty() {
            return Err(ValidationError::MissingTitleOrContent.into());
        }

        let args = PublishPostArgs {
            phone: user.phone.clone(),
            title: post.title,
            content: post.content,
            images: post.images,
            cover_image: post.cover_image,
        };
        self.remote().publish_post(&args).await?;
        info!(phone = %user.phone, "post published");
        Ok(())
    }

    /// Called after the identity changed: drop drafts of another account,
    /// then fetch the new account's drafts.
    pub(crate) async fn rescope_drafts(&self) {
        let dropped = {
            let mut state = self.lock();
            let current = state.current_user.as_ref().map(|u| u.id);
            match state.drafts_owner {
                Some(owner) if Some(owner) != current => {
                    state.drafts.clear();
                    state.drafts_owner = None;
                    Some(owner)
                }
                _ => None,
            }
        };
        if let Some(owner) = dropped {
            self.emit(StoreEvent::DraftsUpdated {
                user_id: owner,
                count: 0,
            });
        }
        self.fetch_drafts().await;
    }
}
