//! Session manager: the current identity and the roster of bound accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use scribe_gateway::GatewayError;
use scribe_shared::constants::ALREADY_LOGGED_IN_PREFIX;
use scribe_shared::User;

use crate::error::{Result, ValidationError};
use crate::events::StoreEvent;
use crate::state::Store;

/// Validation state of one bound account as seen by the UI.
///
/// `Unknown -> Validating -> Valid | Invalid`. An account only changes state
/// through an explicit validate, switch or login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Unknown,
    Validating,
    Valid,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCheck {
    pub status: AccountStatus,
    /// When the last validation settled. `None` while validating.
    pub checked_at: Option<DateTime<Utc>>,
}

/// Outcome of starting a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    /// A verification code was sent; finish with
    /// [`Store::submit_verification_code`].
    CodeSent,
    /// The account's credential was still usable; it is now current.
    AlreadyLoggedIn(User),
}

impl Store {
    pub fn current_user(&self) -> Option<User> {
        self.lock().current_user.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.lock().users.clone()
    }

    pub fn account_status(&self, phone: &str) -> AccountStatus {
        self.lock()
            .account_checks
            .get(phone)
            .map(|c| c.status)
            .unwrap_or_default()
    }

    pub fn account_check(&self, phone: &str) -> Option<AccountCheck> {
        self.lock().account_checks.get(phone).cloned()
    }

    /// Replace the roster with the backend's list. Concurrent fetches are not
    /// ordered; the last one to complete wins.
    pub async fn fetch_users(&self) -> Result<()> {
        let users = self.remote().get_users().await?;
        let count = users.len();
        self.lock().users = users;
        debug!(count, "roster fetched");
        self.emit(StoreEvent::RosterUpdated { count });
        Ok(())
    }

    async fn refresh_roster_logged(&self) {
        if let Err(e) = self.fetch_users().await {
            warn!(error = %e, "roster refresh failed");
        }
    }

    fn set_account_status(&self, phone: &str, status: AccountStatus) {
        let checked_at = match status {
            AccountStatus::Valid | AccountStatus::Invalid => Some(Utc::now()),
            AccountStatus::Unknown | AccountStatus::Validating => None,
        };
        self.lock()
            .account_checks
            .insert(phone.to_string(), AccountCheck { status, checked_at });
        self.emit(StoreEvent::AccountStatusChanged {
            phone: phone.to_string(),
            status,
        });
    }

    /// Confirm that `phone`'s credential is still usable. On success the
    /// refreshed record replaces the roster entry (and the current identity
    /// when it is the same account). On failure nothing but the account
    /// status changes.
    pub async fn validate(&self, phone: &str) -> Result<User> {
        self.set_account_status(phone, AccountStatus::Validating);

        let user = match self.remote().validate_login_status(phone).await {
            Ok(user) => user,
            Err(e) => {
                warn!(phone = %phone, error = %e, "account validation failed");
                self.set_account_status(phone, AccountStatus::Invalid);
                return Err(e.into());
            }
        };

        let current_refreshed = {
            let mut state = self.lock();
            if let Some(entry) = state.users.iter_mut().find(|u| u.phone == user.phone) {
                *entry = user.clone();
            }
            match state.current_user.as_mut() {
                Some(current) if current.id == user.id => {
                    *current = user.clone();
                    true
                }
                _ => false,
            }
        };

        self.set_account_status(phone, AccountStatus::Valid);
        if current_refreshed {
            self.emit(StoreEvent::SessionChanged {
                user: Some(user.clone()),
            });
        }
        Ok(user)
    }

    /// Validate every roster account one after another. Returns the number
    /// of valid and invalid accounts.
    pub async fn validate_all(&self) -> (usize, usize) {
        let mut valid = 0;
        let mut invalid = 0;
        for user in self.users() {
            match self.validate(&user.phone).await {
                Ok(_) => valid += 1,
                Err(_) => invalid += 1,
            }
        }
        info!(valid, invalid, "validated all accounts");
        (valid, invalid)
    }

    /// Make `user` current after validating it. A no-op when it already is.
    pub async fn switch_user(&self, user: &User) -> Result<()> {
        let already_current = self
            .lock()
            .current_user
            .as_ref()
            .is_some_and(|u| u.phone == user.phone);
        if already_current {
            debug!(phone = %user.phone, "switch to current account ignored");
            return Ok(());
        }

        let refreshed = self.validate(&user.phone).await?;
        info!(phone = %refreshed.phone, "switched account");
        self.make_current(refreshed).await;
        Ok(())
    }

    /// Remove the account's binding on the backend. Clears the current
    /// identity when it was that account; the roster is refetched either way.
    pub async fn unbind(&self, phone: &str) -> Result<()> {
        self.remote().logout_user(phone).await?;
        info!(phone = %phone, "account unbound");

        let was_current = {
            let mut state = self.lock();
            state.account_checks.remove(phone);
            let was_current = state
                .current_user
                .as_ref()
                .is_some_and(|u| u.phone == phone);
            if was_current {
                state.current_user = None;
            }
            was_current
        };

        if was_current {
            self.emit(StoreEvent::SessionChanged { user: None });
        }
        self.refresh_roster_logged().await;
        Ok(())
    }

    /// Return to the account picker. Local only: the account stays bound and
    /// the draft list is kept as is.
    pub async fn logout(&self) {
        let previous = self.lock().current_user.take();
        if let Some(user) = previous {
            info!(phone = %user.phone, "logged out");
            self.emit(StoreEvent::SessionChanged { user: None });
        }
        self.refresh_roster_logged().await;
    }

    /// Begin the login flow for `phone`.
    pub async fn start_login(&self, phone: &str) -> Result<LoginStep> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(ValidationError::MissingPhone.into());
        }

        let reply = self.remote().start_login_process(phone).await?;
        match reply.strip_prefix(ALREADY_LOGGED_IN_PREFIX) {
            Some(raw) => {
                let user: User = serde_json::from_str(raw).map_err(|e| GatewayError::Decode {
                    operation: "start_login_process",
                    message: e.to_string(),
                })?;
                info!(phone = %phone, "account already logged in");
                self.login_succeeded(user.clone()).await;
                Ok(LoginStep::AlreadyLoggedIn(user))
            }
            None => {
                info!(phone = %phone, "verification code sent");
                Ok(LoginStep::CodeSent)
            }
        }
    }

    /// Finish the login flow started by [`Store::start_login`].
    pub async fn submit_verification_code(&self, phone: &str, code: &str) -> Result<User> {
        let phone = phone.trim();
        let code = code.trim();
        if phone.is_empty() {
            return Err(ValidationError::MissingPhone.into());
        }
        if code.is_empty() {
            return Err(ValidationError::MissingVerificationCode.into());
        }

        let user = self.remote().submit_verification_code(phone, code).await?;
        info!(phone = %phone, user_id = user.id, "login complete");
        self.login_succeeded(user.clone()).await;
        Ok(user)
    }

    async fn login_succeeded(&self, user: User) {
        self.set_account_status(&user.phone, AccountStatus::Valid);
        self.make_current(user).await;
        self.refresh_roster_logged().await;
    }

    async fn make_current(&self, user: User) {
        self.lock().current_user = Some(user.clone());
        self.emit(StoreEvent::SessionChanged { user: Some(user) });
        self.rescope_drafts().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scribe_gateway::memory::DEFAULT_VERIFICATION_CODE;
    use scribe_gateway::ops::SavePostArgs;
    use scribe_gateway::{MemoryBackend, Operation};
    use scribe_shared::Post;

    use super::*;
    use crate::error::ClientError;

    fn store() -> (Arc<MemoryBackend>, Store) {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());
        (backend, store)
    }

    async fn seed_draft(store: &Store, user: &User, title: &str) -> i64 {
        store
            .remote()
            .save_post(&SavePostArgs {
                user_id: user.id,
                post_id: None,
                title: title.into(),
                content: "body".into(),
                images: vec![],
                cover_image: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn switch_validates_and_scopes_drafts() {
        let (backend, store) = store();
        let alice = backend.bind_user("alice", "111");
        let bob = backend.bind_user("bob", "222");
        seed_draft(&store, &alice, "a1").await;
        seed_draft(&store, &bob, "b1").await;
        store.fetch_users().await.unwrap();

        store.switch_user(&alice).await.unwrap();
        assert_eq!(store.current_user().unwrap().phone, "111");
        assert_eq!(store.account_status("111"), AccountStatus::Valid);
        let titles: Vec<_> = store.drafts().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["a1"]);

        store.switch_user(&bob).await.unwrap();
        let titles: Vec<_> = store.drafts().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["b1"]);
    }

    #[tokio::test]
    async fn switch_to_current_is_a_no_op() {
        let (backend, store) = store();
        let alice = backend.bind_user("alice", "111");
        store.switch_user(&alice).await.unwrap();
        let calls = backend.calls(Operation::ValidateLoginStatus);

        store.switch_user(&alice).await.unwrap();
        assert_eq!(backend.calls(Operation::ValidateLoginStatus), calls);
    }

    #[tokio::test]
    async fn failed_validation_leaves_identity_unchanged() {
        let (backend, store) = store();
        let alice = backend.bind_user("alice", "111");
        let bob = backend.bind_user("bob", "222");
        store.switch_user(&alice).await.unwrap();

        backend.set_credential_valid("111", false);
        let err = store.validate("111").await.unwrap_err();
        assert!(matches!(err, ClientError::Remote(_)));
        assert_eq!(store.current_user(), Some(alice.clone()));
        assert_eq!(store.account_status("111"), AccountStatus::Invalid);

        backend.set_credential_valid("222", false);
        assert!(store.switch_user(&bob).await.is_err());
        assert_eq!(store.current_user(), Some(alice));
    }

    #[tokio::test]
    async fn validate_refreshes_records() {
        let (backend, store) = store();
        let alice = backend.bind_user("alice", "111");
        store.fetch_users().await.unwrap();
        store.switch_user(&alice).await.unwrap();

        backend.rename_user("111", "alice2");
        let user = store.validate("111").await.unwrap();
        assert_eq!(user.nickname, "alice2");
        assert_eq!(store.current_user().unwrap().nickname, "alice2");
        assert_eq!(store.users()[0].nickname, "alice2");
        assert!(store.account_check("111").unwrap().checked_at.is_some());
    }

    #[tokio::test]
    async fn validation_status_transitions_are_observable() {
        let (backend, store) = store();
        backend.bind_user("alice", "111");
        let mut rx = store.subscribe();

        store.validate("111").await.unwrap();

        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let StoreEvent::AccountStatusChanged { status, .. } = event {
                statuses.push(status);
            }
        }
        assert_eq!(statuses, vec![AccountStatus::Validating, AccountStatus::Valid]);
    }

    #[tokio::test]
    async fn unbind_current_clears_identity_and_refetches_roster() {
        let (backend, store) = store();
        let alice = backend.bind_user("alice", "111");
        backend.bind_user("bob", "222");
        store.switch_user(&alice).await.unwrap();

        store.unbind("111").await.unwrap();
        assert!(store.current_user().is_none());
        let phones: Vec<_> = store.users().into_iter().map(|u| u.phone).collect();
        assert_eq!(phones, vec!["222"]);
    }

    #[tokio::test]
    async fn unbind_other_account_keeps_identity() {
        let (backend, store) = store();
        let alice = backend.bind_user("alice", "111");
        backend.bind_user("bob", "222");
        store.switch_user(&alice).await.unwrap();

        store.unbind("222").await.unwrap();
        assert_eq!(store.current_user().unwrap().phone, "111");
        assert_eq!(store.users().len(), 1);
    }

    #[tokio::test]
    async fn logout_keeps_binding_and_drafts() {
        let (backend, store) = store();
        let alice = backend.bind_user("alice", "111");
        seed_draft(&store, &alice, "a1").await;
        store.switch_user(&alice).await.unwrap();

        store.logout().await;
        assert!(store.current_user().is_none());
        assert_eq!(store.users().len(), 1);
        assert_eq!(backend.calls(Operation::LogoutUser), 0);

        store.fetch_drafts().await;
        assert_eq!(store.drafts().len(), 1);
    }

    #[tokio::test]
    async fn login_with_code_makes_user_current() {
        let (_backend, store) = store();

        assert_eq!(store.start_login("13800001234").await.unwrap(), LoginStep::CodeSent);
        assert!(store.current_user().is_none());

        let err = store
            .submit_verification_code("13800001234", "000000")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid verification code");

        let user = store
            .submit_verification_code("13800001234", DEFAULT_VERIFICATION_CODE)
            .await
            .unwrap();
        assert_eq!(store.current_user(), Some(user));
        assert_eq!(store.users().len(), 1);
    }

    #[tokio::test]
    async fn login_for_live_account_skips_code() {
        let (backend, store) = store();
        let alice = backend.bind_user("alice", "111");

        let step = store.start_login("111").await.unwrap();
        assert_eq!(step, LoginStep::AlreadyLoggedIn(alice.clone()));
        assert_eq!(store.current_user(), Some(alice));
    }

    #[tokio::test]
    async fn login_inputs_are_checked_locally() {
        let (backend, store) = store();
        let err = store.start_login("  ").await.unwrap_err();
        assert!(err.is_validation());
        let err = store.submit_verification_code("111", "").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(backend.calls(Operation::StartLoginProcess), 0);
    }

    #[tokio::test]
    async fn validate_all_counts_accounts() {
        let (backend, store) = store();
        backend.bind_user("alice", "111");
        backend.bind_user("bob", "222");
        backend.bind_user("carol", "333");
        backend.set_credential_valid("222", false);
        store.fetch_users().await.unwrap();

        assert_eq!(store.validate_all().await, (2, 1));
        assert_eq!(store.account_status("222"), AccountStatus::Invalid);
    }

    #[tokio::test]
    async fn roster_failure_surfaces_to_caller() {
        let (backend, store) = store();
        backend.fail_once(Operation::GetUsers, "backend busy");
        let err = store.fetch_users().await.unwrap_err();
        assert_eq!(err.to_string(), "backend busy");
        assert_eq!(store.current_post(), Post::default());
    }
}
