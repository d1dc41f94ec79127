//! Client-side session store.
//!
//! `AuthStore` is the single owner of the [`Session`]. Everything else reads it
//! through accessors. The backend and the token store are injected, which keeps
//! the store usable from the CLI, from tests, and from any embedding UI.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::guard::{self, GuardDecision};
use crate::identity::{permissions_for, LoginGrant, PermissionSet, User, UserProfile};
use crate::token_store::TokenStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<User>,
    pub is_loading: bool,
}

impl Session {
    pub fn loading() -> Self {
        Session { user: None, is_loading: true }
    }

    pub fn signed_in(user: User) -> Self {
        Session { user: Some(user), is_loading: false }
    }
}

/// The backend collaborator: authenticates, reports the current principal, ends sessions.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> AppResult<LoginGrant>;
    async fn current_principal(&self, token: &str) -> AppResult<UserProfile>;
    async fn logout(&self, token: &str) -> AppResult<()>;
}

pub struct AuthStore<B, T> {
    backend: B,
    tokens: T,
    state: RwLock<Session>,
}

fn accept_profile(profile: UserProfile) -> AppResult<User> {
    let user = User::try_from(profile).map_err(|e| AppError::forbidden("unknown_role".to_string(), e.to_string()))?;
    if user.is_locked() {
        return Err(AppError::forbidden("account_locked", "account is locked"));
    }
    Ok(user)
}

impl<B: AuthBackend, T: TokenStore> AuthStore<B, T> {
    pub fn new(backend: B, tokens: T) -> Self {
        Self { backend, tokens, state: RwLock::new(Session::loading()) }
    }

    pub fn session(&self) -> Session {
        self.state.read().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading
    }

    pub fn permissions(&self) -> Option<PermissionSet> {
        permissions_for(self.state.read().user.as_ref())
    }

    pub fn guard(&self, path: &str) -> GuardDecision {
        guard::evaluate(&self.state.read(), path)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn set(&self, session: Session) {
        *self.state.write() = session;
    }

    /// Restore a session from the stored token.
    ///
    /// Any failure clears the token and resolves to signed out. `is_loading`
    /// is cleared only once the attempt has finished.
    pub async fn restore(&self) -> Option<User> {
        let token = match self.tokens.load() {
            Ok(Some(t)) => t,
            Ok(None) => {
                self.set(Session::default());
                return None;
            }
            Err(e) => {
                warn!(target: "session", error = %e, "token store unreadable, clearing it and starting signed out");
                if let Err(ce) = self.tokens.clear() {
                    warn!(target: "session", error = %ce, "failed to clear stored token");
                }
                self.set(Session::default());
                return None;
            }
        };
        self.state.write().is_loading = true;
        let outcome = match self.backend.current_principal(&token).await {
            Ok(profile) => accept_profile(profile),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(user) => {
                info!(target: "session", user = %user.username, role = %user.role, "session restored");
                self.set(Session::signed_in(user.clone()));
                Some(user)
            }
            Err(e) => {
                warn!(target: "session", error = %e, "session restore failed, clearing stored token");
                if let Err(ce) = self.tokens.clear() {
                    warn!(target: "session", error = %ce, "failed to clear stored token");
                }
                self.set(Session::default());
                None
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> AppResult<User> {
        let grant = self.backend.login(username, password).await?;
        let user = match accept_profile(grant.user) {
            Ok(u) => u,
            Err(e) => {
                // Do not leave a live server session behind for a principal we refuse.
                self.end_backend_session(&grant.token).await;
                return Err(e);
            }
        };
        if let Err(e) = self.tokens.save(&grant.token) {
            self.end_backend_session(&grant.token).await;
            return Err(e);
        }
        info!(target: "session", user = %user.username, role = %user.role, "signed in");
        self.set(Session::signed_in(user.clone()));
        Ok(user)
    }

    async fn end_backend_session(&self, token: &str) {
        if let Err(e) = self.backend.logout(token).await {
            warn!(target: "session", error = %e, "backend logout failed");
        }
    }

    pub async fn logout(&self) -> AppResult<()> {
        if let Some(token) = self.tokens.load().ok().flatten() {
            self.end_backend_session(&token).await;
        }
        self.set(Session::default());
        self.tokens.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CanonicalRole;
    use crate::token_store::{FileTokenStore, MemoryTokenStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct FixedBackend {
        role: &'static str,
        logouts: AtomicUsize,
    }

    impl FixedBackend {
        fn new(role: &'static str) -> Self {
            Self { role, logouts: AtomicUsize::new(0) }
        }
    }

    /// Token store whose writes always fail.
    struct ReadOnlyTokens;

    impl TokenStore for ReadOnlyTokens {
        fn load(&self) -> AppResult<Option<String>> { Ok(None) }
        fn save(&self, _token: &str) -> AppResult<()> { Err(AppError::io("read_only", "token store is read-only")) }
        fn clear(&self) -> AppResult<()> { Ok(()) }
    }

    #[async_trait]
    impl AuthBackend for FixedBackend {
        async fn login(&self, username: &str, _password: &str) -> AppResult<LoginGrant> {
            Ok(LoginGrant {
                token: "tok".into(),
                user: UserProfile { id: "1".into(), username: username.into(), role: self.role.into(), ..Default::default() },
            })
        }
        async fn current_principal(&self, token: &str) -> AppResult<UserProfile> {
            if token != "tok" { return Err(AppError::auth("invalid_session", "expired")); }
            Ok(UserProfile { id: "1".into(), username: "a".into(), role: self.role.into(), ..Default::default() })
        }
        async fn logout(&self, _token: &str) -> AppResult<()> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn starts_loading_and_resolves_without_token() {
        let store = AuthStore::new(FixedBackend::new("pmo"), MemoryTokenStore::new());
        assert!(store.is_loading());
        assert_eq!(store.restore().await, None);
        assert!(!store.is_loading());
        assert_eq!(store.permissions(), None);
    }

    #[tokio::test]
    async fn login_normalizes_and_persists() {
        let store = AuthStore::new(FixedBackend::new("sep"), MemoryTokenStore::new());
        let user = store.login("minh", "pw").await.unwrap();
        assert_eq!(user.role, CanonicalRole::Director);
        assert!(!store.permissions().unwrap().can_manage_users);
        assert_eq!(store.guard("/users").redirect_target(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn unknown_role_login_is_refused() {
        let tokens = MemoryTokenStore::new();
        let store = AuthStore::new(FixedBackend::new("auditor"), tokens);
        let err = store.login("x", "y").await.unwrap_err();
        assert_eq!(err.code_str(), "unknown_role");
        assert_eq!(store.current_user(), None);
    }

    #[tokio::test]
    async fn stale_token_is_cleared_on_restore() {
        let store = AuthStore::new(FixedBackend::new("pmo"), MemoryTokenStore::with_token("old"));
        assert_eq!(store.restore().await, None);
        assert_eq!(store.session(), Session::default());
    }

    #[tokio::test]
    async fn corrupt_token_file_is_reset_and_login_recovers() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "[1,2]").unwrap();
        let store = AuthStore::new(FixedBackend::new("pmo"), FileTokenStore::new(&path));

        assert_eq!(store.restore().await, None);
        assert!(!store.is_loading());
        assert_eq!(FileTokenStore::new(&path).load().unwrap(), None);

        let user = store.login("hoa", "pw").await.unwrap();
        assert_eq!(user.role, CanonicalRole::Pmo);
        assert_eq!(FileTokenStore::new(&path).load().unwrap().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn unsaved_token_ends_backend_session() {
        let store = AuthStore::new(FixedBackend::new("pmo"), ReadOnlyTokens);
        let err = store.login("hoa", "pw").await.unwrap_err();
        assert_eq!(err.code_str(), "read_only");
        assert_eq!(store.backend().logouts.load(Ordering::SeqCst), 1);
        assert_eq!(store.current_user(), None);
    }

    #[tokio::test]
    async fn refused_role_ends_backend_session() {
        let store = AuthStore::new(FixedBackend::new("auditor"), MemoryTokenStore::new());
        assert!(store.login("x", "y").await.is_err());
        assert_eq!(store.backend().logouts.load(Ordering::SeqCst), 1);
    }
}
