use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::security::UserDirectory;
use crate::tprintln;

use super::principal::{User, UserProfile};
use super::session::{ServerSession, SessionManager};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub ip: Option<String>,
}

/// Successful login: the bearer token plus the principal as the backend reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub session: ServerSession,
    pub profile: UserProfile,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse>;
}

/// Authenticates against the local user directory and issues server sessions.
pub struct LocalAuthProvider {
    pub directory: Arc<UserDirectory>,
    pub sm: SessionManager,
}

impl LocalAuthProvider {
    pub fn new(directory: Arc<UserDirectory>, sm: SessionManager) -> Self { Self { directory, sm } }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        let profile = self.directory.authenticate(&req.username, &req.password)?;
        // Records with a role nobody recognizes cannot sign in.
        let user = User::try_from(profile.clone()).map_err(|e| {
            warn!(target: "auth", user = %req.username, error = %e, "login refused");
            AppError::forbidden("unknown_role".to_string(), e.to_string())
        })?;
        let session = self.sm.issue(user)?;
        info!(target: "auth", user = %req.username, ip = ?req.ip, sid = %session.session_id, "login");
        tprintln!("auth.login user={} sid={}", req.username, session.session_id);
        Ok(LoginResponse { session, profile })
    }
}
