//! Identity: canonical roles, principals, permissions and server-side sessions.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod role;
mod permissions;
mod session;
mod provider;

pub use principal::{User, UserProfile, UserStatus};
pub use role::{normalize_role, CanonicalRole, UnknownRoleError};
pub use permissions::{permissions_for, PermissionSet};
pub use session::{ServerSession, SessionManager, SessionToken};
pub use provider::{AuthProvider, LocalAuthProvider, LoginGrant, LoginRequest, LoginResponse};
