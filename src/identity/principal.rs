use serde::{Deserialize, Serialize};

use super::role::{normalize_role, CanonicalRole, UnknownRoleError};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Locked,
}

/// Principal record as the backend reports it. `role` is the raw backend token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    pub role: String,
    #[serde(default)]
    pub department_ref: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

/// Authenticated user as the rest of the application sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: CanonicalRole,
    #[serde(default)]
    pub department_ref: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

impl User {
    pub fn is_locked(&self) -> bool {
        self.status == UserStatus::Locked
    }

    /// Name to show in page frames; falls back to the login name.
    pub fn shown_name(&self) -> &str {
        if self.display_name.trim().is_empty() { &self.username } else { &self.display_name }
    }
}

impl TryFrom<UserProfile> for User {
    type Error = UnknownRoleError;

    fn try_from(p: UserProfile) -> Result<Self, Self::Error> {
        let role = normalize_role(&p.role)?;
        Ok(User {
            id: p.id,
            username: p.username,
            display_name: p.display_name,
            role,
            department_ref: p.department_ref,
            status: p.status,
            avatar_ref: p.avatar_ref,
        })
    }
}
