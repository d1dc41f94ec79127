//! User directory: account records with Argon2 password hashes, kept in a JSON file.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::identity::{normalize_role, UserProfile, UserStatus};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub password_hash: String,
}

/// Input for [`UserDirectory::add_user`]. `role` is a backend role token.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub role: String,
    pub department_ref: Option<String>,
    pub avatar_ref: Option<String>,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

pub struct UserDirectory {
    path: PathBuf,
    records: RwLock<Vec<UserRecord>>,
}

fn read_records(path: &Path) -> AppResult<Vec<UserRecord>> {
    if !path.exists() { return Ok(Vec::new()); }
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() { return Ok(Vec::new()); }
    Ok(serde_json::from_str(&text)?)
}

fn write_records(path: &Path, records: &[UserRecord]) -> AppResult<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
    }
    let text = serde_json::to_string_pretty(records)?;
    std::fs::write(path, text)?;
    Ok(())
}

impl UserDirectory {
    pub fn open<P: Into<PathBuf>>(path: P) -> AppResult<Self> {
        let path = path.into();
        let records = read_records(&path)?;
        Ok(Self { path, records: RwLock::new(records) })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Seed an `admin` account when the directory has no file yet.
    pub fn ensure_default_admin(&self, password: &str) -> AppResult<bool> {
        if self.path.exists() { return Ok(false); }
        self.add_user(NewUser {
            username: DEFAULT_ADMIN_USERNAME.into(),
            password: password.into(),
            display_name: "Administrator".into(),
            role: "admin".into(),
            ..Default::default()
        })?;
        info!(target: "startup", path = %self.path.display(), "seeded default admin account");
        Ok(true)
    }

    /// Insert or replace the account with the same username.
    ///
    /// A replaced account keeps its id and lock status. Sessions issued before
    /// the replace still carry the old role; callers revoke them through
    /// `SessionManager::revoke_user`.
    pub fn add_user(&self, new: NewUser) -> AppResult<UserProfile> {
        if new.username.trim().is_empty() {
            return Err(AppError::user("invalid_username", "username must not be empty"));
        }
        normalize_role(&new.role).map_err(|e| AppError::user("unknown_role".to_string(), e.to_string()))?;
        let password_hash = hash_password(&new.password)?;
        let mut records = self.records.write();
        let existing = records
            .iter()
            .find(|r| r.profile.username.eq_ignore_ascii_case(&new.username))
            .map(|r| (r.profile.id.clone(), r.profile.status));
        let (existing_id, status) = match existing {
            Some((id, status)) => (Some(id), status),
            None => (None, UserStatus::Active),
        };
        records.retain(|r| !r.profile.username.eq_ignore_ascii_case(&new.username));
        let profile = UserProfile {
            id: existing_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            username: new.username,
            display_name: new.display_name,
            role: new.role,
            department_ref: new.department_ref,
            status,
            avatar_ref: new.avatar_ref,
        };
        records.push(UserRecord { profile: profile.clone(), password_hash });
        write_records(&self.path, &records)?;
        Ok(profile)
    }

    pub fn delete_user(&self, username: &str) -> AppResult<bool> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| !r.profile.username.eq_ignore_ascii_case(username));
        if records.len() == before { return Ok(false); }
        write_records(&self.path, &records)?;
        Ok(true)
    }

    pub fn set_status(&self, username: &str, status: UserStatus) -> AppResult<UserProfile> {
        let mut records = self.records.write();
        let Some(rec) = records.iter_mut().find(|r| r.profile.username.eq_ignore_ascii_case(username)) else {
            return Err(AppError::not_found("user_not_found".to_string(), format!("no user '{username}'")));
        };
        rec.profile.status = status;
        let profile = rec.profile.clone();
        write_records(&self.path, &records)?;
        Ok(profile)
    }

    pub fn get(&self, username: &str) -> Option<UserProfile> {
        self.records
            .read()
            .iter()
            .find(|r| r.profile.username.eq_ignore_ascii_case(username))
            .map(|r| r.profile.clone())
    }

    pub fn get_by_id(&self, id: &str) -> Option<UserProfile> {
        self.records.read().iter().find(|r| r.profile.id == id).map(|r| r.profile.clone())
    }

    pub fn list(&self) -> Vec<UserProfile> {
        self.records.read().iter().map(|r| r.profile.clone()).collect()
    }

    /// Check a password. Locked accounts are refused only after the password matched.
    pub fn authenticate(&self, username: &str, password: &str) -> AppResult<UserProfile> {
        let rec = self
            .records
            .read()
            .iter()
            .find(|r| r.profile.username.eq_ignore_ascii_case(username))
            .cloned();
        let Some(rec) = rec else {
            return Err(AppError::auth("invalid_credentials", "invalid username or password"));
        };
        if !verify_password(&rec.password_hash, password) {
            return Err(AppError::auth("invalid_credentials", "invalid username or password"));
        }
        if rec.profile.status == UserStatus::Locked {
            return Err(AppError::forbidden("account_locked", "account is locked"));
        }
        Ok(rec.profile)
    }
}
