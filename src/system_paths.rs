use std::path::{Path, PathBuf};

/// Centralized helpers for files rooted at the server data directory and the client home.
#[inline]
pub fn users_file(data_dir: &Path) -> PathBuf { data_dir.join("users.json") }

#[inline]
pub fn client_root(home: &Path) -> PathBuf { home.join(".taskdesk") }

#[inline]
pub fn default_token_file(home: &Path) -> PathBuf { client_root(home).join("session.json") }

/// Home directory from the environment, falling back to the working directory.
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
