//! Persistence for the opaque bearer token.
//!
//! The file store keeps a flat JSON object and owns a single key in it, in the
//! manner of browser local storage. Other keys in the same file are left alone.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Fixed key the bearer token is stored under.
pub const TOKEN_KEY: &str = "taskdesk.access_token";

pub trait TokenStore: Send + Sync {
    fn load(&self) -> AppResult<Option<String>>;
    fn save(&self, token: &str) -> AppResult<()>;
    fn clear(&self) -> AppResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_string())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> AppResult<Option<String>> { Ok(self.token.lock().clone()) }

    fn save(&self, token: &str) -> AppResult<()> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        *self.token.lock() = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn read_map(&self) -> AppResult<Map<String, Value>> {
        if !self.path.exists() { return Ok(Map::new()); }
        let text = std::fs::read_to_string(&self.path)?;
        if text.trim().is_empty() { return Ok(Map::new()); }
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(m) => Ok(m),
            _ => Err(AppError::user("token_file_invalid", "token file is not a JSON object")),
        }
    }

    /// Like `read_map`, but a malformed file counts as empty so it gets overwritten.
    fn read_map_or_reset(&self) -> AppResult<Map<String, Value>> {
        match self.read_map() {
            Ok(m) => Ok(m),
            Err(AppError::Io { code, message }) => Err(AppError::Io { code, message }),
            Err(e) => {
                warn!(target: "session", path = %self.path.display(), error = %e, "replacing malformed token file");
                Ok(Map::new())
            }
        }
    }

    fn write_map(&self, map: Map<String, Value>) -> AppResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
        }
        let text = serde_json::to_string_pretty(&Value::Object(map))?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> AppResult<Option<String>> {
        let map = self.read_map()?;
        Ok(map.get(TOKEN_KEY).and_then(|v| v.as_str()).filter(|s| !s.is_empty()).map(|s| s.to_string()))
    }

    fn save(&self, token: &str) -> AppResult<()> {
        let mut map = self.read_map_or_reset()?;
        map.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_map(map)
    }

    fn clear(&self) -> AppResult<()> {
        if !self.path.exists() { return Ok(()); }
        let (mut map, malformed) = match self.read_map() {
            Ok(m) => (m, false),
            Err(_) => (self.read_map_or_reset()?, true),
        };
        if map.remove(TOKEN_KEY).is_some() || malformed {
            self.write_map(map)?;
        }
        Ok(())
    }
}
