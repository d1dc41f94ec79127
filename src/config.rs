//! Runtime configuration from environment variables, with command-line overrides.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::system_paths;

pub const DEFAULT_HTTP_PORT: u16 = 7880;
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:7880";

pub fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

pub fn parse_bool_env(name: &str) -> Option<bool> {
    match env::var(name) {
        Ok(v) => parse_bool(&v),
        Err(_) => None,
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Value following `flag` in `args`, if present.
pub fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].as_str());
        }
        i += 1;
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub http_port: u16,
    pub data_dir: PathBuf,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub admin_password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            http_port: DEFAULT_HTTP_PORT,
            data_dir: PathBuf::from("data"),
            session_ttl: Duration::from_secs(60 * 60),
            cookie_secure: true,
            admin_password: "taskdesk".into(),
        }
    }
}

impl ServerConfig {
    /// Defaults, then `TASKDESK_*` environment variables, then flags in `args`.
    pub fn from_env_and_args(args: &[String]) -> Self {
        let mut cfg = Self::default();
        if let Ok(b) = env::var("TASKDESK_BIND") { cfg.bind = b; }
        if let Some(p) = parse_port_env("TASKDESK_HTTP_PORT") { cfg.http_port = p; }
        if let Ok(d) = env::var("TASKDESK_DATA_DIR") { cfg.data_dir = PathBuf::from(d); }
        if let Some(secs) = env::var("TASKDESK_SESSION_TTL_SECS").ok().and_then(|s| s.parse::<u64>().ok()) {
            cfg.session_ttl = Duration::from_secs(secs);
        }
        if let Some(b) = parse_bool_env("TASKDESK_COOKIE_SECURE") { cfg.cookie_secure = b; }
        if let Ok(p) = env::var("TASKDESK_ADMIN_PASSWORD") { cfg.admin_password = p; }

        if let Some(b) = arg_value(args, "--bind") { cfg.bind = b.to_string(); }
        if let Some(p) = arg_value(args, "--http-port").and_then(|s| s.parse::<u16>().ok()) { cfg.http_port = p; }
        if let Some(d) = arg_value(args, "--data-dir") { cfg.data_dir = PathBuf::from(d); }
        if let Some(secs) = arg_value(args, "--session-ttl").and_then(|s| s.parse::<u64>().ok()) {
            cfg.session_ttl = Duration::from_secs(secs);
        }
        if has_flag(args, "--insecure-cookies") { cfg.cookie_secure = false; }
        cfg
    }

    pub fn users_file(&self) -> PathBuf { system_paths::users_file(&self.data_dir) }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub token_file: PathBuf,
}

impl ClientConfig {
    pub fn from_env_and_args(args: &[String]) -> Self {
        let server_url = arg_value(args, "--server")
            .map(|s| s.to_string())
            .or_else(|| env::var("TASKDESK_SERVER_URL").ok())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let token_file = arg_value(args, "--token-file")
            .map(PathBuf::from)
            .or_else(|| env::var("TASKDESK_TOKEN_FILE").ok().map(PathBuf::from))
            .unwrap_or_else(|| system_paths::default_token_file(&system_paths::home_dir()));
        Self { server_url, token_file }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn flags_override_defaults() {
        let cfg = ServerConfig::from_env_and_args(&args(&[
            "--http-port", "9001", "--data-dir", "/tmp/td", "--session-ttl", "60", "--insecure-cookies",
        ]));
        assert_eq!(cfg.http_port, 9001);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/td"));
        assert_eq!(cfg.session_ttl, Duration::from_secs(60));
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.users_file(), PathBuf::from("/tmp/td/users.json"));
    }

    #[test]
    fn flag_without_value_is_ignored() {
        assert_eq!(arg_value(&args(&["--http-port"]), "--http-port"), None);
        assert_eq!(ServerConfig::from_env_and_args(&args(&["--http-port", "x"])).http_port,
            parse_port_env("TASKDESK_HTTP_PORT").unwrap_or(DEFAULT_HTTP_PORT));
    }

    #[test]
    fn bool_words() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn client_flags() {
        let c = ClientConfig::from_env_and_args(&args(&["--server", "http://h:1", "--token-file", "t.json"]));
        assert_eq!(c.server_url, "http://h:1");
        assert_eq!(c.token_file, PathBuf::from("t.json"));
    }
}
