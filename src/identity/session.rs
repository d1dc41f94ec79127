use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;

use crate::error::{AppError, AppResult};
use crate::tprintln;

use super::principal::User;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct ServerSession {
    pub session_id: String,
    pub token: SessionToken,
    pub user: User,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
struct SessionTables {
    by_token: HashMap<SessionToken, ServerSession>,
    user_index: HashMap<String, HashSet<SessionToken>>,
}

impl SessionTables {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.by_token.len();
        self.by_token.retain(|_, s| s.expires_at > now);
        if self.by_token.len() == before { return 0; }
        let live = &self.by_token;
        self.user_index.retain(|_, tokens| {
            tokens.retain(|t| live.contains_key(t));
            !tokens.is_empty()
        });
        before - self.by_token.len()
    }
}

fn gen_id() -> AppResult<String> {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| AppError::internal("rng_unavailable".to_string(), e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Issues and validates opaque session tokens. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct SessionManager {
    pub ttl: Duration,
    tables: Arc<RwLock<SessionTables>>,
}

impl Default for SessionManager {
    fn default() -> Self { Self::new(Duration::from_secs(60 * 60)) }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, tables: Arc::new(RwLock::new(SessionTables::default())) }
    }

    /// Issue a session for `user`. Expired sessions of every user are swept first.
    pub fn issue(&self, user: User) -> AppResult<ServerSession> {
        let now = Instant::now();
        let sess = ServerSession {
            session_id: uuid::Uuid::new_v4().to_string(),
            token: gen_id()?,
            user,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        {
            let mut t = self.tables.write();
            t.sweep(now);
            t.by_token.insert(sess.token.clone(), sess.clone());
            t.user_index.entry(sess.user.id.clone()).or_default().insert(sess.token.clone());
        }
        tprintln!("session.issue user={} sid={} ttl_secs={}", sess.user.username, sess.session_id, self.ttl.as_secs());
        Ok(sess)
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.tables.write().sweep(Instant::now())
    }

    /// Current user for `token`. Expired sessions are dropped on sight.
    pub fn validate(&self, token: &str) -> Option<User> {
        let now = Instant::now();
        {
            let t = self.tables.read();
            match t.by_token.get(token) {
                Some(s) if s.expires_at > now => return Some(s.user.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.remove(token);
        None
    }

    fn remove(&self, token: &str) -> bool {
        let mut t = self.tables.write();
        let Some(sess) = t.by_token.remove(token) else { return false; };
        if let Some(set) = t.user_index.get_mut(&sess.user.id) {
            set.remove(token);
            if set.is_empty() { t.user_index.remove(&sess.user.id); }
        }
        true
    }

    pub fn logout(&self, token: &str) -> bool {
        self.remove(token)
    }

    /// Drop every session held by `user_id`. Returns how many were removed.
    pub fn revoke_user(&self, user_id: &str) -> usize {
        let mut t = self.tables.write();
        let tokens = t.user_index.remove(user_id).unwrap_or_default();
        let mut count = 0usize;
        for tok in tokens.iter() {
            if t.by_token.remove(tok).is_some() { count += 1; }
        }
        tprintln!("session.revoke user={} count={}", user_id, count);
        count
    }

    pub fn active_count(&self) -> usize {
        self.tables.read().by_token.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{CanonicalRole, UserStatus};

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            username: format!("user{id}"),
            display_name: String::new(),
            role: CanonicalRole::Staff,
            department_ref: None,
            status: UserStatus::Active,
            avatar_ref: None,
        }
    }

    #[test]
    fn issue_validate_logout() {
        let sm = SessionManager::default();
        let s = sm.issue(user("1")).unwrap();
        assert_eq!(sm.validate(&s.token).map(|u| u.id), Some("1".to_string()));
        assert!(sm.logout(&s.token));
        assert!(sm.validate(&s.token).is_none());
        assert!(!sm.logout(&s.token));
    }

    #[test]
    fn tokens_are_unique() {
        let sm = SessionManager::default();
        let a = sm.issue(user("1")).unwrap();
        let b = sm.issue(user("1")).unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), 43);
        assert!(!a.token.starts_with("AAAAAAAA"));
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn expired_sessions_are_pruned() {
        let sm = SessionManager::new(Duration::from_secs(0));
        let s = sm.issue(user("1")).unwrap();
        assert!(sm.validate(&s.token).is_none());
        assert_eq!(sm.active_count(), 0);
    }

    #[test]
    fn revoke_user_drops_only_that_user() {
        let sm = SessionManager::default();
        sm.issue(user("1")).unwrap();
        sm.issue(user("1")).unwrap();
        let other = sm.issue(user("2")).unwrap();
        assert_eq!(sm.revoke_user("1"), 2);
        assert_eq!(sm.active_count(), 1);
        assert!(sm.validate(&other.token).is_some());
    }

    #[test]
    fn abandoned_sessions_are_swept_on_issue() {
        let sm = SessionManager::new(Duration::from_millis(1));
        for i in 0..200 {
            sm.issue(user(&i.to_string())).unwrap();
        }
        std::thread::sleep(Duration::from_millis(20));
        sm.issue(user("late")).unwrap();
        assert_eq!(sm.active_count(), 1);
        assert!(sm.tables.read().user_index.keys().all(|k| k == "late"));
    }

    #[test]
    fn sweep_keeps_live_sessions() {
        let sm = SessionManager::default();
        let live = sm.issue(user("1")).unwrap();
        assert_eq!(sm.sweep_expired(), 0);
        assert!(sm.validate(&live.token).is_some());
    }
}
