//!
//! taskdesk HTTP server
//! --------------------
//! Axum-based HTTP API and page host.
//!
//! Responsibilities:
//! - Session management with an opaque token, carried as a bearer header or an HttpOnly cookie.
//! - Login/logout endpoints backed by the user directory.
//! - The current-principal endpoint the client session store restores from.
//! - Every page request passes the route guard before anything is rendered.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth_store::Session;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::guard::{self, GuardAction};
use crate::identity::{
    AuthProvider, LocalAuthProvider, LoginGrant, LoginRequest, PermissionSet, SessionManager, User, UserStatus,
};
use crate::routing::{self, RoutePermissionEntry, LOGIN_PATH};
use crate::security::UserDirectory;
use crate::stats::{compute_task_stats, TaskRecord, DEFAULT_DUE_SOON_DAYS};

pub mod pages;

const SESSION_COOKIE: &str = "taskdesk_session";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<UserDirectory>,
    pub sessions: SessionManager,
    pub provider: Arc<LocalAuthProvider>,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(directory: Arc<UserDirectory>, sessions: SessionManager, cookie_secure: bool) -> Self {
        let provider = Arc::new(LocalAuthProvider::new(directory.clone(), sessions.clone()));
        Self { directory, sessions, provider, cookie_secure }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/login", get(login_page).post(login_form))
        .route("/logout", post(logout_form))
        .route("/api/auth/login", post(api_login))
        .route("/api/auth/me", get(api_me))
        .route("/api/auth/logout", post(api_logout))
        .route("/api/permissions", get(api_permissions))
        .route("/api/routes", get(api_routes))
        .route("/api/users", get(api_users))
        .route("/api/users/{username}/lock", post(api_lock_user))
        .route("/api/stats/tasks", post(api_task_stats))
        .fallback(page)
        .with_state(state)
}

/// Open the user directory, seed the default admin and build the shared state.
pub fn build_state(cfg: &ServerConfig) -> anyhow::Result<AppState> {
    std::fs::create_dir_all(&cfg.data_dir)
        .with_context(|| format!("Failed to create or access data directory: {}", cfg.data_dir.display()))?;
    let directory = UserDirectory::open(cfg.users_file())
        .with_context(|| format!("While opening user directory: {}", cfg.users_file().display()))?;
    directory
        .ensure_default_admin(&cfg.admin_password)
        .context("While ensuring default admin")?;
    Ok(AppState::new(Arc::new(directory), SessionManager::new(cfg.session_ttl), cfg.cookie_secure))
}

pub async fn run(cfg: ServerConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "taskdesk starting: bind={}, http_port={}, data_dir={:?}, session_ttl_secs={}, cookie_secure={}",
        cfg.bind, cfg.http_port, cfg.data_dir, cfg.session_ttl.as_secs(), cfg.cookie_secure
    );
    let state = build_state(&cfg)?;
    info!(target: "startup", users = state.directory.list().len(), "user directory loaded");

    let sweeper = state.sessions.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            tick.tick().await;
            let removed = sweeper.sweep_expired();
            if removed > 0 {
                debug!(target: "session", removed, "expired sessions swept");
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", cfg.bind, cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get(header::COOKIE)?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some((k, v)) = p.split_once('=') {
            if k == name { return Some(v.to_string()); }
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let v = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let t = v.strip_prefix("Bearer ")?.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

fn request_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| parse_cookie(headers, SESSION_COOKIE))
}

fn current_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    request_token(headers).and_then(|t| state.sessions.validate(&t))
}

fn require_user(state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    current_user(state, headers).ok_or_else(|| AppError::auth("unauthorized", "sign in required"))
}

fn require_permission(user: &User, check: fn(&PermissionSet) -> bool, what: &str) -> AppResult<()> {
    if check(&PermissionSet::for_role(user.role)) {
        Ok(())
    } else {
        Err(AppError::forbidden("forbidden".to_string(), format!("role '{}' may not {}", user.role, what)))
    }
}

fn session_cookie(token: &str, secure: bool) -> AppResult<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!("{}={}; HttpOnly{}; SameSite=Strict; Path=/", SESSION_COOKIE, token, secure))
        .map_err(|e| AppError::internal("cookie_error".to_string(), e.to_string()))
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("taskdesk_session=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Strict; Path=/")
}

async fn root(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    match current_user(&state, &headers) {
        Some(u) => Redirect::to(routing::default_route_for_role(u.role)),
        None => Redirect::to(LOGIN_PATH),
    }
}

async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(u) = current_user(&state, &headers) {
        return Redirect::to(routing::default_route_for_role(u.role)).into_response();
    }
    Html(pages::login(None)).into_response()
}

#[derive(Debug, Deserialize)]
struct LoginForm { username: String, password: String }

async fn login_form(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let req = LoginRequest { username: form.username, password: form.password, ip: None };
    match state.provider.login(&req) {
        Ok(resp) => {
            let cookie = match session_cookie(&resp.session.token, state.cookie_secure) {
                Ok(c) => c,
                Err(e) => return e.into_response(),
            };
            let mut headers = HeaderMap::new();
            headers.insert(header::SET_COOKIE, cookie);
            (headers, Redirect::to(routing::default_route_for_role(resp.session.user.role))).into_response()
        }
        Err(e) => {
            warn!(target: "auth", user = %req.username, error = %e, "form login failed");
            let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::UNAUTHORIZED);
            (status, Html(pages::login(Some(e.message())))).into_response()
        }
    }
}

async fn logout_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = request_token(&headers) {
        state.sessions.logout(&token);
    }
    let mut h = HeaderMap::new();
    h.insert(header::SET_COOKIE, clear_session_cookie());
    (h, Redirect::to(LOGIN_PATH)).into_response()
}

async fn api_login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> AppResult<Json<LoginGrant>> {
    let resp = state.provider.login(&req).inspect_err(|e| {
        warn!(target: "auth", user = %req.username, error = %e, "login failed");
    })?;
    Ok(Json(LoginGrant { token: resp.session.token, user: resp.profile }))
}

/// The principal as stored, with the raw backend role token.
async fn api_me(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<crate::identity::UserProfile>> {
    let user = require_user(&state, &headers)?;
    match state.directory.get_by_id(&user.id) {
        Some(profile) => Ok(Json(profile)),
        None => {
            state.sessions.revoke_user(&user.id);
            Err(AppError::auth("unknown_principal", "account no longer exists"))
        }
    }
}

async fn api_logout(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let removed = request_token(&headers).map(|t| state.sessions.logout(&t)).unwrap_or(false);
    Json(serde_json::json!({"status": "ok", "ended": removed}))
}

async fn api_permissions(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<PermissionSet>> {
    let user = require_user(&state, &headers)?;
    Ok(Json(PermissionSet::for_role(user.role)))
}

async fn api_routes(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<serde_json::Value>> {
    let user = require_user(&state, &headers)?;
    let routes: Vec<&RoutePermissionEntry> = routing::routes_for_role(user.role);
    Ok(Json(serde_json::json!({
        "role": user.role,
        "default_route": routing::default_route_for_role(user.role),
        "routes": routes,
    })))
}

async fn api_users(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Vec<crate::identity::UserProfile>>> {
    let user = require_user(&state, &headers)?;
    require_permission(&user, |p| p.can_manage_users, "manage users")?;
    Ok(Json(state.directory.list()))
}

async fn api_lock_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let user = require_user(&state, &headers)?;
    require_permission(&user, |p| p.can_manage_users, "manage users")?;
    if user.username.eq_ignore_ascii_case(&username) {
        return Err(AppError::user("cannot_lock_self", "an account cannot lock itself"));
    }
    let profile = state.directory.set_status(&username, UserStatus::Locked)?;
    let revoked = state.sessions.revoke_user(&profile.id);
    info!(target: "auth", by = %user.username, user = %profile.username, revoked, "account locked");
    Ok(Json(serde_json::json!({"status": "ok", "user": profile, "revoked": revoked})))
}

#[derive(Debug, Deserialize)]
struct TaskStatsPayload {
    tasks: Vec<TaskRecord>,
    #[serde(default)]
    due_soon_days: Option<i64>,
    #[serde(default)]
    now: Option<DateTime<Utc>>,
}

async fn api_task_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TaskStatsPayload>,
) -> AppResult<Json<crate::stats::TaskStats>> {
    require_user(&state, &headers)?;
    let days = payload.due_soon_days.unwrap_or(DEFAULT_DUE_SOON_DAYS);
    if !(0..=365).contains(&days) {
        return Err(AppError::user("invalid_window", "due_soon_days must be between 0 and 365"));
    }
    let now = payload.now.unwrap_or_else(Utc::now);
    Ok(Json(compute_task_stats(&payload.tasks, now, chrono::Duration::days(days))))
}

/// Every other path is a page and goes through the route guard first.
async fn page(State(state): State<AppState>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri.path();
    if path.starts_with("/api/") {
        return AppError::not_found("not_found".to_string(), format!("no endpoint {path}")).into_response();
    }
    if method != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    let session = Session { user: current_user(&state, &headers), is_loading: false };
    let decision = guard::evaluate(&session, path);
    match decision.action {
        GuardAction::ShowLoading => (StatusCode::SERVICE_UNAVAILABLE, Html(pages::loading())).into_response(),
        GuardAction::Redirect { to, .. } => Redirect::to(&to).into_response(),
        GuardAction::ShowDenied { role, default_route } => {
            (StatusCode::FORBIDDEN, Html(pages::denied(role, &default_route))).into_response()
        }
        GuardAction::Render => {
            let Some(user) = session.user.as_ref() else {
                return Redirect::to(LOGIN_PATH).into_response();
            };
            match routing::route_entry(path) {
                Some(entry) => Html(pages::frame(user, entry.title, &pages::body_for(entry, user))).into_response(),
                None => (StatusCode::NOT_FOUND, Html(pages::frame(user, "Not found", &pages::not_found(path)))).into_response(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_and_bearer_extraction() {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_static("theme=dark; taskdesk_session=abc"));
        assert_eq!(request_token(&h).as_deref(), Some("abc"));
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(request_token(&h).as_deref(), Some("xyz"));
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert_eq!(request_token(&h).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_flags() {
        let c = session_cookie("tok", true).unwrap();
        assert_eq!(c.to_str().unwrap(), "taskdesk_session=tok; HttpOnly; Secure; SameSite=Strict; Path=/");
        let c = session_cookie("tok", false).unwrap();
        assert!(!c.to_str().unwrap().contains("Secure"));
    }
}
