//! HTML for the login form, the application frame and guard notices.

use crate::identity::{CanonicalRole, PermissionSet, User};
use crate::routing::{self, RoutePermissionEntry, LOGIN_PATH};

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{} - taskdesk</title></head>\n<body>\n{}\n</body></html>\n",
        escape(title),
        body
    )
}

pub fn login(error: Option<&str>) -> String {
    let err = error
        .map(|e| format!("<p class=\"error\" role=\"alert\">{}</p>\n", escape(e)))
        .unwrap_or_default();
    document(
        "Sign in",
        &format!(
            "<main class=\"login\">\n<h1>Sign in</h1>\n{err}<form method=\"post\" action=\"{LOGIN_PATH}\">\n\
             <label>Username <input name=\"username\" autocomplete=\"username\" required></label>\n\
             <label>Password <input name=\"password\" type=\"password\" autocomplete=\"current-password\" required></label>\n\
             <button type=\"submit\">Sign in</button>\n</form>\n</main>"
        ),
    )
}

pub fn loading() -> String {
    document("Loading", "<main class=\"loading\"><p>Loading…</p></main>")
}

/// Access-denied notice shown when a role is refused its own landing page.
pub fn denied(role: CanonicalRole, default_route: &str) -> String {
    document(
        "Access denied",
        &format!(
            "<main class=\"denied\">\n<h1>Access denied</h1>\n\
             <p>Your role ({}) cannot open {}.</p>\n\
             <form method=\"post\" action=\"/logout\"><button type=\"submit\">Sign in with another account</button></form>\n</main>",
            escape(role.label()),
            escape(default_route)
        ),
    )
}

fn nav(role: CanonicalRole) -> String {
    let items: Vec<String> = routing::routes_for_role(role)
        .iter()
        .map(|e| format!("<li><a href=\"{}\">{}</a></li>", e.path, escape(e.title)))
        .collect();
    format!("<nav><ul>{}</ul></nav>", items.join(""))
}

/// Main application frame around a page body.
pub fn frame(user: &User, title: &str, body: &str) -> String {
    document(
        title,
        &format!(
            "<header><span class=\"user\">{}</span> <span class=\"role\">{}</span>\n\
             <form method=\"post\" action=\"/logout\"><button type=\"submit\">Sign out</button></form></header>\n\
             {}\n<main>\n<h1>{}</h1>\n{}\n</main>",
            escape(user.shown_name()),
            escape(user.role.label()),
            nav(user.role),
            escape(title),
            body
        ),
    )
}

fn actions(labels: &[(&str, bool)]) -> String {
    let buttons: Vec<String> = labels
        .iter()
        .filter(|(_, on)| *on)
        .map(|(label, _)| format!("<button type=\"button\">{}</button>", label))
        .collect();
    if buttons.is_empty() {
        String::new()
    } else {
        format!("<div class=\"actions\">{}</div>", buttons.join(" "))
    }
}

/// Page body; action buttons follow the role's permission set.
pub fn body_for(entry: &RoutePermissionEntry, user: &User) -> String {
    let p = PermissionSet::for_role(user.role);
    match entry.path {
        "/projects" => actions(&[
            ("New project", p.can_create_project),
            ("Edit project", p.can_edit_project),
            ("Delete project", p.can_delete_project),
        ]),
        "/tasks" => actions(&[
            ("New main task", p.can_create_main_task),
            ("New sub-task", p.can_create_sub_task),
            ("Assign", p.can_assign_task),
            ("Accept", p.can_accept_task),
            ("Update progress", p.can_update_task_progress),
        ]),
        "/tasks/approvals" => actions(&[("Approve", p.can_approve_task)]),
        "/reports" => actions(&[("Export", p.can_export_reports)]),
        "/users" => actions(&[("New user", p.can_manage_users)]),
        "/departments" => actions(&[("New department", p.can_manage_departments)]),
        "/profile" => format!(
            "<dl><dt>Username</dt><dd>{}</dd><dt>Role</dt><dd>{}</dd><dt>Department</dt><dd>{}</dd></dl>",
            escape(&user.username),
            escape(user.role.label()),
            escape(user.department_ref.as_deref().unwrap_or("-"))
        ),
        _ => String::new(),
    }
}

pub fn not_found(path: &str) -> String {
    format!("<p>No page at {}.</p>", escape(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserStatus;

    fn user(role: CanonicalRole) -> User {
        User {
            id: "1".into(),
            username: "<b>x</b>".into(),
            display_name: String::new(),
            role,
            department_ref: None,
            status: UserStatus::Active,
            avatar_ref: None,
        }
    }

    #[test]
    fn frame_escapes_and_lists_permitted_routes() {
        let html = frame(&user(CanonicalRole::Staff), "Projects", "");
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(html.contains("href=\"/overview\""));
        assert!(!html.contains("href=\"/users\""));
    }

    #[test]
    fn project_actions_follow_permissions() {
        let entry = routing::route_entry("/projects").unwrap();
        assert!(body_for(entry, &user(CanonicalRole::Pmo)).contains("New project"));
        assert_eq!(body_for(entry, &user(CanonicalRole::Staff)), "");
    }

    #[test]
    fn denied_offers_relogin() {
        let html = denied(CanonicalRole::Staff, "/overview");
        assert!(html.contains("action=\"/logout\""));
        assert!(html.contains("/overview"));
    }
}
