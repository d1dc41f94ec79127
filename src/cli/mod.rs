pub mod connectivity;

pub use connectivity::HttpAuthBackend;

use crate::guard::{GuardAction, GuardDecision};
use crate::identity::PermissionSet;
use crate::routing::RoutePermissionEntry;

// Render rows as an ASCII table.
pub fn render_table(cols: &[&str], rows: &[Vec<String>]) -> String {
    let max_col_width: usize = 60; // cap to keep output readable
    let mut widths: Vec<usize> = cols.iter().map(|s| s.chars().count().min(max_col_width)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = cell.chars().count();
            if w > widths[i] { widths[i] = w.min(max_col_width); }
        }
    }
    let header: Vec<String> = cols.iter().map(|s| s.to_string()).collect();
    let sep = build_separator(&widths);
    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&build_row(&header, &widths));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for r in rows {
        out.push_str(&build_row(r, &widths));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
    t.push('~');
    t
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        s.push(' ');
        s.push_str(&text);
        s.push_str(&" ".repeat(w.saturating_sub(text.chars().count())));
        s.push_str(" |");
    }
    s
}

pub fn render_permissions(p: &PermissionSet) -> String {
    let v = serde_json::to_value(p).unwrap_or_default();
    let rows: Vec<Vec<String>> = v
        .as_object()
        .map(|m| m.iter().map(|(k, v)| vec![k.clone(), v.to_string()]).collect())
        .unwrap_or_default();
    render_table(&["capability", "granted"], &rows)
}

pub fn render_routes(routes: &[&RoutePermissionEntry]) -> String {
    let rows: Vec<Vec<String>> = routes.iter().map(|e| vec![e.path.to_string(), e.title.to_string()]).collect();
    render_table(&["path", "page"], &rows)
}

pub fn describe_decision(path: &str, d: &GuardDecision) -> String {
    match &d.action {
        GuardAction::ShowLoading => format!("{path}: loading"),
        GuardAction::Redirect { to, .. } => format!("{path}: redirect -> {to}"),
        GuardAction::Render => format!("{path}: render"),
        GuardAction::ShowDenied { role, default_route } => {
            format!("{path}: access denied for role '{role}' (landing page {default_route}); sign in again with another account")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CanonicalRole;

    #[test]
    fn table_layout() {
        let t = render_table(&["a", "bb"], &[vec!["xyz".into(), "1".into()]]);
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "+-----+----+");
        assert_eq!(lines[1], "| a   | bb |");
        assert_eq!(lines[3], "| xyz | 1  |");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn permissions_table_lists_every_flag() {
        let t = render_permissions(&PermissionSet::for_role(CanonicalRole::Admin));
        assert!(t.contains("canManageUsers"));
        assert_eq!(t.lines().count(), 18 + 4);
    }

    #[test]
    fn describes_redirects() {
        let d = GuardDecision {
            state: crate::guard::GuardState::Unauthenticated,
            action: GuardAction::Redirect { to: "/login".into(), replace: true },
        };
        assert_eq!(describe_decision("/users", &d), "/users: redirect -> /login");
    }
}
