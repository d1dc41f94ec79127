//!
//! taskdesk command-line client
//! ----------------------------
//! Signs in against a taskdesk server, keeps the bearer token in the token file,
//! restores the session on every run and evaluates page access through the route guard.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use taskdesk::auth_store::AuthStore;
use taskdesk::cli::{self, HttpAuthBackend};
use taskdesk::config::{arg_value, ClientConfig};
use taskdesk::routing;
use taskdesk::stats::{TaskRecord, TaskStats};
use taskdesk::token_store::{FileTokenStore, TokenStore};

const USAGE: &str = "usage: taskdesk_cli [--server URL] [--token-file PATH] <command>

commands:
  login <username> [--password PW]   sign in (password also read from TASKDESK_PASSWORD)
  logout                             end the session and forget the token
  whoami                             show the restored user
  permissions                        list capability flags of the current role
  routes                             list pages the current role may open
  open <path>                        show what the route guard does for <path>
  stats <tasks.json> [--days N]      task statistics computed by the server";

/// Positional arguments with `--flag value` pairs removed.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i].starts_with("--") {
            i += 2;
            continue;
        }
        out.push(args[i].as_str());
        i += 1;
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let pos = positional(&args);
    let Some(command) = pos.first().copied() else {
        println!("{USAGE}");
        return Ok(());
    };
    let cfg = ClientConfig::from_env_and_args(&args);
    let backend = HttpAuthBackend::new(&cfg.server_url)?;
    let tokens = FileTokenStore::new(cfg.token_file.clone());
    let store = AuthStore::new(backend, tokens);

    match command {
        "login" => {
            let username = pos.get(1).copied().ok_or_else(|| anyhow!("login needs a username"))?;
            let password = arg_value(&args, "--password")
                .map(|s| s.to_string())
                .or_else(|| std::env::var("TASKDESK_PASSWORD").ok())
                .ok_or_else(|| anyhow!("no password: pass --password or set TASKDESK_PASSWORD"))?;
            let user = store.login(username, &password).await?;
            println!("signed in as {} ({})", user.shown_name(), user.role);
            println!("landing page: {}", routing::default_route_for_role(user.role));
        }
        "logout" => {
            store.restore().await;
            store.logout().await?;
            println!("signed out");
        }
        "whoami" => match store.restore().await {
            Some(u) => println!("{} ({}) role={} status={:?}", u.shown_name(), u.username, u.role, u.status),
            None => println!("not signed in"),
        },
        "permissions" => {
            store.restore().await;
            match store.permissions() {
                Some(p) => println!("{}", cli::render_permissions(&p)),
                None => println!("not signed in"),
            }
        }
        "routes" => match store.restore().await {
            Some(u) => println!("{}", cli::render_routes(&routing::routes_for_role(u.role))),
            None => println!("not signed in"),
        },
        "open" => {
            let path = pos.get(1).copied().ok_or_else(|| anyhow!("open needs a path"))?;
            store.restore().await;
            println!("{}", cli::describe_decision(path, &store.guard(path)));
        }
        "stats" => {
            let file = pos.get(1).copied().ok_or_else(|| anyhow!("stats needs a tasks file"))?;
            let text = std::fs::read_to_string(file).with_context(|| format!("reading {file}"))?;
            let tasks: Vec<TaskRecord> = serde_json::from_str(&text).with_context(|| format!("parsing {file}"))?;
            if store.restore().await.is_none() {
                return Err(anyhow!("not signed in"));
            }
            let token = FileTokenStore::new(cfg.token_file.clone())
                .load()?
                .ok_or_else(|| anyhow!("not signed in"))?;
            let mut body = serde_json::json!({"tasks": tasks});
            if let Some(days) = arg_value(&args, "--days").and_then(|d| d.parse::<i64>().ok()) {
                body["due_soon_days"] = serde_json::json!(days);
            }
            let stats: TaskStats = store.backend().post_json("/api/stats/tasks", &token, &body).await?;
            let rows = vec![
                vec!["total".to_string(), stats.total.to_string()],
                vec!["todo".to_string(), stats.todo.to_string()],
                vec!["in_progress".to_string(), stats.in_progress.to_string()],
                vec!["review".to_string(), stats.review.to_string()],
                vec!["completed".to_string(), stats.completed.to_string()],
                vec!["cancelled".to_string(), stats.cancelled.to_string()],
                vec!["overdue".to_string(), stats.overdue.to_string()],
                vec!["due_soon".to_string(), stats.due_soon.to_string()],
                vec!["completion_rate".to_string(), format!("{:.1}%", stats.completion_rate * 100.0)],
            ];
            println!("{}", cli::render_table(&["metric", "value"], &rows));
        }
        other => {
            println!("unknown command '{other}'\n\n{USAGE}");
        }
    }
    Ok(())
}
