//!
//! taskdesk server binary
//! ----------------------
//! Starts the HTTP service. Configuration comes from `TASKDESK_*` environment
//! variables, overridden by command-line flags.

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use taskdesk::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("usage: taskdesk [--bind ADDR] [--http-port PORT] [--data-dir DIR] [--session-ttl SECS] [--insecure-cookies]");
        return Ok(());
    }
    let cfg = ServerConfig::from_env_and_args(&args);

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "startup", "taskdesk starting: RUST_LOG='{}'", rust_log);

    taskdesk::server::run(cfg).await
}
