mod app;
mod attendance;
mod bundle;
mod calc;
mod config;
mod export;
mod ipc;
mod ledger;
mod model;
mod session;
mod stats;
mod store;
mod subjects;

use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = config::Config::from_env();

    // stdout carries the JSON-lines protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.rust_log))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    config::flush_warnings();

    let workspace = config.workspace.clone();
    let mut state = ipc::AppState::new(config);
    if let Some(path) = workspace {
        if let Err(e) = ipc::open_workspace(&mut state, &path) {
            tracing::warn!(error = %format!("{e:#}"), "startup workspace not opened");
        }
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "classroomd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                // Can't reply without id.
                let reply = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", reply);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    tracing::info!("stdin closed, exiting");
}
