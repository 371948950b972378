use crate::ledger::MarkPolicy;
use crate::session::SessionSettings;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_NOTICE_TTL_MS: i64 = 3000;
pub const MAX_NOTICE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub mark_policy: MarkPolicy,
    pub notice_ttl_ms: i64,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            mark_policy: MarkPolicy::Reject,
            notice_ttl_ms: DEFAULT_NOTICE_TTL_MS,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Warnings are queued because the subscriber is not installed yet.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Config::default();

        cfg.workspace = get("CLASSROOMD_WORKSPACE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        if let Some(raw) = get("CLASSROOMD_MARK_POLICY") {
            match MarkPolicy::parse(&raw) {
                Some(p) => cfg.mark_policy = p,
                None => pending_warn(format!(
                    "CLASSROOMD_MARK_POLICY={raw:?} is not reject|clamp, using reject"
                )),
            }
        }

        if let Some(raw) = get("CLASSROOMD_NOTICE_TTL_MS") {
            match raw.trim().parse::<i64>() {
                Ok(ms) if (1..=MAX_NOTICE_TTL_MS).contains(&ms) => cfg.notice_ttl_ms = ms,
                _ => pending_warn(format!(
                    "CLASSROOMD_NOTICE_TTL_MS={raw:?} is not between 1 and {MAX_NOTICE_TTL_MS}, using {DEFAULT_NOTICE_TTL_MS}"
                )),
            }
        }

        if let Some(v) = get("RUST_LOG").filter(|v| !v.trim().is_empty()) {
            cfg.rust_log = v;
        }
        cfg
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            policy: self.mark_policy,
            notice_ttl: chrono::Duration::milliseconds(self.notice_ttl_ms),
        }
    }
}

thread_local! {
    static PENDING: std::cell::RefCell<Vec<String>> = const { std::cell::RefCell::new(Vec::new()) };
}

fn pending_warn(msg: String) {
    PENDING.with(|p| p.borrow_mut().push(msg));
}

/// Emits warnings collected while reading the environment. Call once logging is up.
pub fn flush_warnings() {
    PENDING.with(|p| {
        for msg in p.borrow_mut().drain(..) {
            tracing::warn!("{}", msg);
        }
    });
}
