use crate::app::AppData;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::SqliteStore;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Switches persistence to the workspace database and reloads every collection.
/// Any in-progress assessment or attendance register is discarded.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let store = SqliteStore::open(path)?;
    state.data = AppData::load(&store);
    state.store = Box::new(store);
    state.workspace = Some(path.to_path_buf());
    state.session.restart();
    state.register = None;
    tracing::info!(
        workspace = %path.to_string_lossy(),
        classes = state.data.classes.len(),
        "workspace opened"
    );
    Ok(())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "store": state.store.describe(),
            "markPolicy": state.config.mark_policy,
            "exportFormats": state.renderers.supported(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "classCount": state.data.classes.len(),
                "teacherName": state.data.teacher_name,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "workspace open failed");
            err(&req.id, "db_open_failed", format!("{e:#}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
