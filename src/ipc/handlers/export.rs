use super::session::rng_from_params;
use crate::bundle;
use crate::export::{Artifact, ExportError, ExportFormat, ExportSnapshot};
use crate::ipc::helpers::{get_opt_str, get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use serde_json::json;
use std::path::{Path, PathBuf};

fn capture(state: &AppState, req: &Request) -> Result<ExportSnapshot, HandlerErr> {
    let mut rng = rng_from_params(&req.params);
    let snap = state.session.export_snapshot(
        state.data.teacher_name.as_deref(),
        Utc::now(),
        &mut rng,
    )?;
    Ok(snap)
}

fn parse_format(params: &serde_json::Value) -> Result<ExportFormat, HandlerErr> {
    let raw = get_required_str(params, "format")?;
    ExportFormat::parse(&raw).ok_or_else(|| HandlerErr {
        code: "bad_params",
        message: "format must be image, pdf or spreadsheet".to_string(),
        details: Some(json!({ "format": raw })),
    })
}

fn write_artifact(artifact: &Artifact, out_path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ExportError::Write(e.to_string()))?;
    }
    std::fs::write(out_path, &artifact.bytes).map_err(|e| ExportError::Write(e.to_string()))
}

fn export_snapshot(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let snap = capture(state, req)?;
    Ok(json!({ "snapshot": snap }))
}

fn export_render(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let format = parse_format(&req.params)?;
    let snap = capture(state, req)?;
    let artifact = state.renderers.render(&snap, format).map_err(|e| {
        tracing::warn!(?format, error = %e, "export render failed");
        HandlerErr::from(e)
    })?;

    let mut out = json!({
        "fileName": artifact.file_name,
        "mime": artifact.mime,
        "size": artifact.bytes.len(),
    });
    match get_opt_str(&req.params, "outPath").map(PathBuf::from) {
        Some(path) => {
            write_artifact(&artifact, &path).map_err(|e| {
                tracing::warn!(path = %path.to_string_lossy(), error = %e, "export write failed");
                HandlerErr::from(e)
            })?;
            out["path"] = json!(path.to_string_lossy());
        }
        None => {
            if let Ok(text) = std::str::from_utf8(&artifact.bytes) {
                out["text"] = json!(text);
            }
        }
    }
    Ok(out)
}

fn export_bundle(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let out_path = PathBuf::from(get_required_str(&req.params, "outPath")?);
    let snap = capture(state, req)?;
    let csv = state.renderers.render(&snap, ExportFormat::Spreadsheet)?;
    let summary = bundle::export_results_bundle(&snap, &[csv], &out_path).map_err(|e| {
        tracing::warn!(error = %format!("{e:#}"), "bundle export failed");
        HandlerErr {
            code: "bundle_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "outPath": out_path.to_string_lossy() })),
        }
    })?;
    Ok(json!({
        "path": out_path.to_string_lossy(),
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "entries": summary.entries,
    }))
}

fn export_verify(_state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(get_required_str(&req.params, "path")?);
    let summary = bundle::verify_results_bundle(&path).map_err(|e| HandlerErr {
        code: "bundle_invalid",
        message: format!("{e:#}"),
        details: None,
    })?;
    Ok(json!({
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "entries": summary.entries,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "export.formats" => Ok(json!({ "formats": state.renderers.supported() })),
        "export.snapshot" => export_snapshot(state, req),
        "export.render" => export_render(state, req),
        "export.bundle" => export_bundle(state, req),
        "export.verify" => export_verify(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
