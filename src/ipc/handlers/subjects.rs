use crate::ipc::helpers::{get_opt_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::subjects::{
    classify_level, portion_suggestions, subject_name_suggestions, suggest_presets,
};
use serde_json::json;

fn class_label(state: &AppState, params: &serde_json::Value) -> Result<String, HandlerErr> {
    if let Some(label) = get_opt_str(params, "classLabel") {
        return Ok(label);
    }
    if let Some(class_id) = get_opt_str(params, "classId") {
        return Ok(state.data.class(&class_id)?.name.clone());
    }
    Err(HandlerErr::bad_params("missing classLabel or classId"))
}

fn subjects_presets(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let label = class_label(state, &req.params)?;
    Ok(json!({
        "level": classify_level(&label),
        "subjects": suggest_presets(&label),
    }))
}

fn subjects_names(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let label = class_label(state, &req.params)?;
    Ok(json!({ "names": subject_name_suggestions(&label) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "subjects.presets" => subjects_presets(state, req),
        "subjects.names" => subjects_names(state, req),
        "subjects.portions" => Ok(json!({ "portions": portion_suggestions() })),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
