use crate::ipc::helpers::{get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_teacher_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(
        &req.id,
        Ok(json!({
            "teacherName": state.data.teacher_name,
            "loggedIn": state.data.teacher_name.is_some(),
        })),
    )
}

fn teacher_login(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(&req.params, "name")?;
    state.data.login(state.store.as_mut(), &name)?;
    Ok(json!({ "teacherName": state.data.teacher_name }))
}

fn teacher_logout(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    state.data.logout(state.store.as_mut())?;
    Ok(json!({ "loggedIn": false }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teacher.get" => Some(handle_teacher_get(state, req)),
        "teacher.login" => Some(respond(&req.id, teacher_login(state, req))),
        "teacher.logout" => Some(respond(&req.id, teacher_logout(state, req))),
        _ => None,
    }
}
