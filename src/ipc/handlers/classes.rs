use crate::app::StudentInput;
use crate::ipc::helpers::{get_opt_str, get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let classes: Vec<serde_json::Value> = state
        .data
        .classes
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "studentCount": c.students.len(),
            })
        })
        .collect();
    respond(&req.id, Ok(json!({ "classes": classes })))
}

/// Optional `students: [{rollNo?, name, fatherName?}]` seeds the roster.
fn parse_student_inputs(params: &serde_json::Value) -> Result<Vec<StudentInput>, HandlerErr> {
    let Some(v) = params.get("students") else {
        return Ok(Vec::new());
    };
    let Some(arr) = v.as_array() else {
        return Err(HandlerErr::bad_params("students must be an array"));
    };
    arr.iter()
        .enumerate()
        .map(|(i, s)| {
            let name = s
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| HandlerErr {
                    code: "bad_params",
                    message: "student name is required".to_string(),
                    details: Some(json!({ "index": i })),
                })?;
            Ok(StudentInput {
                roll_no: get_opt_str(s, "rollNo"),
                name: name.to_string(),
                father_name: get_opt_str(s, "fatherName").unwrap_or_default(),
            })
        })
        .collect()
}

fn classes_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(&req.params, "name")?;
    let students = parse_student_inputs(&req.params)?;
    let class = state.data.create_class(state.store.as_mut(), &name, students)?;
    Ok(json!({ "classId": class.id, "name": class.name, "class": class }))
}

fn classes_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let class = state.data.class(&class_id)?;
    Ok(json!({ "class": class }))
}

fn classes_rename(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let name = get_required_str(&req.params, "name")?;
    state
        .data
        .rename_class(state.store.as_mut(), &class_id, &name)?;
    Ok(json!({ "classId": class_id }))
}

fn classes_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    state.data.delete_class(state.store.as_mut(), &class_id)?;
    if state
        .register
        .as_ref()
        .is_some_and(|r| r.class_id == class_id)
    {
        state.register = None;
    }
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "classes.list" => return Some(handle_classes_list(state, req)),
        "classes.create" => classes_create(state, req),
        "classes.get" => classes_get(state, req),
        "classes.rename" => classes_rename(state, req),
        "classes.delete" => classes_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
