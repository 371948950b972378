use crate::app::{StudentInput, StudentPatch};
use crate::ipc::helpers::{get_opt_str, get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn students_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let class = state.data.class(&class_id)?;
    Ok(json!({ "students": class.students }))
}

fn students_add(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let input = StudentInput {
        roll_no: get_opt_str(&req.params, "rollNo"),
        name: get_required_str(&req.params, "name")?,
        father_name: get_opt_str(&req.params, "fatherName").unwrap_or_default(),
    };
    let student = state
        .data
        .add_student(state.store.as_mut(), &class_id, input)?;
    Ok(json!({ "student": student }))
}

fn students_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let student_id = get_required_str(&req.params, "studentId")?;
    let patch_src = req.params.get("patch").unwrap_or(&req.params);
    let patch = StudentPatch {
        roll_no: get_opt_str(patch_src, "rollNo"),
        name: get_opt_str(patch_src, "name"),
        father_name: get_opt_str(patch_src, "fatherName"),
    };
    let student =
        state
            .data
            .update_student(state.store.as_mut(), &class_id, &student_id, patch)?;
    Ok(json!({ "student": student }))
}

fn students_remove(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let student_id = get_required_str(&req.params, "studentId")?;
    state
        .data
        .remove_student(state.store.as_mut(), &class_id, &student_id)?;
    Ok(json!({ "ok": true }))
}

fn students_next_roll_no(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let class = state.data.class(&class_id)?;
    Ok(json!({ "rollNo": class.next_roll_no().to_string() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state, req),
        "students.add" => students_add(state, req),
        "students.update" => students_update(state, req),
        "students.remove" => students_remove(state, req),
        "students.nextRollNo" => students_next_roll_no(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
