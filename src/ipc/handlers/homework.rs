use crate::app::HomeworkInput;
use crate::ipc::helpers::{
    get_opt_date, get_opt_str, get_required_date, get_required_str, respond, today, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn homework_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_opt_str(&req.params, "classId");
    let as_of = get_opt_date(&req.params, "today")?.unwrap_or_else(today);

    let mut items: Vec<_> = state
        .data
        .homework
        .iter()
        .filter(|h| class_id.as_deref().map(|c| h.class_id == c).unwrap_or(true))
        .collect();
    items.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.created_at.cmp(&b.created_at)));

    let rows: Vec<serde_json::Value> = items
        .into_iter()
        .map(|h| {
            let class_name = state
                .data
                .class(&h.class_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            json!({
                "homework": h,
                "className": class_name,
                "dueLabel": h.due_label(as_of),
            })
        })
        .collect();
    Ok(json!({ "homework": rows, "today": as_of }))
}

fn homework_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let input = HomeworkInput {
        class_id: get_required_str(&req.params, "classId")?,
        subject: get_required_str(&req.params, "subject")?,
        description: get_required_str(&req.params, "description")?,
        assigned_date: get_opt_date(&req.params, "assignedDate")?.unwrap_or_else(today),
        due_date: get_required_date(&req.params, "dueDate")?,
    };
    let hw = state.data.add_homework(state.store.as_mut(), input)?;
    Ok(json!({ "homework": hw }))
}

fn homework_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let homework_id = get_required_str(&req.params, "homeworkId")?;
    state
        .data
        .delete_homework(state.store.as_mut(), &homework_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "homework.list" => homework_list(state, req),
        "homework.create" => homework_create(state, req),
        "homework.delete" => homework_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
