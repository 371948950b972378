use crate::attendance::{AttendanceError, AttendanceSheet};
use crate::ipc::helpers::{get_opt_date, get_required_str, respond, today, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use serde_json::json;

fn parse_status(params: &serde_json::Value) -> Result<AttendanceStatus, HandlerErr> {
    let raw = get_required_str(params, "status")?;
    AttendanceStatus::parse(&raw).ok_or_else(|| HandlerErr {
        code: "bad_params",
        message: "status must be present, absent or leave".to_string(),
        details: Some(json!({ "status": raw })),
    })
}

fn sheet_json(sheet: &AttendanceSheet) -> serde_json::Value {
    json!({
        "classId": sheet.class_id,
        "className": sheet.class_name,
        "date": sheet.date,
        "rows": sheet.rows,
        "counts": sheet.counts(),
    })
}

fn register_mut(state: &mut AppState) -> Result<&mut AttendanceSheet, HandlerErr> {
    state
        .register
        .as_mut()
        .ok_or_else(|| AttendanceError::NotOpen.into())
}

fn attendance_open(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let date = get_opt_date(&req.params, "date")?.unwrap_or_else(today);
    let class = state.data.class(&class_id)?;
    let sheet = AttendanceSheet::open(class, date);
    tracing::debug!(class_id = %class_id, %date, students = sheet.rows.len(), "attendance opened");
    let out = sheet_json(&sheet);
    state.register = Some(sheet);
    Ok(out)
}

fn attendance_set(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(&req.params, "studentId")?;
    let status = parse_status(&req.params)?;
    let sheet = register_mut(state)?;
    sheet.set_status(&student_id, status)?;
    Ok(json!({ "status": status, "counts": sheet.counts() }))
}

fn attendance_set_all(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let status = parse_status(&req.params)?;
    let sheet = register_mut(state)?;
    sheet.set_all(status);
    Ok(json!({ "counts": sheet.counts() }))
}

fn attendance_summary(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let sheet = register_mut(state)?;
    let mut out = sheet_json(sheet);
    out["shareText"] = json!(sheet.share_text());
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.open" => attendance_open(state, req),
        "attendance.set" => attendance_set(state, req),
        "attendance.setAll" => attendance_set_all(state, req),
        "attendance.summary" => attendance_summary(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
