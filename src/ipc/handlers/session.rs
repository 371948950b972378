use crate::ipc::helpers::{
    get_opt_str, get_raw_mark, get_required_index, get_required_str, get_total_marks, respond,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::session::AssessmentSession;
use crate::stats;
use crate::subjects::{portion_suggestions, SubjectField};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

/// Seeded when the caller passes `seed`, so remark text is reproducible.
pub(crate) fn rng_from_params(params: &serde_json::Value) -> StdRng {
    match params.get("seed").and_then(|v| v.as_u64()) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn session_view(session: &AssessmentSession) -> serde_json::Value {
    let subjects = session.subjects();
    let (class, marks, attendance) = match session.class() {
        Some(c) => {
            let marks: serde_json::Map<String, serde_json::Value> = c
                .students
                .iter()
                .map(|s| {
                    let row: Vec<Option<f64>> = subjects
                        .as_slice()
                        .iter()
                        .map(|sub| session.ledger().get(&s.id, &sub.name))
                        .collect();
                    (s.id.clone(), json!(row))
                })
                .collect();
            let attendance: Vec<serde_json::Value> = c
                .students
                .iter()
                .map(|s| json!({ "studentId": s.id, "status": session.status_of(&s.id) }))
                .collect();
            (json!(c), json!(marks), json!(attendance))
        }
        None => (serde_json::Value::Null, json!({}), json!([])),
    };
    json!({
        "stage": session.stage(),
        "examName": session.exam_name(),
        "class": class,
        "subjects": subjects,
        "grandTotal": subjects.grand_total(),
        "duplicateSubjects": subjects.duplicate_names(),
        "marks": marks,
        "markCount": session.ledger().len(),
        "attendance": attendance,
        "policy": session.settings().policy,
        "notification": session.notification(Utc::now()),
    })
}

fn session_select_class(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let class = state.data.class(&class_id)?;
    state.session.select_class(class)?;
    if let Some(name) = get_opt_str(&req.params, "examName") {
        state.session.set_exam_name(&name)?;
    }
    Ok(session_view(&state.session))
}

fn session_update_subject(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let index = get_required_index(&req.params, "index")?;
    let field_raw = get_required_str(&req.params, "field")?;
    let field = SubjectField::parse(&field_raw)?;
    let value = match field {
        SubjectField::Name => get_required_str(&req.params, "value")?,
        SubjectField::TotalMarks => get_total_marks(&req.params, "value")?.to_string(),
    };
    state.session.update_subject(index, field, &value)?;
    Ok(json!({
        "subjects": state.session.subjects(),
        "grandTotal": state.session.subjects().grand_total(),
        "duplicateSubjects": state.session.subjects().duplicate_names(),
    }))
}

fn session_add_portion(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(&req.params, "name")?;
    let total_marks = match req.params.get("totalMarks") {
        Some(_) => get_total_marks(&req.params, "totalMarks")?,
        None => portion_suggestions()
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.total_marks)
            .ok_or_else(|| HandlerErr::bad_params("missing totalMarks for custom portion"))?,
    };
    let added = state.session.add_portion(&name, total_marks)?;
    Ok(json!({ "added": added, "subjects": state.session.subjects() }))
}

fn session_set_mark(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(&req.params, "studentId")?;
    let subject_index = get_required_index(&req.params, "subjectIndex")?;
    let raw = get_raw_mark(&req.params, "value")?;
    let write = state
        .session
        .set_mark(&student_id, subject_index, &raw, Utc::now())?;
    Ok(json!({ "write": write }))
}

fn session_set_status(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(&req.params, "studentId")?;
    let raw = get_required_str(&req.params, "status")?;
    let status = AttendanceStatus::parse(&raw).ok_or_else(|| {
        HandlerErr::bad_params("status must be present, absent or leave")
    })?;
    let status = state.session.set_status(&student_id, status)?;
    Ok(json!({ "studentId": student_id, "status": status }))
}

fn session_summary(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let results = state.session.results()?;
    let summary = stats::summarize(&results);
    let mut rng = rng_from_params(&req.params);
    let remark = stats::generate_remark(&summary, &mut rng);
    let quote = stats::motivational_quote(&mut rng);
    let analysis = stats::analysis_report(state.session.exam_name(), &summary, &remark);
    Ok(json!({
        "stats": summary,
        "remark": remark,
        "quote": quote,
        "analysis": analysis,
    }))
}

fn dispatch(state: &mut AppState, req: &Request) -> Option<Result<serde_json::Value, HandlerErr>> {
    let result = match req.method.as_str() {
        "session.get" => Ok(session_view(&state.session)),
        "session.selectClass" => session_select_class(state, req),
        "session.setExamName" => get_required_str(&req.params, "name").and_then(|name| {
            state.session.set_exam_name(&name)?;
            Ok(json!({ "examName": state.session.exam_name() }))
        }),
        "session.next" => state
            .session
            .next()
            .map(|stage| json!({ "stage": stage }))
            .map_err(HandlerErr::from),
        "session.back" => state
            .session
            .back()
            .map(|stage| json!({ "stage": stage }))
            .map_err(HandlerErr::from),
        "session.restart" => {
            state.session.restart();
            Ok(json!({ "stage": state.session.stage() }))
        }
        "session.subjects.add" => get_required_str(&req.params, "name").and_then(|name| {
            let total = get_total_marks(&req.params, "totalMarks")?;
            state.session.add_subject(&name, total)?;
            Ok(json!({ "subjects": state.session.subjects() }))
        }),
        "session.subjects.addPortion" => session_add_portion(state, req),
        "session.subjects.remove" => get_required_index(&req.params, "index").and_then(|i| {
            state.session.remove_subject(i)?;
            Ok(json!({ "subjects": state.session.subjects() }))
        }),
        "session.subjects.update" => session_update_subject(state, req),
        "session.marks.set" => session_set_mark(state, req),
        "session.status.set" => session_set_status(state, req),
        "session.status.toggle" => get_required_str(&req.params, "studentId").and_then(|id| {
            let status = state.session.toggle_status(&id)?;
            Ok(json!({ "studentId": id, "status": status }))
        }),
        "session.results" => state
            .session
            .results()
            .map(|rs| json!(rs))
            .map_err(HandlerErr::from),
        "session.summary" => session_summary(state, req),
        _ => return None,
    };
    Some(result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = dispatch(state, req)?;
    if let Err(e) = &result {
        tracing::debug!(method = %req.method, code = e.code, "session request refused");
    }
    Some(respond(&req.id, result))
}
