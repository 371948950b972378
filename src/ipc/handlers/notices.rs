use crate::app::NoticeInput;
use crate::ipc::helpers::{
    get_opt_date, get_opt_str, get_required_date, get_required_str, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::NoticeType;
use serde_json::json;

/// Newest first. `activeOn` hides notices that expired before that day.
fn notices_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let active_on = get_opt_date(&req.params, "activeOn")?;
    let mut notices: Vec<_> = state
        .data
        .notices
        .iter()
        .filter(|n| active_on.map(|d| n.is_active_on(d)).unwrap_or(true))
        .collect();
    notices.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
    Ok(json!({ "notices": notices }))
}

fn notices_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let kind_raw = get_opt_str(&req.params, "type").unwrap_or_else(|| "announcement".to_string());
    let kind = NoticeType::parse(&kind_raw).ok_or_else(|| HandlerErr {
        code: "bad_params",
        message: "type must be holiday, announcement, important or event".to_string(),
        details: Some(json!({ "type": kind_raw })),
    })?;
    let input = NoticeInput {
        title: get_required_str(&req.params, "title")?,
        description: get_opt_str(&req.params, "description").unwrap_or_default(),
        kind,
        date: get_required_date(&req.params, "date")?,
        expiry_date: get_opt_date(&req.params, "expiryDate")?,
    };
    if input.expiry_date.is_some_and(|exp| exp < input.date) {
        return Err(HandlerErr::bad_params("expiryDate is before date"));
    }
    let notice = state.data.add_notice(state.store.as_mut(), input)?;
    Ok(json!({ "notice": notice }))
}

fn notices_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let notice_id = get_required_str(&req.params, "noticeId")?;
    state.data.delete_notice(state.store.as_mut(), &notice_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "notices.list" => notices_list(state, req),
        "notices.create" => notices_create(state, req),
        "notices.delete" => notices_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
