use crate::app::RosterError;
use crate::attendance::AttendanceError;
use crate::export::ExportError;
use crate::ipc::error::{err, ok};
use crate::session::SessionError;
use crate::subjects::{coerce_total_marks, SubjectError};
use chrono::NaiveDate;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

macro_rules! domain_err {
    ($ty:ty) => {
        impl From<$ty> for HandlerErr {
            fn from(e: $ty) -> Self {
                HandlerErr {
                    code: e.code(),
                    message: e.to_string(),
                    details: None,
                }
            }
        }
    };
}

domain_err!(RosterError);
domain_err!(SessionError);
domain_err!(AttendanceError);
domain_err!(ExportError);
domain_err!(SubjectError);

/// Wraps a handler body's outcome in the reply envelope.
pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn get_required_index(params: &serde_json::Value, key: &str) -> Result<usize, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing or invalid {}", key)))
}

/// Accepts a number or free text; text is coerced the same way the subject editor does.
pub fn get_total_marks(params: &serde_json::Value, key: &str) -> Result<u32, HandlerErr> {
    match params.get(key) {
        Some(serde_json::Value::Number(n)) => Ok(n
            .as_u64()
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(0)),
        Some(serde_json::Value::String(s)) => Ok(coerce_total_marks(s)),
        _ => Err(HandlerErr::bad_params(format!("missing {}", key))),
    }
}

/// Mark cells arrive as text; numbers are accepted and stringified.
pub fn get_raw_mark(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    match params.get(key) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(serde_json::Value::Null) => Ok(String::new()),
        _ => Err(HandlerErr::bad_params(format!("missing {}", key))),
    }
}

pub fn parse_date(raw: &str, key: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| HandlerErr {
        code: "bad_params",
        message: format!("{} must be YYYY-MM-DD", key),
        details: Some(json!({ "value": raw })),
    })
}

pub fn get_required_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    parse_date(&get_required_str(params, key)?, key)
}

pub fn get_opt_date(params: &serde_json::Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    match get_opt_str(params, key).filter(|s| !s.trim().is_empty()) {
        Some(s) => parse_date(&s, key).map(Some),
        None => Ok(None),
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
