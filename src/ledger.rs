use crate::model::AttendanceStatus;
use crate::subjects::{SubjectError, SubjectList};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// What to do with a mark outside `[0, cap]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkPolicy {
    #[default]
    Reject,
    Clamp,
}

impl MarkPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(MarkPolicy::Reject),
            "clamp" => Some(MarkPolicy::Clamp),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MarkError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("marks cannot be negative")]
    Negative { value: f64 },
    #[error("marks cannot exceed {cap}")]
    ExceedsCap { value: f64, cap: u32 },
    #[error(transparent)]
    Subject(#[from] SubjectError),
}

impl MarkError {
    pub fn code(&self) -> &'static str {
        match self {
            MarkError::NotANumber(_) => "bad_mark",
            MarkError::Negative { .. } | MarkError::ExceedsCap { .. } => "mark_out_of_range",
            MarkError::Subject(e) => e.code(),
        }
    }
}

/// Parses raw mark input. Blank input means "no entry".
pub fn parse_mark(raw: &str) -> Result<Option<f64>, MarkError> {
    let t = raw.trim();
    if t.is_empty() {
        return Ok(None);
    }
    match t.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(MarkError::NotANumber(t.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MarkWrite {
    Stored { value: f64, clamped: bool },
    Cleared,
    /// Student is not present for this assessment.
    Skipped,
}

/// Sparse (student, subject name) -> obtained marks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkLedger {
    marks: HashMap<(String, String), f64>,
}

impl MarkLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, student_id: &str, subject_name: &str) -> Option<f64> {
        self.marks
            .get(&(student_id.to_string(), subject_name.to_string()))
            .copied()
    }

    /// Missing entries count as zero.
    pub fn obtained(&self, student_id: &str, subject_name: &str) -> f64 {
        self.get(student_id, subject_name).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    pub fn set_mark(
        &mut self,
        subjects: &SubjectList,
        student_id: &str,
        subject_index: usize,
        raw: &str,
        status: AttendanceStatus,
        policy: MarkPolicy,
    ) -> Result<MarkWrite, MarkError> {
        let subject = subjects.get(subject_index)?;
        if !status.is_present() {
            return Ok(MarkWrite::Skipped);
        }
        let key = (student_id.to_string(), subject.name.clone());
        let Some(value) = parse_mark(raw)? else {
            self.marks.remove(&key);
            return Ok(MarkWrite::Cleared);
        };
        let cap = subjects.cap_for(&subject.name).unwrap_or(subject.total_marks);
        let cap_f = f64::from(cap);

        let (stored, clamped) = match policy {
            MarkPolicy::Reject => {
                if value < 0.0 {
                    return Err(MarkError::Negative { value });
                }
                if value > cap_f {
                    return Err(MarkError::ExceedsCap { value, cap });
                }
                (value, false)
            }
            MarkPolicy::Clamp => {
                let v = value.clamp(0.0, cap_f);
                (v, v != value)
            }
        };
        self.marks.insert(key, stored);
        Ok(MarkWrite::Stored {
            value: stored,
            clamped,
        })
    }

    /// Drops entries for subjects no longer configured and entries above a lowered cap.
    /// Returns how many entries were removed.
    pub fn retain_valid(&mut self, subjects: &SubjectList) -> usize {
        let before = self.marks.len();
        self.marks.retain(|(_, name), v| match subjects.cap_for(name) {
            Some(cap) => *v >= 0.0 && *v <= f64::from(cap),
            None => false,
        });
        before - self.marks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subjects::Subject;

    fn subjects() -> SubjectList {
        SubjectList::new(vec![Subject::new("Math", 100), Subject::new("Eng", 50)])
    }

    const P: AttendanceStatus = AttendanceStatus::Present;

    #[test]
    fn exact_cap_is_accepted_and_just_over_is_rejected() {
        let subjects = subjects();
        let mut ledger = MarkLedger::new();
        let w = ledger
            .set_mark(&subjects, "s1", 0, "100", P, MarkPolicy::Reject)
            .expect("at cap");
        assert_eq!(
            w,
            MarkWrite::Stored {
                value: 100.0,
                clamped: false
            }
        );
        let e = ledger
            .set_mark(&subjects, "s1", 0, "100.01", P, MarkPolicy::Reject)
            .unwrap_err();
        assert_eq!(e.code(), "mark_out_of_range");
        assert_eq!(ledger.get("s1", "Math"), Some(100.0));
    }

    #[test]
    fn rejected_write_leaves_ledger_unchanged() {
        let subjects = subjects();
        let mut ledger = MarkLedger::new();
        ledger
            .set_mark(&subjects, "s1", 0, "40", P, MarkPolicy::Reject)
            .expect("store");
        let snapshot = ledger.clone();
        assert!(matches!(
            ledger.set_mark(&subjects, "s1", 0, "105", P, MarkPolicy::Reject),
            Err(MarkError::ExceedsCap { cap: 100, .. })
        ));
        assert!(matches!(
            ledger.set_mark(&subjects, "s1", 0, "-5", P, MarkPolicy::Reject),
            Err(MarkError::Negative { .. })
        ));
        assert!(matches!(
            ledger.set_mark(&subjects, "s1", 0, "abc", P, MarkPolicy::Reject),
            Err(MarkError::NotANumber(_))
        ));
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn clamp_policy_pulls_values_into_range() {
        let subjects = subjects();
        let mut ledger = MarkLedger::new();
        let w = ledger
            .set_mark(&subjects, "s1", 1, "-5", P, MarkPolicy::Clamp)
            .expect("clamp low");
        assert_eq!(
            w,
            MarkWrite::Stored {
                value: 0.0,
                clamped: true
            }
        );
        ledger
            .set_mark(&subjects, "s1", 1, "70", P, MarkPolicy::Clamp)
            .expect("clamp high");
        assert_eq!(ledger.get("s1", "Eng"), Some(50.0));
        assert!(ledger
            .set_mark(&subjects, "s1", 1, "NaN", P, MarkPolicy::Clamp)
            .is_err());
    }

    #[test]
    fn non_present_writes_are_skipped() {
        let subjects = subjects();
        let mut ledger = MarkLedger::new();
        let w = ledger
            .set_mark(
                &subjects,
                "s1",
                0,
                "50",
                AttendanceStatus::Absent,
                MarkPolicy::Reject,
            )
            .expect("skip");
        assert_eq!(w, MarkWrite::Skipped);
        assert!(ledger.is_empty());
    }

    #[test]
    fn blank_input_clears_entry() {
        let subjects = subjects();
        let mut ledger = MarkLedger::new();
        ledger
            .set_mark(&subjects, "s1", 0, "12.5", P, MarkPolicy::Reject)
            .expect("store");
        let w = ledger
            .set_mark(&subjects, "s1", 0, "  ", P, MarkPolicy::Reject)
            .expect("clear");
        assert_eq!(w, MarkWrite::Cleared);
        assert_eq!(ledger.obtained("s1", "Math"), 0.0);
    }

    #[test]
    fn bad_subject_index_is_an_error() {
        let mut ledger = MarkLedger::new();
        let e = ledger
            .set_mark(&subjects(), "s1", 9, "1", P, MarkPolicy::Reject)
            .unwrap_err();
        assert_eq!(e.code(), "not_found");
    }

    #[test]
    fn retain_valid_prunes_after_subject_changes() {
        let mut subjects = subjects();
        let mut ledger = MarkLedger::new();
        ledger
            .set_mark(&subjects, "s1", 0, "90", P, MarkPolicy::Reject)
            .expect("math");
        ledger
            .set_mark(&subjects, "s1", 1, "30", P, MarkPolicy::Reject)
            .expect("eng");
        ledger
            .set_mark(&subjects, "s2", 0, "45", P, MarkPolicy::Reject)
            .expect("math s2");

        subjects
            .update(0, crate::subjects::SubjectField::TotalMarks, "50")
            .expect("lower cap");
        subjects.remove(1).expect("remove eng");

        assert_eq!(ledger.retain_valid(&subjects), 2);
        assert_eq!(ledger.get("s2", "Math"), Some(45.0));
        assert_eq!(ledger.get("s1", "Math"), None);
    }
}
