//! Assessment authoring session.
//!
//! Stages run strictly forward: select class, configure subjects, enter marks,
//! review/export. `back` returns to the preceding stage keeping all data;
//! `restart` discards everything.

use crate::calc::{self, ResultSet};
use crate::export::{ExportClass, ExportSnapshot};
use crate::ledger::{MarkError, MarkLedger, MarkPolicy, MarkWrite};
use crate::model::{AttendanceStatus, ClassGroup};
use crate::subjects::{SubjectError, SubjectField, SubjectList};
use crate::stats;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    SelectClass,
    ConfigureSubjects,
    EnterMarks,
    Review,
}

impl Stage {
    fn next(self) -> Option<Stage> {
        match self {
            Stage::SelectClass => Some(Stage::ConfigureSubjects),
            Stage::ConfigureSubjects => Some(Stage::EnterMarks),
            Stage::EnterMarks => Some(Stage::Review),
            Stage::Review => None,
        }
    }

    fn prev(self) -> Option<Stage> {
        match self {
            Stage::SelectClass => None,
            Stage::ConfigureSubjects => Some(Stage::SelectClass),
            Stage::EnterMarks => Some(Stage::ConfigureSubjects),
            Stage::Review => Some(Stage::EnterMarks),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not allowed while in stage {actual:?}")]
    WrongStage { actual: Stage },
    #[error("no class selected")]
    NoClass,
    #[error("already at the first stage")]
    AtStart,
    #[error("review is the final stage")]
    AtEnd,
    #[error("student not in this class")]
    UnknownStudent,
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Mark(#[from] MarkError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::WrongStage { .. } => "wrong_stage",
            SessionError::NoClass => "no_class",
            SessionError::AtStart | SessionError::AtEnd => "no_transition",
            SessionError::UnknownStudent => "not_found",
            SessionError::Subject(e) => e.code(),
            SessionError::Mark(e) => e.code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Error,
    Info,
}

/// Transient message shown until `expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub policy: MarkPolicy,
    pub notice_ttl: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            policy: MarkPolicy::Reject,
            notice_ttl: Duration::milliseconds(3000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssessmentSession {
    settings: SessionSettings,
    stage: Stage,
    class: Option<ClassGroup>,
    exam_name: String,
    subjects: SubjectList,
    ledger: MarkLedger,
    attendance: HashMap<String, AttendanceStatus>,
    notification: Option<Notification>,
}

impl AssessmentSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            stage: Stage::SelectClass,
            class: None,
            exam_name: String::new(),
            subjects: SubjectList::default(),
            ledger: MarkLedger::new(),
            attendance: HashMap::new(),
            notification: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn class(&self) -> Option<&ClassGroup> {
        self.class.as_ref()
    }

    pub fn exam_name(&self) -> &str {
        &self.exam_name
    }

    pub fn subjects(&self) -> &SubjectList {
        &self.subjects
    }

    pub fn ledger(&self) -> &MarkLedger {
        &self.ledger
    }

    pub fn attendance(&self) -> &HashMap<String, AttendanceStatus> {
        &self.attendance
    }

    pub fn status_of(&self, student_id: &str) -> AttendanceStatus {
        self.attendance
            .get(student_id)
            .copied()
            .unwrap_or(AttendanceStatus::Present)
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn notification(&self, now: DateTime<Utc>) -> Option<&Notification> {
        self.notification.as_ref().filter(|n| n.is_live(now))
    }

    fn require(&self, allowed: &[Stage]) -> Result<(), SessionError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(SessionError::WrongStage { actual: self.stage })
        }
    }

    fn raise(&mut self, level: NotificationLevel, message: String, now: DateTime<Utc>) {
        self.notification = Some(Notification {
            level,
            message,
            raised_at: now,
            expires_at: now
                .checked_add_signed(self.settings.notice_ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        });
    }

    /// Snapshots the roster and resets subjects to the class presets.
    /// Any earlier customisation and marks are discarded.
    pub fn select_class(&mut self, class: &ClassGroup) -> Result<(), SessionError> {
        self.require(&[Stage::SelectClass])?;
        self.subjects = SubjectList::presets_for(&class.name);
        self.ledger.clear();
        self.attendance = class
            .students
            .iter()
            .map(|s| (s.id.clone(), AttendanceStatus::Present))
            .collect();
        self.notification = None;
        self.class = Some(class.clone());
        tracing::debug!(class_id = %class.id, subjects = self.subjects.len(), "session class selected");
        Ok(())
    }

    pub fn set_exam_name(&mut self, name: &str) -> Result<(), SessionError> {
        self.require(&[Stage::SelectClass, Stage::ConfigureSubjects])?;
        self.exam_name = name.trim().to_string();
        Ok(())
    }

    pub fn next(&mut self) -> Result<Stage, SessionError> {
        if self.stage == Stage::SelectClass && self.class.is_none() {
            return Err(SessionError::NoClass);
        }
        let next = self.stage.next().ok_or(SessionError::AtEnd)?;
        self.stage = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<Stage, SessionError> {
        let prev = self.stage.prev().ok_or(SessionError::AtStart)?;
        self.stage = prev;
        Ok(prev)
    }

    pub fn restart(&mut self) {
        *self = AssessmentSession::new(self.settings);
    }

    pub fn add_subject(&mut self, name: &str, total_marks: u32) -> Result<(), SessionError> {
        self.require(&[Stage::ConfigureSubjects])?;
        self.subjects.add(name, total_marks);
        Ok(())
    }

    /// Appends a canned portion unless a subject of that name is already configured.
    pub fn add_portion(&mut self, name: &str, total_marks: u32) -> Result<bool, SessionError> {
        self.require(&[Stage::ConfigureSubjects])?;
        if self.subjects.cap_for(name).is_some() {
            return Ok(false);
        }
        self.subjects.add(name, total_marks);
        Ok(true)
    }

    pub fn remove_subject(&mut self, index: usize) -> Result<(), SessionError> {
        self.require(&[Stage::ConfigureSubjects])?;
        self.subjects.remove(index)?;
        self.ledger.retain_valid(&self.subjects);
        Ok(())
    }

    pub fn update_subject(
        &mut self,
        index: usize,
        field: SubjectField,
        value: &str,
    ) -> Result<(), SessionError> {
        self.require(&[Stage::ConfigureSubjects])?;
        self.subjects.update(index, field, value)?;
        let dropped = self.ledger.retain_valid(&self.subjects);
        if dropped > 0 {
            tracing::debug!(dropped, "marks invalidated by subject change");
        }
        Ok(())
    }

    fn ensure_student(&self, student_id: &str) -> Result<(), SessionError> {
        let class = self.class.as_ref().ok_or(SessionError::NoClass)?;
        if class.student(student_id).is_none() {
            return Err(SessionError::UnknownStudent);
        }
        Ok(())
    }

    /// A rejected write raises an expiring error notification and leaves the ledger unchanged.
    pub fn set_mark(
        &mut self,
        student_id: &str,
        subject_index: usize,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<MarkWrite, SessionError> {
        self.require(&[Stage::EnterMarks])?;
        self.ensure_student(student_id)?;
        let status = self.status_of(student_id);
        match self.ledger.set_mark(
            &self.subjects,
            student_id,
            subject_index,
            raw,
            status,
            self.settings.policy,
        ) {
            Ok(w) => {
                match w {
                    MarkWrite::Stored {
                        value,
                        clamped: true,
                    } => self.raise(
                        NotificationLevel::Info,
                        format!("marks adjusted to {}", value),
                        now,
                    ),
                    MarkWrite::Stored { .. } | MarkWrite::Cleared => self.notification = None,
                    MarkWrite::Skipped => {}
                }
                Ok(w)
            }
            Err(e) => {
                tracing::warn!(student_id, subject_index, error = %e, "mark rejected");
                self.raise(NotificationLevel::Error, e.to_string(), now);
                Err(e.into())
            }
        }
    }

    pub fn set_status(
        &mut self,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Result<AttendanceStatus, SessionError> {
        self.require(&[Stage::EnterMarks])?;
        self.ensure_student(student_id)?;
        self.attendance.insert(student_id.to_string(), status);
        Ok(status)
    }

    pub fn toggle_status(&mut self, student_id: &str) -> Result<AttendanceStatus, SessionError> {
        let next = self.status_of(student_id).cycle();
        self.set_status(student_id, next)
    }

    pub fn results(&self) -> Result<ResultSet, SessionError> {
        self.require(&[Stage::EnterMarks, Stage::Review])?;
        let class = self.class.as_ref().ok_or(SessionError::NoClass)?;
        Ok(calc::compute_results(
            &class.students,
            &self.subjects,
            &self.ledger,
            &self.attendance,
        ))
    }

    /// Owned copy of the reviewed results for renderers. Review stage only.
    pub fn export_snapshot<R: Rng>(
        &self,
        teacher_name: Option<&str>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<ExportSnapshot, SessionError> {
        self.require(&[Stage::Review])?;
        let class = self.class.as_ref().ok_or(SessionError::NoClass)?;
        let results = self.results()?;
        let summary = stats::summarize(&results);
        let remark = stats::generate_remark(&summary, rng);
        Ok(ExportSnapshot {
            class: ExportClass {
                id: class.id.clone(),
                name: class.name.clone(),
            },
            exam_name: self.exam_name.clone(),
            teacher_name: teacher_name.map(str::to_string),
            generated_at: now,
            subjects: self.subjects.as_slice().to_vec(),
            results,
            stats: summary,
            remark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Student;

    fn class() -> ClassGroup {
        let students = ["A", "B", "C"]
            .iter()
            .map(|n| Student {
                id: n.to_lowercase(),
                roll_no: n.to_string(),
                name: n.to_string(),
                father_name: String::new(),
            })
            .collect();
        ClassGroup {
            id: "c1".to_string(),
            name: "Class 9 Blue".to_string(),
            students,
        }
    }

    fn at_marks() -> AssessmentSession {
        let mut s = AssessmentSession::new(SessionSettings::default());
        s.select_class(&class()).expect("select");
        s.next().expect("to subjects");
        s
    }

    #[test]
    fn cannot_leave_select_without_class() {
        let mut s = AssessmentSession::new(SessionSettings::default());
        assert!(matches!(s.next(), Err(SessionError::NoClass)));
        assert!(matches!(s.back(), Err(SessionError::AtStart)));
    }

    #[test]
    fn selecting_class_loads_presets_and_marks_everyone_present() {
        let s = at_marks();
        assert_eq!(s.stage(), Stage::ConfigureSubjects);
        assert_eq!(s.subjects().len(), 9);
        assert_eq!(s.attendance().len(), 3);
        assert!(s.attendance().values().all(|v| v.is_present()));
    }

    #[test]
    fn operations_are_stage_gated() {
        let mut s = at_marks();
        let now = Utc::now();
        let e = s.set_mark("a", 0, "10", now).unwrap_err();
        assert_eq!(e.code(), "wrong_stage");
        assert!(s.results().is_err());

        s.next().expect("to marks");
        let e = s.add_subject("Drawing", 20).unwrap_err();
        assert_eq!(e.code(), "wrong_stage");
        assert!(s.select_class(&class()).is_err());
    }

    #[test]
    fn back_preserves_marks_and_restart_discards() {
        let mut s = at_marks();
        s.next().expect("to marks");
        s.set_mark("a", 0, "50", Utc::now()).expect("mark");
        s.next().expect("to review");
        assert!(matches!(s.next(), Err(SessionError::AtEnd)));

        s.back().expect("back to marks");
        s.back().expect("back to subjects");
        s.next().expect("forward");
        assert_eq!(s.ledger().get("a", "Physics"), Some(50.0));

        s.restart();
        assert_eq!(s.stage(), Stage::SelectClass);
        assert!(s.class().is_none());
        assert!(s.ledger().is_empty());
        assert!(s.subjects().is_empty());
    }

    #[test]
    fn switching_class_resets_subjects_and_discards_marks() {
        let mut s = at_marks();
        s.add_subject("Drawing", 20).expect("custom subject");
        s.update_subject(0, SubjectField::TotalMarks, "50")
            .expect("edit cap");
        s.next().expect("to marks");
        s.set_mark("a", 0, "40", Utc::now()).expect("mark");
        assert_eq!(s.ledger().len(), 1);

        s.back().expect("back to subjects");
        s.back().expect("back to select");
        let other = ClassGroup {
            id: "c2".to_string(),
            name: "Class 3".to_string(),
            students: class().students,
        };
        s.select_class(&other).expect("select other");
        assert_eq!(s.stage(), Stage::SelectClass);
        assert_eq!(s.subjects(), &SubjectList::presets_for("Class 3"));
        assert!(s.ledger().is_empty());

        s.select_class(&class()).expect("reselect first");
        assert_eq!(s.subjects(), &SubjectList::presets_for("Class 9 Blue"));
        assert!(!s.subjects().as_slice().iter().any(|sub| sub.name == "Drawing"));
        assert!(s.ledger().is_empty());
    }

    #[test]
    fn rejected_mark_raises_expiring_notification() {
        let mut s = at_marks();
        s.next().expect("to marks");
        let now = Utc::now();
        let e = s.set_mark("a", 0, "76", now).unwrap_err();
        assert_eq!(e.code(), "mark_out_of_range");
        let n = s.notification(now).expect("notification");
        assert_eq!(n.level, NotificationLevel::Error);
        assert_eq!(n.message, "marks cannot exceed 75");
        assert!(s
            .notification(now + Duration::milliseconds(3001))
            .is_none());
        assert!(s.ledger().is_empty());
    }

    #[test]
    fn huge_notice_ttl_saturates_instead_of_overflowing() {
        let mut s = AssessmentSession::new(SessionSettings {
            notice_ttl: Duration::milliseconds(10_000_000_000_000_000),
            ..SessionSettings::default()
        });
        s.select_class(&class()).expect("select");
        s.next().expect("subjects");
        s.next().expect("marks");
        let now = Utc::now();
        let e = s.set_mark("a", 0, "999", now).unwrap_err();
        assert_eq!(e.code(), "mark_out_of_range");
        let n = s.notification(now).expect("notification");
        assert_eq!(n.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn toggled_students_leave_the_ranking() {
        let mut s = at_marks();
        s.next().expect("to marks");
        s.set_mark("b", 0, "60", Utc::now()).expect("mark");
        assert_eq!(
            s.toggle_status("b").expect("toggle"),
            AttendanceStatus::Absent
        );
        let w = s.set_mark("b", 1, "60", Utc::now()).expect("skipped");
        assert_eq!(w, MarkWrite::Skipped);

        let rs = s.results().expect("results");
        assert_eq!(rs.rows.len(), 2);
        assert_eq!(rs.excluded.len(), 1);
        assert_eq!(rs.excluded[0].status, AttendanceStatus::Absent);

        assert_eq!(
            s.toggle_status("b").expect("toggle"),
            AttendanceStatus::Leave
        );
        assert_eq!(
            s.toggle_status("b").expect("toggle"),
            AttendanceStatus::Present
        );
        let rs = s.results().expect("results");
        assert_eq!(rs.rows[0].student.id, "b");
        assert_eq!(rs.rows[0].obtained_total, 60.0);
    }

    #[test]
    fn unknown_student_is_rejected() {
        let mut s = at_marks();
        s.next().expect("to marks");
        let e = s.set_mark("zz", 0, "1", Utc::now()).unwrap_err();
        assert_eq!(e.code(), "not_found");
    }

    #[test]
    fn portions_are_not_duplicated() {
        let mut s = at_marks();
        assert!(s.add_portion("Practical", 20).expect("add"));
        assert!(!s.add_portion("Practical", 20).expect("dup"));
        assert_eq!(s.subjects().len(), 10);
    }

    #[test]
    fn clamp_policy_is_honoured() {
        let mut s = AssessmentSession::new(SessionSettings {
            policy: MarkPolicy::Clamp,
            ..SessionSettings::default()
        });
        s.select_class(&class()).expect("select");
        s.next().expect("subjects");
        s.next().expect("marks");
        let w = s.set_mark("a", 0, "-5", Utc::now()).expect("clamped");
        assert_eq!(
            w,
            MarkWrite::Stored {
                value: 0.0,
                clamped: true
            }
        );
        let n = s.notification(Utc::now()).expect("clamp notice");
        assert_eq!(n.level, NotificationLevel::Info);
        assert_eq!(n.message, "marks adjusted to 0");
    }

    #[test]
    fn export_snapshot_is_review_only_and_detached() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut s = at_marks();
        s.set_exam_name("Final").expect("name");
        s.next().expect("marks");
        s.set_mark("a", 0, "70", Utc::now()).expect("mark");
        let mut rng = StdRng::seed_from_u64(9);
        let e = s
            .export_snapshot(Some("Ms. Hina"), Utc::now(), &mut rng)
            .unwrap_err();
        assert_eq!(e.code(), "wrong_stage");

        s.next().expect("review");
        let snap = s
            .export_snapshot(Some("Ms. Hina"), Utc::now(), &mut rng)
            .expect("snapshot");
        assert_eq!(snap.exam_name, "Final");
        assert_eq!(snap.results.rows[0].student.id, "a");
        assert!(!snap.remark.is_empty());

        s.back().expect("marks");
        s.set_mark("a", 0, "10", Utc::now()).expect("edit");
        assert_eq!(snap.results.rows[0].obtained_total, 70.0);
    }
}
