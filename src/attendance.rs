use crate::model::{AttendanceStatus, ClassGroup, Student};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("no attendance register is open")]
    NotOpen,
    #[error("student not in this class")]
    UnknownStudent,
}

impl AttendanceError {
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::NotOpen => "no_register",
            AttendanceError::UnknownStudent => "not_found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub student: Student,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSheet {
    pub class_id: String,
    pub class_name: String,
    pub date: NaiveDate,
    pub rows: Vec<AttendanceRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceCounts {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub leave: usize,
}

impl AttendanceSheet {
    /// Every student starts out present.
    pub fn open(class: &ClassGroup, date: NaiveDate) -> Self {
        Self {
            class_id: class.id.clone(),
            class_name: class.name.clone(),
            date,
            rows: class
                .students
                .iter()
                .map(|s| AttendanceRow {
                    student: s.clone(),
                    status: AttendanceStatus::Present,
                })
                .collect(),
        }
    }

    pub fn set_status(
        &mut self,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Result<(), AttendanceError> {
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.student.id == student_id)
            .ok_or(AttendanceError::UnknownStudent)?;
        row.status = status;
        Ok(())
    }

    /// Marks everyone with one status, e.g. "all present" before individual edits.
    pub fn set_all(&mut self, status: AttendanceStatus) {
        for row in &mut self.rows {
            row.status = status;
        }
    }

    pub fn counts(&self) -> AttendanceCounts {
        let count = |st: AttendanceStatus| self.rows.iter().filter(|r| r.status == st).count();
        AttendanceCounts {
            total: self.rows.len(),
            present: count(AttendanceStatus::Present),
            absent: count(AttendanceStatus::Absent),
            leave: count(AttendanceStatus::Leave),
        }
    }

    pub fn share_text(&self) -> String {
        format!(
            "Attendance Report for {} - Date: {}",
            self.class_name,
            self.date.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class() -> ClassGroup {
        ClassGroup {
            id: "c1".to_string(),
            name: "Class 6".to_string(),
            students: (1..=4)
                .map(|i| Student {
                    id: format!("s{i}"),
                    roll_no: i.to_string(),
                    name: format!("Student {i}"),
                    father_name: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn register_counts_follow_edits() {
        let day = NaiveDate::from_ymd_opt(2025, 2, 3).expect("date");
        let mut sheet = AttendanceSheet::open(&class(), day);
        assert_eq!(
            sheet.counts(),
            AttendanceCounts {
                total: 4,
                present: 4,
                absent: 0,
                leave: 0
            }
        );
        sheet
            .set_status("s2", AttendanceStatus::Absent)
            .expect("absent");
        sheet.set_status("s4", AttendanceStatus::Leave).expect("leave");
        let c = sheet.counts();
        assert_eq!((c.present, c.absent, c.leave), (2, 1, 1));
        assert_eq!(sheet.rows[1].status, AttendanceStatus::Absent);

        sheet.set_all(AttendanceStatus::Present);
        assert_eq!(sheet.counts().present, 4);
    }

    #[test]
    fn unknown_student_is_an_error() {
        let day = NaiveDate::from_ymd_opt(2025, 2, 3).expect("date");
        let mut sheet = AttendanceSheet::open(&class(), day);
        let e = sheet
            .set_status("nobody", AttendanceStatus::Absent)
            .unwrap_err();
        assert_eq!(e.code(), "not_found");
    }

    #[test]
    fn share_text_names_class_and_date() {
        let day = NaiveDate::from_ymd_opt(2025, 2, 3).expect("date");
        let sheet = AttendanceSheet::open(&class(), day);
        assert_eq!(
            sheet.share_text(),
            "Attendance Report for Class 6 - Date: 2025-02-03"
        );
    }
}
