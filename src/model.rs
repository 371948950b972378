use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub roll_no: String,
    pub name: String,
    #[serde(default)]
    pub father_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub students: Vec<Student>,
}

impl ClassGroup {
    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    /// Next unused integer roll number: one past the largest numeric roll number.
    pub fn next_roll_no(&self) -> u32 {
        self.students
            .iter()
            .filter_map(|s| s.roll_no.trim().parse::<u32>().ok())
            .max()
            .map(|n| n.saturating_add(1))
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
}

impl AttendanceStatus {
    /// Present -> Absent -> Leave -> Present.
    pub fn cycle(self) -> Self {
        match self {
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Leave,
            AttendanceStatus::Leave => AttendanceStatus::Present,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, AttendanceStatus::Present)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Some(AttendanceStatus::Present),
            "absent" | "a" => Some(AttendanceStatus::Absent),
            "leave" | "l" => Some(AttendanceStatus::Leave),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeType {
    Holiday,
    Announcement,
    Important,
    Event,
}

impl NoticeType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "holiday" => Some(NoticeType::Holiday),
            "announcement" => Some(NoticeType::Announcement),
            "important" => Some(NoticeType::Important),
            "event" => Some(NoticeType::Event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: NoticeType,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.expiry_date.map(|exp| exp >= day).unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Homework {
    pub id: String,
    pub class_id: String,
    pub subject: String,
    pub description: String,
    pub assigned_date: NaiveDate,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Homework {
    pub fn due_label(&self, today: NaiveDate) -> String {
        let days = (self.due_date - today).num_days();
        match days {
            d if d < 0 => "Overdue".to_string(),
            0 => "Due Today".to_string(),
            1 => "1 day left".to_string(),
            d => format!("{} days left", d),
        }
    }
}
