use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub name: String,
    pub total_marks: u32,
}

impl Subject {
    pub fn new(name: impl Into<String>, total_marks: u32) -> Self {
        Self {
            name: name.into(),
            total_marks,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubjectError {
    #[error("subject index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("unknown subject field: {0}")]
    UnknownField(String),
}

impl SubjectError {
    pub fn code(&self) -> &'static str {
        match self {
            SubjectError::IndexOutOfRange { .. } => "not_found",
            SubjectError::UnknownField(_) => "bad_params",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectField {
    Name,
    TotalMarks,
}

impl SubjectField {
    pub fn parse(raw: &str) -> Result<Self, SubjectError> {
        match raw {
            "name" => Ok(SubjectField::Name),
            "total" | "totalMarks" | "max" => Ok(SubjectField::TotalMarks),
            other => Err(SubjectError::UnknownField(other.to_string())),
        }
    }
}

/// Coerces free-form input to a cap. Anything that is not a non-negative integer becomes 0.
pub fn coerce_total_marks(raw: &str) -> u32 {
    let t = raw.trim();
    if let Ok(n) = t.parse::<u32>() {
        return n;
    }
    // Mirrors integer parsing of a leading numeric prefix ("75 marks" -> 75).
    let digits: String = t.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u32>().unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLevel {
    Primary,
    Middle,
    Matric,
    Inter,
    Default,
}

const PRIMARY_KEYS: &[&str] = &["1", "2", "3", "4", "5", "primary"];
const MIDDLE_KEYS: &[&str] = &["6", "7", "8", "middle"];
const MATRIC_KEYS: &[&str] = &["9", "10", "matric"];
const INTER_KEYS: &[&str] = &["11", "12", "inter", "fsc", "ics"];

/// First matching keyword group wins, in primary/middle/matric/inter order.
/// Labels like "Class 10" therefore land in the primary group because they contain "1".
pub fn classify_level(label: &str) -> ClassLevel {
    let name = label.to_lowercase();
    let hit = |keys: &[&str]| keys.iter().any(|k| name.contains(k));
    if hit(PRIMARY_KEYS) {
        ClassLevel::Primary
    } else if hit(MIDDLE_KEYS) {
        ClassLevel::Middle
    } else if hit(MATRIC_KEYS) {
        ClassLevel::Matric
    } else if hit(INTER_KEYS) {
        ClassLevel::Inter
    } else {
        ClassLevel::Default
    }
}

pub fn suggest_presets(class_label: &str) -> Vec<Subject> {
    let table: &[(&str, u32)] = match classify_level(class_label) {
        ClassLevel::Primary => &[
            ("Urdu", 100),
            ("English", 100),
            ("Mathematics", 100),
            ("Nazra Quran", 50),
            ("General Science", 50),
            ("Islamiat", 50),
        ],
        ClassLevel::Middle => &[
            ("Urdu", 100),
            ("English", 100),
            ("Mathematics", 100),
            ("Science", 100),
            ("Social Studies", 75),
            ("Islamiat", 50),
            ("Arabic", 50),
        ],
        ClassLevel::Matric => &[
            ("Physics", 75),
            ("Chemistry", 75),
            ("Biology", 75),
            ("Mathematics", 100),
            ("English", 100),
            ("Urdu", 100),
            ("Islamiat", 50),
            ("Pak Studies", 50),
            ("Computer", 50),
        ],
        ClassLevel::Inter => &[
            ("Physics", 100),
            ("Chemistry", 100),
            ("Biology/Math", 100),
            ("English", 100),
            ("Urdu", 100),
        ],
        ClassLevel::Default => &[("Urdu", 100), ("English", 100), ("Mathematics", 100)],
    };
    table.iter().map(|(n, t)| Subject::new(*n, *t)).collect()
}

/// Subject names offered for a single-subject test.
pub fn subject_name_suggestions(class_label: &str) -> Vec<&'static str> {
    match classify_level(class_label) {
        ClassLevel::Primary => vec![
            "Urdu",
            "English",
            "Mathematics",
            "Nazra Quran",
            "General Science",
            "Islamiat",
            "Drawing",
        ],
        ClassLevel::Middle => vec![
            "Urdu",
            "English",
            "Mathematics",
            "Science",
            "Social Studies",
            "Islamiat",
            "Arabic",
            "Computer",
        ],
        ClassLevel::Matric => vec![
            "Physics",
            "Chemistry",
            "Biology",
            "Mathematics",
            "English",
            "Urdu",
            "Islamiat",
            "Pak Studies",
            "Computer",
        ],
        ClassLevel::Inter => vec![
            "Physics",
            "Chemistry",
            "Biology",
            "Mathematics",
            "English",
            "Urdu",
            "Computer Science",
        ],
        ClassLevel::Default => vec![
            "Urdu",
            "English",
            "Mathematics",
            "Islamiat",
            "General Science",
        ],
    }
}

/// Extra assessment portions that can be appended to an exam.
pub fn portion_suggestions() -> Vec<Subject> {
    vec![
        Subject::new("Viva/Oral", 10),
        Subject::new("Grading Marks", 10),
        Subject::new("Practical", 20),
        Subject::new("Project", 15),
        Subject::new("Lab Work", 10),
        Subject::new("Attendance", 5),
    ]
}

/// Ordered subject configuration for one assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubjectList {
    subjects: Vec<Subject>,
}

impl SubjectList {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    pub fn presets_for(class_label: &str) -> Self {
        Self::new(suggest_presets(class_label))
    }

    pub fn as_slice(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Subject, SubjectError> {
        self.subjects.get(index).ok_or(SubjectError::IndexOutOfRange {
            index,
            len: self.subjects.len(),
        })
    }

    pub fn grand_total(&self) -> u64 {
        self.subjects.iter().map(|s| u64::from(s.total_marks)).sum()
    }

    pub fn add(&mut self, name: &str, total_marks: u32) {
        self.subjects.push(Subject::new(name.trim(), total_marks));
    }

    pub fn remove(&mut self, index: usize) -> Result<Subject, SubjectError> {
        self.get(index)?;
        Ok(self.subjects.remove(index))
    }

    pub fn update(
        &mut self,
        index: usize,
        field: SubjectField,
        value: &str,
    ) -> Result<&Subject, SubjectError> {
        let len = self.subjects.len();
        let subject = self
            .subjects
            .get_mut(index)
            .ok_or(SubjectError::IndexOutOfRange { index, len })?;
        match field {
            SubjectField::Name => subject.name = value.to_string(),
            SubjectField::TotalMarks => subject.total_marks = coerce_total_marks(value),
        }
        Ok(subject)
    }

    /// Cap for a subject name. Duplicate names share the smallest cap.
    pub fn cap_for(&self, name: &str) -> Option<u32> {
        self.subjects
            .iter()
            .filter(|s| s.name == name)
            .map(|s| s.total_marks)
            .min()
    }

    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut dups = Vec::new();
        for s in &self.subjects {
            let count = seen.entry(s.name.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                dups.push(s.name.clone());
            }
        }
        dups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_follow_keyword_order() {
        assert_eq!(classify_level("Class 3-B"), ClassLevel::Primary);
        assert_eq!(classify_level("Middle Section"), ClassLevel::Middle);
        assert_eq!(classify_level("Grade 7"), ClassLevel::Middle);
        assert_eq!(classify_level("9th Blue"), ClassLevel::Matric);
        assert_eq!(classify_level("MATRIC science"), ClassLevel::Matric);
        assert_eq!(classify_level("FSc Pre-Eng"), ClassLevel::Inter);
        assert_eq!(classify_level("Nursery"), ClassLevel::Default);
        // "10" contains "1", so the primary group wins.
        assert_eq!(classify_level("Class 10"), ClassLevel::Primary);
    }

    #[test]
    fn matric_preset_totals() {
        let subjects = SubjectList::presets_for("matric");
        assert_eq!(subjects.len(), 9);
        assert_eq!(subjects.as_slice()[0], Subject::new("Physics", 75));
        assert_eq!(subjects.grand_total(), 675);
    }

    #[test]
    fn default_preset_is_three_core_subjects() {
        let subjects = suggest_presets("KG");
        let names: Vec<&str> = subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Urdu", "English", "Mathematics"]);
    }

    #[test]
    fn invalid_total_coerces_to_zero() {
        assert_eq!(coerce_total_marks("75"), 75);
        assert_eq!(coerce_total_marks(" 60 "), 60);
        assert_eq!(coerce_total_marks("40abc"), 40);
        assert_eq!(coerce_total_marks("abc"), 0);
        assert_eq!(coerce_total_marks("-20"), 0);
        assert_eq!(coerce_total_marks(""), 0);
    }

    #[test]
    fn crud_on_subject_list() {
        let mut list = SubjectList::default();
        list.add("Math", 100);
        list.add("  Eng ", 50);
        assert_eq!(list.as_slice()[1].name, "Eng");

        list.update(1, SubjectField::TotalMarks, "x")
            .expect("update total");
        assert_eq!(list.as_slice()[1].total_marks, 0);
        list.update(0, SubjectField::Name, "Maths").expect("rename");
        assert_eq!(list.as_slice()[0].name, "Maths");

        assert_eq!(
            list.update(5, SubjectField::Name, "x").unwrap_err(),
            SubjectError::IndexOutOfRange { index: 5, len: 2 }
        );
        let removed = list.remove(0).expect("remove");
        assert_eq!(removed.name, "Maths");
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn duplicate_names_share_smallest_cap() {
        let list = SubjectList::new(vec![
            Subject::new("Math", 100),
            Subject::new("Eng", 100),
            Subject::new("Math", 50),
            Subject::new("Math", 75),
        ]);
        assert_eq!(list.cap_for("Math"), Some(50));
        assert_eq!(list.cap_for("Bio"), None);
        assert_eq!(list.duplicate_names(), vec!["Math".to_string()]);
    }

    #[test]
    fn portion_suggestions_are_small_caps() {
        let portions = portion_suggestions();
        assert_eq!(portions.len(), 6);
        assert!(portions.iter().all(|p| p.total_marks <= 20));
    }
}
