use crate::ledger::MarkLedger;
use crate::model::{AttendanceStatus, Student};
use crate::subjects::SubjectList;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Pass threshold as a percentage of the applicable grand total.
pub const PASS_PERCENT: f64 = 40.0;

/// One-decimal rounding used for every figure shown to the teacher:
/// `floor(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// Total function: a zero grand total yields 0 rather than NaN.
pub fn percentage(obtained: f64, total: f64) -> f64 {
    if total > 0.0 {
        100.0 * obtained / total
    } else {
        0.0
    }
}

pub fn is_pass(obtained: f64, grand_total: f64) -> bool {
    grand_total > 0.0 && percentage(obtained, grand_total) >= PASS_PERCENT
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMark {
    pub subject: String,
    pub obtained: f64,
    pub total_marks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultRow {
    pub student: Student,
    pub per_subject_marks: Vec<SubjectMark>,
    pub obtained_total: f64,
    pub grand_total: f64,
    pub percentage: f64,
    pub rank: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedRow {
    pub student: Student,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    pub grand_total: f64,
    pub rows: Vec<ExamResultRow>,
    pub excluded: Vec<ExcludedRow>,
}

/// Order for equal totals: higher percentage, then name (case-insensitive), then roster position.
fn compare_rows(a: &(usize, ExamResultRow), b: &(usize, ExamResultRow)) -> Ordering {
    b.1.obtained_total
        .partial_cmp(&a.1.obtained_total)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.1.percentage
                .partial_cmp(&a.1.percentage)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            a.1.student
                .name
                .to_lowercase()
                .cmp(&b.1.student.name.to_lowercase())
        })
        .then_with(|| a.0.cmp(&b.0))
}

/// Students without an attendance entry count as present.
pub fn compute_results(
    roster: &[Student],
    subjects: &SubjectList,
    ledger: &MarkLedger,
    attendance: &HashMap<String, AttendanceStatus>,
) -> ResultSet {
    let grand_total = subjects.grand_total() as f64;
    let mut ranked: Vec<(usize, ExamResultRow)> = Vec::new();
    let mut excluded: Vec<ExcludedRow> = Vec::new();

    for (pos, s) in roster.iter().enumerate() {
        let status = attendance
            .get(&s.id)
            .copied()
            .unwrap_or(AttendanceStatus::Present);
        if !status.is_present() {
            excluded.push(ExcludedRow {
                student: s.clone(),
                status,
            });
            continue;
        }

        let per_subject_marks: Vec<SubjectMark> = subjects
            .as_slice()
            .iter()
            .map(|sub| SubjectMark {
                subject: sub.name.clone(),
                obtained: ledger.obtained(&s.id, &sub.name),
                total_marks: sub.total_marks,
            })
            .collect();
        let obtained_total: f64 = per_subject_marks.iter().map(|m| m.obtained).sum();

        ranked.push((
            pos,
            ExamResultRow {
                student: s.clone(),
                per_subject_marks,
                obtained_total,
                grand_total,
                percentage: percentage(obtained_total, grand_total),
                rank: 0,
                passed: is_pass(obtained_total, grand_total),
            },
        ));
    }

    ranked.sort_by(compare_rows);
    let rows = ranked
        .into_iter()
        .enumerate()
        .map(|(i, (_, mut row))| {
            row.rank = i + 1;
            row
        })
        .collect();

    ResultSet {
        grand_total,
        rows,
        excluded,
    }
}
