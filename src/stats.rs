//! Class-level statistics over a ranked result set and the rule-based remark generator.
//!
//! Remark selection takes the random source as a parameter so callers can seed it.

use crate::calc::{round_off_1_decimal, ResultSet};
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performer {
    pub student_id: String,
    pub name: String,
    pub obtained_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub student_count: usize,
    pub grand_total: f64,
    pub average_marks: f64,
    pub average_percentage: f64,
    pub pass_rate: f64,
    pub pass_count: usize,
    pub fail_count: usize,
    pub highest: Option<f64>,
    pub lowest: Option<f64>,
    pub top_performers: Vec<Performer>,
}

pub fn summarize(results: &ResultSet) -> ClassStats {
    let rows = &results.rows;
    let n = rows.len();
    let pass_count = rows.iter().filter(|r| r.passed).count();

    let highest = rows
        .iter()
        .map(|r| r.obtained_total)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));
    let lowest = rows
        .iter()
        .map(|r| r.obtained_total)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.min(v))));

    let top_performers = match highest {
        Some(max) => rows
            .iter()
            .filter(|r| r.obtained_total == max)
            .map(|r| Performer {
                student_id: r.student.id.clone(),
                name: r.student.name.clone(),
                obtained_total: r.obtained_total,
            })
            .collect(),
        None => Vec::new(),
    };

    let (average_marks, average_percentage, pass_rate) = if n > 0 {
        let denom = n as f64;
        (
            rows.iter().map(|r| r.obtained_total).sum::<f64>() / denom,
            rows.iter().map(|r| r.percentage).sum::<f64>() / denom,
            100.0 * pass_count as f64 / denom,
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    ClassStats {
        student_count: n,
        grand_total: results.grand_total,
        average_marks,
        average_percentage,
        pass_rate,
        pass_count,
        fail_count: n - pass_count,
        highest,
        lowest,
        top_performers,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RemarkBand {
    Outstanding,
    Strong,
    Steady,
    Borderline,
    Struggling,
}

impl RemarkBand {
    pub fn for_pass_rate(pass_rate: f64) -> Self {
        if pass_rate >= 90.0 {
            RemarkBand::Outstanding
        } else if pass_rate >= 75.0 {
            RemarkBand::Strong
        } else if pass_rate >= 60.0 {
            RemarkBand::Steady
        } else if pass_rate >= 40.0 {
            RemarkBand::Borderline
        } else {
            RemarkBand::Struggling
        }
    }

    // Placeholders: {pass_rate} {avg_pct} {pass} {total}
    fn templates(self) -> &'static [&'static str] {
        match self {
            RemarkBand::Outstanding => &[
                "Excellent performance! {pass_rate}% of the class passed. Keep up the great work!",
                "Outstanding effort by the entire class, with {pass} of {total} students passing.",
                "Brilliant results: a {pass_rate}% pass rate and a class average of {avg_pct}%.",
            ],
            RemarkBand::Strong => &[
                "Well done! {pass_rate}% passed. A little push will bring the rest along.",
                "The results show dedication and hard work: {pass} of {total} passed.",
            ],
            RemarkBand::Steady => &[
                "Good progress with a {pass_rate}% pass rate. Focus on weaker areas to improve further.",
                "Steady results: class average {avg_pct}%. Revision of weak topics is recommended.",
            ],
            RemarkBand::Borderline => &[
                "Only {pass_rate}% passed. Extra practice sessions are recommended.",
                "{pass} of {total} students passed. Give struggling students extra attention.",
            ],
            RemarkBand::Struggling => &[
                "Room for improvement: the pass rate is {pass_rate}%. Extra attention is needed for struggling students.",
                "Class average is {avg_pct}%. Consider re-teaching core concepts before the next test.",
            ],
        }
    }
}

fn fill_template(template: &str, stats: &ClassStats) -> String {
    template
        .replace("{pass_rate}", &round_off_1_decimal(stats.pass_rate).to_string())
        .replace(
            "{avg_pct}",
            &round_off_1_decimal(stats.average_percentage).to_string(),
        )
        .replace("{pass}", &stats.pass_count.to_string())
        .replace("{total}", &stats.student_count.to_string())
}

fn pick<'a, R: Rng>(rng: &mut R, items: &'a [&'a str]) -> &'a str {
    if items.is_empty() {
        return "";
    }
    items[rng.random_range(0..items.len())]
}

pub fn generate_remark<R: Rng>(stats: &ClassStats, rng: &mut R) -> String {
    let band = RemarkBand::for_pass_rate(stats.pass_rate);
    fill_template(pick(rng, band.templates()), stats)
}

const MOTIVATIONAL_QUOTES: &[&str] = &[
    "Education is the passport to the future.",
    "Every expert was once a beginner.",
    "Success is the sum of small efforts repeated daily.",
    "The beautiful thing about learning is nobody can take it away from you.",
    "Knowledge is power, but enthusiasm pulls the switch.",
    "Strive for progress, not perfection.",
    "Learning never exhausts the mind.",
    "Education is the key to unlock the golden door of freedom.",
];

/// Footer line for award lists.
pub fn motivational_quote<R: Rng>(rng: &mut R) -> &'static str {
    pick(rng, MOTIVATIONAL_QUOTES)
}

/// Multi-line class performance summary shared alongside a result slide.
pub fn analysis_report(title: &str, stats: &ClassStats, remark: &str) -> String {
    let mut out = String::from("Class Performance Summary\n\n");
    if !title.trim().is_empty() {
        out.push_str(&format!("Assessment: {}\n", title.trim()));
    }
    out.push_str(&format!("Total Students: {}\n", stats.student_count));
    out.push_str(&format!(
        "Pass Rate: {}%\n",
        round_off_1_decimal(stats.pass_rate)
    ));
    out.push_str(&format!(
        "Average Marks: {}/{}\n",
        round_off_1_decimal(stats.average_marks),
        stats.grand_total
    ));
    if let (Some(hi), Some(lo)) = (stats.highest, stats.lowest) {
        out.push_str(&format!("Highest: {}  Lowest: {}\n", hi, lo));
    }
    out.push('\n');
    out.push_str("Teacher's Remark: ");
    out.push_str(remark);
    out
}
