//! Hand-off of computed results to renderers.
//!
//! Renderers only ever see an owned [`ExportSnapshot`]; later mark edits
//! cannot reach an export that is already in flight.

use crate::calc::{round_off_1_decimal, ResultSet};
use crate::stats::ClassStats;
use crate::subjects::Subject;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Image,
    Pdf,
    Spreadsheet,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "image" | "png" => Some(ExportFormat::Image),
            "pdf" => Some(ExportFormat::Pdf),
            "spreadsheet" | "csv" | "excel" => Some(ExportFormat::Spreadsheet),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no renderer registered for {0:?}")]
    UnsupportedFormat(ExportFormat),
    #[error("render failed: {0}")]
    Render(String),
    #[error("write failed: {0}")]
    Write(String),
}

impl ExportError {
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::UnsupportedFormat(_) => "unsupported_format",
            ExportError::Render(_) => "export_failed",
            ExportError::Write(_) => "export_write_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportClass {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub class: ExportClass,
    pub exam_name: String,
    pub teacher_name: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub subjects: Vec<Subject>,
    pub results: ResultSet,
    pub stats: ClassStats,
    pub remark: String,
}

impl ExportSnapshot {
    /// Base name for artifacts, e.g. `Award_List_Mid-Term`.
    pub fn file_stem(&self) -> String {
        let title = if self.exam_name.is_empty() {
            self.class.name.as_str()
        } else {
            self.exam_name.as_str()
        };
        let cleaned: String = title
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("Award_List_{}", cleaned)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Capability that turns a snapshot into a shareable file.
pub trait Renderer {
    fn supports(&self, format: ExportFormat) -> bool;
    fn render(&self, snapshot: &ExportSnapshot, format: ExportFormat)
        -> Result<Artifact, ExportError>;
}

/// Award list as CSV: one row per ranked student, then excluded students.
pub struct SpreadsheetRenderer;

impl SpreadsheetRenderer {
    fn write_csv(snapshot: &ExportSnapshot) -> Result<Vec<u8>, csv::Error> {
        let mut w = csv::Writer::from_writer(Vec::new());

        let mut header: Vec<String> = vec![
            "Rank".to_string(),
            "Roll No".to_string(),
            "Name".to_string(),
            "Father Name".to_string(),
        ];
        for s in &snapshot.subjects {
            header.push(format!("{} ({})", s.name, s.total_marks));
        }
        header.extend(
            ["Obtained", "Total", "%", "Status"]
                .iter()
                .map(|s| s.to_string()),
        );
        w.write_record(&header)?;

        for row in &snapshot.results.rows {
            let mut rec: Vec<String> = vec![
                row.rank.to_string(),
                row.student.roll_no.clone(),
                row.student.name.clone(),
                row.student.father_name.clone(),
            ];
            rec.extend(row.per_subject_marks.iter().map(|m| m.obtained.to_string()));
            rec.push(row.obtained_total.to_string());
            rec.push(row.grand_total.to_string());
            rec.push(format!("{:.1}", round_off_1_decimal(row.percentage)));
            rec.push(if row.passed { "PASS" } else { "FAIL" }.to_string());
            w.write_record(&rec)?;
        }

        for ex in &snapshot.results.excluded {
            let mut rec: Vec<String> = vec![
                "-".to_string(),
                ex.student.roll_no.clone(),
                ex.student.name.clone(),
                ex.student.father_name.clone(),
            ];
            rec.extend(snapshot.subjects.iter().map(|_| "-".to_string()));
            rec.push("-".to_string());
            rec.push(snapshot.results.grand_total.to_string());
            rec.push("-".to_string());
            rec.push(format!("{:?}", ex.status).to_uppercase());
            w.write_record(&rec)?;
        }

        w.flush()?;
        w.into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

impl Renderer for SpreadsheetRenderer {
    fn supports(&self, format: ExportFormat) -> bool {
        format == ExportFormat::Spreadsheet
    }

    fn render(
        &self,
        snapshot: &ExportSnapshot,
        format: ExportFormat,
    ) -> Result<Artifact, ExportError> {
        if !self.supports(format) {
            return Err(ExportError::UnsupportedFormat(format));
        }
        let bytes = Self::write_csv(snapshot).map_err(|e| ExportError::Render(e.to_string()))?;
        Ok(Artifact {
            file_name: format!("{}.csv", snapshot.file_stem()),
            mime: "text/csv",
            bytes,
        })
    }
}

/// The first renderer that supports the requested format wins.
pub struct RendererRegistry {
    renderers: Vec<Box<dyn Renderer>>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self {
            renderers: vec![Box::new(SpreadsheetRenderer)],
        }
    }
}

impl RendererRegistry {
    /// Later registrations take precedence over the built-in spreadsheet renderer.
    #[cfg(test)]
    pub fn register(&mut self, renderer: Box<dyn Renderer>) {
        self.renderers.insert(0, renderer);
    }

    pub fn supported(&self) -> Vec<ExportFormat> {
        [ExportFormat::Image, ExportFormat::Pdf, ExportFormat::Spreadsheet]
            .into_iter()
            .filter(|f| self.renderers.iter().any(|r| r.supports(*f)))
            .collect()
    }

    pub fn render(
        &self,
        snapshot: &ExportSnapshot,
        format: ExportFormat,
    ) -> Result<Artifact, ExportError> {
        let renderer = self
            .renderers
            .iter()
            .find(|r| r.supports(format))
            .ok_or(ExportError::UnsupportedFormat(format))?;
        renderer.render(snapshot, format)
    }
}
