//! Presentation boundary: rounding, JSON reports and CSV summary rows.
//!
//! This is the only place where averages are rounded to two decimals.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::engine::Conversion;
use crate::engine::types::{
    AwardReason, CourseResult, DiagnosticClass, Grade, Severity, TranscriptSummary,
    ValidationDiagnostic,
};
use crate::engine::utility::round2;

/// One course as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseLine {
    pub name: String,
    pub grade: Grade,
    pub letter: String,
    pub gpa: Option<f64>,
    pub earned_credits: f64,
    pub max_credits: f64,
    pub reason: AwardReason,
}

impl From<&CourseResult> for CourseLine {
    fn from(result: &CourseResult) -> Self {
        Self {
            name: result.name.clone(),
            grade: result.raw_grade,
            letter: result.letter.clone(),
            gpa: result.gpa,
            earned_credits: result.earned_credits,
            max_credits: result.max_credits,
            reason: result.reason,
        }
    }
}

/// Summary with averages rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentedSummary {
    pub total_max_credits: f64,
    pub total_earned_credits: f64,
    pub overall_average: Option<f64>,
    pub overall_gpa: Option<f64>,
    pub compensation_applied: bool,
}

impl From<&TranscriptSummary> for PresentedSummary {
    fn from(summary: &TranscriptSummary) -> Self {
        Self {
            total_max_credits: summary.total_max_credits,
            total_earned_credits: summary.total_earned_credits,
            overall_average: summary.overall_average.map(round2),
            overall_gpa: summary.overall_gpa.map(round2),
            compensation_applied: summary.compensation_applied,
        }
    }
}

/// Output contract for the document renderer. `renderable` is false when
/// any error diagnostic is present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptReport {
    pub student_id: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub renderable: bool,
    pub courses: Vec<CourseLine>,
    pub summary: PresentedSummary,
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl TranscriptReport {
    pub fn from_conversion(student_id: Option<&str>, conversion: &Conversion) -> Self {
        Self {
            student_id: student_id.map(str::to_string),
            generated_at: Utc::now(),
            renderable: conversion.is_renderable(),
            courses: conversion.results.iter().map(CourseLine::from).collect(),
            summary: PresentedSummary::from(&conversion.summary),
            diagnostics: conversion.diagnostics.clone(),
        }
    }
}

/// One row of the batch summary CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub timestamp: DateTime<Utc>,
    pub student_id: String,
    pub courses: usize,
    pub total_max_credits: f64,
    pub total_earned_credits: f64,
    pub overall_average: Option<f64>,
    pub overall_gpa: Option<f64>,
    pub compensation_applied: bool,
    pub errors: usize,
    pub warnings: usize,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl SummaryRow {
    pub fn from_report(report: &TranscriptReport) -> Self {
        let errors = report.diagnostics.iter().filter(|d| d.is_error()).count();
        Self {
            timestamp: report.generated_at,
            student_id: report.student_id.clone().unwrap_or_default(),
            courses: report.courses.len(),
            total_max_credits: report.summary.total_max_credits,
            total_earned_credits: report.summary.total_earned_credits,
            overall_average: report.summary.overall_average,
            overall_gpa: report.summary.overall_gpa,
            compensation_applied: report.summary.compensation_applied,
            errors,
            warnings: report.diagnostics.len() - errors,
            error_type: None,
            error_message: None,
        }
    }

    /// Row for a student whose conversion could not run at all.
    pub fn from_error(student_id: &str, error_type: &str, error_message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            student_id: student_id.to_string(),
            courses: 0,
            total_max_credits: 0.0,
            total_earned_credits: 0.0,
            overall_average: None,
            overall_gpa: None,
            compensation_applied: false,
            errors: 0,
            warnings: 0,
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
        }
    }
}

/// Diagnostics caused by the input. Consistency faults are left out; the
/// engine logs those itself as they are found.
pub fn input_diagnostics(
    diagnostics: &[ValidationDiagnostic],
) -> impl Iterator<Item = &ValidationDiagnostic> {
    diagnostics
        .iter()
        .filter(|d| d.class != DiagnosticClass::Consistency)
}

pub fn log_diagnostics(diagnostics: &[ValidationDiagnostic]) {
    for d in input_diagnostics(diagnostics) {
        match d.severity {
            Severity::Error => error!(class = ?d.class, field = %d.field, "{}", d.message),
            Severity::Warning => warn!(class = ?d.class, field = %d.field, "{}", d.message),
        }
    }
}

/// Logs a report as pretty-printed JSON.
pub fn print_json(report: &TranscriptReport) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Writes a report as pretty-printed JSON, replacing any existing file.
pub fn write_report(path: impl AsRef<Path>, report: &TranscriptReport) -> Result<()> {
    let path = path.as_ref();
    let body = serde_json::to_vec_pretty(report)?;
    std::fs::write(path, body).with_context(|| format!("failed to write '{}'", path.display()))?;
    debug!(path = %path.display(), "Report written");
    Ok(())
}

/// Appends a [`SummaryRow`] to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: impl AsRef<Path>, row: &SummaryRow) -> Result<()> {
    let path = path.as_ref();
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(row)?;
    writer.flush()?;

    Ok(())
}

/// Gzip-compresses `path` into `<path>.gz` and removes the original.
pub fn gzip_file(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let contents = std::fs::read(path)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&contents)?;
    let compressed = encoder.finish()?;

    let mut target = path.as_os_str().to_owned();
    target.push(".gz");
    let target = PathBuf::from(target);

    std::fs::write(&target, compressed)?;
    std::fs::remove_file(path)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::TranscriptEngine;
    use crate::engine::types::CourseEntry;
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;
    use std::sync::Arc;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_report() -> TranscriptReport {
        let engine = TranscriptEngine::new(Arc::new(EngineConfig::default()));
        let conversion = engine
            .convert(&[
                CourseEntry::graded("Programming 1", 16.5, 6.0, 6.0),
                CourseEntry::graded("Algorithms", 14.2, 6.0, 6.0),
                CourseEntry::graded("Mathematics", 12.8, 3.0, 3.0),
            ])
            .unwrap();
        TranscriptReport::from_conversion(Some("s1"), &conversion)
    }

    #[test]
    fn test_report_rounds_only_for_presentation() {
        let report = sample_report();
        assert_eq!(report.summary.overall_average, Some(14.84));
        assert_eq!(report.summary.overall_gpa, Some(3.87));
        assert!(report.renderable);
    }

    #[test]
    fn test_report_json_shape() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(json["courses"][0]["letter"], "A+");
        assert_eq!(json["courses"][0]["reason"], "direct-pass");
        assert_eq!(json["student_id"], "s1");
    }

    #[test]
    fn test_input_diagnostics_leave_out_engine_faults() {
        let diagnostics = vec![
            ValidationDiagnostic::error(DiagnosticClass::Range, "A.grade", "grade 25 is outside [0, 20]"),
            ValidationDiagnostic::error(DiagnosticClass::Consistency, "B.reason", "direct pass recorded for grade 8/20"),
            ValidationDiagnostic::warning("C.earned_credits", "source reports 3 of 6 credits"),
        ];
        let fields: Vec<_> = input_diagnostics(&diagnostics).map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["A.grade", "C.earned_credits"]);

        log_diagnostics(&diagnostics);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&sample_report()).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("transcript_rater_test_header.csv");
        let _ = fs::remove_file(&path);

        let row = SummaryRow::from_report(&sample_report());
        append_record(&path, &row).unwrap();
        append_record(&path, &SummaryRow::from_error("s2", "read_error", "boom")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("timestamp")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_gzip_file_round_trip() {
        let path = temp_path("transcript_rater_test_gzip.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();

        let target = gzip_file(&path).unwrap();
        assert!(!Path::new(&path).exists());

        let mut decoded = String::new();
        GzDecoder::new(fs::File::open(&target).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "a,b\n1,2\n");

        fs::remove_file(target).unwrap();
    }

    #[test]
    fn test_write_report() {
        let path = temp_path("transcript_rater_test_report.json");
        write_report(&path, &sample_report()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["renderable"], true);

        fs::remove_file(&path).unwrap();
    }
}
