//! Roster conversion: one report per student plus a summary CSV.
//!
//! Students are converted concurrently. A student that fails is recorded in
//! the summary with its error and never stops the others.

use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;
use tracing::{error, info, warn};

use crate::engine::TranscriptEngine;
use crate::ingest::IngestedRecord;
use crate::output::{
    SummaryRow, TranscriptReport, append_record, gzip_file, log_diagnostics, write_report,
};
use crate::source::{RecordReader, load_roster};

/// Where a batch run put its files, plus one summary row per roster entry.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub rows: Vec<SummaryRow>,
    /// Summary CSV, `.csv.gz` when compressed. `None` for an empty roster.
    pub summary_path: Option<PathBuf>,
}

/// Converts every student of a roster, writing one JSON report per student
/// into `output_dir` and one summary row each into `summary.csv`.
///
/// # Errors
///
/// Fails only when the roster cannot be read or the output directory or
/// summary file cannot be written.
#[tracing::instrument(skip(engine, reader, output_dir, gzip), fields(output_dir = %output_dir.display()))]
pub async fn convert_roster<R: RecordReader>(
    engine: &TranscriptEngine,
    reader: &R,
    roster: &str,
    output_dir: &Path,
    concurrency: usize,
    gzip: bool,
) -> Result<BatchOutcome> {
    let records = load_roster(reader, roster).await?;
    info!(students = records.len(), "Roster ready for processing");

    // Create output directory if it doesn't exist
    std::fs::create_dir_all(output_dir)?;

    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
    let mut tasks = vec![];
    let mut rows = Vec::with_capacity(records.len());
    let mut used_names = HashSet::new();

    for record in records {
        // Rows without a student id cannot be attributed to anyone
        let Some(student_id) = record.student_id.clone() else {
            warn!(
                rows = record.entries.len() + record.diagnostics.len(),
                "Skipping roster rows without a student id"
            );
            log_diagnostics(&record.diagnostics);
            rows.push(SummaryRow::from_error(
                "",
                "missing_student_id",
                &format!(
                    "{} roster row(s) have no student id",
                    record.entries.len() + record.diagnostics.len()
                ),
            ));
            continue;
        };

        let sem = semaphore.clone();
        let engine = engine.clone();
        let report_path = output_dir.join(report_file_name(&student_id, &mut used_names));

        let student_span = tracing::info_span!("process_student", student_id = %student_id);

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire().await?;
                Ok::<_, anyhow::Error>(convert_student(&engine, &student_id, record, &report_path))
            }
            .instrument(student_span),
        );
        tasks.push(task);
    }

    // Wait for all tasks to complete
    for task in tasks {
        match task.await {
            Ok(Ok(row)) => rows.push(row),
            Ok(Err(e)) => error!(error = %e, "Student task failed"),
            Err(e) => error!(error = %e, "Student task panicked"),
        }
    }

    if rows.is_empty() {
        warn!("Roster has no students, no summary written");
        return Ok(BatchOutcome {
            rows,
            summary_path: None,
        });
    }

    let mut summary_path = output_dir.join("summary.csv");
    for row in &rows {
        append_record(&summary_path, row)?;
    }

    let blocked = rows
        .iter()
        .filter(|r| r.errors > 0 || r.error_type.is_some())
        .count();
    info!(
        converted = rows.len(),
        blocked,
        summary = %summary_path.display(),
        "Finished processing roster"
    );

    if gzip {
        summary_path = gzip_file(&summary_path)?;
        info!(path = %summary_path.display(), "Summary compressed");
    }

    Ok(BatchOutcome {
        rows,
        summary_path: Some(summary_path),
    })
}

/// Runs one student through the engine and writes the report. Failures are
/// folded into the returned row so the batch keeps going.
pub fn convert_student(
    engine: &TranscriptEngine,
    student_id: &str,
    record: IngestedRecord,
    report_path: &Path,
) -> SummaryRow {
    let conversion = match engine.convert(&record.entries) {
        Ok(conversion) => conversion.with_prior_diagnostics(record.diagnostics),
        Err(e) => {
            error!(error = %e, "Conversion failed");
            return SummaryRow::from_error(student_id, "engine_error", &e.to_string());
        }
    };

    log_diagnostics(&conversion.diagnostics);
    let report = TranscriptReport::from_conversion(Some(student_id), &conversion);
    if let Err(e) = write_report(report_path, &report) {
        error!(error = %e, "Failed to write report");
        return SummaryRow::from_error(student_id, "write_error", &e.to_string());
    }

    if report.renderable {
        info!(path = %report_path.display(), "Student converted successfully");
    } else {
        warn!(
            diagnostics = report.diagnostics.len(),
            path = %report_path.display(),
            "Student has blocking errors"
        );
    }
    SummaryRow::from_report(&report)
}

/// Picks a report file name for `student_id` that no earlier student of the
/// run has taken. Ids that only differ in unsafe characters get a numeric
/// suffix: `a.b` and `a_b` become `student_id=a_b.json` and
/// `student_id=a_b-2.json`.
fn report_file_name(student_id: &str, used: &mut HashSet<String>) -> String {
    let base = file_safe(student_id);
    let mut stem = base.clone();
    let mut n = 1;
    while !used.insert(stem.clone()) {
        n += 1;
        stem = format!("{base}-{n}");
    }
    format!("student_id={stem}.json")
}

fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
