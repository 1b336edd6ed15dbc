//! CLI entry point for the transcript rater.
//!
//! Provides subcommands for converting a single student's grade file,
//! validating one without converting it, converting a whole roster, and
//! printing the active equivalence table.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transcript_rater::batch::convert_roster;
use transcript_rater::config::EngineConfig;
use transcript_rater::engine::TranscriptEngine;
use transcript_rater::engine::types::has_errors;
use transcript_rater::engine::validate::validate_entries;
use transcript_rater::output::{TranscriptReport, log_diagnostics, print_json, write_report};
use transcript_rater::source::{FileReader, load_grades};

#[derive(Parser)]
#[command(name = "transcript_rater")]
#[command(about = "Converts French 0-20 transcripts into letter grades, GPA and ECTS totals", long_about = None)]
struct Cli {
    /// JSON file overriding thresholds and the equivalence table
    #[arg(long, global = true, env = "TRANSCRIPT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one student's grade file
    Convert {
        /// Path to the grade file (JSON)
        #[arg(value_name = "GRADES")]
        source: String,

        /// Write the report to this file instead of logging it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Student identifier recorded in the report
        #[arg(long)]
        student_id: Option<String>,
    },
    /// Check a grade file without converting it
    Validate {
        /// Path to the grade file (JSON)
        #[arg(value_name = "GRADES")]
        source: String,
    },
    /// Convert every student of a long-format CSV roster
    Batch {
        /// Path to the roster CSV
        #[arg(value_name = "ROSTER")]
        roster: String,

        /// Directory for per-student reports and the summary CSV
        #[arg(short = 'd', long, default_value = "transcripts")]
        output_dir: PathBuf,

        /// Maximum number of students converted at once
        #[arg(short, long, default_value_t = 8)]
        concurrency: usize,

        /// Gzip the summary CSV once the batch is done
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Print the active equivalence table
    Table,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transcript_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transcript_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config = Arc::new(EngineConfig::load_or_default(cli.config.as_deref())?);
    let engine = TranscriptEngine::new(config);

    match cli.command {
        Commands::Convert {
            source,
            output,
            student_id,
        } => {
            convert_one(&engine, &source, output.as_deref(), student_id.as_deref()).await?;
        }
        Commands::Validate { source } => {
            let record = load_grades(&FileReader::new(), &source).await?;
            let mut diagnostics = record.diagnostics;
            diagnostics.extend(validate_entries(engine.config(), &record.entries));

            log_diagnostics(&diagnostics);
            info!(
                courses = record.entries.len(),
                diagnostics = diagnostics.len(),
                "Validation finished"
            );
            if has_errors(&diagnostics) {
                bail!("grade file '{source}' has blocking errors");
            }
        }
        Commands::Batch {
            roster,
            output_dir,
            concurrency,
            gzip,
        } => {
            convert_roster(&engine, &FileReader::new(), &roster, &output_dir, concurrency, gzip)
                .await?;
        }
        Commands::Table => {
            let table = &engine.config().table;
            for band in table.bands().iter().rev() {
                let upper = band
                    .upper_bound
                    .map_or_else(|| "-".to_string(), |u| u.to_string());
                info!(
                    letter = %band.letter,
                    gpa = band.gpa,
                    lower = band.lower_bound,
                    upper = %upper,
                    "Band"
                );
            }
            info!(letter = table.not_applicable_letter(), "Not applicable");
        }
    }

    Ok(())
}

/// Converts one grade file and writes or logs the report. Fails after
/// emitting the report when it must not be rendered.
#[tracing::instrument(skip(engine, output))]
async fn convert_one(
    engine: &TranscriptEngine,
    source: &str,
    output: Option<&Path>,
    student_id: Option<&str>,
) -> Result<()> {
    let record = load_grades(&FileReader::new(), source).await?;
    let conversion = engine
        .convert(&record.entries)?
        .with_prior_diagnostics(record.diagnostics);

    log_diagnostics(&conversion.diagnostics);
    let report = TranscriptReport::from_conversion(student_id, &conversion);

    match output {
        Some(path) => {
            write_report(path, &report)?;
            info!(path = %path.display(), "Report written");
        }
        None => print_json(&report)?,
    }

    if !report.renderable {
        bail!("record '{source}' has blocking errors and must not be rendered");
    }
    Ok(())
}
