use crate::config::EngineConfig;
use crate::engine::aggregate::summarize;
use crate::engine::compensate::resolve;
use crate::engine::error::EngineResult;
use crate::engine::evaluate::evaluate;
use crate::engine::types::{
    CourseEntry, CourseResult, DiagnosticClass, TranscriptSummary, ValidationDiagnostic, has_errors,
};
use crate::engine::validate::{is_evaluable, validate_entries, validate_transcript};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Everything one conversion request produces.
///
/// `results` and `summary` cover only the courses that could be evaluated;
/// when `diagnostics` holds an error the record must not be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub results: Vec<CourseResult>,
    pub summary: TranscriptSummary,
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl Conversion {
    pub fn is_renderable(&self) -> bool {
        !has_errors(&self.diagnostics)
    }

    /// Puts diagnostics gathered before conversion (e.g. during ingestion)
    /// ahead of the engine's own.
    pub fn with_prior_diagnostics(mut self, mut prior: Vec<ValidationDiagnostic>) -> Self {
        prior.append(&mut self.diagnostics);
        self.diagnostics = prior;
        self
    }
}

/// Stateless converter holding the shared, read-only configuration.
///
/// Cloning is cheap; clones share the same configuration.
#[derive(Debug, Clone)]
pub struct TranscriptEngine {
    config: Arc<EngineConfig>,
}

impl TranscriptEngine {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs validation, evaluation, compensation, aggregation and the
    /// consistency pass over one student's courses.
    ///
    /// Courses with blocking grade or credit problems are left out of the
    /// results; their diagnostics explain why.
    ///
    /// # Errors
    ///
    /// Only fails on engine defects, such as a grade that passed validation
    /// but matches no equivalence band.
    #[tracing::instrument(skip_all, fields(courses = entries.len()))]
    pub fn convert(&self, entries: &[CourseEntry]) -> EngineResult<Conversion> {
        let config = self.config.as_ref();
        let mut diagnostics = validate_entries(config, entries);

        let evaluated = entries
            .iter()
            .filter(|entry| {
                let ok = is_evaluable(config, entry);
                if !ok {
                    debug!(course = %entry.name, "Course skipped, not evaluable");
                }
                ok
            })
            .map(|entry| evaluate(config, entry))
            .collect::<EngineResult<Vec<_>>>()?;

        let results = resolve(&evaluated, config.compensation_threshold);
        let summary = summarize(&results);

        let faults = validate_transcript(config, &results, &summary);
        for fault in &faults {
            error!(engine_fault = true, field = %fault.field, "{}", fault.message);
        }
        diagnostics.extend(faults);

        let input_errors = diagnostics
            .iter()
            .filter(|d| d.is_error() && d.class != DiagnosticClass::Consistency)
            .count();
        if input_errors > 0 {
            warn!(input_errors, "Record has blocking input errors");
        }

        Ok(Conversion {
            results,
            summary,
            diagnostics,
        })
    }
}
