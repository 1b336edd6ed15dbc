//! Record validation.
//!
//! Two passes: [`validate_entries`] checks the ingested courses before
//! evaluation, [`validate_transcript`] checks the engine's own output after
//! aggregation. Neither mutates anything; both return every problem found.

use crate::config::EngineConfig;
use crate::engine::types::{
    AwardReason, CourseEntry, CourseResult, DiagnosticClass, Grade, TranscriptSummary,
    ValidationDiagnostic,
};
use crate::engine::utility::{CREDIT_EPSILON, reaches};
use std::collections::HashSet;

fn field_path(entry_name: &str, index: usize, attr: &str) -> String {
    if entry_name.trim().is_empty() {
        format!("courses[{index}].{attr}")
    } else {
        format!("{entry_name}.{attr}")
    }
}

/// Returns `true` when the entry can be safely handed to the evaluator.
pub(crate) fn is_evaluable(config: &EngineConfig, entry: &CourseEntry) -> bool {
    let grade_ok = match entry.raw_grade {
        Grade::NotApplicable => true,
        Grade::Numeric(g) => g.is_finite() && (0.0..=config.scale_max).contains(&g),
    };
    grade_ok && entry.max_credits.is_finite() && entry.max_credits > 0.0
}

/// Structural and range checks on the ingested courses.
pub fn validate_entries(config: &EngineConfig, entries: &[CourseEntry]) -> Vec<ValidationDiagnostic> {
    let mut diagnostics = Vec::new();

    if entries.is_empty() {
        diagnostics.push(ValidationDiagnostic::warning("courses", "record contains no courses"));
    }

    let mut seen = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let name = entry.name.trim();
        let field = |attr: &str| field_path(name, index, attr);

        if name.is_empty() {
            diagnostics.push(ValidationDiagnostic::error(
                DiagnosticClass::Structural,
                field("name"),
                "course name is empty",
            ));
        } else if !seen.insert(name) {
            diagnostics.push(ValidationDiagnostic::error(
                DiagnosticClass::Structural,
                field("name"),
                format!("duplicate course name '{name}'"),
            ));
        }

        if let Grade::Numeric(g) = entry.raw_grade {
            if !g.is_finite() {
                diagnostics.push(ValidationDiagnostic::error(
                    DiagnosticClass::Range,
                    field("grade"),
                    "grade is not a finite number",
                ));
            } else if !(0.0..=config.scale_max).contains(&g) {
                diagnostics.push(ValidationDiagnostic::error(
                    DiagnosticClass::Range,
                    field("grade"),
                    format!("grade {g} is outside [0, {}]", config.scale_max),
                ));
            }
        }

        if !entry.max_credits.is_finite() || entry.max_credits <= 0.0 {
            diagnostics.push(ValidationDiagnostic::error(
                DiagnosticClass::Structural,
                field("max_credits"),
                format!("max credits must be positive, got {}", entry.max_credits),
            ));
        }

        if !entry.earned_credits.is_finite() || entry.earned_credits < 0.0 {
            diagnostics.push(ValidationDiagnostic::error(
                DiagnosticClass::Structural,
                field("earned_credits"),
                format!("earned credits must be non-negative, got {}", entry.earned_credits),
            ));
        } else if entry.earned_credits > entry.max_credits {
            diagnostics.push(ValidationDiagnostic::error(
                DiagnosticClass::Structural,
                field("earned_credits"),
                format!(
                    "earned credits {} exceed max credits {}",
                    entry.earned_credits, entry.max_credits
                ),
            ));
        } else {
            check_reported_credits(config, entry, &field("earned_credits"), &mut diagnostics);
        }
    }

    diagnostics
}

/// Warns when the source's credit figure disagrees with the all-or-nothing award.
fn check_reported_credits(
    config: &EngineConfig,
    entry: &CourseEntry,
    field: &str,
    diagnostics: &mut Vec<ValidationDiagnostic>,
) {
    match entry.raw_grade {
        Grade::NotApplicable if entry.earned_credits > 0.0 => {
            diagnostics.push(ValidationDiagnostic::warning(
                field,
                format!(
                    "source reports {} credits for an ungraded course; none will be awarded",
                    entry.earned_credits
                ),
            ));
        }
        Grade::Numeric(g) if g >= config.pass_threshold && entry.earned_credits < entry.max_credits => {
            diagnostics.push(ValidationDiagnostic::warning(
                field,
                format!(
                    "source reports {} of {} credits for a passing grade; full credits will be awarded",
                    entry.earned_credits, entry.max_credits
                ),
            ));
        }
        _ => {}
    }
}

/// Consistency checks on the engine's output. Any diagnostic produced here
/// points to an engine defect, not to bad input.
pub fn validate_transcript(
    config: &EngineConfig,
    results: &[CourseResult],
    summary: &TranscriptSummary,
) -> Vec<ValidationDiagnostic> {
    let mut diagnostics = Vec::new();
    let fault = |field: String, message: String| {
        ValidationDiagnostic::error(DiagnosticClass::Consistency, field, message)
    };

    if summary.total_earned_credits > summary.total_max_credits + CREDIT_EPSILON {
        diagnostics.push(fault(
            "summary.total_earned_credits".into(),
            format!(
                "earned credits {} exceed total credits {}",
                summary.total_earned_credits, summary.total_max_credits
            ),
        ));
    }

    if summary.compensation_applied {
        match summary.overall_average {
            Some(avg) if reaches(avg, config.compensation_threshold) => {}
            other => diagnostics.push(fault(
                "summary.compensation_applied".into(),
                format!(
                    "compensation applied with average {other:?} below {}",
                    config.compensation_threshold
                ),
            )),
        }
    }

    for result in results {
        let field = |attr: &str| format!("{}.{attr}", result.name);

        match result.reason {
            AwardReason::Compensated if !result.compensable || result.exempt => {
                diagnostics.push(fault(field("reason"), "non-compensable course was compensated".into()));
            }
            AwardReason::Compensated if !summary.compensation_applied => {
                diagnostics.push(fault(
                    field("reason"),
                    "course compensated but summary reports no compensation".into(),
                ));
            }
            AwardReason::DirectPass
                if result.raw_grade.value().is_none_or(|g| g < config.pass_threshold) =>
            {
                diagnostics.push(fault(
                    field("reason"),
                    format!("direct pass recorded for grade {}", result.raw_grade),
                ));
            }
            AwardReason::NotApplicable | AwardReason::Failed if result.credits_awarded => {
                diagnostics.push(fault(field("credits_awarded"), "credits awarded without a pass".into()));
            }
            _ => {}
        }

        let expected = if result.credits_awarded { result.max_credits } else { 0.0 };
        if (result.earned_credits - expected).abs() > CREDIT_EPSILON {
            diagnostics.push(fault(
                field("earned_credits"),
                format!("earned credits {} but expected {expected}", result.earned_credits),
            ));
        }
    }

    diagnostics
}
