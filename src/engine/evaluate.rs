use crate::config::EngineConfig;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{AwardReason, CourseEntry, CourseResult, Grade};

/// Converts one course into its letter/GPA and baseline credit decision.
///
/// Credits are awarded only when the grade reaches the pass threshold.
/// Failed courses stay failed here; compensation is a separate, whole-record
/// pass. Ungraded courses never earn credits.
///
/// # Errors
///
/// Fails only for grades that validation should already have rejected
/// (outside the scale, or not matched by any band).
pub fn evaluate(config: &EngineConfig, entry: &CourseEntry) -> EngineResult<CourseResult> {
    if let Grade::Numeric(g) = entry.raw_grade {
        if !(0.0..=config.scale_max).contains(&g) {
            return Err(EngineError::GradeOutOfScale {
                grade: g,
                scale_max: config.scale_max,
            });
        }
    }

    let equivalence = config.table.lookup(entry.raw_grade)?;

    let reason = match entry.raw_grade {
        Grade::NotApplicable => AwardReason::NotApplicable,
        Grade::Numeric(g) if g >= config.pass_threshold => AwardReason::DirectPass,
        Grade::Numeric(_) => AwardReason::Failed,
    };
    let credits_awarded = reason == AwardReason::DirectPass;

    Ok(CourseResult {
        name: entry.name.clone(),
        raw_grade: entry.raw_grade,
        letter: equivalence.letter.to_string(),
        gpa: equivalence.gpa,
        max_credits: entry.max_credits,
        earned_credits: if credits_awarded { entry.max_credits } else { 0.0 },
        credits_awarded,
        reason,
        compensable: entry.compensable,
        exempt: entry.exempt,
    })
}
