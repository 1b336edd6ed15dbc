use crate::engine::aggregate::overall_average;
use crate::engine::types::{AwardReason, CourseResult};
use crate::engine::utility::reaches;
use tracing::{debug, info};

/// Applies global compensation to a student's courses.
///
/// When the credit-weighted average of all numerically graded courses reaches
/// `threshold`, every failed course is validated with reason
/// [`AwardReason::Compensated`] and earns its full credits. Courses marked
/// non-compensable or exempt are never flipped. Below the threshold, or when
/// no course carries a numeric grade, the returned list equals the input.
///
/// The input is left untouched; a new list is returned.
pub fn resolve(results: &[CourseResult], threshold: f64) -> Vec<CourseResult> {
    let Some(average) = overall_average(results) else {
        debug!("No numeric grades, compensation skipped");
        return results.to_vec();
    };

    if !reaches(average, threshold) {
        debug!(average, threshold, "Average below threshold, no compensation");
        return results.to_vec();
    }

    let mut flipped = 0usize;
    let resolved = results
        .iter()
        .map(|result| {
            if is_compensable_failure(result) {
                flipped += 1;
                CourseResult {
                    credits_awarded: true,
                    reason: AwardReason::Compensated,
                    earned_credits: result.max_credits,
                    ..result.clone()
                }
            } else {
                result.clone()
            }
        })
        .collect();

    if flipped > 0 {
        info!(average, threshold, flipped, "Compensation applied");
    }

    resolved
}

fn is_compensable_failure(result: &CourseResult) -> bool {
    result.reason == AwardReason::Failed && result.compensable && !result.exempt
}
