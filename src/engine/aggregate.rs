use crate::engine::types::{AwardReason, CourseResult, TranscriptSummary};
use crate::engine::utility::weighted_mean;

/// Credit-weighted average of the numeric grades, at full precision.
/// Ungraded and exempt courses take no part. `None` when nothing is graded.
pub fn overall_average(results: &[CourseResult]) -> Option<f64> {
    weighted_mean(results.iter().filter_map(CourseResult::average_weight))
}

/// Credit-weighted GPA over the same courses as [`overall_average`].
pub fn overall_gpa(results: &[CourseResult]) -> Option<f64> {
    weighted_mean(results.iter().filter(|r| !r.exempt).filter_map(|r| {
        r.gpa
            .filter(|_| r.raw_grade.is_numeric())
            .map(|gpa| (gpa, r.max_credits))
    }))
}

/// Summarizes a set of course results into credit totals and averages.
///
/// `total_max_credits` includes ungraded courses but not exempt ones.
/// Awarded courses count their full `max_credits`. Nothing is rounded here.
pub fn summarize(results: &[CourseResult]) -> TranscriptSummary {
    let counted = || results.iter().filter(|r| !r.exempt);

    let total_max_credits: f64 = counted().map(|r| r.max_credits).sum();
    let total_earned_credits: f64 = counted()
        .filter(|r| r.credits_awarded)
        .map(|r| r.max_credits)
        .sum();

    let count_reason = |reason: AwardReason| results.iter().filter(|r| r.reason == reason).count();
    let compensated_count = count_reason(AwardReason::Compensated);

    TranscriptSummary {
        total_max_credits,
        total_earned_credits,
        overall_average: overall_average(results),
        overall_gpa: overall_gpa(results),
        compensation_applied: compensated_count > 0,
        course_count: results.len(),
        graded_count: results.iter().filter(|r| r.raw_grade.is_numeric()).count(),
        failed_count: count_reason(AwardReason::Failed),
        compensated_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::compensate::resolve;
    use crate::engine::evaluate::evaluate;
    use crate::engine::types::{CourseEntry, Grade};

    fn evaluated(entries: &[CourseEntry]) -> Vec<CourseResult> {
        let config = EngineConfig::default();
        entries.iter().map(|e| evaluate(&config, e).unwrap()).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_all_passed_record() {
        let results = evaluated(&[
            CourseEntry::graded("Programming 1", 16.5, 6.0, 6.0),
            CourseEntry::graded("Algorithms", 14.2, 6.0, 6.0),
            CourseEntry::graded("Mathematics", 12.8, 3.0, 3.0),
        ]);
        let summary = summarize(&resolve(&results, 10.0));

        // (16.5*6 + 14.2*6 + 12.8*3) / 15
        assert!(approx(summary.overall_average.unwrap(), 14.84));
        // (4.0*6 + 4.0*6 + 3.33*3) / 15
        assert!(approx(summary.overall_gpa.unwrap(), 3.866));
        assert_eq!(summary.total_max_credits, 15.0);
        assert_eq!(summary.total_earned_credits, 15.0);
        assert!(!summary.compensation_applied);
        assert_eq!(summary.failed_count, 0);
    }

    #[test]
    fn test_no_compensation_earns_nothing() {
        let results = evaluated(&[
            CourseEntry::graded("A", 5.0, 0.0, 6.0),
            CourseEntry::graded("B", 6.0, 0.0, 6.0),
        ]);
        let summary = summarize(&resolve(&results, 10.0));

        assert!(approx(summary.overall_average.unwrap(), 5.5));
        assert_eq!(summary.total_earned_credits, 0.0);
        assert_eq!(summary.total_max_credits, 12.0);
        assert_eq!(summary.failed_count, 2);
        assert!(!summary.compensation_applied);
    }

    #[test]
    fn test_not_applicable_counts_only_toward_max_credits() {
        let results = evaluated(&[
            CourseEntry::new("Internship", Grade::NotApplicable, 0.0, 6.0),
            CourseEntry::graded("B", 12.0, 6.0, 6.0),
        ]);
        let summary = summarize(&resolve(&results, 10.0));

        assert_eq!(summary.overall_average, Some(12.0));
        assert!(approx(summary.overall_gpa.unwrap(), 3.33));
        assert_eq!(summary.total_max_credits, 12.0);
        assert_eq!(summary.total_earned_credits, 6.0);
        assert_eq!(summary.graded_count, 1);
    }

    #[test]
    fn test_exempt_counts_nowhere() {
        let results = evaluated(&[
            CourseEntry::graded("Sport", 2.0, 0.0, 2.0).exempt(),
            CourseEntry::graded("B", 12.0, 6.0, 6.0),
        ]);
        let summary = summarize(&results);

        assert_eq!(summary.overall_average, Some(12.0));
        assert_eq!(summary.total_max_credits, 6.0);
        assert_eq!(summary.course_count, 2);
    }

    #[test]
    fn test_empty_record() {
        let summary = summarize(&[]);
        assert_eq!(summary.overall_average, None);
        assert_eq!(summary.overall_gpa, None);
        assert_eq!(summary.total_max_credits, 0.0);
    }

    #[test]
    fn test_summarize_is_repeatable() {
        let results = evaluated(&[
            CourseEntry::graded("A", 8.0, 0.0, 6.0),
            CourseEntry::graded("B", 12.0, 6.0, 6.0),
        ]);
        let resolved = resolve(&results, 10.0);
        assert_eq!(summarize(&resolved), summarize(&resolved));
    }

    #[test]
    fn test_compensated_record_summary() {
        let results = evaluated(&[
            CourseEntry::graded("A", 8.0, 0.0, 6.0),
            CourseEntry::graded("B", 12.0, 6.0, 6.0),
        ]);
        let summary = summarize(&resolve(&results, 10.0));

        assert!(summary.compensation_applied);
        assert_eq!(summary.compensated_count, 1);
        assert_eq!(summary.total_earned_credits, 12.0);
        assert_eq!(summary.overall_average, Some(10.0));
    }
}
