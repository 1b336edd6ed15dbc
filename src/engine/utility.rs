/// Tolerance for comparing sums of credits and credit-weighted averages.
pub const CREDIT_EPSILON: f64 = 1e-9;

/// `true` when `value` reaches `threshold`, allowing for float error in
/// weighted sums (5.2×2 + 13.2×3 over 5 credits computes to 9.999999999999998).
pub fn reaches(value: f64, threshold: f64) -> bool {
    value + CREDIT_EPSILON >= threshold
}

/// Computes the weighted mean of `(value, weight)` pairs.
/// Returns `None` when the input is empty or the weights sum to zero.
pub fn weighted_mean<I>(pairs: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (total, weight_sum) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(total, sum), (value, weight)| (total + value * weight, sum + weight));

    if weight_sum == 0.0 {
        None
    } else {
        Some(total / weight_sum)
    }
}

/// Rounds to two decimal places. Only meant for presentation; the engine
/// keeps full precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_mean_empty() {
        assert_eq!(weighted_mean(Vec::new()), None);
        assert_eq!(weighted_mean(vec![(12.0, 0.0)]), None);
    }

    #[test]
    fn test_weighted_mean_values() {
        assert_eq!(weighted_mean(vec![(8.0, 6.0), (12.0, 6.0)]), Some(10.0));
        assert_eq!(weighted_mean(vec![(10.0, 1.0), (16.0, 2.0)]), Some(14.0));
    }

    #[test]
    fn test_reaches_tolerates_float_error() {
        let average = weighted_mean(vec![(5.2, 2.0), (13.2, 3.0)]).unwrap();
        assert!(average < 10.0);
        assert!(reaches(average, 10.0));
        assert!(!reaches(9.99, 10.0));
        assert!(reaches(10.5, 10.0));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(14.6567), 14.66);
        assert_eq!(round2(3.3333), 3.33);
        assert_eq!(round2(10.0), 10.0);
    }
}
