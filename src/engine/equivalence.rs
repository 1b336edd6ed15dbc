//! French 0–20 grade to letter/GPA equivalence.

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::Grade;
use serde::{Deserialize, Serialize};

/// One contiguous range of the 0–20 scale. The lower bound is inclusive and
/// the upper bound exclusive; `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceBand {
    pub lower_bound: f64,
    #[serde(default)]
    pub upper_bound: Option<f64>,
    pub letter: String,
    pub gpa: f64,
}

impl EquivalenceBand {
    fn new(lower_bound: f64, upper_bound: Option<f64>, letter: &str, gpa: f64) -> Self {
        Self {
            lower_bound,
            upper_bound,
            letter: letter.to_string(),
            gpa,
        }
    }

    fn contains(&self, grade: f64) -> bool {
        grade >= self.lower_bound && self.upper_bound.is_none_or(|upper| grade < upper)
    }
}

/// Letter and GPA for a single grade. `gpa` is `None` for not-applicable grades.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equivalence<'a> {
    pub letter: &'a str,
    pub gpa: Option<f64>,
}

#[derive(Deserialize)]
struct TableSpec {
    bands: Vec<EquivalenceBand>,
    #[serde(default = "default_not_applicable_letter")]
    not_applicable_letter: String,
}

fn default_not_applicable_letter() -> String {
    "N/A".to_string()
}

/// Ordered, gap-free set of [`EquivalenceBand`]s covering the whole scale.
///
/// | Range    | Letter | GPA  |
/// |----------|--------|------|
/// | >= 16    | A+     | 4.0  |
/// | [14, 16) | A      | 4.0  |
/// | [13, 14) | A-     | 3.7  |
/// | [12, 13) | B+     | 3.33 |
/// | [11, 12) | B      | 3.0  |
/// | [10, 11) | B-     | 2.7  |
/// | [9, 10)  | C+     | 2.33 |
/// | [8, 9)   | C      | 2.0  |
/// | [7, 8)   | C-     | 1.7  |
/// | < 7      | F      | 0.0  |
///
/// The table is immutable once built and can be shared freely between threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableSpec")]
pub struct EquivalenceTable {
    bands: Vec<EquivalenceBand>,
    not_applicable_letter: String,
}

impl TryFrom<TableSpec> for EquivalenceTable {
    type Error = EngineError;

    fn try_from(spec: TableSpec) -> EngineResult<Self> {
        Self::new(spec.bands, spec.not_applicable_letter)
    }
}

impl Default for EquivalenceTable {
    fn default() -> Self {
        Self::french_default()
    }
}

impl EquivalenceTable {
    /// Builds a table after checking that the bands start at 0, are sorted,
    /// touch each other exactly and that only the last one is unbounded.
    pub fn new(bands: Vec<EquivalenceBand>, not_applicable_letter: impl Into<String>) -> EngineResult<Self> {
        let invalid = |msg: String| Err(EngineError::InvalidTable(msg));

        let Some(first) = bands.first() else {
            return invalid("no bands defined".into());
        };
        if first.lower_bound != 0.0 {
            return invalid(format!("first band starts at {} instead of 0", first.lower_bound));
        }

        for band in &bands {
            if !(0.0..=4.0).contains(&band.gpa) {
                return invalid(format!("band {} has GPA {} outside [0, 4]", band.letter, band.gpa));
            }
            if let Some(upper) = band.upper_bound {
                if upper <= band.lower_bound {
                    return invalid(format!("band {} is empty or inverted", band.letter));
                }
            }
        }

        for pair in bands.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            match lo.upper_bound {
                None => return invalid(format!("band {} is unbounded but not last", lo.letter)),
                Some(upper) if upper < hi.lower_bound => {
                    return invalid(format!("gap between {} and {}", lo.letter, hi.letter));
                }
                Some(upper) if upper > hi.lower_bound => {
                    return invalid(format!("{} overlaps {}", lo.letter, hi.letter));
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            bands,
            not_applicable_letter: not_applicable_letter.into(),
        })
    }

    pub fn french_default() -> Self {
        let bands = vec![
            EquivalenceBand::new(0.0, Some(7.0), "F", 0.0),
            EquivalenceBand::new(7.0, Some(8.0), "C-", 1.7),
            EquivalenceBand::new(8.0, Some(9.0), "C", 2.0),
            EquivalenceBand::new(9.0, Some(10.0), "C+", 2.33),
            EquivalenceBand::new(10.0, Some(11.0), "B-", 2.7),
            EquivalenceBand::new(11.0, Some(12.0), "B", 3.0),
            EquivalenceBand::new(12.0, Some(13.0), "B+", 3.33),
            EquivalenceBand::new(13.0, Some(14.0), "A-", 3.7),
            EquivalenceBand::new(14.0, Some(16.0), "A", 4.0),
            EquivalenceBand::new(16.0, None, "A+", 4.0),
        ];
        Self {
            bands,
            not_applicable_letter: default_not_applicable_letter(),
        }
    }

    /// Bands in ascending order of lower bound.
    pub fn bands(&self) -> &[EquivalenceBand] {
        &self.bands
    }

    pub fn not_applicable_letter(&self) -> &str {
        &self.not_applicable_letter
    }

    /// Maps a grade to its letter and GPA.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoMatchingBand`] if no band contains the grade
    /// (negative or non-finite values). Callers are expected to have
    /// rejected such grades during validation.
    pub fn lookup(&self, grade: Grade) -> EngineResult<Equivalence<'_>> {
        let g = match grade {
            Grade::NotApplicable => {
                return Ok(Equivalence {
                    letter: &self.not_applicable_letter,
                    gpa: None,
                });
            }
            Grade::Numeric(g) => g,
        };

        self.bands
            .iter()
            .rev()
            .find(|band| band.contains(g))
            .map(|band| Equivalence {
                letter: &band.letter,
                gpa: Some(band.gpa),
            })
            .ok_or(EngineError::NoMatchingBand(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter(g: f64) -> String {
        EquivalenceTable::french_default()
            .lookup(Grade::Numeric(g))
            .unwrap()
            .letter
            .to_string()
    }

    #[test]
    fn test_lookup_boundaries() {
        let table = EquivalenceTable::french_default();
        let at = |g: f64| table.lookup(Grade::Numeric(g)).unwrap();

        assert_eq!(at(10.0), Equivalence { letter: "B-", gpa: Some(2.7) });
        assert_eq!(at(9.999), Equivalence { letter: "C+", gpa: Some(2.33) });
        assert_eq!(at(16.0), Equivalence { letter: "A+", gpa: Some(4.0) });
        assert_eq!(at(6.999), Equivalence { letter: "F", gpa: Some(0.0) });
        assert_eq!(at(20.0), Equivalence { letter: "A+", gpa: Some(4.0) });
        assert_eq!(at(0.0), Equivalence { letter: "F", gpa: Some(0.0) });
    }

    #[test]
    fn test_lookup_every_band() {
        assert_eq!(letter(15.99), "A");
        assert_eq!(letter(14.0), "A");
        assert_eq!(letter(13.5), "A-");
        assert_eq!(letter(12.0), "B+");
        assert_eq!(letter(11.0), "B");
        assert_eq!(letter(9.0), "C+");
        assert_eq!(letter(8.5), "C");
        assert_eq!(letter(7.0), "C-");
    }

    #[test]
    fn test_lookup_not_applicable() {
        let table = EquivalenceTable::french_default();
        let eq = table.lookup(Grade::NotApplicable).unwrap();
        assert_eq!(eq.letter, "N/A");
        assert_eq!(eq.gpa, None);
    }

    #[test]
    fn test_lookup_negative_is_fatal() {
        let table = EquivalenceTable::french_default();
        assert_eq!(
            table.lookup(Grade::Numeric(-0.5)),
            Err(EngineError::NoMatchingBand(-0.5))
        );
        assert!(table.lookup(Grade::Numeric(f64::NAN)).is_err());
    }

    #[test]
    fn test_exactly_one_band_matches_across_scale() {
        let table = EquivalenceTable::french_default();
        for step in 0..=2000 {
            let g = step as f64 / 100.0;
            let matches = table.bands().iter().filter(|b| b.contains(g)).count();
            assert_eq!(matches, 1, "grade {g} matched {matches} bands");
            assert!(table.lookup(Grade::Numeric(g)).is_ok());
        }
    }

    #[test]
    fn test_gpa_is_monotonic() {
        let table = EquivalenceTable::french_default();
        for pair in table.bands().windows(2) {
            assert!(pair[0].gpa <= pair[1].gpa);
        }
    }

    #[test]
    fn test_new_rejects_gap() {
        let bands = vec![
            EquivalenceBand::new(0.0, Some(10.0), "F", 0.0),
            EquivalenceBand::new(11.0, None, "A", 4.0),
        ];
        assert!(matches!(
            EquivalenceTable::new(bands, "N/A"),
            Err(EngineError::InvalidTable(msg)) if msg.contains("gap")
        ));
    }

    #[test]
    fn test_new_rejects_overlap_and_inner_unbounded() {
        let overlap = vec![
            EquivalenceBand::new(0.0, Some(12.0), "F", 0.0),
            EquivalenceBand::new(10.0, None, "A", 4.0),
        ];
        assert!(EquivalenceTable::new(overlap, "N/A").is_err());

        let inner_unbounded = vec![
            EquivalenceBand::new(0.0, None, "F", 0.0),
            EquivalenceBand::new(10.0, None, "A", 4.0),
        ];
        assert!(EquivalenceTable::new(inner_unbounded, "N/A").is_err());
    }

    #[test]
    fn test_new_rejects_bad_start_and_gpa() {
        let late_start = vec![EquivalenceBand::new(1.0, None, "A", 4.0)];
        assert!(EquivalenceTable::new(late_start, "N/A").is_err());

        let bad_gpa = vec![EquivalenceBand::new(0.0, None, "A", 4.3)];
        assert!(EquivalenceTable::new(bad_gpa, "N/A").is_err());

        assert!(EquivalenceTable::new(Vec::new(), "N/A").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok = r#"{"bands": [
            {"lower_bound": 0, "upper_bound": 10, "letter": "F", "gpa": 0},
            {"lower_bound": 10, "letter": "P", "gpa": 4}
        ]}"#;
        let table: EquivalenceTable = serde_json::from_str(ok).unwrap();
        assert_eq!(table.lookup(Grade::Numeric(10.0)).unwrap().letter, "P");
        assert_eq!(table.not_applicable_letter(), "N/A");

        let gap = r#"{"bands": [
            {"lower_bound": 0, "upper_bound": 9, "letter": "F", "gpa": 0},
            {"lower_bound": 10, "letter": "P", "gpa": 4}
        ]}"#;
        assert!(serde_json::from_str::<EquivalenceTable>(gap).is_err());
    }
}
