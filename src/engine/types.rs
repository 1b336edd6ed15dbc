//! Data types shared by the conversion pipeline.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Spellings accepted for a course without a final evaluation.
const NOT_APPLICABLE_MARKERS: &[&str] = &["", "-", "N/A", "NA", "n/a", "na"];

/// A raw grade on the 0–20 scale, or the marker for a course that has no
/// final evaluation.
///
/// Serializes as a bare number or the string `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Grade {
    Numeric(f64),
    NotApplicable,
}

impl Grade {
    /// Returns the numeric value, or `None` for [`Grade::NotApplicable`].
    pub fn value(&self) -> Option<f64> {
        match self {
            Grade::Numeric(g) => Some(*g),
            Grade::NotApplicable => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Grade::Numeric(_))
    }

    /// Parses a textual grade. French decimal commas (`"12,5"`) are accepted.
    /// Returns `None` when the text is neither a number nor a not-applicable marker.
    pub fn parse(text: &str) -> Option<Grade> {
        let text = text.trim();
        if NOT_APPLICABLE_MARKERS.contains(&text) {
            return Some(Grade::NotApplicable);
        }
        text.replace(',', ".").parse::<f64>().ok().map(Grade::Numeric)
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Grade::Numeric(g) => serializer.serialize_f64(*g),
            Grade::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GradeRepr {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<GradeRepr>::deserialize(deserializer)? {
            None => Ok(Grade::NotApplicable),
            Some(GradeRepr::Number(g)) => Ok(Grade::Numeric(g)),
            Some(GradeRepr::Text(t)) => Grade::parse(&t)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid grade '{t}'"))),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Numeric(g) => write!(f, "{g}/20"),
            Grade::NotApplicable => f.write_str("N/A"),
        }
    }
}

/// One course of one student, in the canonical shape produced by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseEntry {
    pub name: String,
    pub raw_grade: Grade,
    pub earned_credits: f64,
    pub max_credits: f64,
    /// `false` when the course may never be validated by compensation.
    #[serde(default = "default_true")]
    pub compensable: bool,
    /// Exempt courses count toward no credit total and no average.
    #[serde(default)]
    pub exempt: bool,
}

fn default_true() -> bool {
    true
}

impl CourseEntry {
    pub fn new(name: impl Into<String>, raw_grade: Grade, earned_credits: f64, max_credits: f64) -> Self {
        Self {
            name: name.into(),
            raw_grade,
            earned_credits,
            max_credits,
            compensable: true,
            exempt: false,
        }
    }

    /// Shorthand for a numerically graded course.
    pub fn graded(name: impl Into<String>, grade: f64, earned_credits: f64, max_credits: f64) -> Self {
        Self::new(name, Grade::Numeric(grade), earned_credits, max_credits)
    }

    pub fn non_compensable(mut self) -> Self {
        self.compensable = false;
        self
    }

    pub fn exempt(mut self) -> Self {
        self.exempt = true;
        self
    }
}

/// Why a course did or did not earn its credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AwardReason {
    DirectPass,
    Compensated,
    Failed,
    NotApplicable,
}

/// A course after letter/GPA conversion and credit decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseResult {
    pub name: String,
    pub raw_grade: Grade,
    pub letter: String,
    /// `None` when the grade is not applicable.
    pub gpa: Option<f64>,
    pub max_credits: f64,
    /// Full award: equals `max_credits` when awarded, 0 otherwise.
    pub earned_credits: f64,
    pub credits_awarded: bool,
    pub reason: AwardReason,
    pub compensable: bool,
    pub exempt: bool,
}

impl CourseResult {
    /// `(grade, weight)` for averaging; `None` for exempt or ungraded courses.
    pub(crate) fn average_weight(&self) -> Option<(f64, f64)> {
        if self.exempt {
            return None;
        }
        self.raw_grade.value().map(|g| (g, self.max_credits))
    }
}

/// Credit totals and weighted averages over a set of [`CourseResult`]s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSummary {
    pub total_max_credits: f64,
    pub total_earned_credits: f64,
    /// `None` when no course carries a numeric grade.
    pub overall_average: Option<f64>,
    pub overall_gpa: Option<f64>,
    pub compensation_applied: bool,
    pub course_count: usize,
    pub graded_count: usize,
    pub failed_count: usize,
    pub compensated_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Origin of a diagnostic. `Consistency` means the engine itself produced an
/// impossible result; the others are caused by the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticClass {
    Structural,
    Range,
    Consistency,
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationDiagnostic {
    pub severity: Severity,
    pub class: DiagnosticClass,
    pub field: String,
    pub message: String,
}

impl ValidationDiagnostic {
    pub fn error(class: DiagnosticClass, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            class,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            class: DiagnosticClass::Advisory,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{severity}] {}: {}", self.field, self.message)
    }
}

/// Returns `true` if any diagnostic blocks rendering.
pub fn has_errors(diagnostics: &[ValidationDiagnostic]) -> bool {
    diagnostics.iter().any(ValidationDiagnostic::is_error)
}
