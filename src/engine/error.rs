use thiserror::Error;

/// Failures that indicate a configuration or engine defect rather than bad
/// input. Bad input is reported through diagnostics instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid equivalence table: {0}")]
    InvalidTable(String),

    #[error("No equivalence band matches grade {0}")]
    NoMatchingBand(f64),

    #[error("Grade {grade} is outside the 0–{scale_max} scale")]
    GradeOutOfScale { grade: f64, scale_max: f64 },
}

pub type EngineResult<T> = Result<T, EngineError>;
