//! Grade normalization and credit compensation.
//!
//! Converts 0–20 grades into letter/GPA pairs, decides which courses earn
//! their ECTS credits, applies global compensation, aggregates the record
//! and validates it before and after. No I/O happens in here.

pub mod aggregate;
pub mod compensate;
pub mod convert;
pub mod equivalence;
pub mod error;
pub mod evaluate;
pub mod types;
pub mod utility;
pub mod validate;

pub use convert::{Conversion, TranscriptEngine};
pub use error::EngineError;
