//! Normalization of grade files into canonical [`CourseEntry`] records.
//!
//! Accepted JSON shapes:
//!
//! ```json
//! { "Algorithms": [14.2, 6], "Databases": [8.5, 0, 6] }
//! ```
//! (`[grade, credits]` from certified transcripts, `[grade, earned, max]`
//! otherwise), or the canonical list form:
//!
//! ```json
//! [ { "name": "Algorithms", "grade": "14,2", "earned_credits": 6, "max_credits": 6 } ]
//! ```
//!
//! Shape problems never abort ingestion; they become structural diagnostics
//! and the offending course is dropped. A course key repeated in the legacy
//! form is reported and only its first occurrence is kept.

use crate::engine::types::{CourseEntry, DiagnosticClass, Grade, ValidationDiagnostic};
use anyhow::{Context, Result};
use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

const REQUIRED_FIELDS: &[&str] = &["name", "grade", "earned_credits", "max_credits"];

/// Courses of one student plus the problems met while reading them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestedRecord {
    pub student_id: Option<String>,
    pub entries: Vec<CourseEntry>,
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl IngestedRecord {
    fn structural(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(ValidationDiagnostic::error(
            DiagnosticClass::Structural,
            field,
            message,
        ));
    }
}

/// Top level of a grade file. Legacy objects are kept as key/value pairs in
/// file order so that repeated keys survive until they can be reported.
enum RawGradeFile {
    Legacy(Vec<(String, Value)>),
    List(Vec<Value>),
}

struct RawGradeFileVisitor;

impl<'de> Visitor<'de> for RawGradeFileVisitor {
    type Value = RawGradeFile;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of courses or an array of courses")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawGradeFile, A::Error> {
        let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, value)) = map.next_entry::<String, Value>()? {
            pairs.push((name, value));
        }
        Ok(RawGradeFile::Legacy(pairs))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawGradeFile, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(RawGradeFile::List(items))
    }
}

impl<'de> Deserialize<'de> for RawGradeFile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawGradeFileVisitor)
    }
}

/// Parses a grade file.
///
/// # Errors
///
/// Returns an error only if the bytes are not JSON at all, or the top level
/// is neither an object nor an array.
pub fn parse_grades(bytes: &[u8]) -> Result<IngestedRecord> {
    let raw: RawGradeFile = serde_json::from_slice(bytes)
        .context("grade file is not a JSON object or array")?;

    let record = match raw {
        RawGradeFile::Legacy(pairs) => from_legacy_map(pairs),
        RawGradeFile::List(items) => from_course_list(items),
    };

    debug!(
        courses = record.entries.len(),
        problems = record.diagnostics.len(),
        "Grade file normalized"
    );
    Ok(record)
}

fn from_legacy_map(pairs: Vec<(String, Value)>) -> IngestedRecord {
    let mut record = IngestedRecord::default();
    let mut seen = HashSet::new();

    for (name, value) in pairs {
        let trimmed = name.trim();
        if !seen.insert(trimmed.to_string()) {
            record.structural(
                format!("{trimmed}.name"),
                format!("duplicate course name '{trimmed}'"),
            );
            continue;
        }

        let Value::Array(values) = &value else {
            record.structural(&name, format!("expected [grade, credits], got {}", type_name(&value)));
            continue;
        };

        let parsed = match values.as_slice() {
            [grade, credits] => grade_value(grade)
                .zip(credit_value(credits))
                .map(|(g, c)| CourseEntry::new(name.as_str(), g, c, c)),
            [grade, earned, max] => grade_value(grade)
                .zip(credit_value(earned))
                .zip(credit_value(max))
                .map(|((g, e), m)| CourseEntry::new(name.as_str(), g, e, m)),
            other => {
                record.structural(&name, format!("expected 2 or 3 values, got {}", other.len()));
                continue;
            }
        };

        match parsed {
            Some(entry) => record.entries.push(entry),
            None => record.structural(&name, "grade or credits have the wrong type"),
        }
    }

    record
}

fn from_course_list(items: Vec<Value>) -> IngestedRecord {
    let mut record = IngestedRecord::default();

    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(obj) = item else {
            record.structural(format!("courses[{index}]"), "expected an object");
            continue;
        };

        let label = obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("courses[{index}]"));

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|key| !obj.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            record.structural(&label, format!("missing field(s): {}", missing.join(", ")));
            continue;
        }

        let name = obj.get("name").and_then(Value::as_str).map(str::to_string);
        let grade = obj.get("grade").and_then(grade_value);
        let earned = obj.get("earned_credits").and_then(credit_value);
        let max = obj.get("max_credits").and_then(credit_value);

        let flag = |key: &str, default: bool| obj.get(key).and_then(Value::as_bool).unwrap_or(default);

        match (name, grade, earned, max) {
            (Some(name), Some(grade), Some(earned), Some(max)) => {
                let mut entry = CourseEntry::new(name, grade, earned, max);
                entry.compensable = flag("compensable", true);
                entry.exempt = flag("exempt", false);
                record.entries.push(entry);
            }
            _ => record.structural(&label, "field has the wrong type"),
        }
    }

    record
}

/// One line of a long-format CSV roster.
///
/// Credit columns are kept as text so that French decimal commas and empty
/// cells are reported per course instead of failing the whole roster.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterRow {
    pub student_id: String,
    pub course: String,
    pub grade: String,
    pub earned_credits: String,
    pub max_credits: String,
    #[serde(default)]
    pub compensable: Option<bool>,
    #[serde(default)]
    pub exempt: Option<bool>,
}

/// A roster line that could not be read as a [`RosterRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// `None` when the `student_id` cell itself is missing or empty.
    pub student_id: Option<String>,
    /// 1-based line in the CSV file, header included.
    pub line: u64,
    pub reason: String,
}

/// Groups roster lines by student, keeping first-seen student order and the
/// course order within each student.
///
/// Rejected lines become structural diagnostics on their student. Lines
/// without a usable student id are gathered in one record whose
/// `student_id` is `None`.
pub fn group_roster(lines: Vec<Result<RosterRow, RejectedRow>>) -> Vec<IngestedRecord> {
    let mut records: Vec<IngestedRecord> = Vec::new();

    for line in lines {
        let student_id = match &line {
            Ok(row) => Some(row.student_id.trim()).filter(|id| !id.is_empty()).map(str::to_string),
            Err(rejected) => rejected.student_id.clone(),
        };

        let position = records.iter().position(|r| r.student_id == student_id);
        let record = match position {
            Some(i) => &mut records[i],
            None => {
                records.push(IngestedRecord {
                    student_id,
                    ..Default::default()
                });
                let last = records.len() - 1;
                &mut records[last]
            }
        };

        match line {
            Ok(row) => push_roster_row(record, row),
            Err(rejected) => record.structural(
                format!("roster[{}]", rejected.line),
                format!("unreadable roster row: {}", rejected.reason),
            ),
        }
    }

    records
}

fn push_roster_row(record: &mut IngestedRecord, row: RosterRow) {
    let Some(grade) = Grade::parse(&row.grade) else {
        record.structural(
            format!("{}.grade", row.course),
            format!("unreadable grade '{}'", row.grade),
        );
        return;
    };

    let earned = parse_credit(&row.earned_credits);
    let max = parse_credit(&row.max_credits);
    for (attr, text, value) in [
        ("earned_credits", &row.earned_credits, earned),
        ("max_credits", &row.max_credits, max),
    ] {
        if value.is_none() {
            record.structural(
                format!("{}.{attr}", row.course),
                format!("unreadable credits '{text}'"),
            );
        }
    }

    let (Some(earned), Some(max)) = (earned, max) else {
        return;
    };
    let mut entry = CourseEntry::new(row.course, grade, earned, max);
    entry.compensable = row.compensable.unwrap_or(true);
    entry.exempt = row.exempt.unwrap_or(false);
    record.entries.push(entry);
}

/// Parses a credit figure, accepting a French decimal comma. Empty text is
/// not a credit figure.
pub fn parse_credit(text: &str) -> Option<f64> {
    text.trim().replace(',', ".").parse().ok()
}

fn grade_value(value: &Value) -> Option<Grade> {
    match value {
        Value::Null => Some(Grade::NotApplicable),
        Value::Number(n) => n.as_f64().map(Grade::Numeric),
        Value::String(s) => Grade::parse(s),
        _ => None,
    }
}

fn credit_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_credit(s),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
