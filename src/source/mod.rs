//! Loading student records through a [`RecordReader`].

mod file;
mod reader;

pub use file::FileReader;
pub use reader::RecordReader;

use crate::ingest::{IngestedRecord, RejectedRow, RosterRow, group_roster, parse_grades};
use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Loads one student's grade file (JSON, legacy or list form).
#[tracing::instrument(skip(reader))]
pub async fn load_grades<R: RecordReader>(reader: &R, location: &str) -> Result<IngestedRecord> {
    let bytes = reader.read(location).await?;
    debug!(bytes = bytes.len(), "Grade file read");
    parse_grades(&bytes).with_context(|| format!("failed to parse '{location}'"))
}

/// Loads a long-format CSV roster and groups it per student.
///
/// A row that cannot be read is attached to its student as a structural
/// diagnostic; the rest of the roster is still loaded.
///
/// # Errors
///
/// Fails only if the roster cannot be read or its header line is unreadable.
#[tracing::instrument(skip(reader))]
pub async fn load_roster<R: RecordReader>(reader: &R, location: &str) -> Result<Vec<IngestedRecord>> {
    let bytes = reader.read(location).await?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let headers = rdr
        .headers()
        .with_context(|| format!("roster '{location}' has no readable header"))?
        .clone();
    let id_column = headers.iter().position(|h| h == "student_id");

    let mut lines = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        // Header is line 1
        let fallback_line = index as u64 + 2;
        let line = match result {
            Ok(record) => record.deserialize::<RosterRow>(Some(&headers)).map_err(|e| RejectedRow {
                student_id: id_column
                    .and_then(|i| record.get(i))
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
                line: record.position().map_or(fallback_line, |p| p.line()),
                reason: e.to_string(),
            }),
            Err(e) => Err(RejectedRow {
                student_id: None,
                line: e.position().map_or(fallback_line, |p| p.line()),
                reason: e.to_string(),
            }),
        };

        if let Err(rejected) = &line {
            warn!(
                line = rejected.line,
                student_id = ?rejected.student_id,
                reason = %rejected.reason,
                "Unreadable roster row"
            );
        }
        lines.push(line);
    }

    let records = group_roster(lines);
    debug!(students = records.len(), "Roster loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MemoryReader(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl RecordReader for MemoryReader {
        async fn read(&self, location: &str) -> Result<Vec<u8>> {
            self.0
                .get(location)
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| anyhow::anyhow!("no such location '{location}'"))
        }
    }

    #[tokio::test]
    async fn test_load_grades() {
        let reader = MemoryReader(HashMap::from([("g.json", r#"{"Algorithms": [14.2, 6]}"#)]));
        let record = load_grades(&reader, "g.json").await.unwrap();
        assert_eq!(record.entries.len(), 1);

        assert!(load_grades(&reader, "missing.json").await.is_err());
    }

    #[tokio::test]
    async fn test_load_roster() {
        let csv = "student_id,course,grade,earned_credits,max_credits,compensable,exempt\n\
                   s1,Algorithms,14.2,6,6,,\n\
                   s1,Thesis,7,0,12,false,\n\
                   s2,Algorithms,N/A,0,6,,true\n";
        let reader = MemoryReader(HashMap::from([("roster.csv", csv)]));
        let records = load_roster(&reader, "roster.csv").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].entries.len(), 2);
        assert!(!records[0].entries[1].compensable);
        assert!(records[1].entries[0].exempt);
    }

    #[tokio::test]
    async fn test_load_roster_keeps_going_past_bad_rows() {
        let csv = "student_id,course,grade,earned_credits,max_credits\n\
                   alice,A,12,6,6\n\
                   bob,A,12,\"6,0\",6\n\
                   carol,A,12,,6\n\
                   dave,A\n";
        let reader = MemoryReader(HashMap::from([("roster.csv", csv)]));
        let records = load_roster(&reader, "roster.csv").await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.student_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("alice"), Some("bob"), Some("carol"), Some("dave")]);

        assert_eq!(records[0].entries[0].earned_credits, 6.0);
        assert_eq!(records[1].entries[0].earned_credits, 6.0);
        assert!(records[1].diagnostics.is_empty());

        assert!(records[2].entries.is_empty());
        assert_eq!(records[2].diagnostics[0].field, "A.earned_credits");

        assert!(records[3].entries.is_empty());
        assert_eq!(records[3].diagnostics[0].field, "roster[5]");
    }
}
