//! NDJSON mutation journal and deterministic replay.
//!
//! Each line is one [`MutationRecord`]. Because every mutation is a pure
//! function of the prior grant, replaying a session's journal from its
//! starting grant reproduces the grant it ended with.
//!
//! ```ignore
//! let mut sink = JournalSink::new(File::create("session.ndjson")?);
//! sink.write_session(&session)?;
//! sink.finish()?;
//! ```

use crate::mutator::{Mutation, PermissionMutator};
use crate::session::EditSession;
use gatekeep_core::error::{GatekeepError, GatekeepResult};
use gatekeep_core::{ModuleDescriptor, PermissionGrant};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufWriter, Write};

/// One journaled mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    pub principal_id: String,
    #[serde(flatten)]
    pub mutation: Mutation,
}

/// Buffered NDJSON writer over any `Write`.
pub struct JournalSink<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl<W: Write> JournalSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(16 * 1024, writer),
            rows_written: 0,
        }
    }

    pub fn write_record(&mut self, record: &MutationRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    /// Journals every mutation the session has applied.
    pub fn write_session(&mut self, session: &EditSession) -> io::Result<()> {
        let principal_id = &session.grant().principal_id;
        for mutation in session.applied() {
            self.write_record(&MutationRecord {
                principal_id: principal_id.clone(),
                mutation: mutation.clone(),
            })?;
        }
        Ok(())
    }

    /// Flush and return how many rows were written.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

/// Reads a journal. Blank lines are skipped; a malformed line (including an
/// unknown action key) is a `Validation` error naming the line.
pub fn read_journal<R: BufRead>(reader: R) -> GatekeepResult<Vec<MutationRecord>> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| GatekeepError::Internal(format!("journal line {}: {e}", i + 1)))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: MutationRecord = serde_json::from_str(&line)
            .map_err(|e| GatekeepError::Validation(format!("journal line {}: {e}", i + 1)))?;
        records.push(record);
    }
    Ok(records)
}

/// Re-applies `records` to `grant` in order.
///
/// Every record must belong to the grant's principal. Stops at the first
/// rejected record and returns its error.
pub fn replay(
    grant: &PermissionGrant,
    registry: &[ModuleDescriptor],
    records: &[MutationRecord],
) -> GatekeepResult<PermissionGrant> {
    let mutator = PermissionMutator::new(registry);
    let mut current = grant.clone();

    for (i, record) in records.iter().enumerate() {
        if record.principal_id != grant.principal_id {
            return Err(GatekeepError::Validation(format!(
                "record {i} belongs to {:?}, not {:?}",
                record.principal_id, grant.principal_id
            )));
        }
        current = mutator.apply(&current, &record.mutation)?;
    }

    tracing::debug!(principal_id = %grant.principal_id, records = records.len(), "replayed journal");
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeep_core::{ActionKey, Role};

    fn record(principal: &str, mutation: Mutation) -> MutationRecord {
        MutationRecord {
            principal_id: principal.into(),
            mutation,
        }
    }

    #[test]
    fn writes_one_line_per_record() {
        let mut buf = Vec::new();
        let mut sink = JournalSink::new(&mut buf);
        sink.write_record(&record("p1", Mutation::module("blogs", ActionKey::All, true)))
            .unwrap();
        sink.write_record(&record(
            "p1",
            Mutation::sub_module("blogs", "write", ActionKey::Delete, false),
        ))
        .unwrap();
        assert_eq!(sink.rows_written(), 2);
        assert_eq!(sink.finish().unwrap(), 2);

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["principalId"], "p1");
        assert_eq!(first["action"], "all");
        assert!(first.get("subModule").is_none());
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["subModule"], "write");
    }

    #[test]
    fn reads_back_and_skips_blank_lines() {
        let input = "\
{\"principalId\":\"p1\",\"module\":\"jobs\",\"action\":\"read\",\"value\":true}

{\"principalId\":\"p1\",\"module\":\"jobs\",\"subModule\":\"list\",\"action\":\"print\",\"value\":true}
";
        let records = read_journal(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].mutation.sub_module.as_deref(), Some("list"));
    }

    #[test]
    fn unknown_action_in_journal_is_rejected() {
        let input = "{\"principalId\":\"p1\",\"module\":\"jobs\",\"action\":\"publish\",\"value\":true}\n";
        let err = read_journal(input.as_bytes()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn replay_rejects_foreign_records() {
        let records = vec![record("p2", Mutation::module("jobs", ActionKey::Read, true))];
        let err = replay(&PermissionGrant::empty("p1"), &[], &records).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn session_journal_replays_to_same_grant() {
        let start = PermissionGrant::empty("p1");
        let mut session = EditSession::new(start.clone(), Role::Admin, Some(Vec::new()));
        session.apply_module_action("blogs", ActionKey::All, true).unwrap();
        session.apply_sub_module_action("blogs", "write", ActionKey::Delete, false).unwrap();
        session.apply_module_action("jobs", ActionKey::Export, true).unwrap();

        let mut buf = Vec::new();
        let mut sink = JournalSink::new(&mut buf);
        sink.write_session(&session).unwrap();
        assert_eq!(sink.finish().unwrap(), 3);

        let records = read_journal(buf.as_slice()).unwrap();
        let replayed = replay(&start, &[], &records).unwrap();
        assert_eq!(&replayed, session.grant());
    }
}
