use crate::annotation::{EntityId, UserId};
use crate::diff::Delta;
use crate::error::{CurationError, ErrorCode};
use serde::{Deserialize, Serialize};

/// One committed edit. Immutable once appended; pairs the forward delta with
/// the inverse computed at diff time so any snapshot can be rebuilt by replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub sequence_number: u64,
    pub entity_id: EntityId,
    pub forward: Delta,
    pub inverse: Delta,
    pub author: UserId,
    pub timestamp_unix_ms: u128,
}

/// Append-only edit log for one entity, newest-last. Sequence numbers start
/// at 1 and are contiguous; the empty log has tail 0, which is also the
/// version number a freshly imported snapshot is read at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLog {
    records: Vec<EditRecord>,
}

impl HistoryLog {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[EditRecord] {
        &self.records
    }

    /// Restartable newest-first view, the order navigation replays in.
    pub fn newest_first(&self) -> impl Iterator<Item = &EditRecord> {
        self.records.iter().rev()
    }

    pub fn tail_sequence_number(&self) -> u64 {
        self.records.last().map(|r| r.sequence_number).unwrap_or(0)
    }

    /// Appends the next record iff `expected_tail` still matches the log
    /// tail. This compare-and-append is the per-entity serialization point:
    /// a caller holding a stale base sequence number gets
    /// `ConcurrentAppendConflict` and must reload and retry.
    pub fn append(
        &mut self,
        entity_id: &str,
        forward: Delta,
        inverse: Delta,
        author: &str,
        expected_tail: u64,
    ) -> Result<&EditRecord, CurationError> {
        let tail = self.tail_sequence_number();
        if expected_tail != tail {
            return Err(CurationError::append_conflict(entity_id, expected_tail, tail));
        }
        self.records.push(EditRecord {
            sequence_number: tail + 1,
            entity_id: entity_id.to_string(),
            forward,
            inverse,
            author: author.to_string(),
            timestamp_unix_ms: now_unix_ms(),
        });
        Ok(self
            .records
            .last()
            .unwrap_or_else(|| unreachable!("record pushed above")))
    }

    /// Integrity check run when a store file is loaded: sequence numbers must
    /// be contiguous from 1 and every record must belong to `entity_id`.
    pub fn verify(&self, entity_id: &str) -> Result<(), CurationError> {
        for (index, record) in self.records.iter().enumerate() {
            let expected = index as u64 + 1;
            if record.sequence_number != expected {
                return Err(CurationError::new(
                    ErrorCode::Internal,
                    format!(
                        "Corrupt history for '{entity_id}': record {index} has sequence number \
                         {} (expected {expected})",
                        record.sequence_number
                    ),
                ));
            }
            if record.entity_id != entity_id {
                return Err(CurationError::new(
                    ErrorCode::Internal,
                    format!(
                        "Corrupt history for '{entity_id}': record {expected} belongs to '{}'",
                        record.entity_id
                    ),
                ));
            }
        }
        Ok(())
    }
}

pub fn now_unix_ms() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{AttributeOp, Delta};

    fn set(key: &str, value: &str) -> Delta {
        Delta(vec![AttributeOp::Set {
            key: key.to_string(),
            value: value.to_string(),
        }])
    }

    #[test]
    fn append_assigns_contiguous_sequence_numbers() {
        let mut log = HistoryLog::default();
        assert_eq!(log.tail_sequence_number(), 0);

        let first = log
            .append("gene1", set("product", "kinase2"), set("product", "kinase"), "ann", 0)
            .unwrap();
        assert_eq!(first.sequence_number, 1);
        let second = log
            .append("gene1", set("note", "reviewed"), set("note", ""), "ben", 1)
            .unwrap();
        assert_eq!(second.sequence_number, 2);
        assert_eq!(log.tail_sequence_number(), 2);
        assert_eq!(log.records()[0].author, "ann");

        let newest: Vec<u64> = log.newest_first().map(|r| r.sequence_number).collect();
        assert_eq!(newest, vec![2, 1]);
    }

    #[test]
    fn stale_expected_tail_is_a_conflict() {
        let mut log = HistoryLog::default();
        log.append("gene1", set("a", "1"), Delta::default(), "ann", 0)
            .unwrap();
        let err = log
            .append("gene1", set("b", "2"), Delta::default(), "ben", 0)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentAppendConflict);
        assert!(err.message.contains("version 0"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn verify_rejects_sequence_gap_and_foreign_records() {
        let mut log = HistoryLog::default();
        log.append("gene1", set("a", "1"), Delta::default(), "ann", 0)
            .unwrap();
        log.append("gene1", set("b", "2"), Delta::default(), "ann", 1)
            .unwrap();
        assert!(log.verify("gene1").is_ok());

        let mut gapped: HistoryLog = serde_json::from_str(
            &serde_json::to_string(&log)
                .unwrap()
                .replace("\"sequence_number\":2", "\"sequence_number\":3"),
        )
        .unwrap();
        let err = gapped.verify("gene1").unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(err.message.contains("expected 2"));

        gapped = log.clone();
        let err = gapped.verify("gene2").unwrap_err();
        assert!(err.message.contains("belongs to 'gene1'"));
    }
}
