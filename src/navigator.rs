use crate::annotation::GeneAnnotation;
use crate::diff::apply_delta;
use crate::error::CurationError;
use crate::history::HistoryLog;
use serde::{Deserialize, Serialize};

/// Rebuilds the snapshot as it was `steps_back` edits ago by folding inverse
/// deltas newest-to-oldest over a copy of the current snapshot.
///
/// `steps_back` outside `[0, log.len()]` is a caller error
/// (`OutOfRangeCursor`); a replay failure means the log is corrupt and aborts
/// the reconstruction.
pub fn reconstruct(
    current: &GeneAnnotation,
    log: &HistoryLog,
    steps_back: usize,
) -> Result<GeneAnnotation, CurationError> {
    if steps_back > log.len() {
        return Err(CurationError::out_of_range_cursor(steps_back, log.len()));
    }
    let mut working = current.clone();
    for record in log.newest_first().take(steps_back) {
        apply_delta(&current.id, &mut working.attributes, &record.inverse)?;
    }
    Ok(working)
}

/// Ephemeral browsing position: how many edits back from "current" the
/// viewer is looking. Created per history-view session and discarded when the
/// session leaves it; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCursor {
    steps_back: usize,
    history_len: usize,
}

impl VersionCursor {
    pub fn at_current(history_len: usize) -> Self {
        Self {
            steps_back: 0,
            history_len,
        }
    }

    pub fn steps_back(&self) -> usize {
        self.steps_back
    }

    pub fn is_current(&self) -> bool {
        self.steps_back == 0
    }

    /// The "version X of N" banner number: oldest reachable version is 0,
    /// current is `history_len`.
    pub fn version_number(&self) -> usize {
        self.history_len - self.steps_back
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Step one edit further into the past. Clamped at the oldest version:
    /// stepping past the boundary changes nothing and reports `false`.
    pub fn older(&mut self) -> bool {
        if self.steps_back < self.history_len {
            self.steps_back += 1;
            true
        } else {
            false
        }
    }

    /// Step one edit toward the present, clamped at current.
    pub fn newer(&mut self) -> bool {
        if self.steps_back > 0 {
            self.steps_back -= 1;
            true
        } else {
            false
        }
    }
}
