use crate::annotation::{EntityId, GeneAnnotation};
use crate::error::{CurationError, ErrorCode};
use crate::history::HistoryLog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Authoritative state for one entity: the current snapshot plus its
/// append-only edit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub current: GeneAnnotation,
    #[serde(default)]
    pub log: HistoryLog,
}

/// Durable store contents: every curated annotation keyed by entity id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurationState {
    #[serde(default)]
    pub entities: BTreeMap<EntityId, EntityRecord>,
}

impl CurationState {
    pub fn load_from_path(path: &str) -> Result<Self, CurationError> {
        let text = std::fs::read_to_string(path).map_err(|e| CurationError {
            code: ErrorCode::Io,
            message: format!("Could not read store file '{path}': {e}"),
        })?;
        let state: Self = serde_json::from_str(&text).map_err(|e| CurationError {
            code: ErrorCode::InvalidInput,
            message: format!("Could not parse store JSON '{path}': {e}"),
        })?;
        state.verify()?;
        Ok(state)
    }

    pub fn save_to_path(&self, path: &str) -> Result<(), CurationError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| CurationError {
            code: ErrorCode::Internal,
            message: format!("Could not serialize store state: {e}"),
        })?;
        std::fs::write(path, text).map_err(|e| CurationError {
            code: ErrorCode::Io,
            message: format!("Could not write store file '{path}': {e}"),
        })
    }

    /// Log integrity for every entity. A corrupt file surfaces here instead
    /// of failing later mid-reconstruction.
    pub fn verify(&self) -> Result<(), CurationError> {
        for (entity_id, record) in &self.entities {
            if &record.current.id != entity_id {
                return Err(CurationError::new(
                    ErrorCode::Internal,
                    format!(
                        "Store entry '{entity_id}' holds snapshot for '{}'",
                        record.current.id
                    ),
                ));
            }
            record.log.verify(entity_id)?;
        }
        Ok(())
    }
}
