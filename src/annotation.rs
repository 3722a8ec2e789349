use crate::error::{CurationError, ErrorCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type EntityId = String;
pub type UserId = String;
pub type AttributeMap = BTreeMap<String, String>;

/// One versioned gene annotation. The scalar fields are immutable business
/// facts; only `attributes` is edited through the version-history flow.
/// Snapshots are treated as immutable values: every transformation returns a
/// new annotation, preserving the old one for diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneAnnotation {
    pub id: EntityId,
    pub reference: String,
    pub seq_id: String,
    pub start: u64,
    pub end: u64,
    pub strand: String,
    pub source: String,
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl GeneAnnotation {
    /// New snapshot with the same scalar fields and the given attribute map.
    pub fn with_attributes(&self, attributes: AttributeMap) -> Self {
        Self {
            attributes,
            ..self.clone()
        }
    }

    pub fn coordinates(&self) -> String {
        format!("{} {}..{} {}", self.seq_id, self.start, self.end, self.strand)
    }
}

pub fn validate_attribute_key(key: &str) -> Result<(), CurationError> {
    if key.trim().is_empty() {
        return Err(CurationError::new(
            ErrorCode::InvalidInput,
            "Attribute key must not be empty",
        ));
    }
    Ok(())
}

pub fn validate_attributes(attributes: &AttributeMap) -> Result<(), CurationError> {
    for key in attributes.keys() {
        validate_attribute_key(key)?;
    }
    Ok(())
}
