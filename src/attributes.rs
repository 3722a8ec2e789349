use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    /// Reserved names shadow structural fields (GFF3 linkage keys or the
    /// scalar columns of the annotation) and may not appear in the editable
    /// attribute map.
    pub reserved: bool,
}

/// Known attribute names, used two ways: reserved names are rejected by the
/// edit transaction, non-reserved names are offered as suggestions when a
/// curator adds a new key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeCatalog {
    entries: BTreeMap<String, AttributeInfo>,
}

impl AttributeCatalog {
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for name in ["ID", "Parent", "seqid", "start", "end", "strand", "source", "reference"] {
            catalog.insert(name, true);
        }
        for name in ["Name", "Alias", "product", "note", "evidence", "Dbxref", "Ontology_term"] {
            catalog.insert(name, false);
        }
        catalog
    }

    pub fn insert(&mut self, name: &str, reserved: bool) {
        self.entries.insert(
            name.to_string(),
            AttributeInfo {
                name: name.to_string(),
                reserved,
            },
        );
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|info| info.reserved)
    }

    /// Non-reserved known names, sorted, for the "add attribute" picker.
    pub fn suggestions(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|info| !info.reserved)
            .map(|info| info.name.clone())
            .collect()
    }
}
