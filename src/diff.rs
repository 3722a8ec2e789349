use crate::annotation::AttributeMap;
use crate::error::CurationError;
use itertools::{EitherOrBoth, Itertools};
use serde::{Deserialize, Serialize};

/// One atomic operation against an annotation's attribute map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AttributeOp {
    Set { key: String, value: String },
    Remove { key: String },
}

impl AttributeOp {
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Remove { key } => key,
        }
    }
}

/// Ordered sequence of attribute operations. Ops are emitted in ascending key
/// order, so two diffs of equal semantic content are representation-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta(pub Vec<AttributeOp>);

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn ops(&self) -> &[AttributeOp] {
        &self.0
    }
}

/// Forward delta and its exact inverse, computed together at diff time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaPair {
    pub forward: Delta,
    pub inverse: Delta,
}

impl DeltaPair {
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Diffs two attribute maps. Total: never fails, and an empty pair signals a
/// no-op edit (rejected by the transaction layer, not here).
///
/// The inverse is built from the old values rather than by negating the
/// forward ops: a forward `Set` over a pre-existing key inverts to `Set(old)`,
/// over a fresh key to `Remove`; a forward `Remove` inverts to `Set(old)`.
pub fn compute_delta(old: &AttributeMap, new: &AttributeMap) -> DeltaPair {
    let mut forward = Vec::new();
    let mut inverse = Vec::new();

    for pair in old
        .iter()
        .merge_join_by(new.iter(), |a, b| a.0.cmp(b.0))
    {
        match pair {
            EitherOrBoth::Left((key, old_value)) => {
                forward.push(AttributeOp::Remove { key: key.clone() });
                inverse.push(AttributeOp::Set {
                    key: key.clone(),
                    value: old_value.clone(),
                });
            }
            EitherOrBoth::Right((key, new_value)) => {
                forward.push(AttributeOp::Set {
                    key: key.clone(),
                    value: new_value.clone(),
                });
                inverse.push(AttributeOp::Remove { key: key.clone() });
            }
            EitherOrBoth::Both((key, old_value), (_, new_value)) => {
                if old_value != new_value {
                    forward.push(AttributeOp::Set {
                        key: key.clone(),
                        value: new_value.clone(),
                    });
                    inverse.push(AttributeOp::Set {
                        key: key.clone(),
                        value: old_value.clone(),
                    });
                }
            }
        }
    }

    DeltaPair {
        forward: Delta(forward),
        inverse: Delta(inverse),
    }
}

/// Applies a delta in sequence. Removing an absent key is a key-state
/// assumption violation (corrupt log or non-monotonic replay) and aborts the
/// whole application; it is never silently skipped.
pub fn apply_delta(
    entity_id: &str,
    attributes: &mut AttributeMap,
    delta: &Delta,
) -> Result<(), CurationError> {
    for op in delta.ops() {
        match op {
            AttributeOp::Set { key, value } => {
                attributes.insert(key.clone(), value.clone());
            }
            AttributeOp::Remove { key } => {
                if attributes.remove(key).is_none() {
                    return Err(CurationError::invalid_remove_target(entity_id, key));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn forward_and_inverse_cover_change_addition_and_removal() {
        let old = attrs(&[("product", "kinase"), ("obsolete", "yes")]);
        let new = attrs(&[("product", "kinase2"), ("note", "reviewed")]);
        let pair = compute_delta(&old, &new);

        assert_eq!(
            pair.forward.ops(),
            &[
                AttributeOp::Set {
                    key: "note".to_string(),
                    value: "reviewed".to_string()
                },
                AttributeOp::Remove {
                    key: "obsolete".to_string()
                },
                AttributeOp::Set {
                    key: "product".to_string(),
                    value: "kinase2".to_string()
                },
            ]
        );
        assert_eq!(
            pair.inverse.ops(),
            &[
                AttributeOp::Remove {
                    key: "note".to_string()
                },
                AttributeOp::Set {
                    key: "obsolete".to_string(),
                    value: "yes".to_string()
                },
                AttributeOp::Set {
                    key: "product".to_string(),
                    value: "kinase".to_string()
                },
            ]
        );
    }

    #[test]
    fn applying_forward_then_inverse_is_identity() {
        let old = attrs(&[("product", "kinase"), ("note", "draft")]);
        let new = attrs(&[("product", "kinase2"), ("evidence", "ISS")]);
        let pair = compute_delta(&old, &new);

        let mut working = old.clone();
        apply_delta("gene1", &mut working, &pair.forward).unwrap();
        assert_eq!(working, new);
        apply_delta("gene1", &mut working, &pair.inverse).unwrap();
        assert_eq!(working, old);

        // Symmetric statement from the new side.
        let mut working = new.clone();
        apply_delta("gene1", &mut working, &pair.inverse).unwrap();
        assert_eq!(working, old);
        apply_delta("gene1", &mut working, &pair.forward).unwrap();
        assert_eq!(working, new);
    }

    #[test]
    fn equal_maps_yield_empty_pair() {
        let a = attrs(&[("product", "kinase")]);
        let pair = compute_delta(&a, &a.clone());
        assert!(pair.is_empty());
        assert!(pair.inverse.is_empty());
    }

    #[test]
    fn repeated_diffs_are_representation_identical() {
        let old = attrs(&[("b", "2"), ("a", "1"), ("c", "3")]);
        let new = attrs(&[("c", "3"), ("a", "changed"), ("d", "4")]);
        let first = compute_delta(&old, &new);
        let second = compute_delta(&old, &new);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn remove_of_absent_key_aborts_replay() {
        let mut working = attrs(&[("product", "kinase")]);
        let delta = Delta(vec![AttributeOp::Remove {
            key: "note".to_string(),
        }]);
        let err = apply_delta("gene1", &mut working, &delta).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRemoveTarget);
        assert!(err.message.contains("note"));
    }

    #[test]
    fn op_wire_layout_uses_op_tag() {
        let op = AttributeOp::Set {
            key: "product".to_string(),
            value: "kinase".to_string(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "set");
        assert_eq!(json["key"], "product");
        assert_eq!(json["value"], "kinase");
        let remove: AttributeOp =
            serde_json::from_str(r#"{"op":"remove","key":"note"}"#).unwrap();
        assert_eq!(
            remove,
            AttributeOp::Remove {
                key: "note".to_string()
            }
        );
    }
}
