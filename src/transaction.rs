use crate::annotation::{validate_attributes, AttributeMap, EntityId, GeneAnnotation};
use crate::attributes::AttributeCatalog;
use crate::diff::compute_delta;
use crate::error::{CurationError, ErrorCode};
use crate::history::EditRecord;
use crate::navigator::reconstruct;
use crate::store::{CurationState, EntityRecord};
use crate::ATTRIBUTE_CATALOG;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    EditAttributes,
    RevertVersion,
}

/// Authorization hook supplied by the surrounding application. The engine
/// never inspects sessions or ambient user state; identity comes in as an
/// explicit parameter and permission comes back as a plain boolean.
pub trait AccessPolicy {
    fn is_permitted(&self, user_id: &str, entity_id: &str, action: EditAction) -> bool;
}

/// Role-based policy: curators may edit attributes, admins may additionally
/// revert to a historical version. Admins are curators too.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    admins: HashSet<String>,
    curators: HashSet<String>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_admin(&mut self, user_id: &str) {
        self.admins.insert(user_id.to_string());
    }

    pub fn add_curator(&mut self, user_id: &str) {
        self.curators.insert(user_id.to_string());
    }
}

impl AccessPolicy for RoleTable {
    fn is_permitted(&self, user_id: &str, _entity_id: &str, action: EditAction) -> bool {
        match action {
            EditAction::EditAttributes => {
                self.curators.contains(user_id) || self.admins.contains(user_id)
            }
            EditAction::RevertVersion => self.admins.contains(user_id),
        }
    }
}

/// Grants everything; for tools and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn is_permitted(&self, _user_id: &str, _entity_id: &str, _action: EditAction) -> bool {
        true
    }
}

/// Orchestrates edits against the authoritative store. Each mutating call
/// runs read-tail-then-append under one `&mut self` borrow, which is the
/// per-entity serialization point the optimistic-concurrency check relies on.
#[derive(Debug)]
pub struct CurationService<P: AccessPolicy> {
    state: CurationState,
    policy: P,
}

impl<P: AccessPolicy> CurationService<P> {
    pub fn new(state: CurationState, policy: P) -> Self {
        Self { state, policy }
    }

    pub fn state(&self) -> &CurationState {
        &self.state
    }

    pub fn into_state(self) -> CurationState {
        self.state
    }

    /// Swap in freshly loaded store contents, e.g. after `load-store`.
    pub fn replace_state(&mut self, state: CurationState) {
        self.state = state;
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.state.entities.keys().cloned().collect()
    }

    pub fn current_snapshot(&self, entity_id: &str) -> Result<&GeneAnnotation, CurationError> {
        Ok(&self.entity(entity_id)?.current)
    }

    pub fn history(&self, entity_id: &str) -> Result<&[EditRecord], CurationError> {
        Ok(self.entity(entity_id)?.log.records())
    }

    pub fn history_len(&self, entity_id: &str) -> Result<usize, CurationError> {
        Ok(self.entity(entity_id)?.log.len())
    }

    /// Snapshot as it was `steps_back` edits ago.
    pub fn snapshot_at(
        &self,
        entity_id: &str,
        steps_back: usize,
    ) -> Result<GeneAnnotation, CurationError> {
        let record = self.entity(entity_id)?;
        reconstruct(&record.current, &record.log, steps_back)
    }

    /// Registers a new annotation with an empty history. Reserved keys are
    /// kept out of the store here so every later edit only needs to vet the
    /// incoming map.
    pub fn import_annotation(&mut self, annotation: GeneAnnotation) -> Result<(), CurationError> {
        validate_attributes(&annotation.attributes)?;
        if let Some(key) = reserved_key_in(&annotation.attributes) {
            return Err(CurationError::new(
                ErrorCode::InvalidInput,
                format!("Attribute key '{key}' is reserved and cannot be edited"),
            ));
        }
        if self.state.entities.contains_key(&annotation.id) {
            return Err(CurationError::new(
                ErrorCode::InvalidInput,
                format!("Annotation '{}' already exists", annotation.id),
            ));
        }
        self.state.entities.insert(
            annotation.id.clone(),
            EntityRecord {
                current: annotation,
                log: Default::default(),
            },
        );
        Ok(())
    }

    /// One save: diff the base snapshot against the curator's merged
    /// attribute map, check permission, append forward+inverse to the log and
    /// commit the new current snapshot. Exactly one record is appended on
    /// success; every failure path leaves the store untouched.
    pub fn submit_edit(
        &mut self,
        entity_id: &str,
        base_sequence_number: u64,
        new_attributes: AttributeMap,
        author: &str,
    ) -> Result<EditRecord, CurationError> {
        let record = self
            .state
            .entities
            .get_mut(entity_id)
            .ok_or_else(|| CurationError::not_found(entity_id))?;

        // A stale base makes the diff meaningless; reject before diffing.
        // The edit is never merged onto a moved tail.
        let tail = record.log.tail_sequence_number();
        if base_sequence_number != tail {
            return Err(CurationError::append_conflict(
                entity_id,
                base_sequence_number,
                tail,
            ));
        }

        validate_attributes(&new_attributes)?;
        if let Some(key) = reserved_key_in(&new_attributes) {
            return Err(CurationError::new(
                ErrorCode::InvalidInput,
                format!("Attribute key '{key}' is reserved and cannot be edited"),
            ));
        }

        let pair = compute_delta(&record.current.attributes, &new_attributes);
        if pair.is_empty() {
            return Err(CurationError::no_op_edit(entity_id));
        }

        if !self
            .policy
            .is_permitted(author, entity_id, EditAction::EditAttributes)
        {
            return Err(CurationError::not_authorized(author, entity_id));
        }

        let appended = record
            .log
            .append(
                entity_id,
                pair.forward,
                pair.inverse,
                author,
                base_sequence_number,
            )?
            .clone();
        record.current = record.current.with_attributes(new_attributes);
        Ok(appended)
    }

    /// Reverts by appending a new edit whose attributes equal the snapshot
    /// `steps_back` edits ago. The log stays linear and append-only; nothing
    /// is truncated.
    pub fn revert_to_version(
        &mut self,
        entity_id: &str,
        steps_back: usize,
        author: &str,
    ) -> Result<EditRecord, CurationError> {
        if !self
            .policy
            .is_permitted(author, entity_id, EditAction::RevertVersion)
        {
            return Err(CurationError::not_authorized(author, entity_id));
        }
        let historical = self.snapshot_at(entity_id, steps_back)?;
        let base = self.entity(entity_id)?.log.tail_sequence_number();
        self.submit_edit(entity_id, base, historical.attributes, author)
    }

    fn entity(&self, entity_id: &str) -> Result<&EntityRecord, CurationError> {
        self.state
            .entities
            .get(entity_id)
            .ok_or_else(|| CurationError::not_found(entity_id))
    }
}

/// Catalog lookup shared by service instances; kept free so the session layer
/// can validate staged keys the same way the transaction does.
pub fn reserved_key_in(attributes: &AttributeMap) -> Option<&str> {
    attributes
        .keys()
        .find(|key| ATTRIBUTE_CATALOG.is_reserved(key))
        .map(String::as_str)
}

pub fn catalog() -> &'static AttributeCatalog {
    &ATTRIBUTE_CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::reconstruct;
    use crate::store::CurationState;

    fn annotation(pairs: &[(&str, &str)]) -> GeneAnnotation {
        GeneAnnotation {
            id: "gene1".to_string(),
            reference: "GRCh38".to_string(),
            seq_id: "chr2".to_string(),
            start: 100,
            end: 900,
            strand: "+".to_string(),
            source: "maker".to_string(),
            attributes: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn service() -> CurationService<AllowAll> {
        let mut service = CurationService::new(CurationState::default(), AllowAll);
        service
            .import_annotation(annotation(&[("product", "kinase")]))
            .unwrap();
        service
    }

    #[test]
    fn submit_edit_appends_record_and_commits_snapshot() {
        let mut service = service();
        let record = service
            .submit_edit(
                "gene1",
                0,
                attrs(&[("product", "kinase2"), ("note", "reviewed")]),
                "ann",
            )
            .unwrap();
        assert_eq!(record.sequence_number, 1);
        assert_eq!(record.author, "ann");
        assert_eq!(record.forward.len(), 2);

        let current = service.current_snapshot("gene1").unwrap();
        assert_eq!(current.attributes.get("product").map(String::as_str), Some("kinase2"));
        assert_eq!(service.history_len("gene1").unwrap(), 1);

        // Inverse replay recovers the pre-edit attributes without the new key.
        let previous = service.snapshot_at("gene1", 1).unwrap();
        assert_eq!(previous.attributes, attrs(&[("product", "kinase")]));
    }

    #[test]
    fn no_op_edit_is_rejected_and_appends_nothing() {
        let mut service = service();
        let err = service
            .submit_edit("gene1", 0, attrs(&[("product", "kinase")]), "ann")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NoOpEdit);
        assert_eq!(service.history_len("gene1").unwrap(), 0);
    }

    #[test]
    fn stale_base_conflicts_and_only_one_of_two_racing_edits_lands() {
        let mut service = service();
        service
            .submit_edit("gene1", 0, attrs(&[("product", "kinase2")]), "ann")
            .unwrap();
        // Second curator saved against the same base 0.
        let err = service
            .submit_edit("gene1", 0, attrs(&[("product", "kinase3")]), "ben")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentAppendConflict);
        assert_eq!(service.history_len("gene1").unwrap(), 1);
        assert_eq!(
            service
                .current_snapshot("gene1")
                .unwrap()
                .attributes
                .get("product")
                .map(String::as_str),
            Some("kinase2")
        );

        // Reload-and-retry path: re-derive against the new tail.
        service
            .submit_edit("gene1", 1, attrs(&[("product", "kinase3")]), "ben")
            .unwrap();
        assert_eq!(service.history_len("gene1").unwrap(), 2);
    }

    #[test]
    fn unauthorized_edit_changes_nothing() {
        let mut roles = RoleTable::new();
        roles.add_curator("ann");
        let mut service = CurationService::new(CurationState::default(), roles);
        service
            .import_annotation(annotation(&[("product", "kinase")]))
            .unwrap();

        let err = service
            .submit_edit("gene1", 0, attrs(&[("product", "kinase2")]), "mallory")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthorized);
        assert_eq!(service.history_len("gene1").unwrap(), 0);
        assert_eq!(
            service
                .current_snapshot("gene1")
                .unwrap()
                .attributes
                .get("product")
                .map(String::as_str),
            Some("kinase")
        );

        service
            .submit_edit("gene1", 0, attrs(&[("product", "kinase2")]), "ann")
            .unwrap();
    }

    #[test]
    fn revert_requires_admin_and_appends_a_new_record() {
        let mut roles = RoleTable::new();
        roles.add_curator("ann");
        roles.add_admin("root");
        let mut service = CurationService::new(CurationState::default(), roles);
        service
            .import_annotation(annotation(&[("product", "kinase")]))
            .unwrap();
        service
            .submit_edit("gene1", 0, attrs(&[("product", "kinase2")]), "ann")
            .unwrap();

        let err = service.revert_to_version("gene1", 1, "ann").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthorized);

        let record = service.revert_to_version("gene1", 1, "root").unwrap();
        assert_eq!(record.sequence_number, 2);
        assert_eq!(service.history_len("gene1").unwrap(), 2);
        assert_eq!(
            service.current_snapshot("gene1").unwrap().attributes,
            attrs(&[("product", "kinase")])
        );
    }

    #[test]
    fn revert_to_current_is_a_no_op() {
        let mut service = service();
        let err = service.revert_to_version("gene1", 0, "ann").unwrap_err();
        assert_eq!(err.code, ErrorCode::NoOpEdit);
    }

    #[test]
    fn reserved_and_empty_keys_are_rejected() {
        let mut service = service();
        let err = service
            .submit_edit(
                "gene1",
                0,
                attrs(&[("product", "kinase"), ("ID", "gene1")]),
                "ann",
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(err.message.contains("reserved"));

        let err = service
            .submit_edit("gene1", 0, attrs(&[("", "oops")]), "ann")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(service.history_len("gene1").unwrap(), 0);
    }

    #[test]
    fn reconstruction_matches_every_committed_version() {
        let mut service = service();
        let versions = [
            attrs(&[("product", "kinase")]),
            attrs(&[("product", "kinase2"), ("note", "reviewed")]),
            attrs(&[("note", "reviewed")]),
            attrs(&[("note", "final"), ("evidence", "ISS")]),
        ];
        for (i, version) in versions.iter().enumerate().skip(1) {
            service
                .submit_edit("gene1", i as u64 - 1, version.clone(), "ann")
                .unwrap();
        }

        let entity = service.state().entities.get("gene1").unwrap();
        for (steps_back, expected) in versions.iter().rev().enumerate() {
            let got = reconstruct(&entity.current, &entity.log, steps_back).unwrap();
            assert_eq!(&got.attributes, expected, "steps_back={steps_back}");
        }
    }
}
