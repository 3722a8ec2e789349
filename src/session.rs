use crate::annotation::{AttributeMap, EntityId, GeneAnnotation};
use crate::error::{CurationError, ErrorCode};
use crate::navigator::VersionCursor;

/// What the viewer is doing with one annotation. History browsing and editing
/// are mutually exclusive: a historical reconstruction cannot be edited, so
/// starting an edit always begins from the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    Viewing,
    BrowsingHistory(VersionCursor),
    Editing(EditSession),
}

/// Per-viewer session for one entity. Purely client-side: abandoning it has
/// no effect on the log or the current snapshot.
#[derive(Debug, Clone)]
pub struct BrowseSession {
    pub entity_id: EntityId,
    mode: SessionMode,
}

impl BrowseSession {
    pub fn new(entity_id: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            mode: SessionMode::Viewing,
        }
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    /// Enter history view at the current version. Toggling in or out always
    /// resets the cursor, matching the browsing UX.
    pub fn show_history(&mut self, history_len: usize) -> Result<VersionCursor, CurationError> {
        if matches!(self.mode, SessionMode::Editing(_)) {
            return Err(CurationError::new(
                ErrorCode::InvalidInput,
                "Finish or cancel the edit before browsing history",
            ));
        }
        let cursor = VersionCursor::at_current(history_len);
        self.mode = SessionMode::BrowsingHistory(cursor);
        Ok(cursor)
    }

    pub fn hide_history(&mut self) {
        if matches!(self.mode, SessionMode::BrowsingHistory(_)) {
            self.mode = SessionMode::Viewing;
        }
    }

    pub fn cursor_mut(&mut self) -> Option<&mut VersionCursor> {
        match &mut self.mode {
            SessionMode::BrowsingHistory(cursor) => Some(cursor),
            _ => None,
        }
    }

    /// Begin editing from the current snapshot. Legal from viewing or history
    /// view; the cursor is forced back to `steps_back = 0` by discarding it.
    pub fn start_edit(&mut self, current: &GeneAnnotation, base_sequence_number: u64) {
        self.mode = SessionMode::Editing(EditSession::new(current, base_sequence_number));
    }

    /// Discard in-progress changes and return to viewing.
    pub fn cancel_edit(&mut self) {
        if matches!(self.mode, SessionMode::Editing(_)) {
            self.mode = SessionMode::Viewing;
        }
    }

    pub fn edit_mut(&mut self) -> Option<&mut EditSession> {
        match &mut self.mode {
            SessionMode::Editing(session) => Some(session),
            _ => None,
        }
    }

    /// Leave editing after a successful save.
    pub fn finish_edit(&mut self) {
        self.mode = SessionMode::Viewing;
    }
}

/// Accumulates a curator's in-progress attribute changes against a fixed base
/// version. All mutations stay local until the merged map is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub base_sequence_number: u64,
    working: AttributeMap,
}

impl EditSession {
    pub fn new(base: &GeneAnnotation, base_sequence_number: u64) -> Self {
        Self {
            base_sequence_number,
            working: base.attributes.clone(),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) {
        self.working.insert(key.to_string(), value.to_string());
    }

    pub fn remove_attribute(&mut self, key: &str) {
        self.working.remove(key);
    }

    /// Adds a brand-new attribute. Both halves are required: a key without a
    /// value (or the reverse) is an incomplete entry, not a deletion.
    pub fn stage_new_attribute(&mut self, key: &str, value: &str) -> Result<(), CurationError> {
        if key.trim().is_empty() {
            return Err(CurationError::new(
                ErrorCode::InvalidInput,
                "New attribute key required",
            ));
        }
        if value.trim().is_empty() {
            return Err(CurationError::new(
                ErrorCode::InvalidInput,
                "New attribute value required",
            ));
        }
        self.working.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// The merged map to hand to `submit_edit`.
    pub fn new_attributes(&self) -> &AttributeMap {
        &self.working
    }
}
