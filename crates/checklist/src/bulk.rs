//! Bulk edit over a selection of parameters.
//!
//! The checklist view scopes the selection to the active section; the
//! catalog editor keeps a fully independent instance scoped to the whole
//! table. Scoping is the caller's candidate list; this type only owns the
//! selection itself.

use std::collections::HashSet;

use crate::controls::ControlStore;
use crate::models::ControlState;

#[derive(Debug, Default)]
pub struct BulkEdit {
    active: bool,
    selection: HashSet<String>,
}

impl BulkEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self) {
        self.active = true;
    }

    pub fn exit(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_selected(&self, parameter_id: &str) -> bool {
        self.selection.contains(parameter_id)
    }

    pub fn selection(&self) -> &HashSet<String> {
        &self.selection
    }

    pub fn toggle(&mut self, parameter_id: &str) {
        if !self.selection.remove(parameter_id) {
            self.selection.insert(parameter_id.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.selection.clear();
    }

    /// All-or-none flip: when the selection already equals the full
    /// candidate set, deselect everything; otherwise select everything.
    pub fn toggle_select_all<'a>(&mut self, candidates: impl IntoIterator<Item = &'a str>) {
        let all: HashSet<String> = candidates.into_iter().map(|id| id.to_string()).collect();
        if self.selection == all {
            self.selection.clear();
        } else {
            self.selection = all;
        }
    }

    /// Apply one state to every selected parameter, one write per id (no
    /// batching at the storage layer). Exits bulk-edit mode but keeps the
    /// selection populated; callers clear it explicitly when they want to.
    pub async fn apply(&mut self, controls: &ControlStore, target: ControlState) -> usize {
        let ids: Vec<String> = self.selection.iter().cloned().collect();
        for id in &ids {
            controls.set_state(id, target).await;
        }
        self.active = false;
        ids.len()
    }
}
