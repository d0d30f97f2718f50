//! Per-vehicle/per-appointment control state.
//!
//! Loading probes an ordered list of candidate locations and accepts the
//! first well-formed map; edits update memory optimistically and mirror out
//! through the persistence adapter. Note edits are coalesced per parameter
//! behind a quiet window, and the in-memory map is only updated once the
//! debounced write lands; updating it per keystroke would re-render the
//! input and lose focus.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use store::{DocumentStore, StoreError};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::ChecklistConfig;
use crate::models::{ChecklistParameter, Control, ControlState, Subject};
use crate::paths;
use crate::persist::PersistenceAdapter;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ControlStore {
    store: Arc<dyn DocumentStore>,
    subject: Subject,
    adapter: PersistenceAdapter,
    controls: Arc<RwLock<HashMap<String, Control>>>,
    pending_notes: DashMap<String, JoinHandle<()>>,
    note_debounce: Duration,
}

impl ControlStore {
    pub fn new(store: Arc<dyn DocumentStore>, subject: Subject) -> Self {
        Self::with_config(store, subject, &ChecklistConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        subject: Subject,
        config: &ChecklistConfig,
    ) -> Self {
        let adapter = PersistenceAdapter::new(store.clone());
        Self {
            store,
            subject,
            adapter,
            controls: Arc::new(RwLock::new(HashMap::new())),
            pending_notes: DashMap::new(),
            note_debounce: config.note_debounce(),
        }
    }

    /// Probe the candidate locations in priority order and copy the first
    /// well-formed map verbatim. A map counts as well-formed when at least
    /// one entry carries a parseable `state`; entries without one are
    /// skipped. No match leaves the store empty, and every parameter then
    /// falls back to its catalog default on first display.
    pub async fn load(&self) -> Result<(), ControlError> {
        for candidate in paths::read_candidates(&self.subject) {
            let Some(Value::Object(map)) = self.store.read(&candidate).await? else {
                continue;
            };
            let mut loaded = HashMap::new();
            for (parameter_id, raw) in map {
                match serde_json::from_value::<Control>(raw) {
                    Ok(control) => {
                        loaded.insert(parameter_id, control);
                    }
                    Err(_) => continue,
                }
            }
            if !loaded.is_empty() {
                debug!(path = %candidate, entries = loaded.len(), "controls loaded");
                *self.controls.write().await = loaded;
                return Ok(());
            }
        }
        self.controls.write().await.clear();
        Ok(())
    }

    pub async fn get(&self, parameter_id: &str) -> Option<Control> {
        self.controls.read().await.get(parameter_id).cloned()
    }

    pub async fn snapshot(&self) -> HashMap<String, Control> {
        self.controls.read().await.clone()
    }

    /// Current control for a parameter, lazily created in memory at the
    /// parameter's default the first time it is displayed. Not persisted
    /// until the user actually edits it.
    pub async fn control_for(&self, parameter: &ChecklistParameter) -> Control {
        let mut controls = self.controls.write().await;
        controls
            .entry(parameter.id.clone())
            .or_insert_with(|| Control::new(parameter.default_state))
            .clone()
    }

    /// Optimistic state change: memory first, then the fan-out write. A
    /// failed write is logged by the adapter and the optimistic state is
    /// deliberately not rolled back.
    pub async fn set_state(&self, parameter_id: &str, state: ControlState) {
        let control = {
            let mut controls = self.controls.write().await;
            let entry = controls
                .entry(parameter_id.to_string())
                .or_insert_with(|| Control::new(state));
            entry.state = state;
            entry.clone()
        };
        self.adapter
            .write_control(&self.subject, parameter_id, &control)
            .await;
    }

    /// One step of the three-state cycle, returning the new state.
    pub async fn toggle(&self, parameter: &ChecklistParameter) -> ControlState {
        let next = self.control_for(parameter).await.state.toggled();
        self.set_state(&parameter.id, next).await;
        next
    }

    /// Debounced note edit: at most one write per parameter per quiet
    /// window. A newer keystroke replaces the pending write. The in-memory
    /// map (and thus `get`) reflects the note only after the window elapses
    /// and the write completes.
    pub fn set_note(&self, parameter: &ChecklistParameter, note: String) {
        let controls = Arc::clone(&self.controls);
        let adapter = self.adapter.clone();
        let subject = self.subject.clone();
        let parameter_id = parameter.id.clone();
        let default_state = parameter.default_state;
        let debounce = self.note_debounce;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let state = controls
                .read()
                .await
                .get(&parameter_id)
                .map(|c| c.state)
                .unwrap_or(default_state);
            let control = Control { state, note };
            adapter
                .write_control(&subject, &parameter_id, &control)
                .await;
            controls.write().await.insert(parameter_id, control);
        });

        if let Some(previous) = self.pending_notes.insert(parameter.id.clone(), handle) {
            previous.abort();
        }
        // Handles whose writes already landed are no longer pending.
        self.pending_notes.retain(|_, handle| !handle.is_finished());
    }

    /// Wait out every pending note write (navigation-away hook).
    pub async fn flush_notes(&self) {
        let parameter_ids: Vec<String> = self
            .pending_notes
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for parameter_id in parameter_ids {
            if let Some((_, handle)) = self.pending_notes.remove(&parameter_id) {
                // Aborted handles just return a join error.
                let _ = handle.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use store::MemoryStore;

    use super::*;

    fn param(id: &str, section: &str, default_state: ControlState) -> ChecklistParameter {
        ChecklistParameter {
            id: id.to_string(),
            name: id.to_string(),
            section: section.to_string(),
            default_state,
        }
    }

    async fn seeded_store(seed: Value) -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_root(seed))
    }

    #[tokio::test]
    async fn canonical_path_beats_every_legacy_path() {
        let store = seeded_store(json!({
            "lavorazione": {"v1": {"controls": {"p1": {"state": "CONTROLLATO", "note": "canonical"}}}},
            "vehicles": {"v1": {"fase2": {"controls": {"p1": {"state": "DA FARE", "note": "legacy"}}}}},
        }))
        .await;
        let controls = ControlStore::new(store, Subject::vehicle("v1"));
        controls.load().await.unwrap();

        let control = controls.get("p1").await.unwrap();
        assert_eq!(control.state, ControlState::Controllato);
        assert_eq!(control.note, "canonical");
    }

    #[tokio::test]
    async fn falls_back_through_legacy_paths_in_order() {
        // Only legacy path #3 (workingPhase/{id}/controls) has data.
        let store = seeded_store(json!({
            "workingPhase": {"v1": {"controls": {"p1": {"state": "DA FARE"}}}},
        }))
        .await;
        let controls = ControlStore::new(store, Subject::vehicle("v1"));
        controls.load().await.unwrap();

        let control = controls.get("p1").await.unwrap();
        assert_eq!(control.state, ControlState::DaFare);
        assert_eq!(control.note, "");
    }

    #[tokio::test]
    async fn malformed_map_is_skipped_during_probing() {
        // Canonical holds entries with no usable state; the legacy map wins.
        let store = seeded_store(json!({
            "lavorazione": {"v1": {"controls": {"p1": {"note": "stateless"}}}},
            "vehicles": {"v1": {"checklist": {"p1": {"state": "CONTROLLATO"}}}},
        }))
        .await;
        let controls = ControlStore::new(store, Subject::vehicle("v1"));
        controls.load().await.unwrap();
        assert_eq!(
            controls.get("p1").await.unwrap().state,
            ControlState::Controllato
        );
    }

    #[tokio::test]
    async fn appointment_copy_wins_over_vehicle_copy() {
        let store = seeded_store(json!({
            "appointments": {"a1": {"checklist": {"p1": {"state": "DA FARE", "note": "appt"}}}},
            "lavorazione": {"v1": {"controls": {"p1": {"state": "CONTROLLATO", "note": "veh"}}}},
        }))
        .await;
        let controls = ControlStore::new(store, Subject::both("v1", "a1"));
        controls.load().await.unwrap();
        assert_eq!(controls.get("p1").await.unwrap().note, "appt");
    }

    #[tokio::test]
    async fn explicit_empty_note_is_preserved() {
        let store = seeded_store(json!({
            "lavorazione": {"v1": {"controls": {"p1": {"state": "CONTROLLATO", "note": ""}}}},
        }))
        .await;
        let controls = ControlStore::new(store, Subject::vehicle("v1"));
        controls.load().await.unwrap();
        assert_eq!(controls.get("p1").await.unwrap().note, "");
    }

    #[tokio::test]
    async fn missing_everywhere_defaults_from_catalog() {
        let store = seeded_store(Value::Null).await;
        let controls = ControlStore::new(store, Subject::vehicle("v1"));
        controls.load().await.unwrap();

        assert_eq!(controls.get("p1").await, None);
        let control = controls
            .control_for(&param("p1", "Freni", ControlState::DaFare))
            .await;
        assert_eq!(control.state, ControlState::DaFare);
        assert_eq!(control.note, "");
    }

    #[tokio::test]
    async fn set_state_mirrors_to_both_canonical_paths() {
        let store = seeded_store(Value::Null).await;
        let controls = ControlStore::new(store.clone(), Subject::vehicle("v1"));
        controls.load().await.unwrap();
        controls.set_state("p1", ControlState::Controllato).await;

        for path in [
            "lavorazione/v1/controls/p1/state",
            "lavorazione/v1/checklist/p1/state",
        ] {
            assert_eq!(store.read(path).await.unwrap(), Some(json!("CONTROLLATO")));
        }
    }

    #[tokio::test]
    async fn toggle_follows_the_three_state_cycle() {
        let store = seeded_store(Value::Null).await;
        let controls = ControlStore::new(store, Subject::vehicle("v1"));
        let p = param("p1", "Motore", ControlState::Controllato);

        assert_eq!(controls.toggle(&p).await, ControlState::NonControllato);
        assert_eq!(controls.toggle(&p).await, ControlState::DaFare);
        assert_eq!(controls.toggle(&p).await, ControlState::Controllato);
    }

    #[tokio::test(start_paused = true)]
    async fn note_edits_coalesce_to_one_write() {
        let store = seeded_store(Value::Null).await;
        let controls = ControlStore::new(store.clone(), Subject::vehicle("v1"));
        let p = param("p1", "Motore", ControlState::NonControllato);

        controls.set_note(&p, "pa".to_string());
        controls.set_note(&p, "pastiglie al 50%".to_string());
        // Nothing visible before the quiet window elapses.
        assert_eq!(controls.get("p1").await, None);

        controls.flush_notes().await;
        assert_eq!(
            controls.get("p1").await.unwrap().note,
            "pastiglie al 50%"
        );
        assert_eq!(
            store
                .read("lavorazione/v1/controls/p1/note")
                .await
                .unwrap(),
            Some(json!("pastiglie al 50%"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn completed_note_handles_are_swept() {
        let store = seeded_store(Value::Null).await;
        let controls = ControlStore::new(store, Subject::vehicle("v1"));
        let p1 = param("p1", "Motore", ControlState::NonControllato);
        let p2 = param("p2", "Motore", ControlState::NonControllato);

        controls.set_note(&p1, "a".to_string());
        // Let the p1 write land without an explicit flush.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controls.get("p1").await.unwrap().note, "a");

        controls.set_note(&p2, "b".to_string());
        // The finished p1 handle was swept; only p2 is pending.
        assert_eq!(controls.pending_notes.len(), 1);
        assert!(controls.pending_notes.contains_key("p2"));
        controls.flush_notes().await;
        assert_eq!(controls.get("p2").await.unwrap().note, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_note_keeps_current_state() {
        let store = seeded_store(json!({
            "lavorazione": {"v1": {"controls": {"p1": {"state": "DA FARE", "note": ""}}}},
        }))
        .await;
        let controls = ControlStore::new(store, Subject::vehicle("v1"));
        controls.load().await.unwrap();

        controls.set_note(
            &param("p1", "Freni", ControlState::NonControllato),
            "da ordinare".to_string(),
        );
        controls.flush_notes().await;

        let control = controls.get("p1").await.unwrap();
        assert_eq!(control.state, ControlState::DaFare);
        assert_eq!(control.note, "da ordinare");
    }
}
