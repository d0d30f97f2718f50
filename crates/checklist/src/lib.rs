//! Checklist core of the workshop management application.
//!
//! A parameter catalog defines the inspection checklist; each vehicle in a
//! work phase (and optionally its appointment) carries a control map
//! recording `{state, note}` per parameter. Storage paths drifted over the
//! application's life, so loading probes a priority-ordered candidate list
//! and every write fans out to the canonical and legacy-compatible
//! locations. The fan-out is intentionally non-transactional; see the
//! module docs in [`persist`].

pub mod bulk;
pub mod catalog;
pub mod config;
pub mod controls;
pub mod models;
pub mod paths;
pub mod persist;
pub mod sections;

pub use bulk::BulkEdit;
pub use catalog::{CatalogError, ParameterCatalog};
pub use config::ChecklistConfig;
pub use controls::{ControlError, ControlStore};
pub use models::{
    ChecklistParameter, Control, ControlState, CreateParameter, SheetState, Subject,
    UpdateParameter,
};
pub use persist::PersistenceAdapter;
pub use sections::{FocusTarget, SectionGroup, SectionModel, TabDirection, group_by_section, tab_order};
