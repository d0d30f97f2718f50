//! Dual/multi-path write strategy.
//!
//! Every state change is mirrored into the canonical `controls` and
//! `checklist` locations (and the appointment checklist when one is in
//! scope) as independent best-effort writes. There is no atomicity across
//! the targets and none is attempted: readers have always tolerated
//! partially mirrored data.

use std::sync::Arc;

use store::DocumentStore;
use tracing::{error, warn};

use crate::models::{Control, Subject};
use crate::paths;

#[derive(Clone)]
pub struct PersistenceAdapter {
    store: Arc<dyn DocumentStore>,
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Mirror one control into every configured target. Failures are logged
    /// and swallowed; callers proceed as if the write succeeded.
    pub async fn write_control(&self, subject: &Subject, parameter_id: &str, control: &Control) {
        let value = match serde_json::to_value(control) {
            Ok(value) => value,
            Err(err) => {
                error!(parameter_id, error = %err, "control not serializable, dropping write");
                return;
            }
        };
        for target in paths::write_targets(subject) {
            let path = format!("{target}/{parameter_id}");
            if let Err(err) = self.store.write(&path, value.clone()).await {
                warn!(path, error = %err, "control write failed, continuing");
            }
        }
    }
}
