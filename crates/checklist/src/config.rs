use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Section names the catalog knows; anything else lands in the fallback
/// bucket for grouping.
pub const DEFAULT_SECTIONS: &[&str] = &[
    "Motore",
    "Pneumatici",
    "Freni",
    "Sospensioni",
    "Luci",
    "Carrozzeria",
];

pub const FALLBACK_SECTION: &str = "Altro";

const DEFAULT_NOTE_DEBOUNCE_MS: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistConfig {
    /// Quiet window before a note edit is written out. Coalescing only;
    /// correctness never depends on it.
    pub note_debounce_ms: u64,
    pub known_sections: Vec<String>,
}

impl Default for ChecklistConfig {
    fn default() -> Self {
        Self {
            note_debounce_ms: DEFAULT_NOTE_DEBOUNCE_MS,
            known_sections: DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ChecklistConfig {
    pub fn note_debounce(&self) -> Duration {
        Duration::from_millis(self.note_debounce_ms)
    }
}
