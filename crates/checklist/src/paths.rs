//! Storage locations for checklist data: the canonical paths plus every
//! legacy shape observed historically. Pure string templating; a malformed
//! id just yields a path nothing ever matches.

use crate::models::Subject;

/// Catalog of parameter definitions.
pub const CATALOG_ROOT: &str = "checklistParams";

/// Vehicles currently in a work phase live under this root; having a node
/// here is the in-progress marker the fan-out walks.
pub const WORKING_ROOT: &str = "lavorazione";

pub fn vehicle_controls(vehicle_id: &str) -> String {
    format!("{WORKING_ROOT}/{vehicle_id}/controls")
}

pub fn vehicle_checklist(vehicle_id: &str) -> String {
    format!("{WORKING_ROOT}/{vehicle_id}/checklist")
}

pub fn appointment_checklist(appointment_id: &str) -> String {
    format!("appointments/{appointment_id}/checklist")
}

pub fn catalog_parameter(parameter_id: &str) -> String {
    format!("{CATALOG_ROOT}/{parameter_id}")
}

/// Every legacy location control maps were written to before the paths
/// settled, in probe priority order.
pub fn legacy_vehicle_paths(vehicle_id: &str) -> Vec<String> {
    vec![
        format!("vehicles/{vehicle_id}/fase2/controls"),
        format!("vehicles/{vehicle_id}/fase2/checklist"),
        format!("workingPhase/{vehicle_id}/controls"),
        format!("workingPhase/{vehicle_id}/checklist"),
        format!("vehicles/{vehicle_id}/checklist"),
    ]
}

/// Ordered candidates probed on load: appointment data first when present,
/// then the canonical vehicle paths, then the legacy shapes.
pub fn read_candidates(subject: &Subject) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(appointment_id) = &subject.appointment {
        candidates.push(appointment_checklist(appointment_id));
    }
    if let Some(vehicle_id) = &subject.vehicle {
        candidates.push(vehicle_controls(vehicle_id));
        candidates.push(vehicle_checklist(vehicle_id));
        candidates.extend(legacy_vehicle_paths(vehicle_id));
    }
    candidates
}

/// Every location a state change is mirrored to. Writes always target the
/// canonical paths regardless of where the read succeeded, so readers still
/// on the deprecated `checklist` path stay correct.
pub fn write_targets(subject: &Subject) -> Vec<String> {
    let mut targets = Vec::new();
    if let Some(vehicle_id) = &subject.vehicle {
        targets.push(vehicle_controls(vehicle_id));
        targets.push(vehicle_checklist(vehicle_id));
    }
    if let Some(appointment_id) = &subject.appointment {
        targets.push(appointment_checklist(appointment_id));
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_paths() {
        assert_eq!(vehicle_controls("v1"), "lavorazione/v1/controls");
        assert_eq!(vehicle_checklist("v1"), "lavorazione/v1/checklist");
        assert_eq!(appointment_checklist("a1"), "appointments/a1/checklist");
        assert_eq!(catalog_parameter("freni-123"), "checklistParams/freni-123");
    }

    #[test]
    fn appointment_is_probed_before_vehicle_paths() {
        let candidates = read_candidates(&Subject::both("v1", "a1"));
        assert_eq!(candidates[0], "appointments/a1/checklist");
        assert_eq!(candidates[1], "lavorazione/v1/controls");
        assert_eq!(candidates[2], "lavorazione/v1/checklist");
        assert_eq!(candidates[3], "vehicles/v1/fase2/controls");
        assert_eq!(candidates.len(), 3 + legacy_vehicle_paths("v1").len());
    }

    #[test]
    fn writes_mirror_canonical_and_appointment_paths() {
        assert_eq!(
            write_targets(&Subject::vehicle("v1")),
            vec!["lavorazione/v1/controls", "lavorazione/v1/checklist"]
        );
        assert_eq!(
            write_targets(&Subject::both("v1", "a1")),
            vec![
                "lavorazione/v1/controls",
                "lavorazione/v1/checklist",
                "appointments/a1/checklist"
            ]
        );
        assert_eq!(
            write_targets(&Subject::appointment("a1")),
            vec!["appointments/a1/checklist"]
        );
    }
}
