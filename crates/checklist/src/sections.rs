//! Section grouping and tab navigation for the checklist view.
//!
//! Grouping preserves catalog order: sections appear in first-seen order
//! and parameters keep their in-section catalog order. Active-section
//! fallback is an explicit reconciliation step run after data changes,
//! never as a side effect of a read.

use std::collections::HashMap;

use crate::config::FALLBACK_SECTION;
use crate::models::ChecklistParameter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionGroup {
    pub name: String,
    pub parameters: Vec<ChecklistParameter>,
}

/// Group parameters by section, bucketing unknown sections under
/// [`FALLBACK_SECTION`].
pub fn group_by_section(
    parameters: &[ChecklistParameter],
    known_sections: &[String],
) -> Vec<SectionGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<ChecklistParameter>> = HashMap::new();
    for parameter in parameters {
        let section = if known_sections.iter().any(|s| s == &parameter.section) {
            parameter.section.clone()
        } else {
            FALLBACK_SECTION.to_string()
        };
        if !buckets.contains_key(&section) {
            order.push(section.clone());
        }
        buckets.entry(section).or_default().push(parameter.clone());
    }
    order
        .into_iter()
        .map(|name| {
            let parameters = buckets.remove(&name).unwrap_or_default();
            SectionGroup { name, parameters }
        })
        .collect()
}

/// Flattened tab order: all parameter ids across all groups, section order
/// preserved, in-section order preserved.
pub fn tab_order(groups: &[SectionGroup]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|group| group.parameters.iter().map(|p| p.id.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabDirection {
    Forward,
    Backward,
}

/// Where keyboard navigation should land. When `section_changed` is set the
/// view has to switch tabs and re-render before focusing; same-section
/// moves can focus immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTarget {
    pub parameter_id: String,
    pub section: String,
    pub section_changed: bool,
}

#[derive(Debug, Default)]
pub struct SectionModel {
    active: Option<String>,
}

impl SectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn set_active(&mut self, section: impl Into<String>) {
        self.active = Some(section.into());
    }

    /// Re-align the active section with the current groups: when it is
    /// unset or no longer among the non-empty sections, fall back to the
    /// first available one. Call after catalog or control data changes.
    pub fn reconcile(&mut self, groups: &[SectionGroup]) {
        let non_empty: Vec<&str> = groups
            .iter()
            .filter(|g| !g.parameters.is_empty())
            .map(|g| g.name.as_str())
            .collect();
        let still_valid = self
            .active
            .as_deref()
            .is_some_and(|active| non_empty.contains(&active));
        if !still_valid {
            self.active = non_empty.first().map(|s| s.to_string());
        }
    }

    /// Tab/Shift-Tab target from `current`, wrapping across the ends of the
    /// flattened order. Switches the active section when the destination
    /// lives in a different one.
    pub fn next_focus(
        &mut self,
        groups: &[SectionGroup],
        current: &str,
        direction: TabDirection,
    ) -> Option<FocusTarget> {
        let order = tab_order(groups);
        let position = order.iter().position(|id| id == current)?;
        let destination = match direction {
            TabDirection::Forward => (position + 1) % order.len(),
            TabDirection::Backward => (position + order.len() - 1) % order.len(),
        };
        let parameter_id = order[destination].clone();
        let section = groups
            .iter()
            .find(|g| g.parameters.iter().any(|p| p.id == parameter_id))
            .map(|g| g.name.clone())?;
        let section_changed = self.active.as_deref() != Some(section.as_str());
        if section_changed {
            self.active = Some(section.clone());
        }
        Some(FocusTarget {
            parameter_id,
            section,
            section_changed,
        })
    }
}
