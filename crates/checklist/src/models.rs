use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// State of one checklist control. Wire spellings match what the historical
/// frontend stored, spaces included.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
pub enum ControlState {
    #[serde(rename = "CONTROLLATO")]
    #[strum(serialize = "CONTROLLATO")]
    Controllato,
    #[serde(rename = "DA FARE")]
    #[strum(serialize = "DA FARE")]
    DaFare,
    #[default]
    #[serde(rename = "NON CONTROLLATO")]
    #[strum(serialize = "NON CONTROLLATO")]
    NonControllato,
}

impl ControlState {
    /// One step of the checklist toggle cycle:
    /// CONTROLLATO → NON CONTROLLATO → DA FARE → CONTROLLATO.
    pub fn toggled(self) -> Self {
        match self {
            Self::Controllato => Self::NonControllato,
            Self::NonControllato => Self::DaFare,
            Self::DaFare => Self::Controllato,
        }
    }
}

/// State on the simpler two-state inspection sheet. A distinct type: the
/// sheet never held a NON CONTROLLATO value and must not grow one.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
pub enum SheetState {
    #[serde(rename = "CONTROLLATO")]
    #[strum(serialize = "CONTROLLATO")]
    Controllato,
    #[default]
    #[serde(rename = "DA FARE")]
    #[strum(serialize = "DA FARE")]
    DaFare,
}

impl SheetState {
    pub fn toggled(self) -> Self {
        match self {
            Self::Controllato => Self::DaFare,
            Self::DaFare => Self::Controllato,
        }
    }
}

/// Recorded state of one parameter for one vehicle or appointment.
///
/// `note` defaults to empty when the stored record has none, but an
/// explicitly stored empty string is a real value: presence is a matter of
/// definedness, never truthiness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
pub struct Control {
    pub state: ControlState,
    #[serde(default)]
    pub note: String,
}

impl Control {
    pub fn new(state: ControlState) -> Self {
        Self {
            state,
            note: String::new(),
        }
    }
}

/// Stored shape of a catalog parameter; the id is the storage map key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
pub struct ParameterFields {
    pub name: String,
    pub section: String,
    #[serde(rename = "defaultState", default)]
    pub default_state: ControlState,
}

/// A catalog parameter with its id attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
pub struct ChecklistParameter {
    pub id: String,
    pub name: String,
    pub section: String,
    #[serde(rename = "defaultState")]
    pub default_state: ControlState,
}

impl ChecklistParameter {
    pub fn from_fields(id: String, fields: ParameterFields) -> Self {
        Self {
            id,
            name: fields.name,
            section: fields.section,
            default_state: fields.default_state,
        }
    }

    pub fn fields(&self) -> ParameterFields {
        ParameterFields {
            name: self.name.clone(),
            section: self.section.clone(),
            default_state: self.default_state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateParameter {
    pub name: String,
    pub section: String,
    #[serde(rename = "defaultState")]
    pub default_state: Option<ControlState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateParameter {
    pub name: Option<String>,
    pub section: Option<String>,
    #[serde(rename = "defaultState")]
    pub default_state: Option<ControlState>,
}

/// What a control map is attached to. A vehicle and its appointment may
/// each carry an independent copy of the same parameter's control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub vehicle: Option<String>,
    pub appointment: Option<String>,
}

impl Subject {
    pub fn vehicle(id: impl Into<String>) -> Self {
        Self {
            vehicle: Some(id.into()),
            appointment: None,
        }
    }

    pub fn appointment(id: impl Into<String>) -> Self {
        Self {
            vehicle: None,
            appointment: Some(id.into()),
        }
    }

    pub fn both(vehicle: impl Into<String>, appointment: impl Into<String>) -> Self {
        Self {
            vehicle: Some(vehicle.into()),
            appointment: Some(appointment.into()),
        }
    }
}

/// Id for a newly created parameter: slug of the name plus the creation
/// timestamp. Uniqueness holds by construction, not by lookup.
pub fn generate_parameter_id(name: &str) -> String {
    format!("{}-{}", slugify(name), Utc::now().timestamp_millis())
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
