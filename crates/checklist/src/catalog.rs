//! The parameter catalog: checklist parameter definitions, loaded once and
//! edited via CRUD operations. Creating a parameter also fans it out to
//! every vehicle currently in a work phase.

use std::sync::Arc;

use serde_json::{Value, json};
use store::{DocumentStore, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    ChecklistParameter, Control, ControlState, CreateParameter, ParameterFields, UpdateParameter,
    generate_parameter_id,
};
use crate::paths;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation error: {0}")]
    Validation(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct ParameterCatalog {
    store: Arc<dyn DocumentStore>,
}

impl ParameterCatalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Full catalog in storage order. An absent catalog is empty, not an
    /// error; entries that do not parse are skipped.
    pub async fn load(&self) -> Result<Vec<ChecklistParameter>, CatalogError> {
        let Some(Value::Object(map)) = self.store.read(paths::CATALOG_ROOT).await? else {
            return Ok(Vec::new());
        };
        let mut parameters = Vec::with_capacity(map.len());
        for (id, raw) in map {
            match serde_json::from_value::<ParameterFields>(raw) {
                Ok(fields) => parameters.push(ChecklistParameter::from_fields(id, fields)),
                Err(err) => warn!(parameter_id = %id, error = %err, "skipping malformed catalog entry"),
            }
        }
        Ok(parameters)
    }

    /// Create a parameter and retroactively seed its default control onto
    /// every in-progress vehicle. The fan-out is best-effort and
    /// non-transactional: a vehicle that fails is logged and skipped, and
    /// the create still reports success.
    pub async fn create(&self, data: CreateParameter) -> Result<ChecklistParameter, CatalogError> {
        if data.name.trim().is_empty() {
            return Err(CatalogError::Validation("name must not be blank"));
        }
        if data.section.trim().is_empty() {
            return Err(CatalogError::Validation("section must not be blank"));
        }

        let parameter = ChecklistParameter {
            id: generate_parameter_id(&data.name),
            name: data.name,
            section: data.section,
            default_state: data.default_state.unwrap_or_default(),
        };
        self.store
            .write(
                &paths::catalog_parameter(&parameter.id),
                serde_json::to_value(parameter.fields())?,
            )
            .await?;
        info!(parameter_id = %parameter.id, section = %parameter.section, "created checklist parameter");

        self.fan_out_default(&parameter).await;
        Ok(parameter)
    }

    /// Overwrite the given fields; last writer wins, no concurrency check.
    pub async fn update(&self, id: &str, data: UpdateParameter) -> Result<(), CatalogError> {
        let mut fields = serde_json::Map::new();
        if let Some(name) = data.name {
            if name.trim().is_empty() {
                return Err(CatalogError::Validation("name must not be blank"));
            }
            fields.insert("name".to_string(), json!(name));
        }
        if let Some(section) = data.section {
            if section.trim().is_empty() {
                return Err(CatalogError::Validation("section must not be blank"));
            }
            fields.insert("section".to_string(), json!(section));
        }
        if let Some(state) = data.default_state {
            fields.insert("defaultState".to_string(), serde_json::to_value(state)?);
        }
        if fields.is_empty() {
            return Ok(());
        }
        self.store
            .update(&paths::catalog_parameter(id), fields)
            .await?;
        Ok(())
    }

    /// Delete the catalog entry. Controls already recorded on vehicles are
    /// left in place, orphaned: grouping derives strictly from the current
    /// catalog, so they stop rendering without ever being purged.
    pub async fn remove(&self, id: &str) -> Result<(), CatalogError> {
        self.store.remove(&paths::catalog_parameter(id)).await?;
        Ok(())
    }

    /// Apply the same section and default state to every id, one write per
    /// id. A failure mid-batch leaves the earlier ids applied.
    pub async fn bulk_update(
        &self,
        ids: &[String],
        section: &str,
        default_state: ControlState,
    ) -> Result<(), CatalogError> {
        if section.trim().is_empty() {
            return Err(CatalogError::Validation("section must not be blank"));
        }
        for id in ids {
            let mut fields = serde_json::Map::new();
            fields.insert("section".to_string(), json!(section));
            fields.insert("defaultState".to_string(), serde_json::to_value(default_state)?);
            self.store
                .update(&paths::catalog_parameter(id), fields)
                .await?;
        }
        Ok(())
    }

    /// Same per-id independent semantics as `bulk_update`, for deletion.
    pub async fn bulk_delete(&self, ids: &[String]) -> Result<(), CatalogError> {
        for id in ids {
            self.store.remove(&paths::catalog_parameter(id)).await?;
        }
        Ok(())
    }

    /// Walk every vehicle under the working root and insert the new
    /// parameter's default control into both canonical sub-paths.
    async fn fan_out_default(&self, parameter: &ChecklistParameter) {
        let vehicle_ids: Vec<String> = match self.store.read(paths::WORKING_ROOT).await {
            Ok(Some(Value::Object(map))) => map.keys().cloned().collect(),
            Ok(_) => {
                debug!("fan-out: no vehicles in progress");
                return;
            }
            Err(err) => {
                warn!(error = %err, "fan-out: could not list in-progress vehicles");
                return;
            }
        };

        let control = Control::new(parameter.default_state);
        let value = match serde_json::to_value(&control) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "fan-out: control not serializable");
                return;
            }
        };

        let mut seeded = 0usize;
        for vehicle_id in &vehicle_ids {
            let mut ok = true;
            for target in [
                paths::vehicle_controls(vehicle_id),
                paths::vehicle_checklist(vehicle_id),
            ] {
                let path = format!("{target}/{}", parameter.id);
                if let Err(err) = self.store.write(&path, value.clone()).await {
                    warn!(vehicle_id = %vehicle_id, path, error = %err, "fan-out write failed, skipping");
                    ok = false;
                }
            }
            if ok {
                seeded += 1;
            }
        }
        info!(
            parameter_id = %parameter.id,
            vehicles = vehicle_ids.len(),
            seeded,
            "propagated new parameter to in-progress vehicles"
        );
    }
}
