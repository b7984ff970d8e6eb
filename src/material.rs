//! Material inventory per project.
//!
//! Quantities are whole units and never go negative: allocation beyond
//! on-hand stock is rejected, and direct stock corrections clamp at
//! zero. Allocation at task creation is permanent consumption; nothing
//! restores stock when a task is later deleted or reassigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::project::ProjectStore;
use crate::storage::Storage;

const MATERIAL_ID_PREFIX: &str = "mat";
const MATERIAL_ID_SUFFIX_LEN: usize = 8;

/// A material inventory line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub id: String,
    pub project_id: String,
    pub name: String,
    /// Unit of measure (sacos, m3, piezas, ...)
    pub unit: String,
    /// Units on hand
    pub quantity: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registry of all materials on the site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialsRegistry {
    pub materials: Vec<MaterialRecord>,
}

#[derive(Debug, Clone)]
pub struct MaterialStore {
    storage: Storage,
}

impl MaterialStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Add a material to a project's inventory
    pub fn add(
        &self,
        project_id: &str,
        name: &str,
        unit: &str,
        quantity: u64,
        description: Option<String>,
        acting_user_id: &str,
    ) -> Result<MaterialRecord> {
        let projects = ProjectStore::new(self.storage.clone());
        projects.ensure_open(project_id)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("material name cannot be empty".to_string()));
        }
        let unit = unit.trim();
        if unit.is_empty() {
            return Err(Error::Validation("material unit cannot be empty".to_string()));
        }

        let now = Utc::now();
        let record = MaterialRecord {
            id: generate_material_id(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            quantity,
            description: description.and_then(|value| {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            }),
            created_by: acting_user_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.storage.update_registry(
            &self.storage.materials_file(),
            |registry: &mut MaterialsRegistry| {
                registry.materials.push(record.clone());
                Ok(record.clone())
            },
        )
    }

    /// Fetch a material by id
    pub fn get(&self, material_id: &str) -> Result<MaterialRecord> {
        let registry: MaterialsRegistry =
            self.storage.read_registry(&self.storage.materials_file())?;
        registry
            .materials
            .into_iter()
            .find(|material| material.id == material_id)
            .ok_or_else(|| Error::MaterialNotFound(material_id.to_string()))
    }

    /// Materials of a project, optionally filtered by a name substring
    pub fn list(&self, project_id: &str, search: Option<&str>) -> Result<Vec<MaterialRecord>> {
        let registry: MaterialsRegistry =
            self.storage.read_registry(&self.storage.materials_file())?;
        let needle = search.map(|needle| needle.trim().to_lowercase());
        let mut materials: Vec<MaterialRecord> = registry
            .materials
            .into_iter()
            .filter(|material| material.project_id == project_id)
            .filter(|material| match needle.as_deref() {
                Some(needle) if !needle.is_empty() => {
                    material.name.to_lowercase().contains(needle)
                }
                _ => true,
            })
            .collect();
        materials.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(materials)
    }

    /// Set the on-hand stock directly. Negative inputs clamp to zero.
    pub fn set_stock(
        &self,
        project_id: &str,
        material_id: &str,
        quantity: i64,
    ) -> Result<MaterialRecord> {
        let projects = ProjectStore::new(self.storage.clone());
        projects.ensure_open(project_id)?;

        let quantity = quantity.max(0) as u64;
        self.storage.update_registry(
            &self.storage.materials_file(),
            |registry: &mut MaterialsRegistry| {
                let material = registry
                    .materials
                    .iter_mut()
                    .find(|material| material.id == material_id)
                    .ok_or_else(|| Error::MaterialNotFound(material_id.to_string()))?;
                if material.project_id != project_id {
                    return Err(Error::Validation(format!(
                        "material {material_id} does not belong to project {project_id}"
                    )));
                }
                material.quantity = quantity;
                material.updated_at = Utc::now();
                Ok(material.clone())
            },
        )
    }

    /// Consume allocated units from stock. Fails when the allocation
    /// exceeds what is on hand; stock never goes negative.
    pub fn allocate(
        &self,
        project_id: &str,
        material_id: &str,
        quantity: u64,
    ) -> Result<MaterialRecord> {
        if quantity == 0 {
            return Err(Error::Validation(
                "allocation quantity must be positive".to_string(),
            ));
        }
        self.storage.update_registry(
            &self.storage.materials_file(),
            |registry: &mut MaterialsRegistry| {
                let material = registry
                    .materials
                    .iter_mut()
                    .find(|material| material.id == material_id)
                    .ok_or_else(|| Error::MaterialNotFound(material_id.to_string()))?;
                if material.project_id != project_id {
                    return Err(Error::Validation(format!(
                        "material {material_id} does not belong to project {project_id}"
                    )));
                }
                if quantity > material.quantity {
                    return Err(Error::Validation(format!(
                        "cannot allocate {quantity} {unit} of {name}: only {on_hand} on hand",
                        unit = material.unit,
                        name = material.name,
                        on_hand = material.quantity
                    )));
                }
                material.quantity -= quantity;
                material.updated_at = Utc::now();
                Ok(material.clone())
            },
        )
    }

    /// Drop every material of a project; returns how many were removed
    pub fn remove_all_for_project(&self, project_id: &str) -> Result<usize> {
        self.storage.update_registry(
            &self.storage.materials_file(),
            |registry: &mut MaterialsRegistry| {
                let before = registry.materials.len();
                registry
                    .materials
                    .retain(|material| material.project_id != project_id);
                Ok(before - registry.materials.len())
            },
        )
    }
}

fn generate_material_id() -> String {
    let raw = Ulid::new().to_string().to_ascii_lowercase();
    format!(
        "{MATERIAL_ID_PREFIX}-{}",
        &raw[raw.len() - MATERIAL_ID_SUFFIX_LEN..]
    )
}
