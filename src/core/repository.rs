//! Persistence collaborator for created properties

use miette::Diagnostic;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::loader::{self, LoadError};
use crate::core::project::{Project, ENTITY_EXTENSION};
use crate::entities::{Property, PropertyPatch, PropertyPayload};

#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("property {0} not found")]
    #[diagnostic(
        code(doorway::persistence::not_found),
        help("run `doorway property list` to see stored properties")
    )]
    NotFound(String),

    #[error("failed to store property: {0}")]
    #[diagnostic(
        code(doorway::persistence::storage),
        help("the draft is kept; fix the problem and run `doorway onboard finish` again")
    )]
    Storage(String),
}

impl From<LoadError> for PersistenceError {
    fn from(e: LoadError) -> Self {
        PersistenceError::Storage(e.to_string())
    }
}

/// Owner of created properties
pub trait PropertyRepository {
    /// Store a new property built from `payload`
    fn create(&self, payload: PropertyPayload) -> Result<Property, PersistenceError>;

    /// Apply a patch to an existing property
    fn update(&self, id: &EntityId, patch: &PropertyPatch) -> Result<Property, PersistenceError>;

    fn delete(&self, id: &EntityId) -> Result<(), PersistenceError>;

    fn get(&self, id: &EntityId) -> Result<Option<Property>, PersistenceError>;

    /// All properties, oldest first
    fn list(&self) -> Result<Vec<Property>, PersistenceError>;

    /// Doors held across every stored property
    fn total_doors(&self) -> Result<u32, PersistenceError> {
        Ok(self
            .list()?
            .iter()
            .map(|p| p.details.door_count)
            .fold(0u32, u32::saturating_add))
    }
}

/// One `PROP-*.doorway.yaml` file per property under `.doorway/properties/`
#[derive(Debug, Clone)]
pub struct FilePropertyStore {
    dir: PathBuf,
}

impl FilePropertyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_project(project: &Project) -> Self {
        Self::new(project.properties_dir())
    }

    fn path(&self, id: &EntityId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, ENTITY_EXTENSION))
    }
}

impl PropertyRepository for FilePropertyStore {
    fn create(&self, payload: PropertyPayload) -> Result<Property, PersistenceError> {
        let property = Property::create(payload);
        loader::write_entity(&self.path(&property.id), &property)?;
        tracing::info!(id = %property.id, doors = property.details.door_count, "property created");
        Ok(property)
    }

    fn update(&self, id: &EntityId, patch: &PropertyPatch) -> Result<Property, PersistenceError> {
        let mut property = self
            .get(id)?
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        property.apply(patch);
        loader::write_entity(&self.path(id), &property)?;
        tracing::debug!(id = %id, revision = property.entity_revision, "property updated");
        Ok(property)
    }

    fn delete(&self, id: &EntityId) -> Result<(), PersistenceError> {
        let path = self.path(id);
        if !path.exists() {
            return Err(PersistenceError::NotFound(id.to_string()));
        }
        fs::remove_file(&path).map_err(|e| PersistenceError::Storage(e.to_string()))?;
        tracing::info!(id = %id, "property deleted");
        Ok(())
    }

    fn get(&self, id: &EntityId) -> Result<Option<Property>, PersistenceError> {
        let path = self.path(id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(loader::read_entity(&path)?))
    }

    fn list(&self) -> Result<Vec<Property>, PersistenceError> {
        let mut properties: Vec<Property> = loader::load_all(&self.dir)?;
        properties.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        Ok(properties)
    }
}

/// In-process repository for tests and embedding callers
#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    properties: Mutex<BTreeMap<EntityId, Property>>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<EntityId, Property>> {
        self.properties
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PropertyRepository for MemoryPropertyStore {
    fn create(&self, payload: PropertyPayload) -> Result<Property, PersistenceError> {
        let property = Property::create(payload);
        self.lock().insert(property.id.clone(), property.clone());
        Ok(property)
    }

    fn update(&self, id: &EntityId, patch: &PropertyPatch) -> Result<Property, PersistenceError> {
        let mut properties = self.lock();
        let property = properties
            .get_mut(id)
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        property.apply(patch);
        Ok(property.clone())
    }

    fn delete(&self, id: &EntityId) -> Result<(), PersistenceError> {
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))
    }

    fn get(&self, id: &EntityId) -> Result<Option<Property>, PersistenceError> {
        Ok(self.lock().get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Property>, PersistenceError> {
        Ok(self.lock().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use crate::entities::{
        Address, AddressStatus, FinancialDetails, PropertyKind, PropertyUseType,
        StructuralDetails, UserType,
    };
    use tempfile::tempdir;

    fn payload(doors: u32) -> PropertyPayload {
        let address = Address {
            street: "5 Elm Ave".to_string(),
            unit: None,
            city: "Denver".to_string(),
            state: "CO".to_string(),
            postal_code: "80203".to_string(),
            formatted: None,
            status: AddressStatus::Verified,
        };
        PropertyPayload {
            nickname: "Elm".to_string(),
            user_type: UserType::Investor,
            property_kind: PropertyKind::MultiFamily,
            use_type: PropertyUseType::RentalUnfurnished,
            door_count: doors,
            display_address: address.composite(),
            address,
            structure: StructuralDetails::default(),
            rental: None,
            units: Vec::new(),
            financials: FinancialDetails::default(),
            completion_percentage: 0,
            health_score: 0,
            source_draft: EntityId::new(EntityPrefix::Drft),
            author: "test".to_string(),
        }
    }

    #[test]
    fn test_file_store_lifecycle() {
        let tmp = tempdir().unwrap();
        let store = FilePropertyStore::new(tmp.path());

        let created = store.create(payload(6)).unwrap();
        assert!(tmp
            .path()
            .join(format!("{}.doorway.yaml", created.id))
            .exists());
        assert_eq!(store.get(&created.id).unwrap(), Some(created.clone()));

        let patch = PropertyPatch {
            nickname: Some("  Elm Court ".to_string()),
            ..Default::default()
        };
        let updated = store.update(&created.id, &patch).unwrap();
        assert_eq!(updated.details.nickname, "Elm Court");
        assert_eq!(updated.entity_revision, 2);

        store.create(payload(2)).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(store.total_doors().unwrap(), 8);

        store.delete(&created.id).unwrap();
        assert!(store.get(&created.id).unwrap().is_none());
        assert!(matches!(
            store.delete(&created.id),
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_missing_property() {
        let store = MemoryPropertyStore::new();
        let err = store
            .update(&EntityId::new(EntityPrefix::Prop), &PropertyPatch::default())
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }
}
