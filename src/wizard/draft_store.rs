//! Draft persistence so an interrupted onboarding can resume

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::loader::{self, LoadError};
use crate::core::project::{Project, ENTITY_EXTENSION};
use crate::wizard::draft::PropertyDraft;
use crate::wizard::step::WizardStep;

/// A stored draft with its bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub draft: PropertyDraft,

    /// Converted into a property; no longer offered for resume
    #[serde(default)]
    pub finalized: bool,

    pub saved_at: DateTime<Utc>,
}

impl DraftRecord {
    /// Converted into a property, either flagged or snapshotted at `Created`
    pub fn is_finalized(&self) -> bool {
        self.finalized || self.draft.current_step == WizardStep::Created
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum DraftStoreError {
    #[error("draft {0} not found")]
    #[diagnostic(
        code(doorway::drafts::not_found),
        help("run `doorway onboard drafts` to list resumable drafts")
    )]
    NotFound(String),

    #[error("draft storage failed: {0}")]
    #[diagnostic(code(doorway::drafts::storage))]
    Storage(String),
}

impl From<LoadError> for DraftStoreError {
    fn from(e: LoadError) -> Self {
        DraftStoreError::Storage(e.to_string())
    }
}

/// Keeps partial wizard state between sessions
///
/// Writes are last-write-wins per draft id.
pub trait DraftStore {
    /// Upsert the draft, always as not finalized
    fn save(&self, draft: &PropertyDraft) -> Result<(), DraftStoreError>;

    fn load(&self, id: &EntityId) -> Result<DraftRecord, DraftStoreError>;

    /// Mark the draft as converted into a property
    fn finalize(&self, id: &EntityId) -> Result<(), DraftStoreError>;

    /// Every stored draft, oldest first
    fn list(&self) -> Result<Vec<DraftRecord>, DraftStoreError>;

    fn discard(&self, id: &EntityId) -> Result<(), DraftStoreError>;

    /// Drafts still offered for resume
    fn resumable(&self) -> Result<Vec<DraftRecord>, DraftStoreError> {
        Ok(self.list()?.into_iter().filter(|r| !r.is_finalized()).collect())
    }
}

/// One YAML file per draft under `.doorway/drafts/`
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_project(project: &Project) -> Self {
        Self::new(project.drafts_dir())
    }

    fn path(&self, id: &EntityId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, ENTITY_EXTENSION))
    }
}

impl DraftStore for FileDraftStore {
    fn save(&self, draft: &PropertyDraft) -> Result<(), DraftStoreError> {
        let record = DraftRecord {
            draft: draft.clone(),
            finalized: false,
            saved_at: Utc::now(),
        };
        loader::write_entity(&self.path(&draft.id), &record)?;
        tracing::debug!(draft = %draft.id, step = %draft.current_step, "draft saved");
        Ok(())
    }

    fn load(&self, id: &EntityId) -> Result<DraftRecord, DraftStoreError> {
        let path = self.path(id);
        if !path.exists() {
            return Err(DraftStoreError::NotFound(id.to_string()));
        }
        Ok(loader::read_entity(&path)?)
    }

    fn finalize(&self, id: &EntityId) -> Result<(), DraftStoreError> {
        let mut record = self.load(id)?;
        record.finalized = true;
        record.saved_at = Utc::now();
        loader::write_entity(&self.path(id), &record)?;
        tracing::debug!(draft = %id, "draft finalized");
        Ok(())
    }

    fn list(&self) -> Result<Vec<DraftRecord>, DraftStoreError> {
        let mut records: Vec<DraftRecord> = loader::load_all(&self.dir)?;
        records.sort_by(|a, b| a.draft.created.cmp(&b.draft.created));
        Ok(records)
    }

    fn discard(&self, id: &EntityId) -> Result<(), DraftStoreError> {
        let path = self.path(id);
        if !path.exists() {
            return Err(DraftStoreError::NotFound(id.to_string()));
        }
        fs::remove_file(&path).map_err(|e| DraftStoreError::Storage(e.to_string()))
    }
}

/// Mutex-guarded in-memory store
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    records: Mutex<BTreeMap<EntityId, DraftRecord>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<EntityId, DraftRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, draft: &PropertyDraft) -> Result<(), DraftStoreError> {
        self.lock().insert(
            draft.id.clone(),
            DraftRecord {
                draft: draft.clone(),
                finalized: false,
                saved_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn load(&self, id: &EntityId) -> Result<DraftRecord, DraftStoreError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| DraftStoreError::NotFound(id.to_string()))
    }

    fn finalize(&self, id: &EntityId) -> Result<(), DraftStoreError> {
        let mut records = self.lock();
        let record = records
            .get_mut(id)
            .ok_or_else(|| DraftStoreError::NotFound(id.to_string()))?;
        record.finalized = true;
        record.saved_at = Utc::now();
        Ok(())
    }

    fn list(&self) -> Result<Vec<DraftRecord>, DraftStoreError> {
        Ok(self.lock().values().cloned().collect())
    }

    fn discard(&self, id: &EntityId) -> Result<(), DraftStoreError> {
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DraftStoreError::NotFound(id.to_string()))
    }
}
