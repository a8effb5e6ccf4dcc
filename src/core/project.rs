//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// Name of the hidden workspace directory
pub const WORKSPACE_DIR: &str = ".doorway";

/// Extension used for every entity file written by doorway
pub const ENTITY_EXTENSION: &str = "doorway.yaml";

/// Represents a Doorway workspace
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the workspace (parent of .doorway/)
    root: PathBuf,
}

impl Project {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Open a workspace rooted exactly at `root` (no upward search)
    pub fn open(root: &Path) -> Result<Self, ProjectError> {
        if root.join(WORKSPACE_DIR).is_dir() {
            Ok(Self {
                root: root.to_path_buf(),
            })
        } else {
            Err(ProjectError::NotFound {
                searched_from: root.to_path_buf(),
            })
        }
    }

    /// Create a new workspace structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(WORKSPACE_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::init_force(&root)
    }

    /// Force initialization even if .doorway/ exists
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let project = Self { root };

        for dir in [project.drafts_dir(), project.properties_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        std::fs::write(project.config_path(), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(project)
    }

    fn default_config() -> &'static str {
        r#"# Doorway Workspace Configuration

# Default author recorded on drafts and properties
# author: ""

# Subscription tier used when no subscription has been recorded yet
# tier: starter

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto

preferences:
  # Pre-fill structural details from high-confidence property records
  prefill_from_records: true
  # Show the pricing preview after a property is created
  show_pricing_preview: true
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .doorway configuration directory
    pub fn doorway_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    /// Path to the workspace config file
    pub fn config_path(&self) -> PathBuf {
        self.doorway_dir().join("config.yaml")
    }

    /// Directory holding in-progress onboarding drafts
    pub fn drafts_dir(&self) -> PathBuf {
        self.doorway_dir().join("drafts")
    }

    /// Directory holding created properties
    pub fn properties_dir(&self) -> PathBuf {
        self.doorway_dir().join("properties")
    }

    /// Path to the subscription record
    pub fn subscription_path(&self) -> PathBuf {
        self.doorway_dir().join("subscription.yaml")
    }

    /// Path to an optional workspace tier table override
    pub fn tiers_path(&self) -> PathBuf {
        self.doorway_dir().join("tiers.yaml")
    }

    /// Path to the optional local property-records file used for enrichment
    pub fn records_path(&self) -> PathBuf {
        self.doorway_dir().join("records.yaml")
    }

    /// Get the path for an entity file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        let dir = match id.prefix() {
            EntityPrefix::Drft => self.drafts_dir(),
            EntityPrefix::Prop => self.properties_dir(),
        };
        dir.join(format!("{}.{}", id, ENTITY_EXTENSION))
    }

    /// Iterate all entity files of a given prefix type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        let dir = match prefix {
            EntityPrefix::Drft => self.drafts_dir(),
            EntityPrefix::Prop => self.properties_dir(),
        };
        walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(ENTITY_EXTENSION))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a Doorway workspace (searched from {searched_from:?}). Run 'doorway init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("Doorway workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
