//! Entity file loading and writing
//!
//! Generic helpers shared by the file-backed draft and property stores.
//! Every record lives in its own `<ID>.doorway.yaml` file.

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::project::ENTITY_EXTENSION;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {message}")]
    Yaml { path: PathBuf, message: String },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LoadError + '_ {
    move |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn is_entity_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(&format!(".{}", ENTITY_EXTENSION)))
}

/// Load all records of type T from a directory
///
/// Files that fail to parse are skipped with a warning.
pub fn load_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, LoadError> {
    let mut records = Vec::new();

    if !dir.exists() {
        return Ok(records);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_error(dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_entity_file(path))
        .collect();
    paths.sort();

    for path in paths {
        match read_entity(&path) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable entity file"),
        }
    }

    Ok(records)
}

/// Find an entity file by ID (supports case-insensitive partial matching)
pub fn find_entity_file(dir: &Path, id: &str) -> Option<PathBuf> {
    let wanted = id.to_uppercase();
    fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_entity_file(path))
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.to_uppercase().contains(&wanted))
        })
}

/// Read and deserialize one entity file
pub fn read_entity<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    serde_yml::from_str(&content).map_err(|e| LoadError::Yaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Serialize to YAML and replace `path` atomically (temp file + rename)
pub fn write_entity<T: Serialize>(path: &Path, value: &T) -> Result<(), LoadError> {
    let yaml = serde_yml::to_string(value).map_err(|e| LoadError::Yaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, yaml).map_err(io_error(&tmp))?;
    fs::rename(&tmp, path).map_err(io_error(path))?;
    Ok(())
}
