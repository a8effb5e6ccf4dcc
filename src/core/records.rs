//! Property-record enrichment collaborator
//!
//! Best-effort structural attributes for an address. Failures are soft: the
//! wizard logs them and carries on with manual entry.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::entities::{Address, FieldValues};

/// How much a record source trusts its match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Attributes found for an address
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub confidence: Confidence,

    /// Structural field values keyed like the wizard's structural fields
    pub attributes: FieldValues,
}

#[derive(Debug, Error)]
pub enum EnrichmentUnavailable {
    #[error("no property record for {0}")]
    NoMatch(String),

    #[error("property records unavailable: {0}")]
    Source(String),

    #[error("property records are disabled")]
    Disabled,
}

pub trait RecordEnricher {
    fn lookup(&self, address: &Address) -> Result<Enrichment, EnrichmentUnavailable>;
}

/// Enricher that never finds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnrichment;

impl RecordEnricher for NoEnrichment {
    fn lookup(&self, _address: &Address) -> Result<Enrichment, EnrichmentUnavailable> {
        Err(EnrichmentUnavailable::Disabled)
    }
}

#[derive(Debug, Deserialize)]
struct RecordsFile {
    #[serde(default)]
    records: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
struct RecordEntry {
    address: String,
    confidence: Confidence,
    #[serde(flatten)]
    attributes: FieldValues,
}

/// Looks addresses up in a local `records.yaml`
///
/// ```yaml
/// records:
///   - address: "12 Oak St, Austin, TX 78701"
///     confidence: high
///     year_built: 1998
///     square_feet: 1850
/// ```
#[derive(Debug, Clone)]
pub struct RecordFileEnricher {
    path: PathBuf,
}

impl RecordFileEnricher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn lookup_key(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

impl RecordEnricher for RecordFileEnricher {
    fn lookup(&self, address: &Address) -> Result<Enrichment, EnrichmentUnavailable> {
        if !self.path.exists() {
            return Err(EnrichmentUnavailable::Source(format!(
                "{} does not exist",
                self.path.display()
            )));
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| EnrichmentUnavailable::Source(e.to_string()))?;
        let file: RecordsFile = serde_yml::from_str(&content)
            .map_err(|e| EnrichmentUnavailable::Source(e.to_string()))?;

        let wanted = address.lookup_key();
        file.records
            .into_iter()
            .find(|r| lookup_key(&r.address) == wanted)
            .map(|r| Enrichment {
                confidence: r.confidence,
                attributes: r.attributes,
            })
            .ok_or_else(|| EnrichmentUnavailable::NoMatch(address.composite()))
    }
}
