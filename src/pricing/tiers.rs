//! Declarative subscription tier table
//!
//! One table, keyed by tier id and ordered by rank, feeds the pricing engine,
//! the transition guard and every display of plans. The default table ships
//! embedded in the binary; a workspace may replace it with `.doorway/tiers.yaml`.

use miette::Diagnostic;
use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Embed)]
#[folder = "tiers/"]
struct EmbeddedTiers;

const DEFAULT_TABLE: &str = "default.yaml";

/// Identifier of a subscription tier (e.g. `starter`)
///
/// Ids are trimmed and lowercased however they arrive, files included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TierId(String);

impl TierId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TierId {
    fn from(s: &str) -> Self {
        TierId::new(s)
    }
}

impl From<String> for TierId {
    fn from(s: String) -> Self {
        TierId::new(s)
    }
}

impl From<TierId> for String {
    fn from(id: TierId) -> Self {
        id.0
    }
}

/// Static configuration of one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub id: TierId,

    pub display_name: String,

    /// Doors covered by the base price
    pub included_doors: u32,

    /// Monthly base price in cents
    pub base_price_cents: u64,

    /// Monthly price per door above `included_doors`, in cents
    pub overage_cents_per_door: u64,

    /// Most doors the tier may hold; `None` is unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_ceiling: Option<u32>,

    /// Features added by this tier over lower-ranked tiers
    #[serde(default)]
    pub features: Vec<String>,
}

impl TierConfig {
    /// Whether the tier may hold `doors` doors
    pub fn accommodates(&self, doors: u32) -> bool {
        self.door_ceiling.map_or(true, |ceiling| doors <= ceiling)
    }

    pub fn is_unlimited(&self) -> bool {
        self.door_ceiling.is_none()
    }
}

/// Errors raised while loading a tier table
#[derive(Debug, Error, Diagnostic)]
pub enum TierTableError {
    #[error("tier table has no tiers")]
    #[diagnostic(code(doorway::tiers::empty))]
    Empty,

    #[error("duplicate tier id '{0}'")]
    #[diagnostic(code(doorway::tiers::duplicate))]
    Duplicate(TierId),

    #[error("tier '{id}' includes {included} doors but its ceiling is {ceiling}")]
    #[diagnostic(code(doorway::tiers::ceiling))]
    IncludedAboveCeiling { id: TierId, included: u32, ceiling: u32 },

    #[error("top tier '{0}' must have an unlimited door ceiling")]
    #[diagnostic(
        code(doorway::tiers::no_fallback),
        help("remove `door_ceiling` from the last tier so every door count has a plan")
    )]
    NoUnlimitedTop(TierId),

    #[error("tier table is missing from the build")]
    #[diagnostic(code(doorway::tiers::missing))]
    Missing,

    #[error("failed to parse tier table: {0}")]
    #[diagnostic(code(doorway::tiers::parse))]
    Parse(String),

    #[error("failed to read tier table: {0}")]
    #[diagnostic(code(doorway::tiers::io))]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct TierTableFile {
    #[serde(default)]
    advertised_annual_savings_pct: Option<u8>,
    tiers: Vec<TierConfig>,
}

/// Ordered set of tiers; position is rank (0 = lowest)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<TierConfig>,
    advertised_annual_savings_pct: Option<u8>,
}

impl TierTable {
    /// Build a table from tiers listed lowest rank first
    pub fn new(tiers: Vec<TierConfig>) -> Result<Self, TierTableError> {
        Self::validated(tiers, None)
    }

    fn validated(
        tiers: Vec<TierConfig>,
        advertised_annual_savings_pct: Option<u8>,
    ) -> Result<Self, TierTableError> {
        let top = tiers.last().ok_or(TierTableError::Empty)?;
        if !top.is_unlimited() {
            return Err(TierTableError::NoUnlimitedTop(top.id.clone()));
        }

        let mut seen = HashSet::new();
        for tier in &tiers {
            if !seen.insert(tier.id.clone()) {
                return Err(TierTableError::Duplicate(tier.id.clone()));
            }
            if let Some(ceiling) = tier.door_ceiling {
                if tier.included_doors > ceiling {
                    return Err(TierTableError::IncludedAboveCeiling {
                        id: tier.id.clone(),
                        included: tier.included_doors,
                        ceiling,
                    });
                }
            }
        }

        Ok(Self {
            tiers,
            advertised_annual_savings_pct,
        })
    }

    /// Parse a table from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self, TierTableError> {
        let file: TierTableFile =
            serde_yml::from_str(yaml).map_err(|e| TierTableError::Parse(e.to_string()))?;
        Self::validated(file.tiers, file.advertised_annual_savings_pct)
    }

    /// The table compiled into the binary
    pub fn builtin() -> Result<Self, TierTableError> {
        let file = EmbeddedTiers::get(DEFAULT_TABLE).ok_or(TierTableError::Missing)?;
        let yaml = std::str::from_utf8(&file.data)
            .map_err(|e| TierTableError::Parse(e.to_string()))?;
        Self::from_yaml(yaml)
    }

    /// Workspace override if present, otherwise the built-in table
    pub fn load(override_path: &Path) -> Result<Self, TierTableError> {
        if override_path.exists() {
            tracing::debug!(path = %override_path.display(), "loading tier table override");
            let yaml = std::fs::read_to_string(override_path)?;
            Self::from_yaml(&yaml)
        } else {
            Self::builtin()
        }
    }

    /// Tiers lowest rank first
    pub fn tiers(&self) -> &[TierConfig] {
        &self.tiers
    }

    pub fn get(&self, id: &TierId) -> Option<&TierConfig> {
        self.tiers.iter().find(|t| &t.id == id)
    }

    /// Ordinal rank of a tier (0 = lowest)
    pub fn rank(&self, id: &TierId) -> Option<usize> {
        self.tiers.iter().position(|t| &t.id == id)
    }

    /// Lowest ranked tier
    pub fn lowest(&self) -> &TierConfig {
        &self.tiers[0]
    }

    /// Highest ranked tier; always unlimited
    pub fn top(&self) -> &TierConfig {
        &self.tiers[self.tiers.len() - 1]
    }

    /// Annual-billing discount shown in marketing copy.
    ///
    /// Quotes never apply it: annual price is twelve monthly payments.
    // TODO: apply this to `annual_cents` once billing confirms the advertised
    // annual discount is real, and drop the "not applied" notice in the CLI.
    pub fn advertised_annual_savings_pct(&self) -> Option<u8> {
        self.advertised_annual_savings_pct
    }

    /// Features available on a tier, including those of every lower rank
    pub fn features(&self, id: &TierId) -> Vec<&str> {
        let Some(rank) = self.rank(id) else {
            return Vec::new();
        };
        self.tiers[..=rank]
            .iter()
            .flat_map(|t| t.features.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(id: &str, ceiling: Option<u32>) -> TierConfig {
        TierConfig {
            id: TierId::new(id),
            display_name: id.to_string(),
            included_doors: 1,
            base_price_cents: 100,
            overage_cents_per_door: 10,
            door_ceiling: ceiling,
            features: vec![format!("{id} feature")],
        }
    }

    #[test]
    fn test_builtin_table_loads() {
        let table = TierTable::builtin().unwrap();
        let ids: Vec<&str> = table.tiers().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["free", "starter", "growth", "portfolio"]);
        assert!(table.top().is_unlimited());
        assert_eq!(table.advertised_annual_savings_pct(), Some(20));
    }

    #[test]
    fn test_rank_follows_table_order() {
        let table = TierTable::builtin().unwrap();
        assert_eq!(table.rank(&"free".into()), Some(0));
        assert_eq!(table.rank(&"portfolio".into()), Some(3));
        assert_eq!(table.rank(&"platinum".into()), None);
    }

    #[test]
    fn test_tier_id_is_normalized() {
        assert_eq!(TierId::new(" Starter "), TierId::new("starter"));
    }

    #[test]
    fn test_features_accumulate_by_rank() {
        let table = TierTable::new(vec![tier("a", Some(1)), tier("b", Some(5)), tier("c", None)])
            .unwrap();
        assert_eq!(table.features(&"a".into()), vec!["a feature"]);
        assert_eq!(
            table.features(&"c".into()),
            vec!["a feature", "b feature", "c feature"]
        );
        assert!(table.features(&"zzz".into()).is_empty());
    }

    #[test]
    fn test_rejects_capped_top_tier() {
        let err = TierTable::new(vec![tier("a", Some(1)), tier("b", Some(5))]).unwrap_err();
        assert!(matches!(err, TierTableError::NoUnlimitedTop(_)));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(matches!(
            TierTable::new(vec![tier("a", Some(1)), tier("a", None)]).unwrap_err(),
            TierTableError::Duplicate(_)
        ));
        assert!(matches!(
            TierTable::new(Vec::new()).unwrap_err(),
            TierTableError::Empty
        ));
    }

    #[test]
    fn test_rejects_included_above_ceiling() {
        let mut bad = tier("a", Some(2));
        bad.included_doors = 3;
        let err = TierTable::new(vec![bad, tier("b", None)]).unwrap_err();
        assert!(matches!(err, TierTableError::IncludedAboveCeiling { .. }));
    }

    #[test]
    fn test_load_prefers_override() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tiers.yaml");
        assert_eq!(TierTable::load(&path).unwrap(), TierTable::builtin().unwrap());

        std::fs::write(
            &path,
            "tiers:\n  - id: solo\n    display_name: Solo\n    included_doors: 2\n    base_price_cents: 500\n    overage_cents_per_door: 100\n",
        )
        .unwrap();
        let table = TierTable::load(&path).unwrap();
        assert_eq!(table.tiers().len(), 1);
        assert_eq!(table.top().id.as_str(), "solo");
        assert_eq!(table.advertised_annual_savings_pct(), None);
    }

    #[test]
    fn test_file_ids_are_normalized() {
        let yaml = "tiers:\n  - id: ' Solo '\n    display_name: Solo\n    included_doors: 1\n    base_price_cents: 500\n    overage_cents_per_door: 100\n    door_ceiling: 3\n  - id: Team\n    display_name: Team\n    included_doors: 3\n    base_price_cents: 900\n    overage_cents_per_door: 100\n";
        let table = TierTable::from_yaml(yaml).unwrap();
        assert_eq!(table.tiers()[0].id.as_str(), "solo");
        assert_eq!(table.rank(&"Solo".into()), Some(0));
        assert_eq!(table.get(&"TEAM".into()).map(|t| t.base_price_cents), Some(900));

        let clash = yaml.replace("id: Team", "id: solo");
        assert!(matches!(
            TierTable::from_yaml(&clash).unwrap_err(),
            TierTableError::Duplicate(_)
        ));
    }
}
