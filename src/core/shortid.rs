//! Short ID aliases for drafts and properties
//!
//! Listing drafts or properties assigns aliases like `DRFT@1` or `PROP@3`
//! (a bare `@3` works when the command already knows the entity type).
//! Aliases are stable until the next listing rebuilds them.

use std::collections::BTreeMap;
use std::fs;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::project::Project;

/// Index file name within the workspace directory
const INDEX_FILE: &str = "shortids.json";

/// Short-number to full-id mappings, one table per entity prefix
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShortIdIndex {
    drafts: BTreeMap<u32, String>,
    properties: BTreeMap<u32, String>,
}

impl ShortIdIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index from a workspace, or create empty if not found
    pub fn load(project: &Project) -> Self {
        let path = project.doorway_dir().join(INDEX_FILE);
        fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Save the index to a workspace
    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        let path = project.doorway_dir().join(INDEX_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    fn table(&self, prefix: EntityPrefix) -> &BTreeMap<u32, String> {
        match prefix {
            EntityPrefix::Drft => &self.drafts,
            EntityPrefix::Prop => &self.properties,
        }
    }

    fn table_mut(&mut self, prefix: EntityPrefix) -> &mut BTreeMap<u32, String> {
        match prefix {
            EntityPrefix::Drft => &mut self.drafts,
            EntityPrefix::Prop => &mut self.properties,
        }
    }

    /// Replace the aliases of one prefix with `ids`, numbered from 1 in order
    pub fn rebuild<'a>(&mut self, prefix: EntityPrefix, ids: impl IntoIterator<Item = &'a EntityId>) {
        let table = self.table_mut(prefix);
        table.clear();
        for (n, id) in ids.into_iter().enumerate() {
            table.insert(n as u32 + 1, id.to_string());
        }
    }

    /// Add an entity ID (if absent) and return its short number
    pub fn add(&mut self, id: &EntityId) -> u32 {
        let id_str = id.to_string();
        if let Some(n) = self.short_number(id) {
            return n;
        }
        let table = self.table_mut(id.prefix());
        let next = table.keys().next_back().copied().unwrap_or(0) + 1;
        table.insert(next, id_str);
        next
    }

    /// Short number currently assigned to an ID
    pub fn short_number(&self, id: &EntityId) -> Option<u32> {
        let id_str = id.to_string();
        self.table(id.prefix())
            .iter()
            .find(|(_, v)| **v == id_str)
            .map(|(k, _)| *k)
    }

    /// Display alias (`PROP@2`) for an ID, or the full ID when unindexed
    pub fn alias(&self, id: &EntityId) -> String {
        match self.short_number(id) {
            Some(n) => format!("{}@{}", id.prefix(), n),
            None => id.to_string(),
        }
    }

    /// Resolve a reference to a full entity ID string
    ///
    /// Accepts `PREFIX@N`, `@N`, a bare number, or a full/partial ID which
    /// is passed through unchanged for partial matching by the caller.
    pub fn resolve(&self, prefix: EntityPrefix, reference: &str) -> Option<String> {
        let number = if let Some((p, n)) = reference.split_once('@') {
            if !p.is_empty() && !p.eq_ignore_ascii_case(prefix.as_str()) {
                return None;
            }
            n
        } else if !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit()) {
            reference
        } else {
            return Some(reference.to_string());
        };

        number
            .parse::<u32>()
            .ok()
            .and_then(|n| self.table(prefix).get(&n).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_resolve() {
        let mut index = ShortIdIndex::new();
        let a = EntityId::new(EntityPrefix::Drft);
        let b = EntityId::new(EntityPrefix::Drft);

        assert_eq!(index.add(&a), 1);
        assert_eq!(index.add(&b), 2);
        assert_eq!(index.add(&a), 1);

        assert_eq!(index.resolve(EntityPrefix::Drft, "@1"), Some(a.to_string()));
        assert_eq!(index.resolve(EntityPrefix::Drft, "DRFT@2"), Some(b.to_string()));
        assert_eq!(index.resolve(EntityPrefix::Drft, "drft@2"), Some(b.to_string()));
        assert_eq!(index.resolve(EntityPrefix::Drft, "2"), Some(b.to_string()));
        assert_eq!(index.resolve(EntityPrefix::Drft, "@9"), None);
        assert_eq!(index.resolve(EntityPrefix::Prop, "@1"), None);
        assert_eq!(index.resolve(EntityPrefix::Drft, "PROP@1"), None);
    }

    #[test]
    fn test_passthrough_for_full_ids() {
        let index = ShortIdIndex::new();
        assert_eq!(
            index.resolve(EntityPrefix::Prop, "PROP-01ABC"),
            Some("PROP-01ABC".to_string())
        );
    }

    #[test]
    fn test_rebuild_renumbers() {
        let mut index = ShortIdIndex::new();
        let ids: Vec<_> = (0..3).map(|_| EntityId::new(EntityPrefix::Prop)).collect();
        index.add(&EntityId::new(EntityPrefix::Prop));
        index.rebuild(EntityPrefix::Prop, ids.iter());

        assert_eq!(index.alias(&ids[0]), "PROP@1");
        assert_eq!(index.alias(&ids[2]), "PROP@3");
    }
}
