//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::core::Project;

/// Doorway configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default author for new drafts and properties
    pub author: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Tier assumed when no subscription record exists yet
    pub tier: Option<String>,

    /// User preferences injected into the wizard and the CLI
    pub preferences: PreferencesLayer,
}

/// Partially specified preferences as read from one config layer
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PreferencesLayer {
    pub prefill_from_records: Option<bool>,
    pub show_pricing_preview: Option<bool>,
    pub dismissed_hints: Option<BTreeSet<String>>,
}

/// Effective user preferences
///
/// Replaces scattered "don't show again" flags with one explicit value that
/// callers pass to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Pre-fill structural fields from high-confidence property records
    pub prefill_from_records: bool,

    /// Show the pricing preview after a property is created
    pub show_pricing_preview: bool,

    /// Hints the user asked not to see again
    pub dismissed_hints: BTreeSet<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            prefill_from_records: true,
            show_pricing_preview: true,
            dismissed_hints: BTreeSet::new(),
        }
    }
}

impl Preferences {
    /// Whether a named hint should still be shown
    pub fn shows_hint(&self, hint: &str) -> bool {
        !self.dismissed_hints.contains(hint)
    }
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        Self::load_for(Project::discover().ok().as_ref())
    }

    /// Load configuration for a specific workspace
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/doorway/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_layer(&global_path) {
                config.merge(global);
            }
        }

        // 3. Workspace config (.doorway/config.yaml)
        if let Some(project) = project {
            if let Some(local) = Self::read_layer(&project.config_path()) {
                config.merge(local);
            }
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("DOORWAY_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(tier) = std::env::var("DOORWAY_TIER") {
            config.tier = Some(tier);
        }

        config
    }

    fn read_layer(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(layer) => Some(layer),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config layer");
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "doorway")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.tier.is_some() {
            self.tier = other.tier;
        }
        let prefs = other.preferences;
        if prefs.prefill_from_records.is_some() {
            self.preferences.prefill_from_records = prefs.prefill_from_records;
        }
        if prefs.show_pricing_preview.is_some() {
            self.preferences.show_pricing_preview = prefs.show_pricing_preview;
        }
        if let Some(hints) = prefs.dismissed_hints {
            self.preferences
                .dismissed_hints
                .get_or_insert_with(BTreeSet::new)
                .extend(hints);
        }
    }

    /// Resolve the effective preferences
    pub fn preferences(&self) -> Preferences {
        let defaults = Preferences::default();
        Preferences {
            prefill_from_records: self
                .preferences
                .prefill_from_records
                .unwrap_or(defaults.prefill_from_records),
            show_pricing_preview: self
                .preferences
                .show_pricing_preview
                .unwrap_or(defaults.show_pricing_preview),
            dismissed_hints: self.preferences.dismissed_hints.clone().unwrap_or_default(),
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_default_when_unset() {
        let config = Config::default();
        let prefs = config.preferences();
        assert!(prefs.prefill_from_records);
        assert!(prefs.show_pricing_preview);
        assert!(prefs.shows_hint("annual-billing"));
    }

    #[test]
    fn test_merge_later_layer_wins() {
        let mut base: Config = serde_yml::from_str(
            "author: alice\ntier: starter\npreferences:\n  dismissed_hints: [a]\n",
        )
        .unwrap();
        let over: Config = serde_yml::from_str(
            "tier: portfolio\npreferences:\n  prefill_from_records: false\n  dismissed_hints: [b]\n",
        )
        .unwrap();
        base.merge(over);

        assert_eq!(base.author.as_deref(), Some("alice"));
        assert_eq!(base.tier.as_deref(), Some("portfolio"));
        let prefs = base.preferences();
        assert!(!prefs.prefill_from_records);
        assert!(!prefs.shows_hint("a"));
        assert!(!prefs.shows_hint("b"));
    }
}
