//! `doorway config` command - Configuration management
//!
//! Reads and writes the global (`~/.config/doorway/config.yaml`) and
//! workspace (`.doorway/config.yaml`) layers.

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::utils::open_project;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path(PathArgs),

    /// List all available configuration keys
    Keys,

    /// Stop showing a hint (e.g. annual-billing)
    Dismiss(DismissArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,

    /// Show only workspace-level config
    #[arg(long = "workspace-only")]
    pub workspace_only: bool,

    /// Show only global (user) config
    #[arg(long = "global-only")]
    pub global_only: bool,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., author, preferences.show_pricing_preview)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of workspace config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of workspace config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Show only workspace config path
    #[arg(long = "workspace-only")]
    pub workspace_only: bool,

    /// Show only global config path
    #[arg(long = "global-only")]
    pub global_only: bool,
}

#[derive(clap::Args, Debug)]
pub struct DismissArgs {
    /// Hint name
    pub hint: String,

    /// Dismiss in global (user) config instead of workspace config
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("author", "Author recorded on drafts and properties"),
    (
        "default_format",
        "Default output format (yaml, json, tsv, etc.)",
    ),
    ("tier", "Tier assumed before any subscription change"),
    (
        "preferences.prefill_from_records",
        "Pre-fill structure from property records (true/false)",
    ),
    (
        "preferences.show_pricing_preview",
        "Show monthly price after creating a property (true/false)",
    ),
    (
        "preferences.dismissed_hints",
        "Hints no longer shown (use `doorway config dismiss`)",
    ),
];

const BOOL_KEYS: &[&str] = &[
    "preferences.prefill_from_records",
    "preferences.show_pricing_preview",
];

const HINTS_KEY: &str = "preferences.dismissed_hints";

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path(args) => run_path(args, global),
        ConfigCommands::Keys => run_keys(),
        ConfigCommands::Dismiss(args) => run_dismiss(args, global),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global).ok();
    let config = Config::load_for(project.as_ref());

    if let Some(key) = &args.key {
        check_key(key)?;
        return match get_config_value(&config, key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    if args.workspace_only && args.global_only {
        return Err(miette::miette!(
            "Cannot specify both --workspace-only and --global-only"
        ));
    }

    if args.workspace_only {
        show_layer("Workspace config:", &workspace_config_path(global)?)?;
    } else if args.global_only {
        show_layer("Global config:", &global_config_path()?)?;
    } else {
        println!("{}", style("Effective Configuration").bold().underlined());
        println!();
        for (key, _) in VALID_KEYS {
            print_config_value(key, get_config_value(&config, key).as_deref());
        }

        println!();
        println!("{}", style("Config Sources (in priority order):").dim());
        println!("  1. Environment variables (DOORWAY_AUTHOR, DOORWAY_TIER)");
        println!("  2. Workspace config (.doorway/config.yaml)");
        println!("  3. Global config (~/.config/doorway/config.yaml)");
    }

    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    if args.key == HINTS_KEY {
        return Err(miette::miette!(
            "Use 'doorway config dismiss <hint>' to add to {}",
            HINTS_KEY
        ));
    }
    let value = parse_value(&args.key, &args.value)?;

    let config_path = layer_path(args.global, global)?;
    let mut config_map = read_map(&config_path)?;
    set_nested_value(&mut config_map, &args.key, value);
    write_map(&config_path, &config_map)?;

    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope(args.global)
    );

    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    let config_path = layer_path(args.global, global)?;

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_map(&config_path)?;
    if !unset_nested_value(&mut config_map, &args.key) {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }
    write_map(&config_path, &config_map)?;

    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope(args.global)
    );

    Ok(())
}

fn run_dismiss(args: DismissArgs, global: &GlobalOpts) -> Result<()> {
    let hint = args.hint.trim();
    if hint.is_empty() {
        return Err(miette::miette!("Hint name cannot be empty"));
    }

    let config_path = layer_path(args.global, global)?;
    let mut config_map = read_map(&config_path)?;
    let added = add_dismissed_hint(&mut config_map, hint);
    write_map(&config_path, &config_map)?;

    if added {
        println!(
            "{} Hint {} dismissed in {} config",
            style("✓").green(),
            style(hint).cyan(),
            scope(args.global)
        );
    } else {
        println!(
            "{} Hint {} was already dismissed",
            style("!").yellow(),
            style(hint).cyan()
        );
    }
    Ok(())
}

fn run_path(args: PathArgs, global: &GlobalOpts) -> Result<()> {
    if args.workspace_only && args.global_only {
        return Err(miette::miette!(
            "Cannot specify both --workspace-only and --global-only"
        ));
    }

    if args.workspace_only {
        println!("{}", workspace_config_path(global)?.display());
    } else if args.global_only {
        println!("{}", global_config_path()?.display());
    } else {
        let global_path = global_config_path()?;

        println!("{}", style("Configuration file paths:").bold());
        println!();
        println!("  {} {}", style("Global:").cyan(), global_path.display());
        print_exists(&global_path, 9);

        println!();
        match workspace_config_path(global) {
            Ok(path) => {
                println!("  {} {}", style("Workspace:").cyan(), path.display());
                print_exists(&path, 12);
            }
            Err(_) => println!(
                "  {} {}",
                style("Workspace:").cyan(),
                style("(not in a Doorway workspace)").dim()
            ),
        }
    }

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<36} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'doorway config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

fn global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn workspace_config_path(global: &GlobalOpts) -> Result<PathBuf> {
    Ok(open_project(global)?.config_path())
}

fn layer_path(use_global: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if use_global {
        global_config_path()
    } else {
        workspace_config_path(global)
    }
}

fn scope(use_global: bool) -> &'static str {
    if use_global {
        "global"
    } else {
        "workspace"
    }
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            "Unknown config key '{}' (run 'doorway config keys')",
            key
        ))
    }
}

/// Typed YAML value for a key, so the layer still deserializes
fn parse_value(key: &str, raw: &str) -> Result<serde_yml::Value> {
    if BOOL_KEYS.contains(&key) {
        return match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(serde_yml::Value::Bool(true)),
            "false" | "no" | "off" => Ok(serde_yml::Value::Bool(false)),
            _ => Err(miette::miette!("'{}' expects true or false, got '{}'", key, raw)),
        };
    }
    if key == "default_format" && OutputFormat::from_str(raw, true).is_err() {
        return Err(miette::miette!(
            "Unknown format '{}' (auto, yaml, tsv, json, csv, md, id)",
            raw
        ));
    }
    Ok(serde_yml::Value::String(raw.to_string()))
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    let prefs = &config.preferences;
    match key {
        "author" => config.author.clone(),
        "default_format" => config.default_format.clone(),
        "tier" => config.tier.clone(),
        "preferences.prefill_from_records" => prefs.prefill_from_records.map(|b| b.to_string()),
        "preferences.show_pricing_preview" => prefs.show_pricing_preview.map(|b| b.to_string()),
        "preferences.dismissed_hints" => prefs
            .dismissed_hints
            .as_ref()
            .filter(|hints| !hints.is_empty())
            .map(|hints| hints.iter().cloned().collect::<Vec<_>>().join(", ")),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn print_exists(path: &Path, indent: usize) {
    let marker = if path.exists() {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("{}{}", " ".repeat(indent), marker);
}

fn show_layer(title: &str, path: &Path) -> Result<()> {
    println!("{} {}", style(title).bold(), style(path.display()).dim());
    println!();

    if path.exists() {
        let content = fs::read_to_string(path).into_diagnostic()?;
        print!("{}", content);
    } else {
        println!("{}", style("(not created)").dim());
    }

    Ok(())
}

fn read_map(path: &Path) -> Result<serde_yml::Value> {
    if !path.exists() {
        return Ok(serde_yml::Value::Mapping(Default::default()));
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    let parsed: serde_yml::Value =
        serde_yml::from_str(&content).unwrap_or(serde_yml::Value::Mapping(Default::default()));
    if parsed.is_mapping() {
        Ok(parsed)
    } else {
        Ok(serde_yml::Value::Mapping(Default::default()))
    }
}

fn write_map(path: &Path, map: &serde_yml::Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(map).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()
}

/// Walk to the mapping holding the last segment of `key`, creating parents
fn parent_mapping<'a>(
    root: &'a mut serde_yml::Value,
    key: &str,
) -> Option<(&'a mut serde_yml::Mapping, String)> {
    let mut parts: Vec<&str> = key.split('.').collect();
    let last = parts.pop()?.to_string();

    let mut current = root;
    for part in parts {
        let map = current.as_mapping_mut()?;
        let key = serde_yml::Value::String(part.to_string());
        let child = map
            .entry(key)
            .or_insert_with(|| serde_yml::Value::Mapping(Default::default()));
        if !child.is_mapping() {
            *child = serde_yml::Value::Mapping(Default::default());
        }
        current = child;
    }
    current.as_mapping_mut().map(|map| (map, last))
}

fn set_nested_value(root: &mut serde_yml::Value, key: &str, value: serde_yml::Value) {
    if let Some((map, last)) = parent_mapping(root, key) {
        map.insert(serde_yml::Value::String(last), value);
    }
}

fn unset_nested_value(root: &mut serde_yml::Value, key: &str) -> bool {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        return false;
    };

    let mut current = root;
    for part in parents {
        match current
            .as_mapping_mut()
            .and_then(|map| map.get_mut(*part))
        {
            Some(next) => current = next,
            None => return false,
        }
    }
    current
        .as_mapping_mut()
        .map_or(false, |map| map.remove(*last).is_some())
}

/// Append a hint to `preferences.dismissed_hints`; false if already present
fn add_dismissed_hint(root: &mut serde_yml::Value, hint: &str) -> bool {
    let Some((map, last)) = parent_mapping(root, HINTS_KEY) else {
        return false;
    };
    let list = map
        .entry(serde_yml::Value::String(last))
        .or_insert_with(|| serde_yml::Value::Sequence(Vec::new()));
    if !list.is_sequence() {
        *list = serde_yml::Value::Sequence(Vec::new());
    }
    let Some(seq) = list.as_sequence_mut() else {
        return false;
    };
    if seq.iter().any(|v| v.as_str() == Some(hint)) {
        return false;
    }
    seq.push(serde_yml::Value::String(hint.to_string()));
    true
}
