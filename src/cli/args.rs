//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigCommands, init::InitArgs,
    onboard::OnboardCommands, pricing::PricingCommands, property::PropertyCommands,
    tier::TierCommands,
};

#[derive(Parser)]
#[command(name = "doorway")]
#[command(author, version, about = "Property onboarding and door-based pricing")]
#[command(long_about = "Onboard homes and rental portfolios through a resumable step-by-step wizard, then see what they cost on each subscription tier.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose (debug) logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding .doorway/)
    #[arg(long, global = true, env = "DOORWAY_WORKSPACE")]
    pub workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new Doorway workspace
    Init(InitArgs),

    /// Add a property through the onboarding wizard
    #[command(subcommand)]
    Onboard(OnboardCommands),

    /// Manage created properties
    #[command(subcommand)]
    Property(PropertyCommands),

    /// Tier prices, quotes and recommendations
    #[command(subcommand)]
    Pricing(PricingCommands),

    /// Show or change the subscription tier
    #[command(subcommand)]
    Tier(TierCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (pretty for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl OutputFormat {
    /// Resolve `Auto` against the configured default, then `fallback`
    pub fn resolve(self, configured: Option<&str>, fallback: OutputFormat) -> OutputFormat {
        if self != OutputFormat::Auto {
            return self;
        }
        configured
            .and_then(|f| OutputFormat::from_str(f, true).ok())
            .filter(|f| *f != OutputFormat::Auto)
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_format_resolution() {
        assert_eq!(
            OutputFormat::Auto.resolve(None, OutputFormat::Tsv),
            OutputFormat::Tsv
        );
        assert_eq!(
            OutputFormat::Auto.resolve(Some("json"), OutputFormat::Tsv),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::Yaml.resolve(Some("json"), OutputFormat::Tsv),
            OutputFormat::Yaml
        );
        assert_eq!(
            OutputFormat::Auto.resolve(Some("bogus"), OutputFormat::Md),
            OutputFormat::Md
        );
    }
}
