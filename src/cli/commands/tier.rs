//! `doorway tier` command - the workspace subscription

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::utils::Workspace;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::subscription::SubscriptionService;
use crate::pricing::{
    format_usd, quote, TierChange, TierId, TierTable, TierTransitionGuard, TransitionError,
    CONFIRMATION_TOKEN,
};

#[derive(Subcommand, Debug)]
pub enum TierCommands {
    /// Show the current tier and what it costs for the doors in use
    Show,

    /// Move to another tier
    Change(ChangeArgs),
}

#[derive(clap::Args, Debug)]
pub struct ChangeArgs {
    /// Target tier id (see `doorway pricing tiers`)
    pub tier: String,

    /// Confirmation word for downgrades (DOWNGRADE)
    #[arg(long)]
    pub confirm: Option<String>,
}

/// Run a tier subcommand
pub fn run(cmd: TierCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    match cmd {
        TierCommands::Show => run_show(&workspace, global),
        TierCommands::Change(args) => run_change(&workspace, args, global),
    }
}

fn run_show(workspace: &Workspace, global: &GlobalOpts) -> Result<()> {
    let table = workspace.tier_table()?;
    let subscription = workspace
        .subscription(&table)
        .current()
        .map_err(miette::Report::new)?;
    let doors = workspace.doors_in_use()?;

    match global.format {
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&subscription).into_diagnostic()?),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&subscription).into_diagnostic()?)
        }
        OutputFormat::Id => println!("{}", subscription.tier),
        _ => {
            let tier = table
                .get(&subscription.tier)
                .ok_or_else(|| miette::Report::new(TransitionError::UnknownTier(subscription.tier.clone())))?;
            let quote = quote(tier, doors);

            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} ({})",
                style("Tier").bold(),
                style(&tier.display_name).yellow(),
                tier.id
            );
            println!(
                "{}: {} of {}",
                style("Doors").bold(),
                style(doors).cyan(),
                tier.door_ceiling
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unlimited".to_string())
            );
            println!(
                "{}: {}/month, {}/year",
                style("Price").bold(),
                style(format_usd(quote.monthly_cents)).green(),
                format_usd(quote.annual_cents)
            );
            println!(
                "{}: {}",
                style("Since").bold(),
                subscription.since.format("%Y-%m-%d %H:%M")
            );
            let features = table.features(&tier.id);
            if !features.is_empty() {
                println!();
                println!("{}:", style("Features").bold());
                for feature in features {
                    println!("  • {}", feature);
                }
            }
            if !subscription.history.is_empty() {
                println!();
                println!("{}:", style("History").bold());
                for change in &subscription.history {
                    println!(
                        "  {} {} {} → {}",
                        style(change.at.format("%Y-%m-%d")).dim(),
                        change.direction,
                        change.from,
                        change.to
                    );
                }
            }
            println!("{}", style("─".repeat(60)).dim());
        }
    }
    Ok(())
}

fn run_change(workspace: &Workspace, args: ChangeArgs, global: &GlobalOpts) -> Result<()> {
    let table = workspace.tier_table()?;
    let subscription = workspace.subscription(&table);
    let current = subscription.current().map_err(miette::Report::new)?;
    let doors = workspace.doors_in_use()?;
    let target = TierId::new(args.tier.trim().to_lowercase());

    let guard = TierTransitionGuard::new(&table);
    let request = guard
        .request(&current.tier, &target, doors)
        .map_err(miette::Report::new)?;

    let token = match args.confirm {
        Some(token) => token,
        None if request.requires_confirmation_token && console::user_attended() => {
            let name = table
                .get(&target)
                .map(|t| t.display_name.clone())
                .unwrap_or_else(|| target.to_string());
            println!(
                "{} Downgrading to {} removes: {}",
                style("!").yellow(),
                style(&name).yellow(),
                lost_features(&table, &current.tier, &target).join(", ")
            );
            Input::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Type {} to confirm", CONFIRMATION_TOKEN))
                .allow_empty(true)
                .interact_text()
                .into_diagnostic()?
        }
        None => String::new(),
    };

    let updated = guard
        .commit(&request, &token, &subscription)
        .map_err(miette::Report::new)?;

    if global.quiet {
        println!("{}", updated.tier);
        return Ok(());
    }
    let verb = match request.direction {
        TierChange::Upgrade => "Upgraded",
        TierChange::Downgrade => "Downgraded",
    };
    let tier = table.get(&updated.tier);
    println!(
        "{} {} from {} to {}",
        style("✓").green(),
        verb,
        request.from,
        style(tier.map_or(updated.tier.as_str(), |t| t.display_name.as_str())).yellow()
    );
    if let Some(tier) = tier {
        println!(
            "   {} door(s) now cost {}/month",
            doors,
            style(format_usd(quote(tier, doors).monthly_cents)).green()
        );
    }
    Ok(())
}

/// Features of `from` that `to` does not carry
fn lost_features(table: &TierTable, from: &TierId, to: &TierId) -> Vec<String> {
    let kept = table.features(to);
    let lost: Vec<String> = table
        .features(from)
        .into_iter()
        .filter(|f| !kept.contains(f))
        .map(str::to_string)
        .collect();
    if lost.is_empty() {
        vec!["no features".to_string()]
    } else {
        lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lost_features_on_downgrade() {
        let table = TierTable::builtin().unwrap();
        let top = table.top().id.clone();
        let lowest = table.lowest().id.clone();
        let lost = lost_features(&table, &top, &lowest);
        assert!(!lost.is_empty());
        for feature in table.features(&lowest) {
            assert!(!lost.iter().any(|l| l == feature));
        }
    }

    #[test]
    fn test_lost_features_same_tier() {
        let table = TierTable::builtin().unwrap();
        let lowest = table.lowest().id.clone();
        assert_eq!(lost_features(&table, &lowest, &lowest), vec!["no features"]);
    }
}
