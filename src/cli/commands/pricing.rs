//! `doorway pricing` command - tier prices and recommendations
//!
//! Works outside a workspace with the built-in tier table; inside one, a
//! `.doorway/tiers.yaml` override is used and `--doors` defaults to the
//! doors of every created property.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::utils::Workspace;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Preferences;
use crate::pricing::{
    clamp_door_count, compare, format_usd, quote, recommended_tier, PricingQuote, TierConfig,
    TierId, TierTable, TransitionError,
};

/// Hint explaining that annual prices carry no discount
const ANNUAL_HINT: &str = "annual-billing";

#[derive(Subcommand, Debug)]
pub enum PricingCommands {
    /// List every tier with its limits and features
    Tiers,

    /// Price a door count on one tier
    Quote(QuoteArgs),

    /// Cheapest tier that fits a door count
    Recommend(DoorsArgs),

    /// Price a door count on every tier
    Compare(DoorsArgs),
}

#[derive(clap::Args, Debug)]
pub struct DoorsArgs {
    /// Number of doors (default: doors in the workspace, or 1)
    #[arg(long, short = 'd', allow_negative_numbers = true)]
    pub doors: Option<i64>,
}

#[derive(clap::Args, Debug)]
pub struct QuoteArgs {
    #[command(flatten)]
    pub doors: DoorsArgs,

    /// Tier to quote (default: the recommended tier)
    #[arg(long, short = 't')]
    pub tier: Option<String>,
}

/// Tier table, door total and preferences from the workspace, when there is one
struct PricingContext {
    table: TierTable,
    workspace_doors: Option<u32>,
    preferences: Preferences,
}

impl PricingContext {
    fn load(global: &GlobalOpts) -> Result<Self> {
        match Workspace::open(global) {
            Ok(workspace) => Ok(Self {
                table: workspace.tier_table()?,
                workspace_doors: Some(workspace.doors_in_use()?),
                preferences: workspace.config.preferences(),
            }),
            Err(e) => {
                tracing::debug!(error = %e, "no workspace; using built-in tiers");
                Ok(Self {
                    table: TierTable::builtin().map_err(miette::Report::new)?,
                    workspace_doors: None,
                    preferences: Preferences::default(),
                })
            }
        }
    }

    fn doors(&self, args: &DoorsArgs) -> u32 {
        match args.doors {
            Some(raw) => clamp_door_count(Some(raw)),
            None => clamp_door_count(self.workspace_doors.map(i64::from)),
        }
    }

    fn annual_notice(&self) {
        let Some(pct) = self.table.advertised_annual_savings_pct() else {
            return;
        };
        if self.preferences.shows_hint(ANNUAL_HINT) {
            println!(
                "{}",
                style(format!(
                    "Annual prices are 12 × monthly; the advertised {}% annual saving is not applied.",
                    pct
                ))
                .dim()
            );
        }
    }
}

/// Run a pricing subcommand
pub fn run(cmd: PricingCommands, global: &GlobalOpts) -> Result<()> {
    let ctx = PricingContext::load(global)?;
    match cmd {
        PricingCommands::Tiers => run_tiers(&ctx, global),
        PricingCommands::Quote(args) => run_quote(&ctx, args, global),
        PricingCommands::Recommend(args) => run_recommend(&ctx, args, global),
        PricingCommands::Compare(args) => run_compare(&ctx, args, global),
    }
}

fn run_tiers(ctx: &PricingContext, global: &GlobalOpts) -> Result<()> {
    let tiers = ctx.table.tiers();
    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(tiers).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(tiers).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for tier in tiers {
                println!("{}", tier.id);
            }
        }
        format => {
            let mut builder = Builder::default();
            builder.push_record(["Tier", "Base / month", "Included doors", "Per extra door", "Max doors", "Features"]);
            for tier in tiers {
                builder.push_record([
                    tier.display_name.clone(),
                    format_usd(tier.base_price_cents),
                    tier.included_doors.to_string(),
                    format_usd(tier.overage_cents_per_door),
                    tier.door_ceiling
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "unlimited".to_string()),
                    tier.features.join(", "),
                ]);
            }
            print_table(builder, format);
        }
    }
    Ok(())
}

/// Quote plus the display name, for structured output
#[derive(Serialize)]
struct QuoteView<'a> {
    display_name: &'a str,
    #[serde(flatten)]
    quote: &'a PricingQuote,
    /// Always false: annual is twelve monthly payments
    annual_discount_applied: bool,
}

impl<'a> QuoteView<'a> {
    fn new(tier: &'a TierConfig, quote: &'a PricingQuote) -> Self {
        Self {
            display_name: &tier.display_name,
            quote,
            annual_discount_applied: false,
        }
    }
}

fn run_quote(ctx: &PricingContext, args: QuoteArgs, global: &GlobalOpts) -> Result<()> {
    let doors = ctx.doors(&args.doors);
    let tier = match &args.tier {
        Some(id) => {
            let id = TierId::new(id.trim().to_lowercase());
            ctx.table
                .get(&id)
                .ok_or_else(|| miette::Report::new(TransitionError::UnknownTier(id)))?
        }
        None => recommended_tier(&ctx.table, doors),
    };
    let quote = quote(tier, doors);
    let view = QuoteView::new(tier, &quote);

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&view).into_diagnostic()?),
        _ => {
            println!(
                "{} for {} door(s)",
                style(&tier.display_name).bold(),
                style(doors).cyan()
            );
            println!("  Base          {}", format_usd(quote.breakdown.base_cents));
            if quote.breakdown.overage_units > 0 {
                println!(
                    "  Extra doors   {} × {} = {}",
                    quote.breakdown.overage_units,
                    format_usd(tier.overage_cents_per_door),
                    format_usd(quote.breakdown.overage_cost_cents)
                );
            }
            println!("  Monthly       {}", style(format_usd(quote.monthly_cents)).green());
            println!("  Annual        {}", format_usd(quote.annual_cents));
            if !tier.accommodates(doors) {
                println!(
                    "{} {} allows at most {} door(s)",
                    style("!").yellow(),
                    tier.display_name,
                    tier.door_ceiling.unwrap_or_default()
                );
            }
            ctx.annual_notice();
        }
    }
    Ok(())
}

fn run_recommend(ctx: &PricingContext, args: DoorsArgs, global: &GlobalOpts) -> Result<()> {
    let doors = ctx.doors(&args);
    let tier = recommended_tier(&ctx.table, doors);
    let quote = quote(tier, doors);

    match global.format {
        OutputFormat::Id => println!("{}", tier.id),
        OutputFormat::Json => {
            let view = QuoteView::new(tier, &quote);
            println!("{}", serde_json::to_string_pretty(&view).into_diagnostic()?);
        }
        _ => {
            println!(
                "{} {} door(s) → {} at {}/month",
                style("✓").green(),
                doors,
                style(&tier.display_name).yellow(),
                style(format_usd(quote.monthly_cents)).green()
            );
            let features = ctx.table.features(&tier.id);
            if !features.is_empty() && !global.quiet {
                println!("   Includes: {}", features.join(", "));
            }
        }
    }
    Ok(())
}

fn run_compare(ctx: &PricingContext, args: DoorsArgs, global: &GlobalOpts) -> Result<()> {
    let doors = ctx.doors(&args);
    let options = compare(&ctx.table, doors);

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&options).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&options).into_diagnostic()?),
        format => {
            println!("Prices for {} door(s):", style(doors).cyan());
            println!();
            let mut builder = Builder::default();
            builder.push_record(["", "Tier", "Monthly", "Annual", "Extra doors", "Fits"]);
            for option in &options {
                builder.push_record([
                    if option.recommended { "★" } else { "" }.to_string(),
                    option.display_name.clone(),
                    format_usd(option.quote.monthly_cents),
                    format_usd(option.quote.annual_cents),
                    option.quote.breakdown.overage_units.to_string(),
                    if option.fits { "yes" } else { "no" }.to_string(),
                ]);
            }
            print_table(builder, format);
            if !global.quiet {
                println!();
                println!("{} recommended", style("★").yellow());
                ctx.annual_notice();
            }
        }
    }
    Ok(())
}

fn print_table(builder: Builder, format: OutputFormat) {
    let mut table = builder.build();
    match format {
        OutputFormat::Md => table.with(Style::markdown()),
        OutputFormat::Tsv | OutputFormat::Csv => table.with(Style::blank()),
        _ => table.with(Style::rounded()),
    };
    println!("{}", table);
}
