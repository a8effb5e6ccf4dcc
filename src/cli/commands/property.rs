//! `doorway property` command - created properties

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::utils::{print_pricing_preview, Workspace};
use crate::cli::helpers::{escape_csv, parse_dollars, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityPrefix;
use crate::core::repository::PropertyRepository;
use crate::entities::{Property, PropertyPatch};
use crate::pricing::format_usd;

#[derive(Subcommand, Debug)]
pub enum PropertyCommands {
    /// List created properties
    List(ListArgs),

    /// Show a property's details
    Show(ShowArgs),

    /// Change a property's nickname or valuation
    Update(UpdateArgs),

    /// Delete a property
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search in nickname and address
    #[arg(long)]
    pub search: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Property ID or short ID (PROP@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Property ID or short ID (PROP@N)
    pub id: String,

    /// New nickname
    #[arg(long)]
    pub nickname: Option<String>,

    /// Current market value in dollars
    #[arg(long, value_parser = parse_dollars)]
    pub current_value: Option<u64>,

    /// Outstanding mortgage balance in dollars
    #[arg(long, value_parser = parse_dollars)]
    pub mortgage_balance: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Property ID or short ID (PROP@N)
    pub id: String,
}

/// Run a property subcommand
pub fn run(cmd: PropertyCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    match cmd {
        PropertyCommands::List(args) => run_list(&workspace, args, global),
        PropertyCommands::Show(args) => run_show(&workspace, args, global),
        PropertyCommands::Update(args) => run_update(&workspace, args, global),
        PropertyCommands::Delete(args) => run_delete(&workspace, args, global),
    }
}

fn run_list(workspace: &Workspace, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let properties: Vec<Property> = workspace
        .properties
        .list()
        .map_err(miette::Report::new)?
        .into_iter()
        .filter(|p| {
            args.search.as_ref().map_or(true, |search| {
                let search = search.to_lowercase();
                p.details.nickname.to_lowercase().contains(&search)
                    || p.details.display_address.to_lowercase().contains(&search)
            })
        })
        .collect();

    if args.count {
        println!("{}", properties.len());
        return Ok(());
    }
    if properties.is_empty() {
        println!("No properties found.");
        return Ok(());
    }

    let mut short_ids = workspace.short_ids();
    short_ids.rebuild(EntityPrefix::Prop, properties.iter().map(|p| &p.id));
    if let Err(e) = short_ids.save(&workspace.project) {
        tracing::warn!(error = %e, "could not save short id index");
    }

    let format = global
        .format
        .resolve(workspace.config.default_format.as_deref(), OutputFormat::Tsv);
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&properties).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&properties).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            println!("short_id,id,nickname,type,use,doors,address");
            for p in &properties {
                println!(
                    "{},{},{},{},{},{},{}",
                    short_ids.alias(&p.id),
                    p.id,
                    escape_csv(&p.details.nickname),
                    p.details.property_kind,
                    p.details.use_type,
                    p.details.door_count,
                    escape_csv(&p.details.display_address)
                );
            }
        }
        OutputFormat::Id => {
            for p in &properties {
                println!("{}", p.id);
            }
        }
        OutputFormat::Md => {
            println!("| Short | Nickname | Type | Use | Doors | Address |");
            println!("|---|---|---|---|---|---|");
            for p in &properties {
                println!(
                    "| {} | {} | {} | {} | {} | {} |",
                    short_ids.alias(&p.id),
                    p.details.nickname,
                    p.details.property_kind.label(),
                    p.details.use_type.label(),
                    p.details.door_count,
                    p.details.display_address
                );
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<8} {:<22} {:<18} {:<6} {}",
                style("SHORT").bold().dim(),
                style("NICKNAME").bold(),
                style("TYPE").bold(),
                style("DOORS").bold(),
                style("ADDRESS").bold()
            );
            println!("{}", "-".repeat(90));
            for p in &properties {
                println!(
                    "{:<8} {:<22} {:<18} {:<6} {}",
                    style(short_ids.alias(&p.id)).cyan(),
                    truncate_str(&p.details.nickname, 20),
                    truncate_str(p.details.property_kind.label(), 16),
                    p.details.door_count,
                    truncate_str(&p.details.display_address, 40)
                );
            }
            let doors: u32 = properties.iter().map(|p| p.details.door_count).sum();
            println!();
            println!(
                "{} property(ies), {} door(s). Use {} to reference by short ID.",
                style(properties.len()).cyan(),
                style(doors).cyan(),
                style("PROP@N").cyan()
            );
        }
    }
    Ok(())
}

fn load(workspace: &Workspace, reference: &str) -> Result<Property> {
    let id = workspace.resolve_property(reference)?;
    workspace
        .properties
        .get(&id)
        .map_err(miette::Report::new)?
        .ok_or_else(|| miette::miette!("No property found matching '{}'", reference))
}

fn run_show(workspace: &Workspace, args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let property = load(workspace, &args.id)?;
    let details = &property.details;

    match global.format {
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&property).into_diagnostic()?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&property).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", property.id),
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("ID").bold(), style(&property.id.to_string()).cyan());
            println!("{}: {}", style("Nickname").bold(), style(&details.nickname).yellow());
            println!("{}: {}", style("Address").bold(), details.display_address);
            println!(
                "{}: {}, {} ({} door(s))",
                style("Type").bold(),
                details.property_kind.label(),
                details.use_type.label(),
                details.door_count
            );
            println!("{}", style("─".repeat(60)).dim());

            let s = &details.structure;
            let mut facts = Vec::new();
            if let Some(year) = s.year_built {
                facts.push(format!("built {}", year));
            }
            if let Some(sqft) = s.square_feet {
                facts.push(format!("{} sq ft", sqft));
            }
            if let Some(beds) = s.bedrooms {
                facts.push(format!("{} bed", beds));
            }
            if let Some(baths) = s.bathrooms {
                facts.push(format!("{} bath", baths));
            }
            if let Some(foundation) = s.foundation {
                facts.push(foundation.label().to_lowercase());
            }
            if !facts.is_empty() {
                println!();
                println!("{}: {}", style("Structure").bold(), facts.join(", "));
            }

            if let Some(rental) = &details.rental {
                println!();
                println!(
                    "{}: {}, {}, {}",
                    style("Rental").bold(),
                    rental.furnishing.label(),
                    rental.duration.label(),
                    rental.management.label()
                );
                if !rental.platforms.is_empty() {
                    let platforms: Vec<&str> = rental.platforms.iter().map(|p| p.label()).collect();
                    println!("  Platforms: {}", platforms.join(", "));
                }
            }

            if !details.units.is_empty() {
                println!();
                println!("{} ({}):", style("Units").bold(), details.units.len());
                for unit in &details.units {
                    print!("  • {}", unit.display_name());
                    if let Some(occupancy) = unit.occupancy {
                        print!(" - {}", occupancy.label());
                    }
                    if let Some(rent) = unit.monthly_rent_cents {
                        print!(" ({}/mo)", format_usd(rent));
                    }
                    println!();
                    if let Some(tenant) = &unit.tenant {
                        println!("    Tenant: {}", tenant.name);
                    }
                }
            }

            let f = &details.financials;
            let mut money = Vec::new();
            if let Some(price) = f.purchase_price_cents {
                money.push(format!("purchased for {}", format_usd(price)));
            }
            if let Some(value) = f.current_value_cents {
                money.push(format!("worth {}", format_usd(value)));
            }
            if let Some(balance) = f.mortgage.as_ref().and_then(|m| m.balance_cents) {
                money.push(format!("owes {}", format_usd(balance)));
            }
            if !money.is_empty() {
                println!();
                println!("{}: {}", style("Financials").bold(), money.join(", "));
            }

            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {} | {}: {}",
                style("Author").dim(),
                details.author,
                style("Created").dim(),
                property.created.format("%Y-%m-%d %H:%M"),
                style("Revision").dim(),
                property.entity_revision
            );
        }
    }
    Ok(())
}

fn run_update(workspace: &Workspace, args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let patch = PropertyPatch {
        nickname: args.nickname.clone(),
        current_value_cents: args.current_value,
        mortgage_balance_cents: args.mortgage_balance,
    };
    if patch.is_empty() {
        return Err(miette::miette!(
            "Nothing to update (use --nickname, --current-value or --mortgage-balance)"
        ));
    }

    let id = workspace.resolve_property(&args.id)?;
    let updated = workspace
        .properties
        .update(&id, &patch)
        .map_err(miette::Report::new)?;

    if !global.quiet {
        println!(
            "{} Updated {} (revision {})",
            style("✓").green(),
            style(&updated.details.nickname).cyan(),
            updated.entity_revision
        );
    }
    Ok(())
}

fn run_delete(workspace: &Workspace, args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let id = workspace.resolve_property(&args.id)?;
    workspace
        .properties
        .delete(&id)
        .map_err(miette::Report::new)?;

    if !global.quiet {
        println!("{} Deleted property {}", style("✓").green(), style(&id.to_string()).cyan());
        if workspace.config.preferences().show_pricing_preview {
            print_pricing_preview(workspace)?;
        }
    }
    Ok(())
}
