//! `doorway onboard` command - the property onboarding wizard
//!
//! `start` and `resume` drive the wizard interactively. The other
//! subcommands operate on a stored draft one step at a time, so the whole
//! flow can also be scripted:
//!
//! ```bash
//! doorway onboard start --no-input
//! doorway onboard advance @1 --set user_type=investor
//! doorway onboard advance @1 --set property_kind=duplex --set use_type=rental_unfurnished
//! doorway onboard advance @1 --address "12 Oak St, Austin, TX 78701"
//! ```

use clap::Subcommand;
use console::style;
use csv::ReaderBuilder;
use dialoguer::{theme::ColorfulTheme, Select};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::cli::commands::utils::{print_pricing_preview, Workspace};
use crate::cli::helpers::{
    assignments_to_values, escape_csv, parse_assignment, parse_unit_assignment, truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::identity::EntityPrefix;
use crate::entities::Property;
use crate::wizard::draft_store::DraftStore;
use crate::wizard::normalize::UNIT_FIELDS;
use crate::wizard::prompt::{self, StepPrompter};
use crate::wizard::{
    AddressInput, ManualAddress, StepData, WizardController, WizardError, WizardStep,
};

/// Hint shown after a non-interactive start
const RESUME_HINT: &str = "resume";

#[derive(Subcommand, Debug)]
pub enum OnboardCommands {
    /// Start onboarding a new property
    Start(StartArgs),

    /// Continue a draft interactively from where it was left
    Resume(ResumeArgs),

    /// Submit values for a draft's current step and move to the next one
    Advance(AdvanceArgs),

    /// Step a draft back without discarding anything
    Back(DraftArgs),

    /// Show a draft's current step, progress and collected values
    Status(DraftArgs),

    /// Create the property from a draft waiting at confirmation
    Finish(DraftArgs),

    /// List stored drafts
    Drafts(DraftsArgs),

    /// Delete a draft
    Discard(DraftArgs),

    /// Fill unit details from a CSV rent roll and submit the structural step
    ImportUnits(ImportUnitsArgs),
}

#[derive(clap::Args, Debug)]
pub struct StartArgs {
    /// Only create the draft; drive it with `advance`
    #[arg(long)]
    pub no_input: bool,
}

#[derive(clap::Args, Debug)]
pub struct ResumeArgs {
    /// Draft ID or short ID (DRFT@N); prompts for one when omitted
    pub id: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct AdvanceArgs {
    /// Draft ID or short ID (DRFT@N)
    pub id: String,

    /// Field value for the current step (repeatable)
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Unit field on the structural step, e.g. `2.occupancy=vacant` (repeatable)
    #[arg(long = "unit", short = 'u', value_name = "N.KEY=VALUE", value_parser = parse_unit_assignment)]
    pub unit: Vec<(u32, String, String)>,

    /// One-line address to look up on the address step
    #[arg(long, conflicts_with = "manual")]
    pub address: Option<String>,

    /// Take street, unit, city, state and postal_code from --set as a manual address
    #[arg(long)]
    pub manual: bool,
}

#[derive(clap::Args, Debug)]
pub struct DraftArgs {
    /// Draft ID or short ID (DRFT@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct DraftsArgs {
    /// Include drafts that were already turned into properties
    #[arg(long)]
    pub all: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ImportUnitsArgs {
    /// Draft ID or short ID (DRFT@N)
    pub id: String,

    /// CSV file with a `unit` column and any of the unit fields
    pub file: PathBuf,

    /// Structural field value to submit along with the units (repeatable)
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,
}

/// Run an onboard subcommand
pub fn run(cmd: OnboardCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    match cmd {
        OnboardCommands::Start(args) => run_start(&workspace, args, global),
        OnboardCommands::Resume(args) => run_resume(&workspace, args, global),
        OnboardCommands::Advance(args) => run_advance(&workspace, args, global),
        OnboardCommands::Back(args) => run_back(&workspace, args, global),
        OnboardCommands::Status(args) => run_status(&workspace, args, global),
        OnboardCommands::Finish(args) => run_finish(&workspace, args, global),
        OnboardCommands::Drafts(args) => run_drafts(&workspace, args, global),
        OnboardCommands::Discard(args) => run_discard(&workspace, args, global),
        OnboardCommands::ImportUnits(args) => run_import_units(&workspace, args, global),
    }
}

fn run_start(workspace: &Workspace, args: StartArgs, global: &GlobalOpts) -> Result<()> {
    let preferences = workspace.config.preferences();
    let controller = WizardController::start(
        workspace.services(),
        preferences.clone(),
        workspace.config.author(),
    );
    warn_snapshot(&controller);

    let alias = remember_draft(workspace, &controller);
    if args.no_input || !console::user_attended() {
        if global.quiet {
            println!("{}", controller.draft().id);
            return Ok(());
        }
        println!(
            "{} Started draft {}",
            style("✓").green(),
            style(&alias).cyan()
        );
        println!("   Next step: {}", style(controller.current_step().label()).yellow());
        if preferences.shows_hint(RESUME_HINT) {
            println!(
                "   {}",
                style(format!(
                    "Continue with `doorway onboard resume {}` or `doorway onboard advance {} --set ...`",
                    alias, alias
                ))
                .dim()
            );
        }
        return Ok(());
    }

    drive(workspace, controller, global)
}

fn run_resume(workspace: &Workspace, args: ResumeArgs, global: &GlobalOpts) -> Result<()> {
    let id = match args.id {
        Some(reference) => workspace.resolve_draft(&reference)?,
        None => {
            let resumable = workspace.drafts.resumable().map_err(miette::Report::new)?;
            if resumable.is_empty() {
                println!("No drafts to resume. Start one with {}", style("doorway onboard start").yellow());
                return Ok(());
            }
            if !console::user_attended() {
                return Err(miette::miette!("Specify which draft to resume (see `doorway onboard drafts`)"));
            }
            let items: Vec<String> = resumable
                .iter()
                .map(|r| {
                    format!(
                        "{} - {} ({}%)",
                        r.draft.title(),
                        r.draft.current_step.label(),
                        r.draft.progress()
                    )
                })
                .collect();
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Which draft?")
                .items(&items)
                .default(items.len() - 1)
                .interact()
                .into_diagnostic()?;
            resumable[selection].draft.id.clone()
        }
    };

    let controller = WizardController::resume(
        workspace.services(),
        workspace.config.preferences(),
        &id,
    )
    .map_err(miette::Report::new)?;
    drive(workspace, controller, global)
}

/// Interactive loop from the controller's current step to `Created`
fn drive(workspace: &Workspace, mut controller: WizardController<'_>, global: &GlobalOpts) -> Result<()> {
    let prompter = StepPrompter::new();

    loop {
        let step = controller.current_step();
        prompter.header(step, controller.progress());

        if step == WizardStep::Confirmation {
            if !prompter.review(controller.draft())? {
                controller.retreat().map_err(miette::Report::new)?;
                continue;
            }
            match controller.finish().cloned() {
                Ok(property) => {
                    warn_snapshot(&controller);
                    return report_created(workspace, &property, global);
                }
                Err(WizardError::Validation(e)) => {
                    eprintln!("{} {}", style("✗").red(), e);
                    controller.retreat().map_err(miette::Report::new)?;
                    continue;
                }
                Err(e) => return Err(miette::Report::new(e)),
            }
        }

        let data = prompter.prompt(controller.draft(), step)?;
        match controller.advance(data) {
            Ok(_) => warn_snapshot(&controller),
            Err(WizardError::Validation(e)) => eprintln!("{} {}", style("✗").red(), e),
            Err(e) => return Err(miette::Report::new(e)),
        }
    }
}

fn run_advance(workspace: &Workspace, args: AdvanceArgs, global: &GlobalOpts) -> Result<()> {
    let id = workspace.resolve_draft(&args.id)?;
    let mut controller = WizardController::resume(
        workspace.services(),
        workspace.config.preferences(),
        &id,
    )
    .map_err(miette::Report::new)?;

    let data = step_data(&args)?;
    let from = controller.current_step();
    let to = controller.advance(data).map_err(miette::Report::new)?;
    warn_snapshot(&controller);

    if global.quiet {
        return Ok(());
    }
    println!(
        "{} {} {} {} ({}%)",
        style("✓").green(),
        from.label(),
        style("→").dim(),
        style(to.label()).yellow(),
        controller.progress()
    );
    if !controller.draft().prefilled.is_empty() && from == WizardStep::Address {
        let filled: Vec<&str> = controller.draft().prefilled.iter().map(String::as_str).collect();
        println!(
            "   {} {}",
            style("Filled from property records:").dim(),
            filled.join(", ")
        );
    }
    Ok(())
}

/// Build step input from `advance` flags
fn step_data(args: &AdvanceArgs) -> Result<StepData> {
    let mut values = assignments_to_values(&args.set);
    let mut data = StepData::new();

    if args.manual {
        let mut take = |key: &str| {
            values
                .remove(key)
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        };
        let unit = take("unit");
        data = data.with_address(AddressInput::Manual(ManualAddress {
            street: take("street"),
            unit: (!unit.is_empty()).then_some(unit),
            city: take("city"),
            state: take("state"),
            postal_code: take("postal_code"),
        }));
    } else if let Some(query) = &args.address {
        data = data.with_address(AddressInput::Lookup(query.clone()));
    }

    data.values = values;
    for (number, key, value) in &args.unit {
        data = data.with_unit(*number, key, value.as_str());
    }
    Ok(data)
}

fn run_back(workspace: &Workspace, args: DraftArgs, global: &GlobalOpts) -> Result<()> {
    let id = workspace.resolve_draft(&args.id)?;
    let mut controller = WizardController::resume(
        workspace.services(),
        workspace.config.preferences(),
        &id,
    )
    .map_err(miette::Report::new)?;

    let step = controller.retreat().map_err(miette::Report::new)?;
    warn_snapshot(&controller);
    if !global.quiet {
        println!(
            "{} Back to {} ({}%)",
            style("✓").green(),
            style(step.label()).yellow(),
            controller.progress()
        );
    }
    Ok(())
}

fn run_status(workspace: &Workspace, args: DraftArgs, global: &GlobalOpts) -> Result<()> {
    let id = workspace.resolve_draft(&args.id)?;
    let record = workspace.drafts.load(&id).map_err(miette::Report::new)?;
    let draft = &record.draft;

    match global.format {
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&record).into_diagnostic()?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", draft.id),
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("ID").bold(), style(&draft.id.to_string()).cyan());
            println!("{}: {}", style("Title").bold(), style(draft.title()).yellow());
            println!(
                "{}: {} ({}%){}",
                style("Step").bold(),
                draft.current_step.label(),
                draft.progress(),
                if record.is_finalized() { " - finalized" } else { "" }
            );
            println!("{}", style("─".repeat(60)).dim());

            let path: Vec<String> = WizardStep::path(draft.use_type)
                .into_iter()
                .map(|s| {
                    if s == draft.current_step {
                        style(format!("[{}]", s.label())).cyan().to_string()
                    } else if s.ordinal() < draft.current_step.ordinal() {
                        s.label().to_string()
                    } else {
                        style(s.label()).dim().to_string()
                    }
                })
                .collect();
            let arrow = format!(" {} ", style("→").dim());
            println!("{}", path.join(arrow.as_str()));

            let rows = prompt::summary(draft);
            if !rows.is_empty() {
                println!();
                for (label, value) in rows {
                    println!("  {:<16} {}", style(label).dim(), value);
                }
            }

            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {} | {}: {}",
                style("Author").dim(),
                draft.author,
                style("Created").dim(),
                draft.created.format("%Y-%m-%d %H:%M"),
                style("Saved").dim(),
                record.saved_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

fn run_finish(workspace: &Workspace, args: DraftArgs, global: &GlobalOpts) -> Result<()> {
    let id = workspace.resolve_draft(&args.id)?;
    let mut controller = WizardController::resume(
        workspace.services(),
        workspace.config.preferences(),
        &id,
    )
    .map_err(miette::Report::new)?;

    let property = controller.finish().map_err(miette::Report::new)?.clone();
    warn_snapshot(&controller);
    report_created(workspace, &property, global)
}

fn run_drafts(workspace: &Workspace, args: DraftsArgs, global: &GlobalOpts) -> Result<()> {
    let records = if args.all {
        workspace.drafts.list()
    } else {
        workspace.drafts.resumable()
    }
    .map_err(miette::Report::new)?;

    if args.count {
        println!("{}", records.len());
        return Ok(());
    }
    if records.is_empty() {
        println!("No drafts found.");
        return Ok(());
    }

    let mut short_ids = workspace.short_ids();
    short_ids.rebuild(EntityPrefix::Drft, records.iter().map(|r| &r.draft.id));
    if let Err(e) = short_ids.save(&workspace.project) {
        tracing::warn!(error = %e, "could not save short id index");
    }

    let format = global
        .format
        .resolve(workspace.config.default_format.as_deref(), OutputFormat::Tsv);
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&records).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            println!("short_id,id,title,step,progress,finalized,saved_at");
            for record in &records {
                println!(
                    "{},{},{},{},{},{},{}",
                    short_ids.alias(&record.draft.id),
                    record.draft.id,
                    escape_csv(record.draft.title()),
                    record.draft.current_step,
                    record.draft.progress(),
                    record.is_finalized(),
                    record.saved_at.to_rfc3339()
                );
            }
        }
        OutputFormat::Id => {
            for record in &records {
                println!("{}", record.draft.id);
            }
        }
        OutputFormat::Md => {
            println!("| Short | Title | Step | Progress |");
            println!("|---|---|---|---|");
            for record in &records {
                println!(
                    "| {} | {} | {} | {}% |",
                    short_ids.alias(&record.draft.id),
                    record.draft.title(),
                    record.draft.current_step.label(),
                    record.draft.progress()
                );
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<8} {:<28} {:<22} {:<6} {}",
                style("SHORT").bold().dim(),
                style("TITLE").bold(),
                style("STEP").bold(),
                style("DONE").bold(),
                style("SAVED").bold()
            );
            println!("{}", "-".repeat(80));
            for record in &records {
                let marker = if record.is_finalized() { " (finalized)" } else { "" };
                println!(
                    "{:<8} {:<28} {:<22} {:<6} {}{}",
                    style(short_ids.alias(&record.draft.id)).cyan(),
                    truncate_str(record.draft.title(), 26),
                    record.draft.current_step.label(),
                    format!("{}%", record.draft.progress()),
                    record.saved_at.format("%Y-%m-%d %H:%M"),
                    marker
                );
            }
            println!();
            println!(
                "{} draft(s) found. Use {} to reference by short ID.",
                style(records.len()).cyan(),
                style("DRFT@N").cyan()
            );
        }
    }
    Ok(())
}

fn run_discard(workspace: &Workspace, args: DraftArgs, global: &GlobalOpts) -> Result<()> {
    let id = workspace.resolve_draft(&args.id)?;
    workspace.drafts.discard(&id).map_err(miette::Report::new)?;
    if !global.quiet {
        println!("{} Discarded draft {}", style("✓").green(), style(&id.to_string()).cyan());
    }
    Ok(())
}

fn run_import_units(workspace: &Workspace, args: ImportUnitsArgs, global: &GlobalOpts) -> Result<()> {
    let id = workspace.resolve_draft(&args.id)?;
    let mut controller = WizardController::resume(
        workspace.services(),
        workspace.config.preferences(),
        &id,
    )
    .map_err(miette::Report::new)?;

    if controller.current_step() != WizardStep::StructuralDetails {
        return Err(miette::miette!(
            "Units can only be imported at {} (draft is at {})",
            WizardStep::StructuralDetails.label(),
            controller.current_step().label()
        ));
    }

    let mut data = StepData::new();
    data.values = assignments_to_values(&args.set);
    let rows = read_unit_rows(&args.file, data)?;
    let imported = rows.unit_edits.len();

    let to = controller.advance(rows).map_err(miette::Report::new)?;
    warn_snapshot(&controller);
    if !global.quiet {
        println!(
            "{} Imported {} unit row(s); draft is now at {}",
            style("✓").green(),
            style(imported).cyan(),
            style(to.label()).yellow()
        );
    }
    Ok(())
}

/// Read a rent roll into unit edits
///
/// The `unit` column holds the 1-based door number; other headers must be
/// unit fields. Blank cells are left out.
fn read_unit_rows(path: &Path, mut data: StepData) -> Result<StepData> {
    let file = File::open(path).into_diagnostic()?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = rdr
        .headers()
        .into_diagnostic()?
        .iter()
        .map(|h| h.to_lowercase().replace(' ', "_"))
        .collect();
    let unit_col = headers
        .iter()
        .position(|h| h == "unit")
        .ok_or_else(|| miette::miette!("CSV needs a 'unit' column with door numbers"))?;
    if let Some(unknown) = headers
        .iter()
        .find(|h| *h != "unit" && !UNIT_FIELDS.contains(&h.as_str()))
    {
        return Err(miette::miette!(
            "Unknown column '{}' (expected: unit, {})",
            unknown,
            UNIT_FIELDS.join(", ")
        ));
    }

    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2; // 1-indexed plus header row
        let record =
            result.map_err(|e| miette::miette!("CSV parse error at row {}: {}", row_num, e))?;

        let number: u32 = record
            .get(unit_col)
            .and_then(|n| n.parse().ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| miette::miette!("Row {}: 'unit' must be a door number", row_num))?;

        for (header, value) in headers.iter().zip(record.iter()) {
            if header == "unit" || value.is_empty() {
                continue;
            }
            data = data.with_unit(number, header, value);
        }
    }
    Ok(data)
}

/// Assign a short id to the controller's draft and return its alias
fn remember_draft(workspace: &Workspace, controller: &WizardController<'_>) -> String {
    let mut short_ids = workspace.short_ids();
    short_ids.add(&controller.draft().id);
    if let Err(e) = short_ids.save(&workspace.project) {
        tracing::warn!(error = %e, "could not save short id index");
    }
    short_ids.alias(&controller.draft().id)
}

fn report_created(workspace: &Workspace, property: &Property, global: &GlobalOpts) -> Result<()> {
    let mut short_ids = workspace.short_ids();
    short_ids.add(&property.id);
    if let Err(e) = short_ids.save(&workspace.project) {
        tracing::warn!(error = %e, "could not save short id index");
    }

    if global.quiet {
        println!("{}", property.id);
        return Ok(());
    }
    println!(
        "{} Created property {} ({})",
        style("✓").green(),
        style(short_ids.alias(&property.id)).cyan(),
        style(&property.details.nickname).yellow()
    );
    println!(
        "   {} door(s) at {}",
        property.details.door_count, property.details.display_address
    );

    if workspace.config.preferences().show_pricing_preview {
        print_pricing_preview(workspace)?;
    }
    Ok(())
}

/// Surface a failed draft snapshot without stopping the wizard
fn warn_snapshot(controller: &WizardController<'_>) {
    if let Some(e) = controller.last_snapshot_error() {
        eprintln!(
            "{} Progress could not be saved ({}); finishing now still works",
            style("!").yellow(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_unit_rows() {
        let file = csv_file(
            "unit,occupancy,monthly_rent,tenant_name\n1,tenant_occupied,\"1,250\",Grace\n2,vacant,,\n",
        );
        let data = read_unit_rows(file.path(), StepData::new()).unwrap();
        assert_eq!(data.unit_edits.len(), 2);
        assert_eq!(data.unit_edits[0].values.len(), 3);
        assert_eq!(data.unit_edits[0].values["monthly_rent"], "1,250");
        assert_eq!(data.unit_edits[1].values.len(), 1);
    }

    #[test]
    fn test_read_unit_rows_rejects_unknown_column() {
        let file = csv_file("unit,pets\n1,yes\n");
        assert!(read_unit_rows(file.path(), StepData::new()).is_err());
    }

    #[test]
    fn test_read_unit_rows_needs_door_number() {
        let file = csv_file("unit,occupancy\nfront,vacant\n");
        assert!(read_unit_rows(file.path(), StepData::new()).is_err());
    }

    #[test]
    fn test_manual_address_from_set_values() {
        let args = AdvanceArgs {
            id: "@1".to_string(),
            set: vec![
                ("nickname".to_string(), "Oak".to_string()),
                ("street".to_string(), "12 Oak St".to_string()),
                ("city".to_string(), "Austin".to_string()),
                ("state".to_string(), "TX".to_string()),
                ("postal_code".to_string(), "78701".to_string()),
            ],
            unit: Vec::new(),
            address: None,
            manual: true,
        };
        let data = step_data(&args).unwrap();
        assert_eq!(data.values.len(), 1);
        match data.address {
            Some(AddressInput::Manual(manual)) => {
                assert_eq!(manual.street, "12 Oak St");
                assert_eq!(manual.unit, None);
            }
            other => panic!("expected manual address, got {:?}", other),
        }
    }
}
