//! Shared utilities for CLI commands

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::address::OfflineAddressResolver;
use crate::core::config::Config;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::loader;
use crate::core::project::Project;
use crate::core::records::{NoEnrichment, RecordEnricher, RecordFileEnricher};
use crate::core::repository::{FilePropertyStore, PropertyRepository};
use crate::core::shortid::ShortIdIndex;
use crate::core::subscription::FileSubscription;
use crate::pricing::{engine, TierId, TierTable};
use crate::wizard::draft_store::FileDraftStore;
use crate::wizard::WizardServices;

/// Find the workspace named by `--workspace`, or walk up from the current directory
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    let project = match &global.workspace {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

/// An opened workspace with its file-backed collaborators
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub drafts: FileDraftStore,
    pub properties: FilePropertyStore,
    addresses: OfflineAddressResolver,
    records: Box<dyn RecordEnricher>,
}

impl Workspace {
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = open_project(global)?;
        let config = Config::load_for(Some(&project));

        let records_path = project.records_path();
        let records: Box<dyn RecordEnricher> = if records_path.exists() {
            Box::new(RecordFileEnricher::new(records_path))
        } else {
            Box::new(NoEnrichment)
        };

        Ok(Self {
            drafts: FileDraftStore::for_project(&project),
            properties: FilePropertyStore::for_project(&project),
            addresses: OfflineAddressResolver,
            records,
            config,
            project,
        })
    }

    /// Collaborators for a wizard session
    pub fn services(&self) -> WizardServices<'_> {
        WizardServices {
            drafts: &self.drafts,
            addresses: &self.addresses,
            records: self.records.as_ref(),
            properties: &self.properties,
        }
    }

    /// Workspace tier table, or the built-in one
    pub fn tier_table(&self) -> Result<TierTable> {
        TierTable::load(&self.project.tiers_path()).map_err(miette::Report::new)
    }

    /// Subscription record, starting on the configured tier or the lowest one
    pub fn subscription(&self, table: &TierTable) -> FileSubscription {
        let default_tier = self
            .config
            .tier
            .as_deref()
            .map(TierId::new)
            .filter(|id| table.get(id).is_some())
            .unwrap_or_else(|| table.lowest().id.clone());
        FileSubscription::new(self.project.subscription_path(), default_tier)
    }

    /// Doors across every created property
    pub fn doors_in_use(&self) -> Result<u32> {
        self.properties.total_doors().map_err(miette::Report::new)
    }

    pub fn short_ids(&self) -> ShortIdIndex {
        ShortIdIndex::load(&self.project)
    }

    /// Resolve `DRFT@N`, `@N`, `N`, or a full/partial draft id
    pub fn resolve_draft(&self, reference: &str) -> Result<EntityId> {
        self.resolve(EntityPrefix::Drft, reference, &self.project.drafts_dir())
    }

    /// Resolve `PROP@N`, `@N`, `N`, or a full/partial property id
    pub fn resolve_property(&self, reference: &str) -> Result<EntityId> {
        self.resolve(EntityPrefix::Prop, reference, &self.project.properties_dir())
    }

    fn resolve(&self, prefix: EntityPrefix, reference: &str, dir: &Path) -> Result<EntityId> {
        let resolved = self.short_ids().resolve(prefix, reference).ok_or_else(|| {
            miette::miette!(
                "'{}' is not a known {} alias; list them first to refresh aliases",
                reference,
                prefix
            )
        })?;

        if let Ok(id) = EntityId::parse(&resolved) {
            if id.prefix() == prefix {
                return Ok(id);
            }
        }

        let path = loader::find_entity_file(dir, &resolved)
            .ok_or_else(|| miette::miette!("No {} found matching '{}'", prefix, reference))?;
        let stem = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.split('.').next())
            .unwrap_or_default();
        match EntityPrefix::from_filename(stem) {
            Some(p) if p == prefix => EntityId::parse(stem).into_diagnostic(),
            _ => Err(miette::miette!("No {} found matching '{}'", prefix, reference)),
        }
    }
}

/// Monthly cost line shown after a property is created or deleted
pub fn print_pricing_preview(workspace: &Workspace) -> Result<()> {
    let table = workspace.tier_table()?;
    let doors = workspace.doors_in_use()?;
    let tier = engine::recommended_tier(&table, doors);
    let quote = engine::quote(tier, doors);

    println!();
    println!(
        "{} {} door(s) in this workspace fit the {} tier: {}/month ({}/year)",
        style("$").cyan(),
        style(doors).cyan(),
        style(&tier.display_name).yellow(),
        style(engine::format_usd(quote.monthly_cents)).green(),
        engine::format_usd(quote.annual_cents)
    );
    println!(
        "   {}",
        style("Run `doorway pricing compare` to see every tier.").dim()
    );
    Ok(())
}
