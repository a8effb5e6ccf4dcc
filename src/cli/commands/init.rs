//! `doorway init` command - Initialize a new Doorway workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::identity::EntityPrefix;
use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Rewrite the workspace config even if .doorway/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized Doorway workspace at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created workspace structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Onboard your first property",
                style("doorway onboard start").yellow()
            );
            println!(
                "  {} See what each tier costs",
                style("doorway pricing tiers").yellow()
            );
            println!(
                "  {} Set your name on new properties",
                style("doorway config set author \"Your Name\"").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} Doorway workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            if let Ok(existing) = Project::open(&path) {
                println!(
                    "  {} draft(s), {} propert(ies)",
                    existing.iter_entity_files(EntityPrefix::Drft).count(),
                    existing.iter_entity_files(EntityPrefix::Prop).count()
                );
            }
            println!();
            println!(
                "Use {} to rewrite its config",
                style("doorway init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let entries = [
        ".doorway/",
        ".doorway/config.yaml",
        ".doorway/drafts/",
        ".doorway/properties/",
    ];
    for entry in entries {
        println!("  {}", style(root.join(entry).display()).dim());
    }
}
