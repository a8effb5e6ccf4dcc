use clap::Parser;
use doorway::cli::{Cli, Commands, GlobalOpts};
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "DOORWAY_LOG";

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Init(args) => doorway::cli::commands::init::run(args),
        Commands::Onboard(cmd) => doorway::cli::commands::onboard::run(cmd, &global),
        Commands::Property(cmd) => doorway::cli::commands::property::run(cmd, &global),
        Commands::Pricing(cmd) => doorway::cli::commands::pricing::run(cmd, &global),
        Commands::Tier(cmd) => doorway::cli::commands::tier::run(cmd, &global),
        Commands::Config(cmd) => doorway::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => doorway::cli::commands::completions::run(args),
    }
}

/// Log to stderr so command output stays pipeable
fn init_logging(global: &GlobalOpts) {
    let default = if global.verbose { "doorway=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
