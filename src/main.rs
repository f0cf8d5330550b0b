use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trcli::cli::{Cli, Commands, GlobalOpts};

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
    init_tracing(&global)?;

    match cli.command {
        Commands::Projects(cmd) => trcli::cli::commands::projects::run(cmd, &global),
        Commands::Cases(cmd) => trcli::cli::commands::cases::run(cmd, &global),
        Commands::Sections(cmd) => trcli::cli::commands::sections::run(cmd, &global),
        Commands::Suites(cmd) => trcli::cli::commands::suites::run(cmd, &global),
        Commands::Raw(args) => trcli::cli::commands::raw::run(args, &global),
        Commands::Config(cmd) => trcli::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => trcli::cli::commands::completions::run(args),
    }
}

/// Log to stderr; `TRCLI_LOG` overrides the level picked by --verbose/--quiet
fn init_tracing(global: &GlobalOpts) -> Result<()> {
    let default_level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("TRCLI_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| miette::miette!("Failed to initialize logging: {}", e))
}
