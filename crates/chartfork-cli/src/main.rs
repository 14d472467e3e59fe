//! chartfork CLI - maintain forked Helm charts as an upstream plus replayable patches

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::exit;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod error;
mod exit_codes;

use error::Result;

#[derive(Parser)]
#[command(name = "chartfork")]
#[command(author = "chartfork Contributors")]
#[command(version)]
#[command(about = "Maintain forked Helm charts as an upstream plus replayable patches", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository root holding packages/
    #[arg(long, global = true, env = "CHARTFORK_ROOT", default_value = ".")]
    root: PathBuf,

    /// Only operate on this package (default: every package)
    #[arg(short, long, global = true, env = "PACKAGE")]
    package: Option<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull charts from upstream and apply their recorded changes
    Prepare,

    /// Record the edits made to prepared charts
    Patch,

    /// Undo main chart changes and remove prepared working directories
    Clean,

    /// Export prepared charts into assets/ and charts/
    Charts,

    /// List packages
    List,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry().with(layer).with(filter).init();
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.root.as_path();
    let package = cli.package.as_deref();

    match cli.command {
        Commands::Prepare => commands::prepare::run(root, package),
        Commands::Patch => commands::patch::run(root, package),
        Commands::Clean => commands::clean::run(root, package),
        Commands::Charts => commands::charts::run(root, package),
        Commands::List => commands::list::run(root),
    }
}

fn main() {
    // Setup miette for nice error display; paths in messages stay on one line
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().wrap_lines(false).build())
    }));
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        exit(code);
    }

    exit(exit_codes::SUCCESS)
}
