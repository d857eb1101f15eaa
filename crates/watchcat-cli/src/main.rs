mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{state::StateSubcommand, watch::WatchArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "watchcat",
    about = "Watch GitHub repositories for new releases, commits, issues, pull requests and tags",
    version,
    propagate_version = true
)]
struct Cli {
    /// State database (default: ~/.config/watchcat/watchcat.db)
    #[arg(long, global = true, env = "WATCHCAT_DB")]
    db: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the configured repositories until interrupted
    #[command(visible_alias = "w")]
    Watch(WatchArgs),

    /// Run every check once and exit
    Check(WatchArgs),

    /// Inspect the stored last-seen markers
    State {
        #[command(subcommand)]
        subcommand: StateSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => tracing::Level::DEBUG,
        (Commands::Watch(_) | Commands::Check(_), false) => tracing::Level::INFO,
        (Commands::State { .. }, false) => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let db = cli.db.as_deref();
    let result = match cli.command {
        Commands::Watch(args) => cmd::watch::run_watch(db, args),
        Commands::Check(args) => cmd::watch::run_check(db, args),
        Commands::State { subcommand } => cmd::state::run(db, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
