use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "gapfit-cli", version, about = "GapFit CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full scan and print gaps plus the notification decision
    Scan(commands::scan::ScanArgs),
    /// Detect and classify gaps only, no notification evaluation
    Gaps(commands::scan::GapsArgs),
    /// Notification policy management
    Policy {
        #[command(subcommand)]
        action: commands::policy::PolicyAction,
    },
    /// Notification history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Scan(args) => commands::scan::run_scan(args),
        Commands::Gaps(args) => commands::scan::run_gaps(args),
        Commands::Policy { action } => commands::policy::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
