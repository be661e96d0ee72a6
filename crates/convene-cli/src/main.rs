use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod workspace;

#[derive(Parser)]
#[command(name = "convene", version, about = "Group availability and meeting-time optimizer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Event management
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Participant preferences
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// Rank the best meeting blocks of an event
    Optimize(commands::optimize::OptimizeArgs),
    /// Show an event's availability heatmap
    Heatmap(commands::heatmap::HeatmapArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so stdout stays machine-readable.
///
/// `RUST_LOG` selects the filter, default `warn`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = workspace::locked(|| match cli.command {
        Commands::Event { action } => commands::event::run(action),
        Commands::Prefs { action } => commands::prefs::run(action),
        Commands::Optimize(args) => commands::optimize::run(args),
        Commands::Heatmap(args) => commands::heatmap::run(args),
        Commands::Config { action } => commands::config::run(action),
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
