//! examkit CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "examkit", version, about = "Tier-balanced timed quiz engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a timed 24-question test
    Take {
        /// Question bank JSON file (defaults to the configured path)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// User identity; omit for guest mode (no rotation, no saving)
        #[arg(long)]
        user: Option<String>,

        /// Test duration in minutes
        #[arg(long)]
        duration_mins: Option<u64>,

        /// Seed for deterministic question selection
        #[arg(long)]
        seed: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List or delete past results
    History {
        /// User identity
        #[arg(long)]
        user: String,

        /// Delete the record with this ID instead of listing
        #[arg(long)]
        delete: Option<Uuid>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List, add, or remove favorited questions
    Favorites {
        /// User identity
        #[arg(long)]
        user: String,

        /// Favorite this question ID
        #[arg(long)]
        add: Option<String>,

        /// Unfavorite this question ID
        #[arg(long)]
        remove: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a question bank JSON file
    Validate {
        /// Path to the bank file
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and sample question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examkit=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            bank,
            user,
            duration_mins,
            seed,
            config,
        } => commands::take::execute(bank, user, duration_mins, seed, config).await,
        Commands::History {
            user,
            delete,
            config,
        } => commands::history::execute(user, delete, config).await,
        Commands::Favorites {
            user,
            add,
            remove,
            config,
        } => commands::favorites::execute(user, add, remove, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
