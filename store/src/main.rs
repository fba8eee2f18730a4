use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::Path;
use store::checkpoint::run_checkpoints;
use store::{LeaderboardError, LeaderboardStore, StoreConfig, Stores};
use tokio::time::Duration;

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the best entries of the leaderboard
    Top {
        /// Number of entries to print
        #[clap(short, default_value = "10")]
        n: usize,
    },
    /// Offer one score to the leaderboard and save it
    Add {
        #[clap(long)]
        id: u32,
        #[clap(long)]
        name: String,
        #[clap(long)]
        score: u32,
        /// Defaults to the current local time
        #[clap(long)]
        timestamp: Option<String>,
    },
    /// Host the stores and checkpoint the leaderboard until Ctrl+C
    Serve {
        /// Seconds between leaderboard checkpoints
        #[clap(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
        checkpoint_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Leaderboard file to load from and save to
        #[clap(short, long, default_value = "leaderboard.bin")]
        leaderboard: std::path::PathBuf,
        /// Capacity of the networked object table
        #[clap(long, default_value_t = shared::MAX_NETWORK_OBJECTS)]
        max_objects: usize,
        /// Capacity of the player table
        #[clap(long, default_value_t = shared::MAX_PLAYERS)]
        max_players: usize,
        /// Capacity of the leaderboard; must match the file being loaded
        #[clap(long, default_value_t = shared::MAX_LEADERBOARD_SCORES)]
        max_scores: usize,
        #[clap(subcommand)]
        command: Command,
    }

    env_logger::init();

    let args = Args::parse();
    let config = StoreConfig {
        max_objects: args.max_objects,
        max_players: args.max_players,
        max_scores: args.max_scores,
    };
    config.validate()?;
    let stores = Stores::new(&config);

    load_or_start_empty(&stores.leaderboard, &args.leaderboard)?;

    match args.command {
        Command::Top { n } => {
            for line in stores.leaderboard.top_players(n) {
                println!("{}", line);
            }
        }
        Command::Add {
            id,
            name,
            score,
            timestamp,
        } => {
            let timestamp = timestamp
                .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string());

            if stores.leaderboard.add_score(id, &name, score, &timestamp) {
                stores.leaderboard.save(&args.leaderboard)?;
                println!("Score {} for {} entered the leaderboard", score, name);
            } else {
                println!("Score {} for {} did not qualify", score, name);
            }
        }
        Command::Serve { checkpoint_secs } => {
            info!(
                "Hosting stores ({} objects, {} players, {} scores)",
                config.max_objects, config.max_players, config.max_scores
            );

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
                println!("Received Ctrl+C, shutting down gracefully...");
            };

            let completed = run_checkpoints(
                stores.leaderboard.clone(),
                args.leaderboard.clone(),
                Duration::from_secs(checkpoint_secs),
                shutdown,
            )
            .await?;
            info!("Wrote {} periodic checkpoints", completed);
        }
    }

    Ok(())
}

/// Loads the leaderboard, treating a missing file as an empty board
fn load_or_start_empty(
    leaderboard: &LeaderboardStore,
    path: &Path,
) -> Result<(), LeaderboardError> {
    match leaderboard.load(path) {
        Err(e) if e.is_not_found() => {
            info!("No leaderboard at {}, starting empty", path.display());
            Ok(())
        }
        result => result,
    }
}
