//! Operator tool for the shared key-value store: list, inspect and delete
//! keys, read leaderboards, and reset leaderboard windows.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use manga_reader::services::run_window_rollover;
use manga_reader::{
    AnalyticsService, KeyValueStore, LeaderboardPeriod, LeaderboardWindow, RedisConfig,
    RedisStore,
};

#[derive(Parser)]
#[command(name = "kv-admin")]
#[command(about = "Inspect the manga reader cache and manage view leaderboards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL")]
    redis_url: String,

    /// Per-command timeout in milliseconds
    #[arg(long, env = "REDIS_COMMAND_TIMEOUT_MS", default_value = "2000")]
    timeout_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List keys matching a glob pattern
    Keys {
        /// Pattern such as `cache:manga:*` or `views:page:*`
        #[arg(default_value = "*")]
        pattern: String,
    },

    /// Print the value stored at a key
    Get {
        key: String,
    },

    /// Delete a key
    Delete {
        key: String,
    },

    /// Show the most viewed manga
    Top {
        /// Leaderboard period (all, day, week, month)
        #[arg(short, long, default_value = "all")]
        period: LeaderboardPeriod,

        /// Number of entries
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Clear a windowed leaderboard and start a fresh window
    Reset {
        /// Window to reset (day, week, month)
        window: LeaderboardWindow,
    },

    /// Reset every window whose period has elapsed
    Rollover,

    /// Show the time left in each leaderboard window
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let redis_store = RedisStore::connect(&RedisConfig {
        url: cli.redis_url,
        command_timeout: Duration::from_millis(cli.timeout_ms),
    })
    .await?;
    let store: Arc<dyn KeyValueStore> = Arc::new(redis_store.clone());
    let analytics = AnalyticsService::new(store.clone());

    match cli.command {
        Commands::Keys { pattern } => {
            let keys = redis_store.scan_keys(&pattern).await?;
            for key in &keys {
                println!("{key}");
            }
            println!("({} keys)", keys.len());
        }

        Commands::Get { key } => match store.get(&key).await? {
            Some(value) => println!("{value}"),
            None => println!("(nil)"),
        },

        Commands::Delete { key } => {
            store.delete(&key).await?;
            println!("Deleted {key}");
        }

        Commands::Top { period, limit } => {
            let entries = analytics.get_top_manga(period, Some(limit)).await;
            if entries.is_empty() {
                println!("Leaderboard '{period}' is empty");
            }
            for (rank, entry) in entries.iter().enumerate() {
                println!("{:>3}. manga {:<8} {} views", rank + 1, entry.manga_id, entry.views);
            }
        }

        Commands::Reset { window } => {
            analytics.reset_window(window).await?;
            println!("Reset {window} leaderboard");
        }

        Commands::Rollover => {
            let reset = run_window_rollover(&analytics).await;
            if reset.is_empty() {
                println!("No window was due");
            }
            for window in reset {
                println!("Rolled over {window} leaderboard");
            }
        }

        Commands::Status => {
            for window in LeaderboardWindow::ALL {
                match analytics.window_remaining(window).await? {
                    Some(remaining) => println!(
                        "{window:<6} resets in {}h {}m",
                        remaining.as_secs() / 3600,
                        remaining.as_secs() % 3600 / 60
                    ),
                    None => println!("{window:<6} due for reset"),
                }
            }
        }
    }

    Ok(())
}
