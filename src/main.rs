use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use taar_profile::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "taar-profile",
    about = "Read and write TAAR client profiles"
)]
struct Cli {
    /// Config file; defaults to an optional `taar-profile.{toml,yaml,json}`.
    #[arg(long, env = "TAAR_PROFILE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the normalized profile of each client as one JSON line (`null` if absent).
    Get {
        #[arg(required = true)]
        client_ids: Vec<String>,
    },
    /// Store a raw profile record read from a JSON file.
    Put { record: PathBuf },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref(), None)?;

    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.as_str())
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let fetcher = config.fetcher()?;

    match cli.command {
        Command::Get { client_ids } => {
            for client_id in client_ids {
                let profile = fetcher.get(&client_id)?;
                println!("{}", serde_json::to_string(&profile)?);
            }
        }
        Command::Put { record } => {
            let text = fs::read_to_string(&record)
                .with_context(|| format!("reading {}", record.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", record.display()))?;
            let Some(record) = value.as_object() else {
                bail!("profile record must be a JSON object");
            };
            fetcher.put(record)?;
            tracing::info!("profile stored");
        }
    }

    Ok(())
}
