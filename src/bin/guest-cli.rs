use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use guest_fetch::config::loader::load_or_default;
use guest_fetch::lifecycle::{Services, Shutdown};
use guest_fetch::observability::logging;

#[derive(Parser)]
#[command(name = "guest-cli")]
#[command(about = "One-off lookups against the guest API", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Route the fetch through the configured accelerator
    #[arg(long)]
    accelerator: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a user profile by screen name
    User { screen_name: String },
    /// Look up a status through syndication
    Status { id: String },
    /// Fetch any guest API URL, accepting any non-empty JSON object
    Fetch { url: String },
}

fn accepts_non_empty_object(body: &Value) -> bool {
    body.as_object().map_or(false, |map| !map.is_empty())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;
    logging::init(&config.observability);

    let shutdown = Shutdown::new();
    let services = Services::build(&config, shutdown.subscribe())?;
    let use_accelerator = cli.accelerator && services.platform.fetcher().has_accelerator();
    if cli.accelerator && !use_accelerator {
        eprintln!("Warning: no accelerator configured, fetching directly");
    }

    let body = match cli.command {
        Commands::User { screen_name } => {
            services.platform.fetch_user(&screen_name, use_accelerator).await?
        }
        Commands::Status { id } => services.platform.fetch_status(&id).await?,
        Commands::Fetch { url } => {
            services
                .platform
                .fetcher()
                .fetch(&url, use_accelerator, accepts_non_empty_object)
                .await
        }
    };

    services.maintenance.flush().await;

    if body.as_object().map_or(false, |map| map.is_empty()) {
        eprintln!("Error: upstream denied every attempt, try again later");
        std::process::exit(1);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
