use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use nourish_rs::nourish::config::AppConfig;
use nourish_rs::nourish::server;
use nourish_rs::nourish::workflow::state::{HealthData, UserProfile};
use nourish_rs::nourish::workflow::{build_workflow, SharedState};

use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API and static front end
    Serve {
        /// Port to listen on (defaults to NOURISH_PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Analyze one journal entry and print the response
    Analyze {
        /// The journal text
        #[arg(short, long)]
        journal: String,

        /// JSON file with the user profile
        #[arg(long)]
        profile: Option<PathBuf>,

        /// JSON file with health data
        #[arg(long)]
        health: Option<PathBuf>,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let engine = Arc::new(build_workflow(
        config.create_model()?,
        config.create_safety_filter()?,
        config.generation_config(),
    )?);

    match args.command {
        Commands::Serve { port } => {
            tracing::subscriber::set_global_default(tracing_subscriber::fmt().finish())
                .context("installing tracing subscriber")?;

            let port = port.unwrap_or(config.port);
            let static_dir = Some(config.static_dir.clone()).filter(|dir| dir.is_dir());
            if static_dir.is_none() {
                log::warn!(
                    "Static directory {} not found, serving the API only",
                    config.static_dir.display()
                );
            }

            println!("Starting Nutrition Assistant on http://localhost:{}", port);
            server::serve(engine, port, static_dir).await?;
        }
        Commands::Analyze {
            journal,
            profile,
            health,
        } => {
            let mut state = SharedState::for_journal(journal);
            if let Some(path) = profile {
                state = state.with_profile(read_json::<UserProfile>(&path)?);
            }
            if let Some(path) = health {
                state = state.with_health(read_json::<HealthData>(&path)?);
            }

            let result = engine.invoke(state).await?;
            println!("{}", result.last_message().content);
        }
    }

    Ok(())
}
