use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use travel_recommend::{
    api::{serve, AppState},
    catalog::{CatalogSource, JsonFileSource},
    config::Config,
    links::LinkGenerator,
    recommend::Recommender,
    registry::CityRegistry,
};

#[derive(Parser)]
#[command(name = "travel-recommend", version, about = "Travel destination recommendation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Check the destination dataset against the city registry
    Validate {
        /// Data directory, overrides DATA_DIR
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

async fn validate(config: &Config, registry: &CityRegistry, data_dir: PathBuf) -> Result<bool> {
    let source = JsonFileSource::new(data_dir);
    let catalog = source
        .load()
        .await
        .with_context(|| format!("loading {}", source.describe()))?;
    let report = catalog.validate(registry);

    println!(
        "Checked {} destinations against {} registry cities (default origin {})",
        catalog.destinations.len(),
        registry.len(),
        config.provider.default_origin
    );
    for err in &report.errors {
        println!("ERROR   {err}");
    }
    for warning in &report.warnings {
        println!("WARNING {warning}");
    }
    println!(
        "{} error(s), {} warning(s)",
        report.errors.len(),
        report.warnings.len()
    );

    Ok(report.is_ok())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("reading configuration")?;
    let registry = config.load_registry().context("loading city registry")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Validate { data_dir } => {
            let data_dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            if !validate(&config, &registry, data_dir).await? {
                std::process::exit(1);
            }
        }
        Command::Serve => {
            if !config.ota_pid_configured {
                warn!(
                    pid = %config.provider.ota_pid,
                    "OTA_PID/CTRIP_PID not set, outbound links use the built-in affiliate id"
                );
            }

            let links = LinkGenerator::new(Arc::new(registry), config.provider.clone());
            let source: Arc<dyn CatalogSource> = Arc::new(JsonFileSource::new(&config.data_dir));
            let state = AppState::load(Recommender::new(links), source)
                .await
                .context("loading catalog")?;

            info!("Starting server...");
            serve(state, config.port).await.context("running server")?;
        }
    }

    Ok(())
}
