use anyhow::Context;
use clap::Parser;
use collecthub_api::Server;
use collecthub_core::ConfigManager;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "collecthub-api",
    version,
    about = "CollectHub API server - personal collections and AI personality analysis"
)]
struct Cli {
    /// Directory holding default.toml, <env>.toml and local.toml
    #[arg(long, value_name = "DIR", env = "COLLECTHUB_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Environment name selecting the <env>.toml overlay
    #[arg(long)]
    env: Option<String>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ConfigManager::load(cli.config_dir, cli.env)?;
    {
        let settings = config.settings_mut();
        if let Some(host) = cli.host {
            settings.server.host = host;
        }
        if let Some(port) = cli.port {
            settings.server.port = port;
        }
        settings.validate()?;
    }

    let level = config.settings().logging.level.clone();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "collecthub_api={0},collecthub_ai={0},collecthub_core={0},tower_http={0}",
                level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server = Server::new(Arc::new(config))
        .await
        .context("initializing server")?;
    server.run().await.context("running server")?;
    Ok(())
}
