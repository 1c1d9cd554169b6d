use clap::Parser;
use mimalloc::MiMalloc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulso::app::Application;
use pulso::app::manager::AppRegistry;
use pulso::error::Result;
use pulso::options::ServerOptions;
use pulso::server;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "pulso", version, about)]
struct Cli {
    /// Path to the configuration descriptor.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let options = ServerOptions::load(&cli.config)?;

    let registry = Arc::new(AppRegistry::new());
    for app_config in &options.apps {
        info!(app_id = %app_config.id, name = %app_config.name, "registering application");
        registry.add_app(Arc::new(Application::new(app_config.clone())?));
    }

    server::run(options, registry).await
}
