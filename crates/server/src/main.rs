use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use fluxgate_broker::{KafkaOffsetStore, KafkaPublisher};
use fluxgate_catalog::RestCatalog;
use fluxgate_config::{load_cfg, ServiceConfig};
use fluxgate_modifier_store::SqliteModifierStore;
use fluxgate_server::build_router;

#[derive(Parser, Debug)]
struct Args {
    /// YAML config file. Without it the environment is used.
    #[arg(short, long)]
    config: Option<String>,

    /// Log as pretty text instead of JSON lines.
    #[arg(long)]
    pretty_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    fluxgate_o11y::init_all(&fluxgate_o11y::O11yConfig {
        logging: fluxgate_o11y::logging::Config {
            filter: None,
            json: !args.pretty_logs,
        },
        metrics: fluxgate_o11y::metrics::Config::default(),
    });

    let cfg = match &args.config {
        Some(path) => load_cfg(path)?,
        None => ServiceConfig::from_env().context("reading environment")?,
    };

    let store = Arc::new(
        SqliteModifierStore::new(&cfg.modifier_store.path)
            .context("opening modifier store")?,
    );
    let catalog = Arc::new(RestCatalog::new(&cfg.catalog.uri)?);
    let publisher = Arc::new(KafkaPublisher::new(&cfg.kafka)?);
    let offsets = Arc::new(KafkaOffsetStore::new(&cfg.kafka)?);

    let app = build_router(publisher, store, catalog, offsets)
        .merge(fluxgate_o11y::metrics::router_with_metrics());

    let addr = cfg.listen.socket_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, topic = %cfg.kafka.topic, "fluxgate listening");

    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
