//! Prometheus recorder and the /metrics listener.

use axum::{Router, routing::get};
use metrics::{Unit, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::{net::SocketAddr, time::Duration};
use tokio::net::TcpListener;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone, Debug)]
pub struct Config {
    pub enable: bool,
    /// Separate listener for the scrape endpoint; None keeps the recorder
    /// without exposing it.
    pub http_listener: Option<SocketAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable: true,
            http_listener: Some(([0, 0, 0, 0], 9000).into()),
        }
    }
}

pub fn init(cfg: &Config) {
    if !cfg.enable {
        return;
    }

    if HANDLE.get().is_none() {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install metrics recorder");
        HANDLE.set(handle).ok();
    }

    if let Some(addr) = cfg.http_listener {
        tokio::spawn(async move {
            let router = router_with_metrics();
            // retry binding a few times in case of startup races (tests)
            let mut tries = 0;
            loop {
                match TcpListener::bind(addr).await {
                    Ok(l) => {
                        axum::serve(l, router).await.ok();
                        break;
                    }
                    Err(e) if tries < 5 => {
                        tries += 1;
                        tracing::warn!(error=%e, tries, "metrics listener bind failed; retrying");
                        tokio::time::sleep(Duration::from_millis(150)).await;
                    }
                    Err(e) => {
                        tracing::error!(error=%e, "metrics listener failed; giving up");
                        break;
                    }
                }
            }
        });
    }

    describe_metrics();
}

/// Axum handler that renders the current metrics snapshot.
pub async fn metrics_handler() -> String {
    HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# recorder not installed\n".into())
}

pub fn router_with_metrics() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub fn describe_metrics() {
    describe_counter!(
        "fluxgate_events_queued_total",
        Unit::Count,
        "Events accepted and handed to the broker client queue"
    );
    describe_counter!(
        "fluxgate_delivery_failures_total",
        Unit::Count,
        "Broker deliveries that failed after enqueue"
    );
    describe_counter!(
        "fluxgate_modifiers_appended_total",
        Unit::Count,
        "Directives committed to the modifier audit log"
    );
    describe_counter!(
        "fluxgate_catalog_mutations_total",
        Unit::Count,
        "Create/update/drop operations applied to the catalog"
    );
    describe_counter!(
        "fluxgate_offset_rewrites_total",
        Unit::Count,
        "Accepted consumer offset rewrite requests"
    );
    describe_counter!(
        "fluxgate_panics_total",
        Unit::Count,
        "Panics captured by the global hook"
    );
}
