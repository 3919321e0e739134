//! Global tracing setup.

use std::sync::Once;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt,
};

static INIT: Once = Once::new();

#[derive(Clone, Debug)]
pub struct Config {
    /// A level like "info" or a full EnvFilter spec such as
    /// "info,fluxgate=debug,rdkafka=warn". `RUST_LOG` wins when set.
    pub filter: Option<String>,
    /// JSON lines when true, pretty text otherwise.
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter: Some("info".to_owned()),
            json: true,
        }
    }
}

fn build_filter(cfg: &Config) -> EnvFilter {
    let fallback = cfg.filter.clone().unwrap_or_else(|| "info".into());
    EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Safe to call more than once; only the
/// first call takes effect, which keeps test binaries quiet.
pub fn init(cfg: &Config) {
    INIT.call_once(|| {
        // route log-crate records (rdkafka uses log) into tracing
        let _ = LogTracer::init();

        let fmt_layer = if cfg.json {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .boxed()
        } else {
            fmt::layer().with_ansi(true).boxed()
        };

        let subscriber =
            Registry::default().with(build_filter(cfg)).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
            .expect("failed to set global tracing subscriber");
    });
}
