//! Observability wiring: logging, metrics, panic capture.

pub mod logging;
pub mod metrics;
pub mod panic;

#[derive(Clone, Debug, Default)]
pub struct O11yConfig {
    pub logging: logging::Config,
    pub metrics: metrics::Config,
}

/// One-call init for binaries. Each piece is idempotent on its own, so
/// calling this twice (tests) is harmless.
pub fn init_all(cfg: &O11yConfig) {
    logging::init(&cfg.logging);
    metrics::init(&cfg.metrics);
    panic::install_hook();
}
