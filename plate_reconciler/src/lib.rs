pub mod config;
pub mod error;
pub mod plate_reconciliation;

pub use config::{ConfigOverrides, ReconcileConfig};
pub use error::{ReconcileError, Result};

/// Installs the `tracing` subscriber used by the binaries; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("plate_reconciler=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
