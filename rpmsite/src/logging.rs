//! Log output for the `rpmsite-*` binaries

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable holding the log filter (`error` .. `trace`)
pub const LOG_ENV: &str = "RPMSITE_LOG";

/// Install a compact stderr subscriber filtered by `RPMSITE_LOG`, `info` by
/// default. A second call is a no-op.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
