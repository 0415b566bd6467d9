//! Log subscriber setup
//!
//! `SONDEO_LOG` takes `EnvFilter` directives (e.g. `sondeo=debug`) and wins
//! over the level derived from `-v`/`-q`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Verbosity;

/// Environment variable holding filter directives
pub const LOG_ENV: &str = "SONDEO_LOG";

/// Filter from `SONDEO_LOG`, or from the verbosity when unset or invalid
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(verbosity.log_level()))
}

/// Install the global subscriber, writing to stderr; later calls are no-ops
pub fn init(verbosity: Verbosity) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbosity.is_debug()))
        .with(env_filter(verbosity))
        .try_init();
}
