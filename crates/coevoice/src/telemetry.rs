//! Tracing subscriber set-up.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the console subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, with debug output for the
/// coevoice crates when `verbose` is on.
pub fn init_console_telemetry(verbose: bool) {
    let default_filter = if verbose {
        "info,coevoice=debug,coevoice_core=debug,coevoice_discord=debug"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
