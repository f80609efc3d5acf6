//! Installs the global `tracing` subscriber.

use crate::options::Options;
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

/// Installs a `fmt` subscriber, at DEBUG level when `debug` is set and INFO otherwise.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(debug: bool) -> Result<(), SetGlobalDefaultError> {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// [`init_tracing`] with the level taken from `http.debug`.
pub fn init_from_options(options: &Options) -> Result<(), SetGlobalDefaultError> {
    init_tracing(options.http.debug)
}
