//! Log output setup
//!
//! Console logs go to stderr at `info` (or `debug` with `--verbose`), filtered
//! by `RUST_LOG`. With `--log-file`, every `debug` and higher event is also
//! written to that file without ANSI colours.

use crate::error::Result;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Build the subscriber; `log_file` receives the debug stream
pub fn subscriber(verbose: bool, log_file: Option<File>) -> impl Subscriber + Send + Sync {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env().add_directive(level.into()));

    let file = log_file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(LevelFilter::DEBUG)
    });

    tracing_subscriber::registry().with(console).with(file)
}

/// Install the global subscriber
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let file = log_file.map(File::create).transpose()?;
    tracing::subscriber::set_global_default(subscriber(verbose, file))
        .map_err(|e| crate::error::Error::config(format!("Failed to install logger: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, trace};

    #[test]
    fn test_log_file_receives_debug_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.log");
        let file = File::create(&path).unwrap();

        tracing::subscriber::with_default(subscriber(false, Some(file)), || {
            debug!("Page: 3 of url: http://x read");
            trace!("too fine for the file");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("DEBUG"));
        assert!(contents.contains("Page: 3 of url: http://x read"));
        assert!(!contents.contains("too fine for the file"));
    }
}
