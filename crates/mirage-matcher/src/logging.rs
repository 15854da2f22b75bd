//! Subscriber setup for binaries embedding the matcher.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the host process.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Show diagnostics down to `debug`; otherwise only errors.
    pub verbose: bool,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl LogOptions {
    /// Filter used when `RUST_LOG` is not set.
    pub fn default_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "error"
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the verbosity.
pub fn init(options: LogOptions) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.default_level()));

    if options.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(LogOptions::default().default_level(), "error");
        assert_eq!(
            LogOptions {
                verbose: true,
                json: false
            }
            .default_level(),
            "debug"
        );
    }
}
