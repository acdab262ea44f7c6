//! Telemetry and logging initialization.
//!
//! Logs go to stderr; stdout carries the JSON response stream.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging.
pub fn init_telemetry(log_level: &str, json_format: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_level)?;

    if json_format {
        // JSON format for production
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        // Pretty format for development
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_telemetry_rejects_bad_filter() {
        assert!(init_telemetry("quadvote=notalevel", false).is_err());
    }

    #[test]
    fn test_init_telemetry_twice_is_an_error_not_a_panic() {
        let first = init_telemetry("info", false);
        let second = init_telemetry("info", true);
        // Another test may have installed the subscriber first.
        assert!(first.is_err() || second.is_err());
    }
}
