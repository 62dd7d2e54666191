//! Process-wide tracing subscriber.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{NestError, Result};

/// Filter used when neither an explicit filter nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "warn";

/// Installs a stderr fmt subscriber.
///
/// `filter` takes precedence over `RUST_LOG`; with neither, [`DEFAULT_FILTER`] applies.
pub fn init_logging(filter: Option<&str>) -> Result<()> {
    let env_filter = match filter {
        Some(filter) => EnvFilter::try_new(filter)
            .map_err(|e| NestError::InvalidArgument(format!("Invalid log filter: {e}")))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| NestError::InvalidArgument("Logging already initialized".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_filter() {
        let err = init_logging(Some("nestql=loud")).expect_err("bad filter");
        assert!(err.to_string().contains("Invalid log filter"));
    }
}
