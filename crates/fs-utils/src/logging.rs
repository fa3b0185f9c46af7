//! Subscriber setup for binaries and tests that want to see the crate's
//! tracing output.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a global subscriber that prints compact lines to stdout.
///
/// The level comes from `RUST_LOG`, defaulting to `info`. Refused
/// deletions log at `warn`; directory creation and codec selection log at
/// `debug`.
///
/// # Errors
///
/// Fails if the filter does not parse or a global subscriber is already
/// set.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected() {
        // Another test may have installed the subscriber already.
        let _ = init();
        assert!(init().is_err());
        tracing::warn!(path = "x", "Cannot delete the current working directory");
    }
}
