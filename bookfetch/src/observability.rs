//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at `info`, or at
/// `debug` when `verbose` is set. Calling this more than once is harmless.
/// Returns whether this call installed the subscriber.
pub fn init_tracing(verbose: bool, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.is_ok()
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "bookfetch=debug"
    } else {
        "bookfetch=info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(true), "bookfetch=debug");
        assert_eq!(default_directive(false), "bookfetch=info");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_tracing(false, false);
        assert!(!init_tracing(true, true));
    }
}
