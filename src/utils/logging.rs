//! Tracing subscriber setup for the binary

use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter};

/// Install a stderr subscriber. `RUST_LOG` wins over the verbosity flag.
///
/// Stage spans log on entry and on close, so `-v` traces every fit and
/// transform call.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("featagg={}", default_level)));

    // Ignore the error raised when a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
        )
        .with(filter)
        .try_init();
}
