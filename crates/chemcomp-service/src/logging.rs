use std::io::IsTerminal;

use tracing_subscriber::fmt::fmt;
use tracing_subscriber::fmt::time::UtcTime;

use crate::config::{LogFormat, Logging};

/// Initializes logging for the service.
///
/// An explicit `RUST_LOG` environment variable takes precedence over the
/// configured level.
pub fn init_logging(config: &Logging) {
    if config.enable_backtraces {
        // SAFETY: called once during startup, before any worker threads exist.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.to_string());

    let format = match config.format {
        LogFormat::Auto if std::io::stdout().is_terminal() => LogFormat::Pretty,
        LogFormat::Auto => LogFormat::Simplified,
        other => other,
    };

    let subscriber = fmt()
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_env_filter(filter);

    match format {
        LogFormat::Auto => unreachable!(),
        LogFormat::Pretty => subscriber.pretty().init(),
        LogFormat::Simplified => subscriber.with_ansi(false).init(),
        LogFormat::Json => subscriber
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .with_file(true)
            .with_line_number(true)
            .init(),
    }
}
