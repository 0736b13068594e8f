//! Logging system demonstration
//!
//! Run with:
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_runtime=trace"
//! ```

use bridge_traits::logging::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[core_async::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug)
        .with_spans(true)
        .with_logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }));
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    if let Err(e) = init_logging(config) {
        eprintln!("Failed to initialize logging: {}", e);
        return;
    }

    info!("logging initialised");
    connect("3f9a1c", "https://edge.example/ctrl/v2?session-id=3f9a1c");
    evaluate_buffer(0.2, 0.0);
}

#[instrument(skip_all)]
fn connect(token: &str, base_url: &str) {
    info!(
        token = %redact_if_sensitive("token", token),
        base_url = %redact_if_sensitive("base_url", base_url),
        "session created"
    );
}

#[instrument]
fn evaluate_buffer(buffered_s: f64, scheduled_s: f64) {
    debug!("evaluating buffer");
    if buffered_s + scheduled_s < 0.5 {
        warn!(buffered_s, scheduled_s, "buffer below pre-buffer threshold");
    }
}
