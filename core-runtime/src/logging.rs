//! # Logging
//!
//! One global `tracing` subscriber for the player core. It combines:
//! - a formatting layer writing to stdout (pretty, JSON or compact),
//! - a filter that holds foreign crates at `warn`,
//! - an optional [`LoggerSink`] mirror for the host's own log pipeline.
//!
//! Session tokens travel through the control plane on every request, so
//! values forwarded to the sink go through [`redact_if_sensitive`]. Call
//! sites that log endpoints redact explicitly as well, since the formatting
//! layer prints fields as given.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::logging::{ConsoleLogger, LogLevel};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(ConsoleLogger::default()));
//! init_logging(config)?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};
use core_async::runtime;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::error::{Error, Result};

/// Crates logged at the configured level.
const PLAYER_CRATES: &[&str] = &[
    "ybrid_player",
    "core_async",
    "core_runtime",
    "core_playback",
    "core_session",
    "bridge_traits",
];

/// Field names whose values never leave the process in clear text.
const SECRET_FIELDS: &[&str] = &["token", "session_id", "secret", "password", "authorization"];

const REDACTED: &str = "[REDACTED]";

/// Output format of the stdout layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for the player crates. Dependencies stay at `warn`.
    pub level: LogLevel,
    /// Full `EnvFilter` directive, overriding `level`.
    pub filter: Option<String>,
    pub redact: bool,
    /// Log span activity (pretty) or the span list (JSON).
    pub spans: bool,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            redact: true,
            spans: false,
            logger_sink: None,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("redact", &self.redact)
            .field("spans", &self.spans)
            .field("logger_sink", &self.logger_sink.is_some())
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = Some(directive.into());
        self
    }

    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    pub fn with_spans(mut self, spans: bool) -> Self {
        self.spans = spans;
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    fn directive(&self) -> String {
        match &self.filter {
            Some(custom) => custom.clone(),
            None => {
                let level = self.level.as_str().to_lowercase();
                std::iter::once("warn".to_string())
                    .chain(PLAYER_CRATES.iter().map(|krate| format!("{}={}", krate, level)))
                    .collect::<Vec<_>>()
                    .join(",")
            }
        }
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// # Errors
///
/// [`Error::Config`] for an invalid filter directive, or when a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = env_filter(&config)?;
    let sink = SinkLayer::new(config.logger_sink.clone(), config.redact);

    tracing_subscriber::registry()
        .with(stdout_layer(&config))
        .with(sink)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directive = config.directive();
    EnvFilter::try_new(&directive)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

fn stdout_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);
    match config.format {
        LogFormat::Pretty => {
            let spans = if config.spans {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            };
            base.pretty().with_span_events(spans).boxed()
        }
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.spans)
            .with_span_list(config.spans)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

/// Mirrors events into the host [`LoggerSink`].
pub(crate) struct SinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
    redact: bool,
}

impl SinkLayer {
    pub(crate) fn new(sink: Option<Arc<dyn LoggerSink>>, redact: bool) -> Self {
        Self { sink, redact }
    }

    fn forward(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
        let deliver = async move {
            if let Err(err) = sink.log(entry).await {
                eprintln!("LoggerSink error: {}", err);
            }
        };
        match runtime::current_handle() {
            Some(handle) => {
                handle.spawn(deliver);
            }
            None => runtime::block_on(deliver),
        }
    }
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let meta = event.metadata();
        let level = log_level(meta.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector {
            redact: self.redact,
            message: None,
            fields: BTreeMap::new(),
        };
        event.record(&mut fields);

        let message = fields.message.unwrap_or_else(|| meta.name().to_string());
        let mut entry = LogEntry::new(level, meta.target(), message);
        entry.fields = fields.fields;
        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span(span.name());
        }
        Self::forward(Arc::clone(sink), entry);
    }
}

struct FieldCollector {
    redact: bool,
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: String) {
        let name = field.name();
        if name == "message" {
            self.message = Some(value);
        } else if self.redact {
            self.fields
                .insert(name.to_string(), redact_if_sensitive(name, &value));
        } else {
            self.fields.insert(name.to_string(), value);
        }
    }
}

// Every other primitive falls back to `record_debug`, which renders numbers
// and bools the same way `to_string` would.
impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

fn log_level(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// Returns `value` fit for logging under `field_name`.
///
/// Secrets (see the field list above) are replaced entirely. URLs lose their
/// query string, where control endpoints carry the session id.
///
/// ```ignore
/// debug!(token = %redact_if_sensitive("token", &endpoint.token), "session created");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let name = field_name.to_lowercase();
    if SECRET_FIELDS.iter().any(|secret| name.contains(secret)) {
        return REDACTED.to_string();
    }
    match value.split_once('?') {
        Some((base, _)) if base.contains("://") => format!("{}?{}", base, REDACTED),
        _ => value.to_string(),
    }
}
