//! Integration tests for the logging and event infrastructure

use bridge_traits::logging::LogLevel;
use core_runtime::events::{EventBus, EventSeverity};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn config_builder_chains() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_filter("core_playback=trace")
        .with_redaction(false)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.filter.as_deref(), Some("core_playback=trace"));
    assert!(!config.redact);
    assert!(config.spans);
    assert!(config.logger_sink.is_none());
}

#[test]
fn format_defaults_follow_build_profile() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

// The only test in this binary that installs the global subscriber.
#[test]
fn second_initialisation_is_rejected() {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact)).unwrap();
    let again = init_logging(LoggingConfig::default());
    assert!(matches!(again, Err(Error::Config(_))));
}

#[test]
fn session_tokens_never_pass_through() {
    for field in ["token", "session_token", "Authorization"] {
        assert_eq!(redact_if_sensitive(field, "abc123"), "[REDACTED]");
    }
    assert_eq!(redact_if_sensitive("offset_ms", "-1200"), "-1200");
}

#[test]
fn url_without_query_is_kept() {
    let url = "https://edge.example/ctrl/v2";
    assert_eq!(redact_if_sensitive("base_url", url), url);
}

#[test]
fn event_severity_serialises_by_name() {
    let json = serde_json::to_string(&EventSeverity::Warning).unwrap();
    assert_eq!(json, "\"Warning\"");
}

#[core_async::test]
async fn bus_can_be_shared_across_tasks() {
    let bus = EventBus::<u32>::new(8);
    let mut rx = bus.subscribe();
    let producer = bus.clone();
    core_async::spawn(async move {
        producer.emit(7).ok();
    })
    .await
    .unwrap();
    assert_eq!(rx.recv().await.unwrap(), 7);
}
