//! Ybrid v2 control-plane driver.
//!
//! The HTTP/JSON plumbing lives in the host behind [`YbridTransport`]; this
//! driver decides which command to send, checks the session preconditions
//! and folds each response snapshot into the media state.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::BridgeError;
use core_runtime::logging::redact_if_sensitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{MediaControl, SkipDirection, WindTarget};
use crate::error::{Result, SessionError};
use crate::media_state::MediaState;
use crate::model::{ItemType, MediaUpdate, Metadata, SessionEndpoint};

pub(super) const NAME: &str = "ybrid-v2";

/// Requests understood by a Ybrid v2 control endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum YbridCommand {
    CreateSession,
    CloseSession,
    Info,
    Wind { by_ms: i64 },
    WindTo { timestamp_ms: i64 },
    WindToLive,
    SkipForward { item_type: Option<ItemType> },
    SkipBackward { item_type: Option<ItemType> },
    SwapItem,
    SwapService { service_id: String },
    LimitBitRate { bps: u32 },
}

impl YbridCommand {
    pub fn name(&self) -> &'static str {
        match self {
            YbridCommand::CreateSession => "create_session",
            YbridCommand::CloseSession => "close_session",
            YbridCommand::Info => "info",
            YbridCommand::Wind { .. } => "wind",
            YbridCommand::WindTo { .. } => "wind_to",
            YbridCommand::WindToLive => "wind_to_live",
            YbridCommand::SkipForward { .. } => "skip_forward",
            YbridCommand::SkipBackward { .. } => "skip_backward",
            YbridCommand::SwapItem => "swap_item",
            YbridCommand::SwapService { .. } => "swap_service",
            YbridCommand::LimitBitRate { .. } => "limit_bit_rate",
        }
    }
}

/// Decoded answer of the control endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YbridResponse {
    /// `false` when the server no longer knows the session token.
    pub valid: bool,
    /// `false` when the server refused the command.
    pub accepted: bool,
    pub message: Option<String>,
    pub update: MediaUpdate,
}

impl YbridResponse {
    pub fn accepted(update: MediaUpdate) -> Self {
        Self {
            valid: true,
            accepted: true,
            message: None,
            update,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            accepted: false,
            message: Some(message.into()),
            update: MediaUpdate::default(),
        }
    }

    pub fn invalid_session() -> Self {
        Self::default()
    }
}

/// Host-provided transport to the Ybrid control endpoint.
#[async_trait]
pub trait YbridTransport: Send + Sync {
    /// Sends `command`. `endpoint` is `None` only for
    /// [`YbridCommand::CreateSession`].
    async fn request(
        &self,
        command: YbridCommand,
        endpoint: Option<SessionEndpoint>,
    ) -> std::result::Result<YbridResponse, BridgeError>;
}

pub struct YbridV2Driver {
    transport: Arc<dyn YbridTransport>,
    state: Arc<MediaState>,
}

impl YbridV2Driver {
    pub fn new(transport: Arc<dyn YbridTransport>, state: Arc<MediaState>) -> Self {
        Self { transport, state }
    }

    pub fn state(&self) -> &Arc<MediaState> {
        &self.state
    }

    async fn request(&self, command: YbridCommand) -> Result<()> {
        let endpoint = match (&command, self.state.endpoint()) {
            (YbridCommand::CreateSession, _) => None,
            (_, Some(endpoint)) => Some(endpoint),
            (_, None) => return Err(SessionError::NoSession),
        };

        let name = command.name();
        debug!(command = name, "Sending Ybrid request");
        let response = self.transport.request(command, endpoint).await?;

        if !response.valid {
            warn!(command = name, "Ybrid session was invalidated by the server");
            self.state.set_valid(false);
            return Err(SessionError::InvalidSession(format!(
                "server rejected session on {}",
                name
            )));
        }
        if !response.accepted {
            return Err(SessionError::Rejected {
                command: name,
                reason: response
                    .message
                    .unwrap_or_else(|| "not accepted".to_string()),
            });
        }

        self.state.apply(response.update);
        Ok(())
    }
}

#[async_trait]
impl MediaControl for YbridV2Driver {
    async fn connect(&self) -> Result<()> {
        self.request(YbridCommand::CreateSession).await?;
        let Some(endpoint) = self.state.endpoint() else {
            return Err(SessionError::BadResponse(
                "session created without an endpoint".to_string(),
            ));
        };
        self.state.set_valid(true);
        info!(
            token = %redact_if_sensitive("token", &endpoint.token),
            base_url = %redact_if_sensitive("base_url", &endpoint.base_url),
            "Ybrid session created"
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if self.state.endpoint().is_none() {
            return Ok(());
        }
        let result = self.request(YbridCommand::CloseSession).await;
        self.state.set_endpoint(None);
        self.state.set_valid(false);
        debug!("Ybrid session closed");
        result
    }

    async fn refresh(&self) -> Result<()> {
        self.request(YbridCommand::Info).await
    }

    fn set_metadata(&self, metadata: Metadata) {
        self.state.set_metadata(Some(metadata));
    }

    async fn wind(&self, target: WindTarget) -> Result<()> {
        let command = match target {
            WindTarget::By(by_ms) => YbridCommand::Wind { by_ms },
            WindTarget::To(timestamp_ms) => YbridCommand::WindTo { timestamp_ms },
            WindTarget::Live => YbridCommand::WindToLive,
        };
        self.request(command).await
    }

    async fn skip(&self, direction: SkipDirection, item_type: Option<ItemType>) -> Result<()> {
        let command = match direction {
            SkipDirection::Forward => YbridCommand::SkipForward { item_type },
            SkipDirection::Backward => YbridCommand::SkipBackward { item_type },
        };
        self.request(command).await
    }

    async fn swap_item(&self) -> Result<()> {
        if self.state.swaps() == Some(0) {
            return Err(SessionError::NoSwapsLeft);
        }
        self.request(YbridCommand::SwapItem).await
    }

    async fn swap_service(&self, service_id: &str) -> Result<()> {
        self.request(YbridCommand::SwapService {
            service_id: service_id.to_string(),
        })
        .await
    }

    async fn limit_bit_rate(&self, bps: u32) -> Result<()> {
        self.request(YbridCommand::LimitBitRate { bps }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorSeverity;
    use crate::media_state::SubInfo;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Transport {}

        #[async_trait]
        impl YbridTransport for Transport {
            async fn request(
                &self,
                command: YbridCommand,
                endpoint: Option<SessionEndpoint>,
            ) -> std::result::Result<YbridResponse, BridgeError>;
        }
    }

    fn endpoint() -> SessionEndpoint {
        SessionEndpoint::new("token-1", "https://edge.example.com/ctrl/v2")
    }

    fn connected(transport: MockTransport) -> (Arc<MediaState>, YbridV2Driver) {
        let state = Arc::new(MediaState::new());
        state.set_endpoint(Some(endpoint()));
        state.set_valid(true);
        let driver = YbridV2Driver::new(Arc::new(transport), state.clone());
        (state, driver)
    }

    #[core_async::test]
    async fn connect_stores_endpoint_from_response() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .with(eq(YbridCommand::CreateSession), eq(None::<SessionEndpoint>))
            .times(1)
            .returning(|_, _| {
                Ok(YbridResponse::accepted(MediaUpdate {
                    endpoint: Some(endpoint()),
                    swaps: Some(3),
                    ..Default::default()
                }))
            });

        let state = Arc::new(MediaState::new());
        let driver = YbridV2Driver::new(Arc::new(transport), state.clone());
        driver.connect().await.unwrap();

        assert!(state.is_valid());
        assert_eq!(state.endpoint(), Some(endpoint()));
        assert_eq!(state.swaps(), Some(3));
    }

    #[core_async::test]
    async fn connect_without_endpoint_is_a_bad_response() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .returning(|_, _| Ok(YbridResponse::accepted(MediaUpdate::default())));
        let driver = YbridV2Driver::new(Arc::new(transport), Arc::new(MediaState::new()));

        assert!(matches!(
            driver.connect().await,
            Err(SessionError::BadResponse(_))
        ));
    }

    #[core_async::test]
    async fn requests_before_connect_have_no_session() {
        let mut transport = MockTransport::new();
        transport.expect_request().never();
        let driver = YbridV2Driver::new(Arc::new(transport), Arc::new(MediaState::new()));

        assert_eq!(driver.refresh().await, Err(SessionError::NoSession));
        assert_eq!(
            driver.wind(WindTarget::Live).await,
            Err(SessionError::NoSession)
        );
    }

    #[core_async::test]
    async fn swap_without_swaps_left_is_refused_locally() {
        let mut transport = MockTransport::new();
        transport.expect_request().never();
        let (state, driver) = connected(transport);
        state.set_swaps(Some(0));

        assert_eq!(driver.swap_item().await, Err(SessionError::NoSwapsLeft));
    }

    #[core_async::test]
    async fn invalid_session_response_invalidates_state() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .returning(|_, _| Ok(YbridResponse::invalid_session()));
        let (state, driver) = connected(transport);

        assert!(matches!(
            driver.skip(SkipDirection::Forward, None).await,
            Err(SessionError::InvalidSession(_))
        ));
        assert!(!state.is_valid());
    }

    #[core_async::test]
    async fn wind_folds_offset_into_state() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .with(eq(YbridCommand::Wind { by_ms: -30_000 }), eq(Some(endpoint())))
            .times(1)
            .returning(|_, _| {
                Ok(YbridResponse::accepted(MediaUpdate {
                    offset_to_live_ms: Some(-30_000),
                    ..Default::default()
                }))
            });
        let (state, driver) = connected(transport);

        driver.wind(WindTarget::By(-30_000)).await.unwrap();
        assert_eq!(state.offset_to_live_ms(), -30_000);
        assert!(state.has_changed(SubInfo::Timeshift));
    }

    #[core_async::test]
    async fn transport_failure_is_transient() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .returning(|_, _| Err(BridgeError::Timeout(10_000)));
        let (_state, driver) = connected(transport);

        let err = driver.limit_bit_rate(32_000).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[core_async::test]
    async fn rejected_command_reports_server_message() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .returning(|_, _| Ok(YbridResponse::rejected("unknown service")));
        let (_state, driver) = connected(transport);

        let err = driver.swap_service("nope").await.unwrap_err();
        assert_eq!(
            err,
            SessionError::Rejected {
                command: "swap_service",
                reason: "unknown service".to_string()
            }
        );
        assert_eq!(err.severity(), ErrorSeverity::Notice);
    }

    #[core_async::test]
    async fn disconnect_forgets_endpoint_even_on_failure() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .with(eq(YbridCommand::CloseSession), eq(Some(endpoint())))
            .returning(|_, _| Err(BridgeError::OperationFailed("reset".into())));
        let (state, driver) = connected(transport);

        assert!(driver.disconnect().await.is_err());
        assert_eq!(state.endpoint(), None);
        assert!(!state.is_valid());
    }

    #[test]
    fn commands_serialize_with_tag() {
        let json = serde_json::to_value(YbridCommand::SwapService {
            service_id: "jazz".into(),
        })
        .unwrap();
        assert_eq!(json["command"], "swap_service");
        assert_eq!(json["service_id"], "jazz");
    }
}
