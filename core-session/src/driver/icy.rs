use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{MediaControl, SkipDirection, WindTarget};
use crate::error::{Result, SessionError};
use crate::media_state::MediaState;
use crate::model::{ItemType, Metadata};

pub(super) const NAME: &str = "icy";

/// Driver for plain ICY streams. Only in-band metadata is available.
pub struct IcyDriver {
    state: Arc<MediaState>,
}

impl IcyDriver {
    pub fn new(state: Arc<MediaState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<MediaState> {
        &self.state
    }

    fn unsupported(operation: &'static str) -> SessionError {
        SessionError::Unsupported {
            driver: NAME,
            operation,
        }
    }
}

#[async_trait]
impl MediaControl for IcyDriver {
    async fn connect(&self) -> Result<()> {
        self.state.set_valid(true);
        debug!("ICY session connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.state.set_valid(false);
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    fn set_metadata(&self, metadata: Metadata) {
        self.state.set_metadata(Some(metadata));
    }

    async fn wind(&self, _target: WindTarget) -> Result<()> {
        Err(Self::unsupported("wind"))
    }

    async fn skip(&self, _direction: SkipDirection, _item_type: Option<ItemType>) -> Result<()> {
        Err(Self::unsupported("skip"))
    }

    async fn swap_item(&self) -> Result<()> {
        Err(Self::unsupported("swap_item"))
    }

    async fn swap_service(&self, _service_id: &str) -> Result<()> {
        Err(Self::unsupported("swap_service"))
    }

    async fn limit_bit_rate(&self, _bps: u32) -> Result<()> {
        Err(Self::unsupported("limit_bit_rate"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_state::SubInfo;

    #[core_async::test]
    async fn metadata_is_folded_and_validity_follows_connection() {
        let state = Arc::new(MediaState::new());
        let driver = IcyDriver::new(state.clone());

        driver.connect().await.unwrap();
        assert!(state.is_valid());

        driver.set_metadata(Metadata::default().with_stream_reference("StreamTitle"));
        assert!(state.has_changed(SubInfo::Metadata));

        driver.disconnect().await.unwrap();
        assert!(!state.is_valid());
    }

    #[core_async::test]
    async fn time_shift_is_unsupported() {
        let driver = IcyDriver::new(Arc::new(MediaState::new()));
        assert!(matches!(
            driver.wind(WindTarget::By(-60_000)).await,
            Err(SessionError::Unsupported { operation: "wind", .. })
        ));
        assert!(driver.limit_bit_rate(64_000).await.is_err());
    }
}
