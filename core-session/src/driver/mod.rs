//! # Control drivers
//!
//! A driver talks to one kind of control plane and folds what it learns into
//! the shared [`MediaState`]. The driver is picked when the session is built:
//!
//! - [`IcyDriver`] for plain ICY streams: metadata only, no control actions
//! - [`YbridV2Driver`] for Ybrid v2 sessions: time-shift, swaps, bit-rate
//!
//! Operations a driver cannot perform fail with
//! [`SessionError::Unsupported`](crate::error::SessionError::Unsupported).

mod icy;
mod ybrid;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media_state::{MediaState, SubInfo};
use crate::model::{ItemType, Metadata};

pub use icy::IcyDriver;
pub use ybrid::{YbridCommand, YbridResponse, YbridTransport, YbridV2Driver};

/// Where to move the playout position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindTarget {
    /// Relative move in milliseconds; negative goes back in time.
    By(i64),
    /// Absolute wall-clock position in milliseconds since the Unix epoch.
    To(i64),
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipDirection {
    Forward,
    Backward,
}

/// A control action whose effect is awaited on the audio timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlAction {
    Wind(WindTarget),
    Skip {
        direction: SkipDirection,
        item_type: Option<ItemType>,
    },
    SwapItem,
    SwapService(String),
    LimitBitRate(u32),
}

impl ControlAction {
    /// The sub-info that changes once the action took effect.
    pub fn sub_info(&self) -> SubInfo {
        match self {
            ControlAction::Wind(_) | ControlAction::Skip { .. } => SubInfo::Timeshift,
            ControlAction::SwapItem => SubInfo::Metadata,
            ControlAction::SwapService(_) => SubInfo::Bouquet,
            ControlAction::LimitBitRate(_) => SubInfo::Playout,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlAction::Wind(_) => "wind",
            ControlAction::Skip { .. } => "skip",
            ControlAction::SwapItem => "swap_item",
            ControlAction::SwapService(_) => "swap_service",
            ControlAction::LimitBitRate(_) => "limit_bit_rate",
        }
    }
}

/// Capabilities of a control-plane driver.
#[async_trait]
pub trait MediaControl: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Re-reads the session's facts from the control plane.
    async fn refresh(&self) -> Result<()>;

    /// Folds metadata that became audible.
    fn set_metadata(&self, metadata: Metadata);

    async fn wind(&self, target: WindTarget) -> Result<()>;

    async fn skip(&self, direction: SkipDirection, item_type: Option<ItemType>) -> Result<()>;

    async fn swap_item(&self) -> Result<()>;

    async fn swap_service(&self, service_id: &str) -> Result<()>;

    async fn limit_bit_rate(&self, bps: u32) -> Result<()>;
}

/// The driver chosen for a session.
pub enum MediaDriver {
    Icy(IcyDriver),
    YbridV2(YbridV2Driver),
}

impl MediaDriver {
    pub fn icy(state: Arc<MediaState>) -> Self {
        MediaDriver::Icy(IcyDriver::new(state))
    }

    pub fn ybrid_v2(transport: Arc<dyn YbridTransport>, state: Arc<MediaState>) -> Self {
        MediaDriver::YbridV2(YbridV2Driver::new(transport, state))
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaDriver::Icy(_) => icy::NAME,
            MediaDriver::YbridV2(_) => ybrid::NAME,
        }
    }

    pub fn state(&self) -> &Arc<MediaState> {
        match self {
            MediaDriver::Icy(driver) => driver.state(),
            MediaDriver::YbridV2(driver) => driver.state(),
        }
    }

    fn control(&self) -> &dyn MediaControl {
        match self {
            MediaDriver::Icy(driver) => driver,
            MediaDriver::YbridV2(driver) => driver,
        }
    }

    /// Performs `action` through the matching capability.
    pub async fn execute(&self, action: &ControlAction) -> Result<()> {
        match action {
            ControlAction::Wind(target) => self.wind(*target).await,
            ControlAction::Skip {
                direction,
                item_type,
            } => self.skip(*direction, *item_type).await,
            ControlAction::SwapItem => self.swap_item().await,
            ControlAction::SwapService(id) => self.swap_service(id).await,
            ControlAction::LimitBitRate(bps) => self.limit_bit_rate(*bps).await,
        }
    }
}

#[async_trait]
impl MediaControl for MediaDriver {
    async fn connect(&self) -> Result<()> {
        self.control().connect().await
    }

    async fn disconnect(&self) -> Result<()> {
        self.control().disconnect().await
    }

    async fn refresh(&self) -> Result<()> {
        self.control().refresh().await
    }

    fn set_metadata(&self, metadata: Metadata) {
        self.control().set_metadata(metadata)
    }

    async fn wind(&self, target: WindTarget) -> Result<()> {
        self.control().wind(target).await
    }

    async fn skip(&self, direction: SkipDirection, item_type: Option<ItemType>) -> Result<()> {
        self.control().skip(direction, item_type).await
    }

    async fn swap_item(&self) -> Result<()> {
        self.control().swap_item().await
    }

    async fn swap_service(&self, service_id: &str) -> Result<()> {
        self.control().swap_service(service_id).await
    }

    async fn limit_bit_rate(&self, bps: u32) -> Result<()> {
        self.control().limit_bit_rate(bps).await
    }
}
