//! # Session & Change-Over Synchronization
//!
//! Control-plane side of the player: tracks session facts, runs control
//! actions through a driver and makes their confirmation fire at the audio
//! instant the change becomes audible.
//!
//! ## Overview
//!
//! - [`MediaState`] holds session facts and their "changed" flags
//! - [`ChangeOver`] correlates one action with its audible effect
//! - [`MediaDriver`] selects the ICY or Ybrid v2 control plane
//! - [`MediaSession`] sequences actions, change-overs and notifications
//! - [`PlaybackPipeline`] feeds decoded audio and metadata into the buffer
//!
//! ## Usage
//!
//! ```ignore
//! use core_session::{MediaDriver, MediaSession, MediaState, PlaybackPipeline};
//!
//! let state = Arc::new(MediaState::new());
//! let driver = MediaDriver::ybrid_v2(transport, state);
//! let session = Arc::new(MediaSession::new(driver, EventBus::new(config.event_buffer_size)));
//! session.connect().await?;
//!
//! let pipeline = PlaybackPipeline::new(&config, BufferConfig::default(), session.clone())?;
//! pipeline.spawn_updater();
//!
//! let handle = session.swap_item().await;
//! // `handle.control` resolves when the request returned,
//! // `handle.audio` once the swapped item is audible.
//! ```

pub mod change_over;
pub mod driver;
pub mod error;
pub mod events;
pub mod listener;
pub mod media_state;
pub mod model;
pub mod pipeline;
pub mod session;

pub use change_over::{
    ActionHandle, AlwaysTrigger, ChangeOver, ChangeOverKey, StreamReferenceTrigger, SwitchTrigger,
};
pub use driver::{
    ControlAction, IcyDriver, MediaControl, MediaDriver, SkipDirection, WindTarget, YbridCommand,
    YbridResponse, YbridTransport, YbridV2Driver,
};
pub use error::{ErrorSeverity, Result, SessionError};
pub use events::PlayerEvent;
pub use listener::{dispatch, spawn_listener, PlayerListener};
pub use media_state::{MediaState, SubInfo};
pub use model::{Bouquet, Item, ItemType, MediaUpdate, Metadata, Service, SessionEndpoint};
pub use pipeline::{PlaybackPipeline, PlaybackState};
pub use session::MediaSession;
