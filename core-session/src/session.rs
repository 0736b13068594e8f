//! # Media Session
//!
//! Façade sequencing driver calls, the change-over lifecycle and listener
//! notification.
//!
//! ## Issuing an action
//!
//! 1. A [`ChangeOver`] is built for the sub-info the action affects.
//! 2. The driver performs the control request.
//! 3. The caller's `control` completion reports the request outcome.
//! 4. On failure, when the playback gate is closed, or once the session was
//!    closed, the `audio` completion resolves `false` right away and nothing
//!    is awaited.
//! 5. Otherwise the change-over becomes the single awaited one,
//!    superseding (and failing) any previous one.
//!
//! ## Resolving
//!
//! When metadata accepted by the session's [`SwitchTrigger`] arrives and the
//! awaited sub-info is flagged in the media state, the change-over's audio
//! completion is handed back to the caller, which queues it behind the
//! metadata's cue in the playback buffer.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use core_async::sync::ConcurrentMap;
use core_playback::Completion;
use core_runtime::events::EventBus;
use tracing::{debug, error, info, instrument, warn};

use crate::change_over::{
    ActionHandle, AlwaysTrigger, ChangeOver, ChangeOverKey, StreamReferenceTrigger, SwitchTrigger,
};
use crate::driver::{ControlAction, MediaControl, MediaDriver, SkipDirection, WindTarget};
use crate::error::{ErrorSeverity, Result, SessionError};
use crate::events::PlayerEvent;
use crate::media_state::{MediaState, SubInfo};
use crate::model::{ItemType, Metadata};

type PlaybackGate = Box<dyn Fn() -> bool + Send + Sync>;

/// One connected control-plane session.
pub struct MediaSession {
    driver: MediaDriver,
    state: Arc<MediaState>,
    events: EventBus<PlayerEvent>,
    awaited: ConcurrentMap<ChangeOverKey, ChangeOver>,
    trigger: Box<dyn SwitchTrigger>,
    playback_gate: PlaybackGate,
    /// Set by [`close`](MediaSession::close), cleared by a successful connect.
    closed: AtomicBool,
}

impl MediaSession {
    /// Creates a session around `driver`.
    ///
    /// ICY metadata always denotes new content, so ICY sessions accept every
    /// metadata as a switch. Ybrid sessions require a stream reference.
    pub fn new(driver: MediaDriver, events: EventBus<PlayerEvent>) -> Self {
        let trigger: Box<dyn SwitchTrigger> = match driver {
            MediaDriver::Icy(_) => Box::new(AlwaysTrigger),
            MediaDriver::YbridV2(_) => Box::new(StreamReferenceTrigger),
        };
        Self {
            state: Arc::clone(driver.state()),
            driver,
            events,
            awaited: ConcurrentMap::new(),
            trigger,
            playback_gate: Box::new(|| true),
            closed: AtomicBool::new(false),
        }
    }

    /// Replaces the predicate deciding which metadata marks a switch.
    pub fn with_trigger(mut self, trigger: impl SwitchTrigger + 'static) -> Self {
        self.trigger = Box::new(trigger);
        self
    }

    /// Actions only await their change-over while `gate` returns `true`.
    pub fn with_playback_gate<F>(mut self, gate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.playback_gate = Box::new(gate);
        self
    }

    pub fn state(&self) -> &Arc<MediaState> {
        &self.state
    }

    pub fn events(&self) -> &EventBus<PlayerEvent> {
        &self.events
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Number of change-overs currently awaited (0 or 1).
    pub fn awaited_count(&self) -> usize {
        self.awaited.len()
    }

    /// Connects the driver. Re-opens a session that was closed.
    #[instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn connect(&self) -> Result<()> {
        if let Err(err) = self.driver.connect().await {
            self.report_error(&err);
            return Err(err);
        }
        self.closed.store(false, Ordering::Release);
        info!("Session connected");
        self.notify_changes(None);
        Ok(())
    }

    #[instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn refresh(&self) -> Result<()> {
        if let Err(err) = self.driver.refresh().await {
            self.report_error(&err);
            return Err(err);
        }
        self.notify_changes(None);
        Ok(())
    }

    /// Fails any awaited change-over and closes the control session.
    #[instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn disconnect(&self) -> Result<()> {
        self.close();
        let result = self.driver.disconnect().await;
        if let Err(err) = &result {
            self.report_error(err);
        }
        result
    }

    pub async fn wind(&self, target: WindTarget) -> ActionHandle {
        self.issue(ControlAction::Wind(target)).await
    }

    pub async fn wind_to_live(&self) -> ActionHandle {
        self.wind(WindTarget::Live).await
    }

    pub async fn skip_forward(&self, item_type: Option<ItemType>) -> ActionHandle {
        self.issue(ControlAction::Skip {
            direction: SkipDirection::Forward,
            item_type,
        })
        .await
    }

    pub async fn skip_backward(&self, item_type: Option<ItemType>) -> ActionHandle {
        self.issue(ControlAction::Skip {
            direction: SkipDirection::Backward,
            item_type,
        })
        .await
    }

    pub async fn swap_item(&self) -> ActionHandle {
        self.issue(ControlAction::SwapItem).await
    }

    pub async fn swap_service(&self, service_id: impl Into<String>) -> ActionHandle {
        self.issue(ControlAction::SwapService(service_id.into()))
            .await
    }

    pub async fn limit_bit_rate(&self, bps: u32) -> ActionHandle {
        self.issue(ControlAction::LimitBitRate(bps)).await
    }

    /// Performs `action` and, when it succeeded, awaits its audible effect.
    #[instrument(skip(self), fields(action = action.name()))]
    pub async fn issue(&self, action: ControlAction) -> ActionHandle {
        let (mut change_over, handle) = ChangeOver::new(action.sub_info());

        let result = self.driver.execute(&action).await;
        change_over.control_complete(result.is_ok());

        match result {
            Err(err) => {
                self.report_error(&err);
                change_over.fail();
            }
            Ok(()) if !self.playback_allowed() => {
                debug!("Playback cannot continue, not awaiting change-over");
                change_over.fail();
            }
            Ok(()) => self.await_change_over(change_over),
        }
        handle
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn playback_allowed(&self) -> bool {
        !self.is_closed() && self.state.is_valid() && (self.playback_gate)()
    }

    fn await_change_over(&self, change_over: ChangeOver) {
        let key = change_over.key();
        for superseded in self.awaited.replace_all(key, change_over) {
            debug!(sub_info = ?superseded.sub_info(), "Change-over superseded");
            superseded.fail();
        }
        // close() may have drained between the gate check and the insert.
        if self.is_closed() {
            if let Some(change_over) = self.awaited.pop(&key) {
                debug!(sub_info = ?key.sub_info, "Session closed, failing change-over");
                change_over.fail();
            }
            return;
        }
        debug!(sub_info = ?key.sub_info, "Awaiting change-over");
    }

    /// Offers newly arrived metadata as evidence for the awaited change-over.
    ///
    /// Returns the change-over's audio completion when the metadata marks a
    /// switch and the awaited sub-info has changed. The caller must queue it
    /// right behind the metadata's cue point.
    pub fn on_metadata(&self, metadata: &Metadata) -> Option<Completion> {
        if self.awaited.is_empty() || !self.trigger.is_switch(metadata) {
            return None;
        }
        let (key, change_over) = self.awaited.pop_where(|key| key.matches(&self.state))?;
        info!(sub_info = ?key.sub_info, "Change-over matched");
        Some(change_over.into_audio_completion())
    }

    /// Folds metadata whose cue reached the render clock and notifies.
    pub fn on_audible_metadata(&self, metadata: Metadata) {
        self.driver.set_metadata(metadata.clone());
        self.notify_changes(Some(&metadata));
    }

    /// Emits one event per changed sub-info and acknowledges it.
    ///
    /// The sub-info of an awaited change-over is left flagged so the matcher
    /// still sees it. Returns the number of events emitted.
    pub fn notify_changes(&self, audible: Option<&Metadata>) -> usize {
        let awaited: Vec<SubInfo> = self.awaited.keys().iter().map(|k| k.sub_info).collect();
        let mut emitted = 0;

        for sub_info in SubInfo::ALL {
            if awaited.contains(&sub_info) || !self.state.clear_changed(sub_info) {
                continue;
            }
            for event in self.events_for(sub_info, audible) {
                self.events.emit(event).ok();
                emitted += 1;
            }
        }
        emitted
    }

    fn events_for(&self, sub_info: SubInfo, audible: Option<&Metadata>) -> Vec<PlayerEvent> {
        match sub_info {
            SubInfo::Metadata => audible
                .cloned()
                .or_else(|| self.state.metadata())
                .map(|metadata| PlayerEvent::MetadataChanged { metadata })
                .into_iter()
                .collect(),
            SubInfo::Timeshift => vec![PlayerEvent::OffsetToLiveChanged {
                offset_ms: self.state.offset_to_live_ms(),
            }],
            SubInfo::Bouquet => self
                .state
                .bouquet()
                .map(|bouquet| PlayerEvent::ServicesChanged { bouquet })
                .into_iter()
                .collect(),
            SubInfo::Playout => {
                let mut events = vec![PlayerEvent::BitRateChanged {
                    current_bps: self.state.current_bit_rate(),
                    max_bps: self.state.max_bit_rate(),
                }];
                if let Some(swaps) = self.state.swaps() {
                    events.push(PlayerEvent::SwapsChanged { swaps });
                }
                events
            }
        }
    }

    /// Fails every awaited change-over and refuses new ones until the next
    /// successful [`connect`](Self::connect).
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let pending = self.awaited.drain();
        if !pending.is_empty() {
            warn!(count = pending.len(), "Failing awaited change-over on close");
        }
        for (_, change_over) in pending {
            change_over.fail();
        }
    }

    /// Logs `err` at its severity and forwards it to listeners.
    pub fn report_error(&self, err: &SessionError) {
        let severity = err.severity();
        match severity {
            ErrorSeverity::Notice => info!(error = %err, "Control action declined"),
            ErrorSeverity::Recoverable => warn!(error = %err, "Control plane unavailable"),
            ErrorSeverity::Fatal => error!(error = %err, "Control plane failure"),
        }
        self.events
            .emit(PlayerEvent::Error {
                severity,
                message: err.to_string(),
            })
            .ok();
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSession")
            .field("driver", &self.driver.name())
            .field("awaited", &self.awaited.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
