//! # Change-over
//!
//! Correlates one issued control action with the moment its effect becomes
//! audible.
//!
//! A [`ChangeOver`] carries two completions: `control`, resolved as soon as
//! the driver call returns, and `audio`, resolved once the change reached the
//! render clock. Both are consumed when resolved, so each fires exactly once;
//! a change-over dropped on any path resolves whatever is left with `false`.

use std::fmt;

use core_playback::{Completion, CompletionHandle};
use uuid::Uuid;

use crate::media_state::{MediaState, SubInfo};
use crate::model::Metadata;

/// Identity of an awaited change-over and the sub-info it waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeOverKey {
    pub id: Uuid,
    pub sub_info: SubInfo,
}

impl ChangeOverKey {
    /// True iff `state` flags the awaited sub-info. Has no side effects.
    pub fn matches(&self, state: &MediaState) -> bool {
        state.has_changed(self.sub_info)
    }
}

/// Caller side of an issued action.
#[derive(Debug)]
pub struct ActionHandle {
    /// Resolves when the control request returned: `true` on success.
    pub control: CompletionHandle,
    /// Resolves `true` once the change is audible, `false` when it failed or
    /// was superseded.
    pub audio: CompletionHandle,
}

/// One in-flight control action.
pub struct ChangeOver {
    key: ChangeOverKey,
    control: Option<Completion>,
    audio: Completion,
}

impl ChangeOver {
    pub fn new(sub_info: SubInfo) -> (Self, ActionHandle) {
        let (control, control_handle) = Completion::new();
        let (audio, audio_handle) = Completion::new();
        (
            Self {
                key: ChangeOverKey {
                    id: Uuid::new_v4(),
                    sub_info,
                },
                control: Some(control),
                audio,
            },
            ActionHandle {
                control: control_handle,
                audio: audio_handle,
            },
        )
    }

    pub fn key(&self) -> ChangeOverKey {
        self.key
    }

    pub fn sub_info(&self) -> SubInfo {
        self.key.sub_info
    }

    pub fn matches(&self, state: &MediaState) -> bool {
        self.key.matches(state)
    }

    /// Reports the outcome of the control request. Later calls are no-ops.
    pub fn control_complete(&mut self, success: bool) {
        if let Some(control) = self.control.take() {
            control.resolve(success);
        }
    }

    /// Hands out the audio completion so it can travel through the playback
    /// buffer as a marker.
    pub fn into_audio_completion(mut self) -> Completion {
        self.control_complete(true);
        self.audio
    }

    /// Resolves everything still pending with `false`.
    pub fn fail(mut self) {
        self.control_complete(false);
        self.audio.resolve(false);
    }
}

impl fmt::Debug for ChangeOver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeOver")
            .field("id", &self.key.id)
            .field("sub_info", &self.key.sub_info)
            .field("control_pending", &self.control.is_some())
            .finish()
    }
}

/// Decides whether incoming metadata marks the point where the server
/// switched content.
///
/// Only metadata accepted by the trigger is evidence that an awaited
/// change-over took effect; any other refresh leaves it pending.
pub trait SwitchTrigger: Send + Sync {
    fn is_switch(&self, metadata: &Metadata) -> bool;
}

/// Accepts metadata carrying a stream-relative reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamReferenceTrigger;

impl SwitchTrigger for StreamReferenceTrigger {
    fn is_switch(&self, metadata: &Metadata) -> bool {
        metadata.stream_reference.is_some()
    }
}

/// Accepts all metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTrigger;

impl SwitchTrigger for AlwaysTrigger {
    fn is_switch(&self, _metadata: &Metadata) -> bool {
        true
    }
}

impl<F> SwitchTrigger for F
where
    F: Fn(&Metadata) -> bool + Send + Sync,
{
    fn is_switch(&self, metadata: &Metadata) -> bool {
        self(metadata)
    }
}
