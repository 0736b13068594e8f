//! # Media state
//!
//! Latest known control-plane facts plus the set of sub-infos that changed
//! since they were last acknowledged.
//!
//! Setters only flag a sub-info when the value actually differs. Flags are
//! cleared by [`MediaState::clear_changed`]; clearing an already clear flag
//! is a no-op.

use core_async::sync::ConcurrentSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::{Bouquet, MediaUpdate, Metadata, SessionEndpoint};

/// Category of control-plane fact that can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubInfo {
    Metadata,
    Timeshift,
    Bouquet,
    /// Swaps and bit-rates.
    Playout,
}

impl SubInfo {
    pub const ALL: [SubInfo; 4] = [
        SubInfo::Metadata,
        SubInfo::Timeshift,
        SubInfo::Bouquet,
        SubInfo::Playout,
    ];
}

#[derive(Debug, Default)]
struct Facts {
    metadata: Option<Metadata>,
    bouquet: Option<Bouquet>,
    offset_to_live_ms: i64,
    swaps: Option<u32>,
    max_bit_rate: Option<u32>,
    current_bit_rate: Option<u32>,
    endpoint: Option<SessionEndpoint>,
    valid: bool,
}

#[derive(Debug, Default)]
pub struct MediaState {
    facts: RwLock<Facts>,
    changed: ConcurrentSet<SubInfo>,
}

macro_rules! tracked_setter {
    ($(#[$doc:meta])* $name:ident, $field:ident: $ty:ty => $sub_info:expr) => {
        $(#[$doc])*
        pub fn $name(&self, value: $ty) -> bool {
            let differs = {
                let mut facts = self.facts.write();
                if facts.$field == value {
                    false
                } else {
                    facts.$field = value;
                    true
                }
            };
            if differs {
                self.changed.insert($sub_info);
            }
            differs
        }
    };
}

impl MediaState {
    pub fn new() -> Self {
        Self::default()
    }

    tracked_setter!(
        /// Flags [`SubInfo::Metadata`] when different. Returns whether it was.
        set_metadata, metadata: Option<Metadata> => SubInfo::Metadata
    );
    tracked_setter!(set_bouquet, bouquet: Option<Bouquet> => SubInfo::Bouquet);
    tracked_setter!(set_offset_to_live_ms, offset_to_live_ms: i64 => SubInfo::Timeshift);
    tracked_setter!(set_swaps, swaps: Option<u32> => SubInfo::Playout);
    tracked_setter!(set_max_bit_rate, max_bit_rate: Option<u32> => SubInfo::Playout);
    tracked_setter!(set_current_bit_rate, current_bit_rate: Option<u32> => SubInfo::Playout);

    pub fn set_endpoint(&self, endpoint: Option<SessionEndpoint>) {
        self.facts.write().endpoint = endpoint;
    }

    pub fn set_valid(&self, valid: bool) {
        self.facts.write().valid = valid;
    }

    /// Folds every field present in `update`.
    pub fn apply(&self, update: MediaUpdate) {
        let MediaUpdate {
            metadata,
            bouquet,
            offset_to_live_ms,
            swaps,
            max_bit_rate,
            current_bit_rate,
            endpoint,
        } = update;

        if let Some(metadata) = metadata {
            self.set_metadata(Some(metadata));
        }
        if let Some(bouquet) = bouquet {
            self.set_bouquet(Some(bouquet));
        }
        if let Some(offset) = offset_to_live_ms {
            self.set_offset_to_live_ms(offset);
        }
        if swaps.is_some() {
            self.set_swaps(swaps);
        }
        if max_bit_rate.is_some() {
            self.set_max_bit_rate(max_bit_rate);
        }
        if current_bit_rate.is_some() {
            self.set_current_bit_rate(current_bit_rate);
        }
        if endpoint.is_some() {
            self.set_endpoint(endpoint);
        }
    }

    pub fn metadata(&self) -> Option<Metadata> {
        self.facts.read().metadata.clone()
    }

    pub fn bouquet(&self) -> Option<Bouquet> {
        self.facts.read().bouquet.clone()
    }

    pub fn offset_to_live_ms(&self) -> i64 {
        self.facts.read().offset_to_live_ms
    }

    pub fn swaps(&self) -> Option<u32> {
        self.facts.read().swaps
    }

    pub fn max_bit_rate(&self) -> Option<u32> {
        self.facts.read().max_bit_rate
    }

    pub fn current_bit_rate(&self) -> Option<u32> {
        self.facts.read().current_bit_rate
    }

    pub fn endpoint(&self) -> Option<SessionEndpoint> {
        self.facts.read().endpoint.clone()
    }

    pub fn is_valid(&self) -> bool {
        self.facts.read().valid
    }

    pub fn has_changed(&self, sub_info: SubInfo) -> bool {
        self.changed.contains(&sub_info)
    }

    /// Acknowledges `sub_info`. Returns whether it was flagged.
    pub fn clear_changed(&self, sub_info: SubInfo) -> bool {
        self.changed.remove(&sub_info)
    }

    pub fn changed(&self) -> Vec<SubInfo> {
        self.changed.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, ItemType, Service};

    fn song(id: &str) -> Metadata {
        Metadata::default().with_current(Item::new(id, ItemType::Music))
    }

    #[test]
    fn only_differing_values_are_flagged() {
        let state = MediaState::new();
        assert!(state.set_metadata(Some(song("a"))));
        assert!(state.has_changed(SubInfo::Metadata));

        assert!(state.clear_changed(SubInfo::Metadata));
        assert!(!state.set_metadata(Some(song("a"))));
        assert!(!state.has_changed(SubInfo::Metadata));
    }

    #[test]
    fn bouquet_compares_by_service_identity() {
        let state = MediaState::new();
        state.set_bouquet(Some(Bouquet::new(vec![Service::new("one")], "one")));
        state.clear_changed(SubInfo::Bouquet);

        let renamed = Bouquet::new(vec![Service::new("one").with_display_name("One")], "one");
        assert!(!state.set_bouquet(Some(renamed)));
        assert!(!state.has_changed(SubInfo::Bouquet));
    }

    #[test]
    fn clearing_is_idempotent() {
        let state = MediaState::new();
        state.set_offset_to_live_ms(-30_000);
        assert!(state.clear_changed(SubInfo::Timeshift));
        assert!(!state.clear_changed(SubInfo::Timeshift));
    }

    #[test]
    fn apply_folds_present_fields_only() {
        let state = MediaState::new();
        state.set_swaps(Some(3));
        state.clear_changed(SubInfo::Playout);

        state.apply(MediaUpdate {
            offset_to_live_ms: Some(-5_000),
            max_bit_rate: Some(64_000),
            ..Default::default()
        });

        assert_eq!(state.swaps(), Some(3));
        assert_eq!(state.max_bit_rate(), Some(64_000));
        assert_eq!(state.offset_to_live_ms(), -5_000);
        let mut changed = state.changed();
        changed.sort_by_key(|s| *s as u8);
        assert_eq!(changed, vec![SubInfo::Timeshift, SubInfo::Playout]);
    }

    #[test]
    fn endpoint_and_validity_are_not_sub_infos() {
        let state = MediaState::new();
        state.set_endpoint(Some(SessionEndpoint::new("t", "https://example.com")));
        state.set_valid(true);
        assert!(state.changed().is_empty());
        assert!(state.is_valid());
    }
}
