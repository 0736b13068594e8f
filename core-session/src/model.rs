//! Control-plane data exchanged with drivers and listeners.

use std::fmt;
use std::time::Duration;

use core_runtime::logging::redact_if_sensitive;
use serde::{Deserialize, Serialize};

/// A station or program offered by a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub display_name: Option<String>,
    pub icon_url: Option<String>,
}

impl Service {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            icon_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// The set of services offered by a session, one of them active.
///
/// Two bouquets are equal when they offer the same services (by id, in the
/// same order) and the same one is active. Display data is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bouquet {
    pub services: Vec<Service>,
    /// Id of the active service.
    pub active: String,
}

impl Bouquet {
    pub fn new(services: Vec<Service>, active: impl Into<String>) -> Self {
        Self {
            services,
            active: active.into(),
        }
    }

    pub fn active_service(&self) -> Option<&Service> {
        self.services.iter().find(|s| s.id == self.active)
    }

    pub fn contains(&self, service_id: &str) -> bool {
        self.services.iter().any(|s| s.id == service_id)
    }
}

impl PartialEq for Bouquet {
    fn eq(&self, other: &Self) -> bool {
        self.active == other.active
            && self.services.len() == other.services.len()
            && self
                .services
                .iter()
                .zip(&other.services)
                .all(|(a, b)| a.id == b.id)
    }
}

impl Eq for Bouquet {}

/// Kind of a program item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Advertisement,
    Comedy,
    Jingle,
    Music,
    News,
    Traffic,
    Voice,
    Weather,
    Unknown,
}

/// One program item (song, news, ad break, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub item_type: ItemType,
    pub duration: Option<Duration>,
}

impl Item {
    pub fn new(id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            id: id.into(),
            title: None,
            artist: None,
            item_type,
            duration: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// What is playing, what comes next and on which service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub current: Option<Item>,
    pub next: Option<Item>,
    pub service: Option<Service>,
    /// Stream-relative reference carried by in-band metadata when the
    /// server switched content at this point of the stream.
    pub stream_reference: Option<String>,
}

impl Metadata {
    pub fn with_current(mut self, item: Item) -> Self {
        self.current = Some(item);
        self
    }

    pub fn with_stream_reference(mut self, reference: impl Into<String>) -> Self {
        self.stream_reference = Some(reference.into());
        self
    }

    pub fn current_title(&self) -> Option<&str> {
        self.current.as_ref().and_then(|item| item.title.as_deref())
    }
}

/// Where and as whom control requests are sent.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoint {
    pub token: String,
    pub base_url: String,
}

impl SessionEndpoint {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into(),
        }
    }
}

impl fmt::Debug for SessionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEndpoint")
            .field("token", &redact_if_sensitive("token", &self.token))
            .field("base_url", &redact_if_sensitive("base_url", &self.base_url))
            .finish()
    }
}

/// Partial snapshot of control-plane facts. `None` fields are left untouched
/// when folded into the media state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaUpdate {
    pub metadata: Option<Metadata>,
    pub bouquet: Option<Bouquet>,
    pub offset_to_live_ms: Option<i64>,
    pub swaps: Option<u32>,
    pub max_bit_rate: Option<u32>,
    pub current_bit_rate: Option<u32>,
    pub endpoint: Option<SessionEndpoint>,
}
