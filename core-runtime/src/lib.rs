//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the player core:
//! - Logging and tracing setup
//! - Configuration with fail-fast capability checks
//! - Typed event bus
//!
//! ## Overview
//!
//! Every other `core-*` crate relies on the conventions established here:
//! components log through `tracing`, notify through an [`events::EventBus`]
//! and receive their host collaborators through [`config::CoreConfig`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
