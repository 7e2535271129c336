//! Domain models for Bundlecast.
//!
//! Canonical definitions for the request-side entities:
//! - `ChannelBits`: Client opt-in to stable/alpha/beta
//! - `ClientState`: Everything a poll carries
//! - Error taxonomy shared by the engine, pipeline and service

pub mod channel;
pub mod client;
pub mod error;

pub use channel::ChannelBits;
pub use client::{baseline_field, ClientState, Platform};
pub use error::{PayloadError, Result, UpdateError, ValidationError};
