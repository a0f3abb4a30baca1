//! Beacon Core Library
//!
//! This crate provides the shared vocabulary for the beacon pixel engine:
//! events, frequency policies, platform tags, wire constants, and errors.

pub mod error;
pub mod event;
pub mod frequency;
pub mod platform;
pub mod wire;

pub use error::{BeaconError, BeaconResult};
pub use event::{Event, EventKind, PixelError};
pub use frequency::Frequency;
pub use platform::Platform;
