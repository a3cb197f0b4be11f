//! # VANTAGE Shared
//!
//! Common types used by gameplay producers, the sync core and clients.
//!
//! ## CRITICAL RULE
//!
//! This crate holds data only. Anything that locks, spawns threads or
//! touches a socket belongs in `vantage_core` or `vantage_sync`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    DEFAULT_FIRST_ENTITY_ID, DEFAULT_MAX_FRAME_BYTES, DEFAULT_MAX_KEY_LEN, ENTITY_HEADER_SIZE,
};
pub use math::Vec3;
