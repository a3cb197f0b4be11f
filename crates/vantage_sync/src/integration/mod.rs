//! # Integration Layer
//!
//! The engine does not own a spatial index or a network socket. The host
//! supplies both through the traits in this module.
//!
//! ```text
//!  host spatial index ──impl InterestScan──┐
//!                                          ├──► SyncDriver::run_cycle
//!  host network layer ──impl Transport─────┘
//! ```
//!
//! [`ChannelTransport`] is a ready-made [`Transport`] that forwards frames to
//! a network thread over a bounded channel.

mod channel;
mod traits;

pub use channel::{ChannelTransport, OutboundFrame};
pub use traits::{InterestScan, Transport};
