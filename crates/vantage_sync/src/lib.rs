//! # VANTAGE Sync
//!
//! Per-entity synchronization engine. Gameplay threads mutate entities at
//! any time; a periodic sync cycle decides who can see each entity,
//! captures pending changes and encodes one frame per interested client.
//!
//! ## Data Flow
//!
//! ```text
//! gameplay threads ──set_position / set_attribute──► SyncEntity
//!                                                        │
//!        InterestScan ──► SyncDriver::run_cycle ◄────────┘
//!                                │
//!                                ▼
//!                     encode_entity_frame ──► Transport
//! ```
//!
//! ## Example
//!
//! ```rust
//! use vantage_shared::Vec3;
//! use vantage_sync::{ClientId, EntityId, EntityKind, SyncConfig, SyncEntity};
//!
//! let entity = SyncEntity::new(EntityId(1), EntityKind(2), 64, Vec3::ZERO, 0);
//! entity.set_attribute("name", "lantern");
//! entity.subscribe(ClientId(9));
//!
//! let changed = entity.diff_since(ClientId(9));
//! let frame = entity.serialize(changed, &SyncConfig::default()).unwrap();
//! assert!(frame.len() > 32);
//!
//! // Already seen.
//! assert!(entity.diff_since(ClientId(9)).is_empty());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod attributes;
pub mod client;
pub mod config;
pub mod driver;
pub mod entity;
pub mod error;
pub mod integration;
pub mod protocol;
pub mod visibility;

pub use attributes::{AttributeStore, AttributeValue, ChangedKeys, FromAttribute};
pub use client::ClientId;
pub use config::SyncConfig;
pub use driver::{CycleStats, SyncDriver};
pub use entity::{EntityFlags, EntityId, EntityKind, EntityPhase, EntityView, PendingScalars, SyncEntity};
pub use error::{SyncError, SyncResult, WireError, WireResult};
pub use integration::{ChannelTransport, InterestScan, OutboundFrame, Transport};
pub use protocol::{
    decode_entity_frame, encode_entity_frame, encode_entity_frames, EntityFrame, EntityHeader,
    FrameBatch,
};
pub use visibility::VisibilitySet;
