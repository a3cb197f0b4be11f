//! # Integration Traits
//!
//! Implemented by the host, called by [`SyncDriver`](crate::SyncDriver).
//!
//! ```text
//! vantage_sync defines:    host implements:
//! ┌──────────────────┐    ┌──────────────────┐
//! │ trait Transport  │ ←─ │ impl Transport   │
//! └──────────────────┘    └──────────────────┘
//! ```

use crate::client::ClientId;
use crate::entity::{EntityId, EntityView};

/// Spatial interest query.
///
/// Implementations must only read; the driver calls this once per entity
/// per cycle with no entity lock held.
pub trait InterestScan {
    /// Appends every client currently in range of `entity` to `out`.
    ///
    /// `out` is cleared by the caller. Duplicates are tolerated.
    fn clients_in_range(&self, entity: &EntityView, out: &mut Vec<ClientId>);
}

/// Outbound delivery of encoded frames.
pub trait Transport {
    /// Sends one encoded entity frame to `client`.
    fn send_update(&mut self, client: ClientId, entity: EntityId, frame: Vec<u8>);

    /// Tells `client` that `entity` is no longer visible.
    fn send_despawn(&mut self, client: ClientId, entity: EntityId);
}

impl<F> InterestScan for F
where
    F: Fn(&EntityView, &mut Vec<ClientId>),
{
    fn clients_in_range(&self, entity: &EntityView, out: &mut Vec<ClientId>) {
        self(entity, out);
    }
}
