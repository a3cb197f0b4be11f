//! # Reference Synchronization Driver
//!
//! One call to [`SyncDriver::run_cycle`] is one synchronization cycle:
//!
//! ```text
//! for each entity:
//!   1. interest   uncheck_all → scan → subscribe/mark_checked → departed → despawn
//!   2. scalars    begin_sync → commit_sync
//!   3. diff       diff_since(client) for every subscriber
//!   4. encode     serialize_batch → Transport::send_update (one or more frames)
//! ```
//!
//! The driver is single-threaded. Hosts that want to parallelize across
//! entities can run one driver per shard; each entity must only be handed
//! to one driver per cycle.

use std::borrow::Borrow;

use crate::client::ClientId;
use crate::config::SyncConfig;
use crate::entity::SyncEntity;
use crate::integration::{InterestScan, Transport};
use crate::protocol::FrameWriter;

/// Counters for one cycle, or accumulated over many.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Entities visited.
    pub entities: u64,
    /// Clients that started seeing an entity.
    pub entered: u64,
    /// Clients that stopped seeing an entity.
    pub exited: u64,
    /// Update frames handed to the transport.
    pub frames: u64,
    /// Total bytes of those frames.
    pub bytes: u64,
    /// Frames that could not be encoded.
    pub encode_failures: u64,
}

impl CycleStats {
    /// Adds `other` into `self`.
    pub fn absorb(&mut self, other: &Self) {
        self.entities += other.entities;
        self.entered += other.entered;
        self.exited += other.exited;
        self.frames += other.frames;
        self.bytes += other.bytes;
        self.encode_failures += other.encode_failures;
    }
}

/// Drives synchronization cycles over a set of entities.
#[derive(Debug)]
pub struct SyncDriver {
    config: SyncConfig,
    writer: FrameWriter,
    candidates: Vec<ClientId>,
    totals: CycleStats,
    cycles: u64,
}

impl SyncDriver {
    /// Creates a driver.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        let writer = FrameWriter::with_capacity(config.max_frame_bytes);
        Self {
            config,
            writer,
            candidates: Vec::new(),
            totals: CycleStats::default(),
            cycles: 0,
        }
    }

    /// Returns the active configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Number of completed cycles.
    #[inline]
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Counters accumulated over every completed cycle.
    #[inline]
    #[must_use]
    pub const fn totals(&self) -> &CycleStats {
        &self.totals
    }

    /// Runs one synchronization cycle.
    pub fn run_cycle<E, S, T>(&mut self, entities: &[E], scan: &S, transport: &mut T) -> CycleStats
    where
        E: Borrow<SyncEntity>,
        S: InterestScan + ?Sized,
        T: Transport + ?Sized,
    {
        let mut stats = CycleStats::default();
        for entity in entities {
            self.sync_entity(entity.borrow(), scan, transport, &mut stats);
        }

        self.cycles += 1;
        self.totals.absorb(&stats);
        tracing::trace!(
            cycle = self.cycles,
            entities = stats.entities,
            frames = stats.frames,
            bytes = stats.bytes,
            "sync cycle complete"
        );
        stats
    }

    fn sync_entity<S, T>(
        &mut self,
        entity: &SyncEntity,
        scan: &S,
        transport: &mut T,
        stats: &mut CycleStats,
    ) where
        S: InterestScan + ?Sized,
        T: Transport + ?Sized,
    {
        let id = entity.id();
        stats.entities += 1;

        // 1. Interest.
        entity.uncheck_all();
        self.candidates.clear();
        scan.clients_in_range(&entity.view(), &mut self.candidates);

        let mut entered = Vec::new();
        for &client in &self.candidates {
            if entity.subscribe(client) {
                tracing::debug!(entity = id.0, client = client.raw(), "client entered range");
                entered.push(client);
            }
            entity.mark_checked(client);
        }
        stats.entered += entered.len() as u64;

        for client in entity.departed() {
            if entity.unsubscribe(client) {
                tracing::debug!(entity = id.0, client = client.raw(), "client left range");
                transport.send_despawn(client, id);
                stats.exited += 1;
            }
        }

        // 2. Scalars.
        let scalars_changed = !entity.begin_sync().is_empty();
        entity.commit_sync();

        // 3 + 4. Per-client diff and encode.
        for client in entity.subscribers() {
            let changed = entity.diff_since(client);
            if changed.is_empty() && !scalars_changed && !entered.contains(&client) {
                continue;
            }

            let batch = entity.serialize_batch(changed, &self.config, &mut self.writer);
            for (key, error) in &batch.rejected {
                // Not retried: the key goes out again once its value changes.
                stats.encode_failures += 1;
                tracing::warn!(entity = id.0, client = client.raw(), key = %key, %error, "attribute dropped");
            }
            for frame in batch.frames {
                stats.frames += 1;
                stats.bytes += frame.len() as u64;
                tracing::trace!(entity = id.0, client = client.raw(), bytes = frame.len(), "frame encoded");
                transport.send_update(client, id, frame);
            }
        }
    }
}
