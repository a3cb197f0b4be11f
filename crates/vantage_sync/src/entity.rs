//! # Sync Entity
//!
//! One synchronized unit of world state and everything the sync cycle
//! needs to replicate it.
//!
//! ## Lock Domains
//!
//! ```text
//! ┌──────────────────────── SyncEntity ────────────────────────┐
//! │ id / kind / range            immutable, no lock            │
//! │ state      Mutex ── position cell, dimension cell, flags,  │
//! │                     visibility set, lifecycle phase        │
//! │ attributes Mutex ── values, change log, client watermarks  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! No operation holds both locks at once, and neither is held while a frame
//! is being encoded.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use vantage_core::{CellState, IdAllocator, PropertyCell};
use vantage_shared::Vec3;

use crate::attributes::{AttributeStore, AttributeValue, ChangedKeys, FromAttribute};
use crate::client::ClientId;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::protocol::{encode_entity_frame, encode_entity_frames, EntityHeader, FrameBatch, FrameWriter};
use crate::visibility::VisibilitySet;

/// Stable identity of a synchronized entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Immutable classification tag of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EntityKind(pub u64);

/// Entity bitmask, guarded by the same lock as position and dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EntityFlags(u32);

impl EntityFlags {
    /// No flag set.
    pub const NONE: Self = Self(0);

    /// Wraps raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets every bit of `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears every bit of `other`.
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for EntityFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Lifecycle phase of an entity.
///
/// Retirement is the external driver's call; see [`SyncEntity::can_retire`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EntityPhase {
    /// Constructed, never subscribed to any client.
    #[default]
    Created,
    /// Subscribed to at least one client at some point.
    Active,
}

/// Scalar values captured by [`SyncEntity::begin_sync`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PendingScalars {
    /// Captured position, if it changed.
    pub position: Option<Vec3>,
    /// Captured dimension, if it changed.
    pub dimension: Option<i32>,
}

impl PendingScalars {
    /// Returns true if nothing was captured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position.is_none() && self.dimension.is_none()
    }
}

/// Consistent read of an entity's committed spatial state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityView {
    /// Entity identifier.
    pub id: EntityId,
    /// Classification tag.
    pub kind: EntityKind,
    /// Committed position.
    pub position: Vec3,
    /// Committed dimension.
    pub dimension: i32,
    /// Scan radius.
    pub range: u32,
}

/// Everything behind the entity lock.
#[derive(Debug)]
struct EntityState {
    position: PropertyCell<Vec3>,
    dimension: PropertyCell<i32>,
    flags: EntityFlags,
    visibility: VisibilitySet,
    phase: EntityPhase,
}

/// A synchronized entity.
///
/// Shared between gameplay threads (writers) and one sync caller at a time,
/// typically behind an `Arc`.
#[derive(Debug)]
pub struct SyncEntity {
    id: EntityId,
    kind: EntityKind,
    range: u32,
    state: Mutex<EntityState>,
    attributes: AttributeStore,
}

impl SyncEntity {
    /// Creates an entity with an externally allocated id.
    #[must_use]
    pub fn new(id: EntityId, kind: EntityKind, range: u32, position: Vec3, dimension: i32) -> Self {
        Self {
            id,
            kind,
            range,
            state: Mutex::new(EntityState {
                position: PropertyCell::new(position),
                dimension: PropertyCell::new(dimension),
                flags: EntityFlags::NONE,
                visibility: VisibilitySet::new(),
                phase: EntityPhase::Created,
            }),
            attributes: AttributeStore::new(),
        }
    }

    /// Creates an entity with a fresh id from `ids`.
    ///
    /// Returns `None` if the allocator is exhausted.
    #[must_use]
    pub fn spawn(
        ids: &IdAllocator,
        kind: EntityKind,
        range: u32,
        position: Vec3,
        dimension: i32,
    ) -> Option<Self> {
        let id = EntityId(ids.allocate()?);
        Some(Self::new(id, kind, range, position, dimension))
    }

    /// Returns the entity identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the classification tag.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the scan radius.
    #[inline]
    #[must_use]
    pub const fn range(&self) -> u32 {
        self.range
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    /// Returns the last committed position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        *self.state.lock().position.current()
    }

    /// Queues a new position for the next sync cycle.
    pub fn set_position(&self, position: Vec3) {
        self.state.lock().position.write(position);
    }

    /// Returns the last committed dimension.
    #[must_use]
    pub fn dimension(&self) -> i32 {
        *self.state.lock().dimension.current()
    }

    /// Queues a new dimension for the next sync cycle.
    pub fn set_dimension(&self, dimension: i32) {
        self.state.lock().dimension.write(dimension);
    }

    /// Returns the phase of the position cell.
    #[must_use]
    pub fn position_state(&self) -> CellState {
        self.state.lock().position.state()
    }

    /// Returns the phase of the dimension cell.
    #[must_use]
    pub fn dimension_state(&self) -> CellState {
        self.state.lock().dimension.state()
    }

    /// Returns the current flags.
    #[must_use]
    pub fn flags(&self) -> EntityFlags {
        self.state.lock().flags
    }

    /// Replaces the flags.
    pub fn set_flags(&self, flags: EntityFlags) {
        self.state.lock().flags = flags;
    }

    /// Sets the given flag bits.
    pub fn insert_flags(&self, flags: EntityFlags) {
        self.state.lock().flags.insert(flags);
    }

    /// Clears the given flag bits.
    pub fn remove_flags(&self, flags: EntityFlags) {
        self.state.lock().flags.remove(flags);
    }

    /// Captures pending position and dimension writes for this cycle.
    pub fn begin_sync(&self) -> PendingScalars {
        let mut state = self.state.lock();
        PendingScalars {
            position: state.position.begin_compute(),
            dimension: state.dimension.begin_compute(),
        }
    }

    /// Publishes whatever [`begin_sync`](Self::begin_sync) captured.
    ///
    /// Returns true if at least one value was published.
    pub fn commit_sync(&self) -> bool {
        let mut state = self.state.lock();
        let position = state.position.commit();
        let dimension = state.dimension.commit();
        position || dimension
    }

    /// Reads committed position and dimension under one lock.
    #[must_use]
    pub fn view(&self) -> EntityView {
        let state = self.state.lock();
        EntityView {
            id: self.id,
            kind: self.kind,
            position: *state.position.current(),
            dimension: *state.dimension.current(),
            range: self.range,
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Sets an attribute. Returns the previous value, if any.
    pub fn set_attribute(
        &self,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.attributes.set(key, value)
    }

    /// Removes an attribute. Returns the removed value, if any.
    pub fn unset_attribute(&self, key: &str) -> Option<AttributeValue> {
        self.attributes.unset(key)
    }

    /// Returns a copy of an attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<AttributeValue> {
        self.attributes.get(key)
    }

    /// Returns an attribute if it holds kind `T`.
    #[must_use]
    pub fn attribute_as<T: FromAttribute>(&self, key: &str) -> Option<T> {
        self.attributes.get_as(key)
    }

    /// Returns the attribute store.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Keys changed since `client` last asked. Consuming advances its watermark.
    pub fn diff_since(&self, client: ClientId) -> ChangedKeys {
        self.attributes.diff_since(client)
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Subscribes `client`. Returns false if it already was.
    pub fn subscribe(&self, client: ClientId) -> bool {
        let mut state = self.state.lock();
        let added = state.visibility.subscribe(client);
        if added && state.phase == EntityPhase::Created {
            state.phase = EntityPhase::Active;
            tracing::debug!(entity = self.id.0, "entity active");
        }
        added
    }

    /// Unsubscribes `client`. Returns false if it was not subscribed.
    ///
    /// Also drops the client's attribute watermark: the remote copy is gone,
    /// so a later re-subscribe must resend every attribute.
    pub fn unsubscribe(&self, client: ClientId) -> bool {
        let removed = self.state.lock().visibility.unsubscribe(client);
        if removed {
            self.attributes.forget_client(client);
        }
        removed
    }

    /// Records that the latest scan found `client` in range.
    pub fn mark_checked(&self, client: ClientId) {
        self.state.lock().visibility.mark_checked(client);
    }

    /// Records that the latest scan did not find `client` in range.
    pub fn mark_unchecked(&self, client: ClientId) {
        self.state.lock().visibility.mark_unchecked(client);
    }

    /// Marks every known client as pending removal, ahead of a new scan.
    pub fn uncheck_all(&self) {
        self.state.lock().visibility.uncheck_all();
    }

    /// Copy of the latest scan results.
    #[must_use]
    pub fn checked_clients(&self) -> HashMap<ClientId, bool> {
        self.state.lock().visibility.checked_clients().clone()
    }

    /// Subscribed clients the latest scan did not confirm.
    #[must_use]
    pub fn departed(&self) -> Vec<ClientId> {
        self.state.lock().visibility.departed()
    }

    /// Subscribed clients in id order.
    #[must_use]
    pub fn subscribers(&self) -> Vec<ClientId> {
        self.state.lock().visibility.subscribed()
    }

    /// Returns true if `client` is subscribed.
    #[must_use]
    pub fn is_subscribed(&self, client: ClientId) -> bool {
        self.state.lock().visibility.is_subscribed(client)
    }

    /// Returns the number of subscribed clients.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().visibility.len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> EntityPhase {
        self.state.lock().phase
    }

    /// Returns true once the entity has been active and nobody sees it any more.
    #[must_use]
    pub fn can_retire(&self) -> bool {
        let state = self.state.lock();
        state.phase == EntityPhase::Active && state.visibility.is_empty()
    }

    // =========================================================================
    // Wire
    // =========================================================================

    /// Returns the fixed header built from committed state.
    #[must_use]
    pub fn header(&self) -> EntityHeader {
        EntityHeader {
            id: self.id.0,
            kind: self.kind.0,
            position: self.position(),
            range: self.range,
        }
    }

    /// Encodes this entity plus the given changed attributes into `writer`.
    ///
    /// Values are copied out under the attribute lock, then encoded with no
    /// lock held.
    pub fn serialize_into<I>(
        &self,
        changed_keys: I,
        config: &SyncConfig,
        writer: &mut FrameWriter,
    ) -> SyncResult<()>
    where
        I: IntoIterator<Item = String>,
    {
        let header = self.header();
        let attributes = self.attributes.snapshot(changed_keys);
        encode_entity_frame(&header, &attributes, config, writer)
    }

    /// Encodes this entity plus the given changed attributes, split over as
    /// many frames as the budget requires.
    ///
    /// See [`encode_entity_frames`] for how oversized attributes are handled.
    pub fn serialize_batch<I>(
        &self,
        changed_keys: I,
        config: &SyncConfig,
        writer: &mut FrameWriter,
    ) -> FrameBatch
    where
        I: IntoIterator<Item = String>,
    {
        let header = self.header();
        let attributes = self.attributes.snapshot(changed_keys);
        encode_entity_frames(&header, &attributes, config, writer)
    }

    /// Encodes this entity plus the given changed attributes into a new frame.
    pub fn serialize<I>(&self, changed_keys: I, config: &SyncConfig) -> SyncResult<Vec<u8>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut writer = FrameWriter::with_capacity(config.max_frame_bytes);
        self.serialize_into(changed_keys, config, &mut writer)?;
        Ok(writer.to_vec())
    }
}
