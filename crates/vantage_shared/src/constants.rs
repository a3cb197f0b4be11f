//! # Wire & Sync Constants
//!
//! Defaults baked into both ends of the entity stream.
//!
//! **CRITICAL:** `ENTITY_HEADER_SIZE` is part of the wire contract.
//! Changing it breaks every deployed client.

// =============================================================================
// WIRE LAYOUT
// =============================================================================

/// Size of the fixed entity header in bytes.
///
/// `id (8) | kind (8) | x (4) | y (4) | z (4) | range (4)`
pub const ENTITY_HEADER_SIZE: usize = 32;

/// Default upper bound for one encoded entity frame (MTU-safe).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1200;

/// Default upper bound for an attribute key on the wire.
pub const DEFAULT_MAX_KEY_LEN: usize = 255;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// First identifier handed out by a fresh allocator.
///
/// Zero is never allocated so it can serve as a "no entity" marker.
pub const DEFAULT_FIRST_ENTITY_ID: u64 = 1;
