//! # Sync Error Types
//!
//! Only encoding, decoding and configuration can fail. Everything else in
//! the engine reports through return values (`None`, `false`, no-op).

use thiserror::Error;

/// Errors raised while encoding frames or loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The encoded frame does not fit the configured budget.
    #[error("frame too large: {size} bytes, limit {max}")]
    FrameTooLarge {
        /// Encoded size in bytes.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// An attribute key is longer than the wire allows.
    #[error("attribute key too long: {len} bytes, limit {max}")]
    KeyTooLong {
        /// Key length in bytes.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// More changed attributes than one frame can carry.
    #[error("too many attributes in one frame: {0}")]
    TooManyAttributes(usize),

    /// A text or bytes value is longer than the wire allows.
    #[error("attribute value too long: {0} bytes")]
    ValueTooLong(usize),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("could not read configuration: {0}")]
    ConfigIo(String),
}

/// Errors raised while decoding an entity frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before the field was complete.
    #[error("truncated frame: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the next field needs.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// Unknown attribute value tag.
    #[error("unknown attribute tag: {0}")]
    UnknownTag(u8),

    /// A key or text value is not valid UTF-8.
    #[error("invalid utf-8 in frame")]
    InvalidUtf8,

    /// Bytes left over after the last attribute.
    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),
}

/// Result type for encoding and configuration.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for decoding.
pub type WireResult<T> = Result<T, WireError>;
