//! # Sync Configuration
//!
//! Loaded once at startup from TOML.
//!
//! ```toml
//! max_frame_bytes = 1200
//! max_key_len = 64
//! first_entity_id = 1000
//! ```

use std::path::Path;

use serde::Deserialize;
use vantage_core::IdAllocator;
use vantage_shared::{
    DEFAULT_FIRST_ENTITY_ID, DEFAULT_MAX_FRAME_BYTES, DEFAULT_MAX_KEY_LEN, ENTITY_HEADER_SIZE,
};

use crate::error::{SyncError, SyncResult};

/// Configuration for encoding and identifier allocation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Upper bound for one encoded entity frame, header included.
    pub max_frame_bytes: usize,
    /// Upper bound for an attribute key in bytes.
    pub max_key_len: usize,
    /// First identifier handed out by the entity allocator.
    pub first_entity_id: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            max_key_len: DEFAULT_MAX_KEY_LEN,
            first_entity_id: DEFAULT_FIRST_ENTITY_ID,
        }
    }
}

impl SyncConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> SyncResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SyncError::ConfigIo(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded sync config");
        Ok(config)
    }

    /// Builds the entity id allocator this configuration describes.
    #[must_use]
    pub const fn id_allocator(&self) -> IdAllocator {
        IdAllocator::starting_at(self.first_entity_id)
    }

    /// Checks the invariants the encoder and allocator rely on.
    pub fn validate(&self) -> SyncResult<()> {
        if self.max_frame_bytes < ENTITY_HEADER_SIZE {
            return Err(SyncError::InvalidConfig(format!(
                "max_frame_bytes {} is smaller than the {ENTITY_HEADER_SIZE}-byte header",
                self.max_frame_bytes
            )));
        }
        if self.max_key_len == 0 || self.max_key_len > usize::from(u16::MAX) {
            return Err(SyncError::InvalidConfig(format!(
                "max_key_len {} must be between 1 and {}",
                self.max_key_len,
                u16::MAX
            )));
        }
        if self.first_entity_id == 0 {
            return Err(SyncError::InvalidConfig(
                "first_entity_id 0 is reserved".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_frame_bytes, 1200);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str("max_key_len = 64").unwrap();
        assert_eq!(config.max_key_len, 64);
        assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
        assert_eq!(config.first_entity_id, 1);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = SyncConfig::from_toml_str("tick_rate = 60").unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }

    #[test]
    fn test_frame_smaller_than_header_rejected() {
        let err = SyncConfig::from_toml_str("max_frame_bytes = 16").unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }

    #[test]
    fn test_reserved_first_id_rejected() {
        assert!(SyncConfig::from_toml_str("first_entity_id = 0").is_err());
    }

    #[test]
    fn test_allocator_starts_at_configured_id() {
        let config = SyncConfig::from_toml_str("first_entity_id = 1000").unwrap();
        let ids = config.id_allocator();
        assert_eq!(ids.allocate(), Some(1000));
        assert_eq!(ids.allocate(), Some(1001));
    }

    #[test]
    fn test_missing_file() {
        let err = SyncConfig::load("/nonexistent/vantage.toml").unwrap_err();
        assert!(matches!(err, SyncError::ConfigIo(_)));
    }
}
