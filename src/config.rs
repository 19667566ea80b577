use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TransferError};

const KILOBYTE: usize = 1024;
const MEGABYTE: usize = 1024 * KILOBYTE;

/// Tunables of a [`crate::TransferService`].
///
/// The host shell owns configuration; it can hand it over as JSON with
/// [`TransferConfig::from_json`]. Missing fields fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Size of the buffer each copy reads into and writes from.
    pub chunk_size: usize,
    /// Copies allowed to run at the same time; the rest wait for a slot.
    pub max_concurrent_copies: usize,
    pub pick_timeout_ms: Option<u64>,
    pub copy_timeout_ms: Option<u64>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8 * KILOBYTE,
            max_concurrent_copies: 4,
            pick_timeout_ms: None,
            copy_timeout_ms: None,
        }
    }
}

impl TransferConfig {
    pub fn low_memory() -> Self {
        Self {
            chunk_size: KILOBYTE,
            max_concurrent_copies: 1,
            ..Self::default()
        }
    }

    pub fn balanced() -> Self {
        Self::default()
    }

    pub fn high_throughput() -> Self {
        Self {
            chunk_size: MEGABYTE,
            max_concurrent_copies: 8,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: TransferConfig = serde_json::from_str(json)
            .map_err(|e| TransferError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(TransferError::Config(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.max_concurrent_copies == 0 {
            return Err(TransferError::Config(
                "max_concurrent_copies must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn pick_timeout(&self) -> Option<Duration> {
        self.pick_timeout_ms.map(Duration::from_millis)
    }

    pub fn copy_timeout(&self) -> Option<Duration> {
        self.copy_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            TransferConfig::from_json(r#"{"chunk_size": 1024, "pick_timeout_ms": 500}"#)
                .unwrap();
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.max_concurrent_copies, 4);
        assert_eq!(config.pick_timeout(), Some(Duration::from_millis(500)));
        assert_eq!(config.copy_timeout(), None);
    }

    #[rstest]
    #[case(r#"{"chunk_size": 0}"#)]
    #[case(r#"{"max_concurrent_copies": 0}"#)]
    #[case(r#"{"chunk_size": "big"}"#)]
    fn invalid_json_is_a_config_error(#[case] json: &str) {
        let err = TransferConfig::from_json(json).unwrap_err();
        assert!(matches!(err, TransferError::Config(_)));
    }

    #[rstest]
    #[case(TransferConfig::low_memory())]
    #[case(TransferConfig::balanced())]
    #[case(TransferConfig::high_throughput())]
    fn presets_are_valid(#[case] config: TransferConfig) {
        assert!(config.validate().is_ok());
    }
}
