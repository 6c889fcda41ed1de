//! Configuration module for the filer.

use crate::error::{FilerError, Result};
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default number of entries requested per directory listing page.
pub const PAGINATION_SIZE: usize = 1024;

/// Main configuration for a filer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilerConfig {
    /// Listing batch size, also the "last page" threshold of a subtree walk.
    pub pagination_size: usize,
    /// Chunk reclamation queue configuration.
    pub reclaim: ReclaimConfig,
    /// Directory listing cache configuration.
    pub cache: ListingCacheConfig,
    /// Observability configuration.
    pub observability: ObservabilityConfig,
}

impl Default for FilerConfig {
    fn default() -> Self {
        Self {
            pagination_size: PAGINATION_SIZE,
            reclaim: ReclaimConfig::default(),
            cache: ListingCacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl FilerConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FilerError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| FilerError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.pagination_size == 0 {
            return Err(FilerError::InvalidConfig {
                field: "pagination_size".to_string(),
                reason: "Pagination size must be non-zero".to_string(),
            });
        }

        if self.reclaim.queue_capacity == 0 {
            return Err(FilerError::InvalidConfig {
                field: "reclaim.queue_capacity".to_string(),
                reason: "Queue capacity must be non-zero".to_string(),
            });
        }

        if self.reclaim.batch_size == 0 {
            return Err(FilerError::InvalidConfig {
                field: "reclaim.batch_size".to_string(),
                reason: "Batch size must be non-zero".to_string(),
            });
        }

        if self.reclaim.retry.max_attempts == 0 {
            return Err(FilerError::InvalidConfig {
                field: "reclaim.retry.max_attempts".to_string(),
                reason: "At least one attempt is required".to_string(),
            });
        }

        let multiplier = self.reclaim.retry.multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(FilerError::InvalidConfig {
                field: "reclaim.retry.multiplier".to_string(),
                reason: format!("Backoff multiplier must be at least 1.0, got {}", multiplier),
            });
        }

        Ok(())
    }

    /// Small pages and a tiny queue, for tests and local runs.
    pub fn development() -> Self {
        Self {
            pagination_size: 8,
            reclaim: ReclaimConfig {
                queue_capacity: 16,
                batch_size: 4,
                retry: RetryConfig::quick(),
            },
            cache: ListingCacheConfig {
                max_entries: 64,
                max_age: Duration::from_secs(5),
            },
            observability: ObservabilityConfig {
                log_level: "debug".to_string(),
                json_logs: false,
            },
        }
    }
}

/// Chunk reclamation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReclaimConfig {
    /// Maximum number of chunk batches waiting for the worker.
    pub queue_capacity: usize,
    /// Maximum file ids sent to the deleter in one call.
    pub batch_size: usize,
    /// Retry policy for deleter calls.
    pub retry: RetryConfig,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            batch_size: 1000,
            retry: RetryConfig::default(),
        }
    }
}

/// Directory listing cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingCacheConfig {
    /// Maximum number of cached directories.
    pub max_entries: usize,
    /// Maximum age of a cached listing.
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
}

impl Default for ListingCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 4096,
            max_age: Duration::from_secs(60),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level.
    pub log_level: String,
    /// Enable JSON logging.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Serde helper for Duration using humantime format.
pub mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        } else if let Some(s_val) = s.strip_suffix('s') {
            s_val
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| e.to_string())
        } else if let Some(m) = s.strip_suffix('m') {
            let minutes = m.parse::<u64>().map_err(|e| e.to_string())?;
            minutes
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("duration out of range: {}", s))
        } else {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        }
    }
}
