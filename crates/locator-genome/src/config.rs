//! Tracker configuration.
//!
//! Loaded from YAML; every field is optional and falls back to its default.
//!
//! ```yaml
//! knowledge_path: .genome/knowledge.json
//! flush_interval_ms: 30000
//! capture_timeout_ms: 5000
//! snapshot_capacity: 100
//! event_capacity: 256
//! extra_generated_class_patterns:
//!   - "^tw-"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::history::DEFAULT_SNAPSHOT_CAPACITY;
use crate::result::{GenomeError, GenomeResult};
use crate::selector::GeneratedClassFilter;

/// Default knowledge file location, relative to the working directory
pub const DEFAULT_KNOWLEDGE_PATH: &str = ".genome/knowledge.json";

/// Default autosave interval
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 30_000;

/// Default time allowed for one element lookup
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 5_000;

/// Default event channel buffer
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for an [`EvolutionTracker`](crate::EvolutionTracker)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Knowledge file
    pub knowledge_path: PathBuf,
    /// Autosave interval in milliseconds
    pub flush_interval_ms: u64,
    /// Lookup timeout in milliseconds
    pub capture_timeout_ms: u64,
    /// Snapshots kept per element
    pub snapshot_capacity: usize,
    /// Event channel buffer
    pub event_capacity: usize,
    /// Regexes appended to the generated-class patterns
    pub extra_generated_class_patterns: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            knowledge_path: PathBuf::from(DEFAULT_KNOWLEDGE_PATH),
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            capture_timeout_ms: DEFAULT_CAPTURE_TIMEOUT_MS,
            snapshot_capacity: DEFAULT_SNAPSHOT_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            extra_generated_class_patterns: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> GenomeResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file
    pub fn from_yaml_file(path: &Path) -> GenomeResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Set the knowledge file
    #[must_use]
    pub fn with_knowledge_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.knowledge_path = path.into();
        self
    }

    /// Set the autosave interval
    #[must_use]
    pub const fn with_flush_interval_ms(mut self, ms: u64) -> Self {
        self.flush_interval_ms = ms;
        self
    }

    /// Set the lookup timeout
    #[must_use]
    pub const fn with_capture_timeout_ms(mut self, ms: u64) -> Self {
        self.capture_timeout_ms = ms;
        self
    }

    /// Set the per-element snapshot capacity
    #[must_use]
    pub const fn with_snapshot_capacity(mut self, capacity: usize) -> Self {
        self.snapshot_capacity = capacity;
        self
    }

    /// Set the event channel buffer
    #[must_use]
    pub const fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Append a generated-class regex
    #[must_use]
    pub fn with_generated_class_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.extra_generated_class_patterns.push(pattern.into());
        self
    }

    /// Autosave interval
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Lookup timeout
    #[must_use]
    pub const fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    /// Default generated-class filter extended with the configured patterns
    pub fn class_filter(&self) -> GenomeResult<GeneratedClassFilter> {
        self.extra_generated_class_patterns
            .iter()
            .try_fold(GeneratedClassFilter::new(), |filter, pattern| {
                filter.with_pattern(pattern)
            })
    }

    /// Reject values the tracker cannot run with
    pub fn validate(&self) -> GenomeResult<()> {
        if self.knowledge_path.as_os_str().is_empty() {
            return Err(GenomeError::config("knowledge_path must not be empty"));
        }
        if self.flush_interval_ms == 0 {
            return Err(GenomeError::config("flush_interval_ms must be positive"));
        }
        if self.capture_timeout_ms == 0 {
            return Err(GenomeError::config("capture_timeout_ms must be positive"));
        }
        if self.snapshot_capacity == 0 {
            return Err(GenomeError::config("snapshot_capacity must be positive"));
        }
        if self.event_capacity == 0 {
            return Err(GenomeError::config("event_capacity must be positive"));
        }
        self.class_filter().map(|_| ())
    }
}
