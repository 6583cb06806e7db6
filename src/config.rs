//! Configuration for LogKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KvError, Result};

/// Main configuration for a LogKV engine
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the data file
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── logkv.data          (active data file)
    ///     ├── logkv.data.merge    (only present while a merge is running)
    ///     └── logkv.data.torn     (bytes cut by a torn tail repair)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the data file
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Recovery Configuration
    // -------------------------------------------------------------------------
    /// Cut an incomplete final record even when it is large enough to hide
    /// later records. The cut bytes are copied to `logkv.data.torn` first.
    /// Small torn tails (a partial header, or too short to hold another
    /// record) are always cut.
    pub repair_torn_tail: bool,
}

/// Data file sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Never fsync on append; rely on the OS page cache (fastest)
    Never,

    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced appends (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./logkv_data"),
            sync_strategy: SyncStrategy::Never,
            repair_torn_tail: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> Result<()> {
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(KvError::Config(
                "EveryNEntries sync strategy needs a count of at least 1".to_string(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(KvError::Config("data_dir must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Allow recovery to cut large torn tails (saving them aside)
    pub fn repair_torn_tail(mut self, repair: bool) -> Self {
        self.config.repair_torn_tail = repair;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
