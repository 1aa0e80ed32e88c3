//! Oracle configuration: where a game's data lives and how to run the engine.
//!
//! Loaded from a JSON file. Validation is fail-closed: a config that would
//! only fail later, mid-game, is rejected up front.
//!
//! ```text
//! {
//!   "data_dir": "/var/lib/steptrace/game-0x1234",
//!   "absolute_pre_state": "/etc/steptrace/prestate.json.gz",
//!   "max_depth": 73,
//!   "engine": {
//!     "executable": "/usr/local/bin/vm",
//!     "server": ["/usr/local/bin/vm-host", "--server"],
//!     "info_freq": 10000000,
//!     "snapshot_freq": 1000000000
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{read_json, CodecError};

/// Default interval, in steps, between engine progress lines.
pub const DEFAULT_INFO_FREQ: u64 = 10_000_000;
/// Default interval, in steps, between engine state snapshots.
pub const DEFAULT_SNAPSHOT_FREQ: u64 = 1_000_000_000;
/// Deepest game the provider accepts: positions at this depth still fit
/// a [`crate::contract::TraceIndex`].
pub const MAX_GAME_DEPTH: u64 = 127;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot load config: {0}")]
    Load(#[from] CodecError),
    #[error("invalid config: {detail}")]
    Invalid { detail: String },
}

/// How to invoke the external step-execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Path to the VM binary.
    pub executable: PathBuf,
    /// Host program the VM talks to, passed after `--`.
    #[serde(default)]
    pub server: Vec<String>,
    #[serde(default = "default_info_freq")]
    pub info_freq: u64,
    #[serde(default = "default_snapshot_freq")]
    pub snapshot_freq: u64,
}

const fn default_info_freq() -> u64 {
    DEFAULT_INFO_FREQ
}

const fn default_snapshot_freq() -> u64 {
    DEFAULT_SNAPSHOT_FREQ
}

impl EngineConfig {
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            server: Vec::new(),
            info_freq: DEFAULT_INFO_FREQ,
            snapshot_freq: DEFAULT_SNAPSHOT_FREQ,
        }
    }
}

/// Configuration for one dispute game's trace provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    /// Directory exclusively owned by this game.
    pub data_dir: PathBuf,
    /// Genesis state file.
    pub absolute_pre_state: PathBuf,
    pub max_depth: u64,
    pub engine: EngineConfig,
}

impl OracleConfig {
    /// Load and validate a JSON (optionally gzipped) config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Load`] if the file cannot be read or parsed,
    /// [`ConfigError::Invalid`] if it fails [`validate`](Self::validate).
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |detail: &str| {
            Err(ConfigError::Invalid {
                detail: detail.to_string(),
            })
        };
        if self.data_dir.as_os_str().is_empty() {
            return invalid("data_dir is empty");
        }
        if self.absolute_pre_state.as_os_str().is_empty() {
            return invalid("absolute_pre_state is empty");
        }
        if self.max_depth == 0 || self.max_depth > MAX_GAME_DEPTH {
            return Err(ConfigError::Invalid {
                detail: format!(
                    "max_depth must be in 1..={MAX_GAME_DEPTH}, got {}",
                    self.max_depth
                ),
            });
        }
        if self.engine.executable.as_os_str().is_empty() {
            return invalid("engine.executable is empty");
        }
        if self.engine.info_freq == 0 {
            return invalid("engine.info_freq must be non-zero");
        }
        if self.engine.snapshot_freq == 0 {
            return invalid("engine.snapshot_freq must be non-zero");
        }
        Ok(())
    }
}
