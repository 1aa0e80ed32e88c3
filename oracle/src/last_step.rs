//! Last-Step Cache: durable record of the highest real trace index.
//!
//! Written once the provider discovers the program exited, next to the
//! synthetic proof record it protects. The cache is advisory: a missing or
//! unreadable marker only costs a recomputation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::{read_json, write_json, CodecError};

/// Marker file under the data directory.
pub const LAST_STEP_FILE: &str = "last_step.json.gz";

/// Persisted marker: the last trace index backed by a real instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastStepMarkerV1 {
    pub step: u64,
}

#[derive(Debug, Clone)]
pub struct LastStepCache {
    path: PathBuf,
}

impl LastStepCache {
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(LAST_STEP_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached last step.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotFound`] until a termination has been recorded.
    pub fn read(&self) -> Result<u64, CodecError> {
        read_json::<LastStepMarkerV1>(&self.path).map(|marker| marker.step)
    }

    /// Record `step` as the last real trace index. Overwrites any prior value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] on encode or filesystem failure.
    pub fn write(&self, step: u64) -> Result<(), CodecError> {
        write_json(&self.path, &LastStepMarkerV1 { step })
    }
}
