//! `CommandEngine`: runs the VM binary as a subprocess to materialize proofs.
//!
//! Each invocation resumes from the latest snapshot below the target index,
//! runs until one step past it, and asks the VM to write:
//!
//! ```text
//! <dir>/proofs/<proof_at>.json.gz    : the requested proof record
//! <dir>/snapshots/<n>.json.gz        : periodic snapshots for later resumes
//! <dir>/final.json.gz                : the state where the VM stopped
//! ```
//!
//! If the program exits before `proof_at`, no proof record is written and
//! the final state is exited: exactly the engine postcondition the
//! provider relies on.
//!
//! The VM's stdout and stderr are forwarded line by line to `tracing` at
//! debug level as the run progresses; only a bounded stderr tail is kept
//! for the failure report.

use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::contract::{EngineError, StepEngine};
use crate::store::{FINAL_STATE_FILE, PROOFS_DIR, PROOF_FILE_EXT};

/// Subdirectory holding engine snapshots.
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// Bytes of stderr kept in [`EngineError::Failed`].
const STDERR_TAIL_BYTES: usize = 2048;

#[derive(Debug, Clone)]
pub struct CommandEngine {
    config: EngineConfig,
    absolute_pre_state: PathBuf,
}

impl CommandEngine {
    #[must_use]
    pub fn new(config: EngineConfig, absolute_pre_state: impl Into<PathBuf>) -> Self {
        Self {
            config,
            absolute_pre_state: absolute_pre_state.into(),
        }
    }

    /// Arguments for a run that starts from `start` and proves `proof_at`.
    #[must_use]
    pub fn run_args(&self, dir: &Path, start: &Path, proof_at: u64) -> Vec<String> {
        let proof_fmt = dir.join(PROOFS_DIR).join(format!("%d.{PROOF_FILE_EXT}"));
        let snapshot_fmt = dir.join(SNAPSHOTS_DIR).join(format!("%d.{PROOF_FILE_EXT}"));
        let mut args = vec![
            "run".to_string(),
            "--input".to_string(),
            start.display().to_string(),
            "--output".to_string(),
            dir.join(FINAL_STATE_FILE).display().to_string(),
            "--meta".to_string(),
            String::new(),
            "--info-at".to_string(),
            format!("%{}", self.config.info_freq),
            "--proof-at".to_string(),
            format!("={proof_at}"),
            "--proof-fmt".to_string(),
            proof_fmt.display().to_string(),
            "--snapshot-at".to_string(),
            format!("%{}", self.config.snapshot_freq),
            "--snapshot-fmt".to_string(),
            snapshot_fmt.display().to_string(),
            "--stop-at".to_string(),
            format!("={}", proof_at.saturating_add(1)),
        ];
        if !self.config.server.is_empty() {
            args.push("--".to_string());
            args.extend(self.config.server.iter().cloned());
        }
        args
    }
}

impl StepEngine for CommandEngine {
    fn generate_proof(&mut self, dir: &Path, proof_at: u64) -> Result<(), EngineError> {
        let snapshot_dir = dir.join(SNAPSHOTS_DIR);
        let start = find_starting_snapshot(&snapshot_dir, &self.absolute_pre_state, proof_at)?;
        for sub in [dir.join(PROOFS_DIR), snapshot_dir] {
            fs::create_dir_all(&sub).map_err(|source| EngineError::Prepare { path: sub, source })?;
        }

        let args = self.run_args(dir, &start, proof_at);
        info!(
            proof_at,
            start = %start.display(),
            executable = %self.config.executable.display(),
            "Generating trace"
        );
        debug!(?args, "Engine arguments");

        let started = Instant::now();
        let mut child = Command::new(&self.config.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                executable: self.config.executable.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let forwarder = thread::spawn(move || {
            if let Some(stdout) = stdout {
                forward_lines(stdout, "stdout");
            }
        });
        let stderr = child
            .stderr
            .take()
            .map(|stderr| forward_lines(stderr, "stderr"))
            .unwrap_or_default();
        let status = child.wait().map_err(|err| EngineError::Other {
            detail: format!("cannot wait for engine: {err}"),
        })?;
        if forwarder.join().is_err() {
            warn!("Engine stdout forwarder panicked");
        }
        let elapsed = started.elapsed();

        if !status.success() {
            return Err(EngineError::Failed {
                status: status.to_string(),
                stderr: stderr_tail(&stderr),
            });
        }
        info!(proof_at, elapsed_secs = elapsed.as_secs_f64(), "Trace generated");
        Ok(())
    }
}

/// Pick the state to resume from: the highest snapshot strictly below
/// `proof_at`, or the absolute pre-state when none exists.
///
/// # Errors
///
/// [`EngineError::InvalidSnapshot`] for a `.json.gz` file whose stem is not
/// an index; [`EngineError::Prepare`] if the directory cannot be listed.
pub fn find_starting_snapshot(
    snapshot_dir: &Path,
    absolute_pre_state: &Path,
    proof_at: u64,
) -> Result<PathBuf, EngineError> {
    let entries = match fs::read_dir(snapshot_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(absolute_pre_state.to_path_buf())
        }
        Err(source) => {
            return Err(EngineError::Prepare {
                path: snapshot_dir.to_path_buf(),
                source,
            })
        }
    };

    let suffix = format!(".{PROOF_FILE_EXT}");
    let mut best: Option<u64> = None;
    for entry in entries {
        let entry = entry.map_err(|source| EngineError::Prepare {
            path: snapshot_dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(stem) = name.strip_suffix(&suffix) else {
            continue;
        };
        // In-flight writes from an interrupted run.
        if stem.starts_with('.') {
            continue;
        }
        let index: u64 = stem
            .parse()
            .map_err(|_| EngineError::InvalidSnapshot { name: name.clone() })?;
        if index < proof_at && best < Some(index) {
            best = Some(index);
        }
    }

    Ok(match best {
        Some(index) => snapshot_dir.join(format!("{index}{suffix}")),
        None => absolute_pre_state.to_path_buf(),
    })
}

/// Log each line of `reader` until EOF. Returns the last bytes read, at
/// least [`STDERR_TAIL_BYTES`] of them when that many were produced.
fn forward_lines(reader: impl Read, stream: &'static str) -> Vec<u8> {
    let mut tail = Vec::new();
    for line in BufReader::new(reader).split(b'\n') {
        let Ok(line) = line else {
            break;
        };
        debug!(stream, line = %String::from_utf8_lossy(&line).trim_end(), "engine");
        tail.extend_from_slice(&line);
        tail.push(b'\n');
        if tail.len() > 2 * STDERR_TAIL_BYTES {
            tail.drain(..tail.len() - STDERR_TAIL_BYTES);
        }
    }
    tail
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}
