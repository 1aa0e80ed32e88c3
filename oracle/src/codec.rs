//! Compressed structured files: read/write JSON records, gzipped when the
//! path ends in `.gz`.
//!
//! # Fail-closed semantics
//!
//! - A missing file is [`CodecError::NotFound`] and nothing else. Callers
//!   branch on it; every other failure is fatal to them.
//! - A file that exists but does not decode is [`CodecError::Decode`], even
//!   when the underlying cause is a broken gzip stream.
//! - Writes go to a hidden temp file in the target directory and are renamed
//!   into place, so a reader never observes a half-written record.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Prefix of in-flight temp files written by [`write_json`].
pub const TEMP_PREFIX: &str = ".tmp_";

/// Error reading or writing a structured file.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The file does not exist.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },
    /// Any other I/O failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file exists but is not a valid record.
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The value could not be serialized.
    #[error("cannot encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The file this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::Decode { path, .. }
            | Self::Encode { path, .. } => path,
        }
    }
}

fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn io_error(path: &Path, source: io::Error) -> CodecError {
    CodecError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read and decode a JSON record.
///
/// # Errors
///
/// Returns [`CodecError::NotFound`] if the file does not exist,
/// [`CodecError::Io`] if it cannot be opened, and [`CodecError::Decode`]
/// if its contents are not a valid `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CodecError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            CodecError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            io_error(path, source)
        }
    })?;
    let reader = BufReader::new(file);
    let decoded = if is_compressed(path) {
        serde_json::from_reader(GzDecoder::new(reader))
    } else {
        serde_json::from_reader(reader)
    };
    decoded.map_err(|source| CodecError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode and write a JSON record, replacing any existing file.
///
/// Creates the parent directory if needed.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] on serialization failure and
/// [`CodecError::Io`] on any filesystem failure.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CodecError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

    let file_name = path.file_name().ok_or_else(|| {
        io_error(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let temp_path = dir.join(format!("{TEMP_PREFIX}{}", file_name.to_string_lossy()));

    let written = write_encoded(&temp_path, path, value)
        .and_then(|()| fs::rename(&temp_path, path).map_err(|source| io_error(path, source)));
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

fn write_encoded<T: Serialize>(
    temp_path: &Path,
    target: &Path,
    value: &T,
) -> Result<(), CodecError> {
    let encode_error = |source| CodecError::Encode {
        path: target.to_path_buf(),
        source,
    };
    let file = File::create(temp_path).map_err(|source| io_error(temp_path, source))?;
    let mut writer = BufWriter::new(file);
    if is_compressed(target) {
        let mut encoder = GzEncoder::new(&mut writer, Compression::default());
        serde_json::to_writer(&mut encoder, value).map_err(encode_error)?;
        encoder
            .finish()
            .map_err(|source| io_error(temp_path, source))?;
    } else {
        serde_json::to_writer(&mut writer, value).map_err(encode_error)?;
    }
    writer
        .flush()
        .map_err(|source| io_error(temp_path, source))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|source| io_error(temp_path, source))
}
