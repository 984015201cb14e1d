//! Checkpointing of the full engine state.
//!
//! A checkpoint is a JSON document
//!
//! ```text
//! { "format_version": 1, "engine": { ... } }
//! ```
//!
//! holding every field needed to continue the run: strategy parameters, mean,
//! evolution paths, covariance with its cached eigensystem, counters, best
//! solutions and the search space. Floats are written with shortest
//! round-trip formatting and parsed exactly, so a restored engine fed the
//! same random stream reproduces the original run bit for bit. Objective
//! values of recorded best solutions may be infinite; they are stored as
//! strings. The eigensolver is not part of the state and comes back as the
//! default.

use crate::engine::CmaEs;
use crate::error::{CmaError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Newest checkpoint layout this build reads and the one it writes.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct CheckpointRef<'a> {
    format_version: u32,
    engine: &'a CmaEs,
}

#[derive(Deserialize)]
struct Checkpoint {
    format_version: u32,
    engine: CmaEs,
}

#[derive(Deserialize)]
struct VersionHeader {
    format_version: u32,
}

impl CmaEs {
    /// Encodes the complete engine state as checkpoint bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CmaError::Serialization`] if encoding fails.
    pub fn to_checkpoint_bytes(&self) -> Result<Vec<u8>> {
        let checkpoint = CheckpointRef {
            format_version: CHECKPOINT_FORMAT_VERSION,
            engine: self,
        };
        Ok(serde_json::to_vec_pretty(&checkpoint)?)
    }

    /// Decodes and validates checkpoint bytes.
    ///
    /// # Errors
    ///
    /// - [`CmaError::Serialization`] on malformed JSON or missing fields
    /// - [`CmaError::UnsupportedVersion`] if written by a newer format
    /// - [`CmaError::CheckpointFormat`] or [`CmaError::DimensionMismatch`]
    ///   if the decoded state is inconsistent
    pub fn from_checkpoint_bytes(bytes: &[u8]) -> Result<Self> {
        let header: VersionHeader = serde_json::from_slice(bytes)?;
        if header.format_version == 0 || header.format_version > CHECKPOINT_FORMAT_VERSION {
            return Err(CmaError::UnsupportedVersion {
                found: header.format_version,
                supported: CHECKPOINT_FORMAT_VERSION,
            });
        }

        let checkpoint: Checkpoint = serde_json::from_slice(bytes)?;
        checkpoint.engine.validate()?;
        debug!(
            version = checkpoint.format_version,
            n = checkpoint.engine.dimension(),
            evals = checkpoint.engine.eval_count(),
            "decoded checkpoint"
        );
        Ok(checkpoint.engine)
    }

    /// Writes a checkpoint to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error on encoding or I/O failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_checkpoint_bytes()?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes)?;
        writer.flush()?;

        debug!(
            path = %path.display(),
            generation = self.generation(),
            evals = self.eval_count(),
            bytes = bytes.len(),
            "saved checkpoint"
        );
        Ok(())
    }

    /// Reads an engine from a checkpoint file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise as
    /// [`CmaEs::from_checkpoint_bytes`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;

        let engine = Self::from_checkpoint_bytes(&content)?;
        debug!(path = %path.display(), generation = engine.generation(), "loaded checkpoint");
        Ok(engine)
    }

    /// Replaces this engine's state with the checkpoint at `path`.
    ///
    /// `self` is left untouched unless the checkpoint loads and validates.
    /// The current eigensolver is kept.
    ///
    /// # Errors
    ///
    /// As [`CmaEs::load`].
    pub fn restore(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let loaded = Self::load(path)?;
        let solver = self.eigen_solver();
        *self = loaded.with_eigen_solver(solver);
        Ok(())
    }
}
