//! Core types for the firmware log decoder library
//!
//! This module defines the key space shared by the record codecs and the
//! provider builders, and the error type every fallible operation returns.

use crate::watch::WatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Numeric library (provider) id, supplied by the caller per provider source
/// and matched against the id carried in every record header.
pub type LibraryId = u32;

/// Lookup key into a provider table
///
/// Record headers and provider sources must build this key the same way or a
/// variant cannot resolve anything. Two layouts exist:
/// - ICL: the 25-bit entry id widened to 64 bits
/// - SPT: file id in the low 32 bits, line number in the high 32 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(u64);

impl RecordKey {
    /// Key for an ICL record or ELF literal
    pub fn from_entry_id(entry_id: u32) -> Self {
        Self(u64::from(entry_id))
    }

    /// Composite key for an SPT record or CSV literal
    pub fn from_location(file_id: u32, line: u32) -> Self {
        Self(u64::from(file_id) | (u64::from(line) << 32))
    }

    /// Low half of the key (file id for SPT keys, entry id for ICL keys)
    pub fn file_id(self) -> u32 {
        self.0 as u32
    }

    /// High half of the key (line number for SPT keys)
    pub fn line(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw 64-bit key value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Errors that can occur while building providers or decoding a trace
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Invalid provider record at line {line}: \"{record}\"")]
    ProviderFormat { line: usize, record: String },

    #[error("Failed to read provider source {path:?}: {source}")]
    ProviderIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ELF container: {0}")]
    ContainerFormat(String),

    #[error("Required section not found: {0}")]
    MissingSection(String),

    #[error("File watch failed: {0}")]
    Watch(#[from] WatchError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DecoderError {
    /// True for errors raised by a provider build (as opposed to decoding)
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            DecoderError::ProviderFormat { .. }
                | DecoderError::ProviderIo { .. }
                | DecoderError::ContainerFormat(_)
                | DecoderError::MissingSection(_)
        )
    }
}
