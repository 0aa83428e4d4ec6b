//! Decoder configuration types
//!
//! This module defines what the library needs to set up a decoding run: which
//! provider format family is in use, the ordered provider sources, and whether
//! the input should be followed. Input/output paths and console concerns are
//! handled by the application layer.

use crate::types::{DecoderError, LibraryId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Largest library id a record header can carry (4-bit field)
pub const MAX_LIBRARY_ID: LibraryId = 0xf;

/// Provider source format, which also selects the record variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFormat {
    /// CSV symbol cache, decodes SPT records
    #[default]
    Csv,
    /// ELF image with embedded literals, decodes ICL records
    Elf,
}

impl fmt::Display for ProviderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFormat::Csv => write!(f, "csv"),
            ProviderFormat::Elf => write!(f, "elf"),
        }
    }
}

impl FromStr for ProviderFormat {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ProviderFormat::Csv),
            "elf" => Ok(ProviderFormat::Elf),
            other => Err(DecoderError::InvalidConfig(format!(
                "unknown provider format '{}'",
                other
            ))),
        }
    }
}

/// One provider source and the library id its literals are filed under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderSource {
    pub path: PathBuf,
    pub library_id: LibraryId,
}

impl ProviderSource {
    pub fn new(path: impl Into<PathBuf>, library_id: LibraryId) -> Self {
        Self {
            path: path.into(),
            library_id,
        }
    }
}

/// Parses `path:library_id`; the id may be decimal or `0x` hexadecimal
///
/// Only the last `:` separates the id, so paths containing colons work.
impl FromStr for ProviderSource {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        let (path, id) = s.rsplit_once(':').ok_or_else(|| {
            DecoderError::InvalidConfig(format!(
                "provider source '{}' must have the form PATH:LIBRARY_ID",
                s
            ))
        })?;
        if path.is_empty() {
            return Err(DecoderError::InvalidConfig(format!(
                "provider source '{}' has an empty path",
                s
            )));
        }

        Ok(Self::new(path, parse_library_id(id)?))
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal library id
pub fn parse_library_id(value: &str) -> Result<LibraryId> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => LibraryId::from_str_radix(hex, 16),
        None => value.parse(),
    };

    parsed.map_err(|_| DecoderError::InvalidConfig(format!("invalid library id '{}'", value)))
}

/// Configuration for a decoding run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Provider format family (and thereby record variant)
    #[serde(default)]
    pub format: ProviderFormat,

    /// Provider sources in load order
    #[serde(default)]
    pub providers: Vec<ProviderSource>,

    /// Keep waiting for appended data at end of input
    #[serde(default)]
    pub follow: bool,
}

impl DecoderConfig {
    /// Create a new configuration for the given format family
    pub fn new(format: ProviderFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Builder method: add a provider source
    pub fn with_provider(mut self, path: impl Into<PathBuf>, library_id: LibraryId) -> Self {
        self.providers.push(ProviderSource::new(path, library_id));
        self
    }

    /// Builder method: add several provider sources
    pub fn with_providers(mut self, sources: impl IntoIterator<Item = ProviderSource>) -> Self {
        self.providers.extend(sources);
        self
    }

    /// Builder method: enable or disable follow mode
    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    /// Check the configuration before any provider is built
    ///
    /// Library ids above [`MAX_LIBRARY_ID`] are accepted but logged, since no
    /// record can ever select them.
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(DecoderError::InvalidConfig(
                "at least one provider source is required".to_string(),
            ));
        }

        for source in &self.providers {
            if source.path.as_os_str().is_empty() {
                return Err(DecoderError::InvalidConfig(
                    "provider source with an empty path".to_string(),
                ));
            }
            if source.library_id > MAX_LIBRARY_ID {
                log::warn!(
                    "Library id {} for {:?} exceeds {}; no record can match it",
                    source.library_id,
                    source.path,
                    MAX_LIBRARY_ID
                );
            }
        }

        Ok(())
    }
}
