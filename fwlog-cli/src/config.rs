//! Configuration loading and parsing
//!
//! A TOML file can replace the provider and input flags:
//!
//! ```toml
//! [input]
//! file = "trace.bin"
//! follow = true
//!
//! [output]
//! file = "decoded.txt"
//!
//! [providers]
//! format = "elf"
//! sources = ["firmware.elf:0", { path = "dsp.elf", library_id = 1 }]
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use anyhow::{Context, Result};
use fwlog_decoder::{DecoderConfig, ProviderFormat, ProviderSource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub follow: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output file; stdout when absent
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    pub format: ProviderFormat,
    pub sources: Vec<SourceEntry>,
}

/// A provider source, either as a `path:id` string or as a table
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Spec(String),
    Table(ProviderSource),
}

impl SourceEntry {
    fn to_source(&self) -> Result<ProviderSource> {
        match self {
            SourceEntry::Spec(spec) => spec
                .parse()
                .with_context(|| format!("Invalid provider source in config: {}", spec)),
            SourceEntry::Table(source) => Ok(source.clone()),
        }
    }
}

impl AppConfig {
    /// Library configuration for this file's providers
    pub fn decoder_config(&self) -> Result<DecoderConfig> {
        let sources = self
            .providers
            .sources
            .iter()
            .map(SourceEntry::to_source)
            .collect::<Result<Vec<_>>>()?;

        Ok(DecoderConfig::new(self.providers.format)
            .with_providers(sources)
            .with_follow(self.input.follow))
    }

    /// Make relative paths relative to `base` instead of the working directory
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        if let Some(file) = self.input.file.as_mut() {
            resolve(file);
        }
        if let Some(file) = self.output.file.as_mut() {
            resolve(file);
        }
        for entry in &mut self.providers.sources {
            match entry {
                SourceEntry::Table(source) => resolve(&mut source.path),
                SourceEntry::Spec(spec) => {
                    if let Ok(mut source) = spec.parse::<ProviderSource>() {
                        resolve(&mut source.path);
                        *entry = SourceEntry::Table(source);
                    }
                }
            }
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }

    Ok(config)
}
