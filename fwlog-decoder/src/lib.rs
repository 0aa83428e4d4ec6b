//! Firmware Log Decoder Library
//!
//! A reusable library for turning binary firmware trace logs into text, by
//! pairing every record with a literal message template from a provider table.
//!
//! # Architecture
//!
//! - Two record formats: SPT (legacy, 16-byte header) and ICL (current,
//!   12-byte header), each a [`RecordCodec`]
//! - Providers built from a CSV symbol cache (SPT) or from sections of a
//!   32-bit ELF image (ICL), filed under caller-assigned library ids
//! - A decode loop that resynchronizes on unknown records and can follow a
//!   trace that is still being written, through a [`FileWatcher`]
//!
//! The library does NOT:
//! - Parse command lines or configuration files
//! - Pick output files or terminal formatting
//! - Check that providers and trace belong to the same firmware build
//!
//! All of that lives in the application layer (fwlog-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use fwlog_decoder::{DecoderConfig, LogDecoder, ProviderFormat};
//! use std::io;
//! use std::path::Path;
//!
//! // Build providers for the selected format family
//! let config = DecoderConfig::new(ProviderFormat::Csv)
//!     .with_provider("core_symbols.csv", 0)
//!     .with_provider("dsp_symbols.csv", 1);
//! let decoder = LogDecoder::from_config(&config).unwrap();
//!
//! // Decode the whole trace to stdout
//! let stats = decoder
//!     .run_file(Path::new("trace.bin"), io::stdout().lock(), false)
//!     .unwrap();
//! eprintln!("{} records, {} unknown", stats.records_rendered, stats.records_unknown);
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod formats;
pub mod providers;
pub mod render;
pub mod types;
pub mod watch;

// Re-export main types for convenience
pub use config::{DecoderConfig, ProviderFormat, ProviderSource};
pub use decoder::{DecodeStats, Decoder, LogDecoder, ProviderDump};
pub use formats::{IclCodec, RecordCodec, SptCodec};
pub use providers::{IclLiteral, LiteralTable, ProviderStats, ProviderTables, SptLiteral};
pub use types::{DecoderError, LibraryId, RecordKey, Result};
pub use watch::{platform_watcher, FileWatcher, WatchError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
