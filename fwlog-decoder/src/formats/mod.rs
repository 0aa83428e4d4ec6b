//! Binary record formats (SPT, ICL)
//!
//! A trace is a dense sequence of records: a fixed-size little-endian header
//! followed by a variable number of 32-bit payload words. Neither format has a
//! stream header or separators, so the payload length must be derivable from
//! the first header byte alone. Each format implements [`RecordCodec`], which
//! the decode loop is generic over.

use crate::providers::LiteralTable;
use crate::render::Rendered;
use crate::types::{LibraryId, RecordKey, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use std::path::Path;

pub mod icl;
pub mod spt;

pub use icl::{IclCodec, IclHeader};
pub use spt::{SptCodec, SptFields, SptHeader};

/// Size of one payload word, and the resync stride after an unknown record
pub const WORD_SIZE: usize = 4;

/// Capability set of one record format
///
/// All functions are pure: nothing is cached between records, so the decode
/// loop may call them on any byte window it likes.
pub trait RecordCodec {
    /// Decoded header fields
    type Header: Copy + fmt::Debug;
    /// Literal record the provider builder produces for this format
    type Literal: Clone + fmt::Debug + PartialEq + serde::Serialize + Send;

    /// Short format name used in log messages
    const NAME: &'static str;
    /// Fixed header length in bytes
    const HEADER_SIZE: usize;
    /// Largest payload the length field can declare, in words
    const MAX_PAYLOAD_WORDS: usize;

    /// Constant byte length of the header
    fn header_size() -> usize {
        Self::HEADER_SIZE
    }

    /// Payload length in bytes for the given first header byte
    ///
    /// Only the low bits holding the encoded length are inspected, so the
    /// whole byte may be passed as read from the stream.
    fn payload_size(encoded_length: u8) -> usize;

    /// Upper bound of a record, used to size the read buffer
    fn max_record_size() -> usize {
        Self::HEADER_SIZE + Self::MAX_PAYLOAD_WORDS * WORD_SIZE
    }

    /// Total record length (header + payload) for the given first header byte
    fn record_size(encoded_length: u8) -> usize {
        Self::HEADER_SIZE + Self::payload_size(encoded_length)
    }

    /// Decode a header from `bytes`, which must hold at least `HEADER_SIZE` bytes
    fn parse_header(bytes: &[u8]) -> Self::Header;

    /// Whether the header may be looked up at all
    fn is_valid(header: &Self::Header) -> bool;

    /// Library id selecting the provider table
    fn library_id(header: &Self::Header) -> LibraryId;

    /// Key into the selected provider table
    fn key(header: &Self::Header) -> RecordKey;

    /// Render a matched record against its payload words
    fn render(header: &Self::Header, literal: &Self::Literal, payload: &[u32]) -> Rendered;

    /// Build the provider table for this format from a source file
    fn build_provider(path: &Path) -> Result<LiteralTable<Self::Literal>>;
}

/// Read little-endian payload words from a byte slice
///
/// Trailing bytes that do not fill a whole word are ignored.
pub fn payload_words(bytes: &[u8]) -> Vec<u32> {
    let count = bytes.len() / WORD_SIZE;
    let mut words = vec![0u32; count];
    LittleEndian::read_u32_into(&bytes[..count * WORD_SIZE], &mut words);
    words
}

/// Extract `width` bits starting at `shift` from a raw header word
pub(crate) fn bits(word: u32, shift: u32, width: u32) -> u32 {
    (word >> shift) & ((1u32 << width) - 1)
}
