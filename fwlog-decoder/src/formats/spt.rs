//! SPT (legacy) record format
//!
//! ```text
//!  word 0 (LSB first)
//!  +-----+---------+----------+---------+----------+
//!  | len | line    | file_id  | core_id | log_type |
//!  | 2   | 14      | 13       | 2       | 1        |
//!  +-----+---------+----------+---------+----------+
//!  instance_id: u16 | module: u16 (id:12, library:4) | timestamp: u64
//! ```
//!
//! The header is 16 bytes and at least one payload word always follows it:
//! the length field stores `words - 1`.

use super::{bits, RecordCodec, WORD_SIZE};
use crate::providers::csv::{self, SptLiteral};
use crate::providers::LiteralTable;
use crate::render::{self, Rendered};
use crate::types::{LibraryId, RecordKey, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::path::Path;

const LENGTH_MASK: u8 = 0x3;

/// Raw SPT header as read from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SptHeader {
    word0: u32,
    /// Firmware instance id
    pub instance_id: u16,
    module: u16,
    /// Firmware timestamp (raw ticks)
    pub timestamp: u64,
}

/// Unpacked SPT header fields, used to build headers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SptFields {
    /// Payload length in words (1..=4)
    pub payload_words: u8,
    pub line: u16,
    pub file_id: u16,
    pub core_id: u8,
    pub log_type: bool,
    pub instance_id: u16,
    pub module_id: u16,
    pub library: u8,
    pub timestamp: u64,
}

impl SptHeader {
    /// Pack header fields, truncating each to its bit width
    ///
    /// A payload length of 0 is stored as 1 since the format cannot express
    /// an empty payload.
    pub fn pack(fields: &SptFields) -> Self {
        let length = u32::from(fields.payload_words.saturating_sub(1) & LENGTH_MASK);
        let word0 = length
            | (u32::from(fields.line) & 0x3fff) << 2
            | (u32::from(fields.file_id) & 0x1fff) << 16
            | (u32::from(fields.core_id) & 0x3) << 29
            | u32::from(fields.log_type) << 31;
        let module = (fields.module_id & 0x0fff) | (u16::from(fields.library) & 0xf) << 12;

        Self {
            word0,
            instance_id: fields.instance_id,
            module,
            timestamp: fields.timestamp,
        }
    }

    /// Wire representation of this header
    pub fn encode(&self) -> [u8; SptCodec::HEADER_SIZE] {
        let mut bytes = [0u8; SptCodec::HEADER_SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], self.word0);
        LittleEndian::write_u16(&mut bytes[4..6], self.instance_id);
        LittleEndian::write_u16(&mut bytes[6..8], self.module);
        LittleEndian::write_u64(&mut bytes[8..16], self.timestamp);
        bytes
    }

    /// Number of payload words following the header
    pub fn payload_words(&self) -> usize {
        bits(self.word0, 0, 2) as usize + 1
    }

    pub fn line(&self) -> u32 {
        bits(self.word0, 2, 14)
    }

    pub fn file_id(&self) -> u32 {
        bits(self.word0, 16, 13)
    }

    pub fn core_id(&self) -> u32 {
        bits(self.word0, 29, 2)
    }

    pub fn log_type(&self) -> bool {
        bits(self.word0, 31, 1) != 0
    }

    /// Module sub-id (low 12 bits of the module word)
    pub fn module_id(&self) -> u32 {
        u32::from(self.module & 0x0fff)
    }

    /// Library id (high nibble of the module word)
    pub fn library(&self) -> u32 {
        u32::from(self.module >> 12)
    }
}

/// Codec for SPT records, resolved against CSV providers
#[derive(Debug, Clone, Copy, Default)]
pub struct SptCodec;

impl RecordCodec for SptCodec {
    type Header = SptHeader;
    type Literal = SptLiteral;

    const NAME: &'static str = "SPT";
    const HEADER_SIZE: usize = 16;
    const MAX_PAYLOAD_WORDS: usize = 4;

    fn payload_size(encoded_length: u8) -> usize {
        // there is always at least one word after the header
        (usize::from(encoded_length & LENGTH_MASK) + 1) * WORD_SIZE
    }

    fn parse_header(bytes: &[u8]) -> SptHeader {
        SptHeader {
            word0: LittleEndian::read_u32(&bytes[0..4]),
            instance_id: LittleEndian::read_u16(&bytes[4..6]),
            module: LittleEndian::read_u16(&bytes[6..8]),
            timestamp: LittleEndian::read_u64(&bytes[8..16]),
        }
    }

    fn is_valid(header: &SptHeader) -> bool {
        header.file_id() != 0 && header.line() != 0
    }

    fn library_id(header: &SptHeader) -> LibraryId {
        header.library()
    }

    fn key(header: &SptHeader) -> RecordKey {
        RecordKey::from_location(header.file_id(), header.line())
    }

    fn render(header: &SptHeader, literal: &SptLiteral, payload: &[u32]) -> Rendered {
        let message = render::format_words(&literal.message, payload);
        let text = format!(
            "{}: {} {},{} {}({}): {} {}",
            header.timestamp,
            header.core_id(),
            header.module_id(),
            header.instance_id,
            literal.filename,
            literal.key.line(),
            literal.level,
            message.text
        );

        Rendered { text, ..message }
    }

    fn build_provider(path: &Path) -> Result<LiteralTable<SptLiteral>> {
        csv::build_provider(path)
    }
}
