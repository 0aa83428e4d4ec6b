//! ICL (current) record format
//!
//! ```text
//!  word 0 (LSB first)
//!  +-----+-------------+----------+
//!  | len | provider_id | entry_id |
//!  | 3   | 4           | 25       |
//!  +-----+-------------+----------+
//!  timestamp: u64
//! ```
//!
//! The header is 12 bytes; the payload holds 0..=7 words. The entry id is the
//! literal's address inside the firmware image shifted right by 7, which is
//! what the ELF provider builder keys its table with.

use super::{bits, RecordCodec, WORD_SIZE};
use crate::providers::elf::{self, IclLiteral};
use crate::providers::LiteralTable;
use crate::render::{self, Rendered};
use crate::types::{LibraryId, RecordKey, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::path::Path;

const LENGTH_MASK: u8 = 0x7;

/// Raw ICL header as read from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IclHeader {
    word0: u32,
    /// Firmware timestamp (raw ticks)
    pub timestamp: u64,
}

impl IclHeader {
    /// Pack header fields, truncating each to its bit width
    pub fn new(payload_words: u8, provider_id: u8, entry_id: u32, timestamp: u64) -> Self {
        let word0 = u32::from(payload_words & LENGTH_MASK)
            | (u32::from(provider_id) & 0xf) << 3
            | (entry_id & 0x1ff_ffff) << 7;
        Self { word0, timestamp }
    }

    /// Wire representation of this header
    pub fn encode(&self) -> [u8; IclCodec::HEADER_SIZE] {
        let mut bytes = [0u8; IclCodec::HEADER_SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], self.word0);
        LittleEndian::write_u64(&mut bytes[4..12], self.timestamp);
        bytes
    }

    pub fn payload_words(&self) -> usize {
        bits(self.word0, 0, 3) as usize
    }

    pub fn provider_id(&self) -> u32 {
        bits(self.word0, 3, 4)
    }

    pub fn entry_id(&self) -> u32 {
        bits(self.word0, 7, 25)
    }
}

/// Codec for ICL records, resolved against ELF providers
#[derive(Debug, Clone, Copy, Default)]
pub struct IclCodec;

impl RecordCodec for IclCodec {
    type Header = IclHeader;
    type Literal = IclLiteral;

    const NAME: &'static str = "ICL";
    const HEADER_SIZE: usize = 12;
    const MAX_PAYLOAD_WORDS: usize = 7;

    fn payload_size(encoded_length: u8) -> usize {
        usize::from(encoded_length & LENGTH_MASK) * WORD_SIZE
    }

    fn parse_header(bytes: &[u8]) -> IclHeader {
        IclHeader {
            word0: LittleEndian::read_u32(&bytes[0..4]),
            timestamp: LittleEndian::read_u64(&bytes[4..12]),
        }
    }

    fn is_valid(header: &IclHeader) -> bool {
        header.entry_id() != 0
    }

    fn library_id(header: &IclHeader) -> LibraryId {
        header.provider_id()
    }

    fn key(header: &IclHeader) -> RecordKey {
        RecordKey::from_entry_id(header.entry_id())
    }

    fn render(header: &IclHeader, literal: &IclLiteral, payload: &[u32]) -> Rendered {
        let message = render::format_words(&literal.text, payload);
        let text = format!(
            "{ts}: {}({}):\n{ts}: {}\n",
            literal.filename,
            literal.line,
            message.text,
            ts = header.timestamp
        );

        Rendered { text, ..message }
    }

    fn build_provider(path: &Path) -> Result<LiteralTable<IclLiteral>> {
        elf::build_provider(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_layout() {
        let header = IclHeader::new(5, 0xa, 0x123_4567, 99);
        let bytes = header.encode();
        assert_eq!(LittleEndian::read_u32(&bytes[0..4]), 5 | (0xa << 3) | (0x123_4567 << 7));

        let parsed = IclCodec::parse_header(&bytes);
        assert_eq!(parsed, header);
        assert_eq!(parsed.payload_words(), 5);
        assert_eq!(parsed.provider_id(), 0xa);
        assert_eq!(parsed.entry_id(), 0x123_4567);
        assert_eq!(parsed.timestamp, 99);
    }

    #[test]
    fn test_payload_size_range() {
        for byte in 0..=u8::MAX {
            let words = IclCodec::payload_size(byte) / WORD_SIZE;
            assert!(words <= 7);
            assert_eq!(words, usize::from(byte & 0x7));
        }
        assert_eq!(IclCodec::max_record_size(), 12 + 28);
    }

    #[test]
    fn test_validity_and_key() {
        assert!(!IclCodec::is_valid(&IclHeader::new(2, 1, 0, 0)));

        let header = IclHeader::new(2, 3, 0x101, 0);
        assert!(IclCodec::is_valid(&header));
        assert_eq!(IclCodec::key(&header), RecordKey::from_entry_id(0x101));
        assert_eq!(IclCodec::library_id(&header), 3);
    }

    #[test]
    fn test_render_two_lines() {
        let literal = IclLiteral {
            text: "gain %d dB, mask 0x%08x".to_string(),
            filename: "mixer.c".to_string(),
            offset: 0,
            level: 2,
            log_source: 0,
            line: 88,
            file_ref: 0x1000,
            text_len: 24,
        };
        let header = IclHeader::new(2, 0, 0x100, 5000);

        let rendered = IclCodec::render(&header, &literal, &[(-6i32) as u32, 0xff]);
        assert_eq!(
            rendered.text,
            "5000: mixer.c(88):\n5000: gain -6 dB, mask 0x000000ff\n"
        );
        assert_eq!(rendered.missing_args, 0);
    }
}
