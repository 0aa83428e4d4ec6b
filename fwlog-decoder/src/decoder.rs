//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! [`Decoder`] pairs one record format with its provider tables and drives the
//! decode-and-render loop; [`LogDecoder`] selects between the two formats once
//! at startup from a [`DecoderConfig`].

use crate::config::{DecoderConfig, ProviderFormat};
use crate::formats::{payload_words, IclCodec, RecordCodec, SptCodec, WORD_SIZE};
use crate::providers::{
    IclLiteral, LiteralTable, ProviderStats, ProviderTables, SptLiteral, Unresolved,
};
use crate::types::{LibraryId, Result};
use crate::watch::{platform_watcher, FileWatcher, WatchError};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::Path;

/// Counters for one decoding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Records matched against a literal and written out
    pub records_rendered: u64,
    /// "Unknown record" diagnostics emitted (one per resync step)
    pub records_unknown: u64,
    /// Rendered records whose template asked for more words than the payload held
    pub render_overflows: u64,
    /// Offset of the first byte not yet consumed
    pub end_offset: u64,
}

/// Decoder for one record format
pub struct Decoder<C: RecordCodec> {
    tables: ProviderTables<C::Literal>,
    _codec: PhantomData<fn() -> C>,
}

impl<C: RecordCodec> Decoder<C> {
    /// Create a decoder with no providers
    pub fn new() -> Self {
        Self::from_tables(ProviderTables::new())
    }

    /// Create a decoder over already built provider tables
    pub fn from_tables(tables: ProviderTables<C::Literal>) -> Self {
        Self {
            tables,
            _codec: PhantomData,
        }
    }

    /// Build a provider from `path` and file it under `library_id`
    ///
    /// # Example
    /// ```no_run
    /// use fwlog_decoder::{Decoder, SptCodec};
    /// use std::path::Path;
    ///
    /// let mut decoder = Decoder::<SptCodec>::new();
    /// decoder.add_provider(Path::new("symbols.csv"), 0).unwrap();
    /// ```
    pub fn add_provider(&mut self, path: &Path, library_id: LibraryId) -> Result<()> {
        log::info!("Loading {} provider {:?} as library {}", C::NAME, path, library_id);
        let table = C::build_provider(path)?;
        self.insert_table(library_id, table);
        Ok(())
    }

    /// File an already built table under `library_id`
    pub fn insert_table(&mut self, library_id: LibraryId, table: LiteralTable<C::Literal>) {
        self.tables.insert_library(library_id, table);
    }

    pub fn tables(&self) -> &ProviderTables<C::Literal> {
        &self.tables
    }

    /// Get statistics about the loaded provider tables
    pub fn provider_stats(&self) -> ProviderStats {
        self.tables.stats()
    }

    /// Decode `input` until its end and write the text to `output`
    ///
    /// An incomplete record at the end of the input is left unconsumed; its
    /// offset is reported as [`DecodeStats::end_offset`].
    pub fn decode<R, W>(&self, mut input: R, mut output: W) -> Result<DecodeStats>
    where
        R: Read + Seek,
        W: Write,
    {
        let mut stats = DecodeStats::default();
        stats.end_offset = self.decode_pass(&mut input, &mut output, &mut stats)?;
        output.flush()?;

        log::info!(
            "Decoded {} {} records ({} unknown) up to offset {}",
            stats.records_rendered,
            C::NAME,
            stats.records_unknown,
            stats.end_offset
        );
        Ok(stats)
    }

    /// Decode `input` and keep decoding whatever is appended to `path`
    ///
    /// At every end of input the output is flushed and the call blocks on
    /// `watcher`. Decoding resumes from the offset where the previous pass
    /// stopped, so no record is rendered twice. Returns when the watcher
    /// reports [`WatchError::Closed`]; any other watch failure is returned as
    /// an error. The watcher is unsubscribed on every exit path.
    pub fn follow<R, W, F>(
        &self,
        mut input: R,
        mut output: W,
        watcher: &mut F,
        path: &Path,
    ) -> Result<DecodeStats>
    where
        R: Read + Seek,
        W: Write,
        F: FileWatcher + ?Sized,
    {
        watcher.subscribe(path)?;
        let result = self.follow_subscribed(&mut input, &mut output, watcher);
        watcher.unsubscribe();
        result
    }

    fn follow_subscribed<R, W, F>(
        &self,
        input: &mut R,
        output: &mut W,
        watcher: &mut F,
    ) -> Result<DecodeStats>
    where
        R: Read + Seek,
        W: Write,
        F: FileWatcher + ?Sized,
    {
        let mut stats = DecodeStats::default();
        loop {
            stats.end_offset = self.decode_pass(input, output, &mut stats)?;
            output.flush()?;
            log::debug!("End of input at offset {}, waiting for data", stats.end_offset);

            match watcher.wait_for_signal() {
                Ok(()) => {
                    input.seek(SeekFrom::Start(stats.end_offset))?;
                }
                Err(WatchError::Closed) => {
                    log::info!(
                        "Follow mode ended after {} {} records",
                        stats.records_rendered,
                        C::NAME
                    );
                    return Ok(stats);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Run the record loop until the input holds no complete record
    ///
    /// Returns the offset of the first unconsumed byte; the input is left
    /// positioned there. Within a pass the input is only read forward, so a
    /// resync step never discards a `BufReader`'s buffer.
    fn decode_pass<R, W>(&self, input: &mut R, output: &mut W, stats: &mut DecodeStats) -> Result<u64>
    where
        R: Read + Seek,
        W: Write,
    {
        let header_size = C::header_size();
        let mut window = RecordWindow::new(input.stream_position()?, C::max_record_size());

        loop {
            let start = window.offset;
            if !window.fill(input, header_size)? {
                break;
            }
            let record_size = C::record_size(window.bytes()[0]);
            if !window.fill(input, record_size)? {
                break;
            }

            let record = &window.bytes()[..record_size];
            let header = C::parse_header(&record[..header_size]);
            match self.lookup(&header) {
                Ok(literal) => {
                    let payload = payload_words(&record[header_size..]);
                    let rendered = C::render(&header, literal, &payload);
                    if rendered.overflowed() {
                        log::warn!(
                            "{} record at {} references {} more arguments than its payload holds",
                            C::NAME,
                            start,
                            rendered.missing_args
                        );
                        stats.render_overflows += 1;
                    }
                    output.write_all(rendered.text.as_bytes())?;
                    stats.records_rendered += 1;
                    window.consume(record_size);
                }
                Err(reason) => {
                    log::trace!("{} record at {} not resolved: {:?}", C::NAME, start, reason);
                    writeln!(output, "Unknown record at position: {}", start)?;
                    stats.records_unknown += 1;
                    window.consume(WORD_SIZE);
                }
            }
        }

        // hand back bytes read past the last complete record
        if window.pending() > 0 {
            input.seek(SeekFrom::Start(window.offset))?;
        }
        Ok(window.offset)
    }

    fn lookup(&self, header: &C::Header) -> std::result::Result<&C::Literal, Unresolved> {
        if !C::is_valid(header) {
            return Err(Unresolved::InvalidHeader);
        }
        self.tables.resolve(C::library_id(header), C::key(header))
    }
}

impl<C: RecordCodec> Default for Decoder<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes read from the input but not yet consumed by the record loop
struct RecordWindow {
    buf: Vec<u8>,
    head: usize,
    /// Input offset of `buf[head]`
    offset: u64,
}

impl RecordWindow {
    fn new(offset: u64, max_record_size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(2 * max_record_size),
            head: 0,
            offset,
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.buf[self.head..]
    }

    fn pending(&self) -> usize {
        self.buf.len() - self.head
    }

    fn consume(&mut self, count: usize) {
        let count = count.min(self.pending());
        self.head += count;
        self.offset += count as u64;
    }

    /// Read until at least `needed` bytes are pending; false at end of input
    fn fill<R: Read>(&mut self, input: &mut R, needed: usize) -> io::Result<bool> {
        if self.pending() >= needed {
            return Ok(true);
        }
        self.buf.drain(..self.head);
        self.head = 0;

        let chunk = self.buf.capacity().max(needed);
        while self.buf.len() < needed {
            let filled = self.buf.len();
            self.buf.resize(chunk, 0);
            let read = match input.read(&mut self.buf[filled..]) {
                Ok(n) => n,
                Err(e) => {
                    self.buf.truncate(filled);
                    if e.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(e);
                }
            };
            self.buf.truncate(filled + read);
            if read == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Decoder for whichever record variant the configuration selects
pub enum LogDecoder {
    Spt(Decoder<SptCodec>),
    Icl(Decoder<IclCodec>),
}

/// Serializable view of the loaded provider tables
#[derive(Debug, Serialize)]
#[serde(tag = "format", content = "tables", rename_all = "lowercase")]
pub enum ProviderDump<'a> {
    Csv(&'a ProviderTables<SptLiteral>),
    Elf(&'a ProviderTables<IclLiteral>),
}

impl LogDecoder {
    /// Create an empty decoder for a provider format family
    pub fn new(format: ProviderFormat) -> Self {
        match format {
            ProviderFormat::Csv => LogDecoder::Spt(Decoder::new()),
            ProviderFormat::Elf => LogDecoder::Icl(Decoder::new()),
        }
    }

    /// Validate `config` and build all of its providers in order
    ///
    /// The first provider that fails to build aborts setup.
    pub fn from_config(config: &DecoderConfig) -> Result<Self> {
        config.validate()?;

        let mut decoder = Self::new(config.format);
        for source in &config.providers {
            decoder.add_provider(&source.path, source.library_id)?;
        }
        Ok(decoder)
    }

    pub fn format(&self) -> ProviderFormat {
        match self {
            LogDecoder::Spt(_) => ProviderFormat::Csv,
            LogDecoder::Icl(_) => ProviderFormat::Elf,
        }
    }

    pub fn add_provider(&mut self, path: &Path, library_id: LibraryId) -> Result<()> {
        match self {
            LogDecoder::Spt(decoder) => decoder.add_provider(path, library_id),
            LogDecoder::Icl(decoder) => decoder.add_provider(path, library_id),
        }
    }

    pub fn decode<R: Read + Seek, W: Write>(&self, input: R, output: W) -> Result<DecodeStats> {
        match self {
            LogDecoder::Spt(decoder) => decoder.decode(input, output),
            LogDecoder::Icl(decoder) => decoder.decode(input, output),
        }
    }

    pub fn follow<R, W, F>(&self, input: R, output: W, watcher: &mut F, path: &Path) -> Result<DecodeStats>
    where
        R: Read + Seek,
        W: Write,
        F: FileWatcher + ?Sized,
    {
        match self {
            LogDecoder::Spt(decoder) => decoder.follow(input, output, watcher, path),
            LogDecoder::Icl(decoder) => decoder.follow(input, output, watcher, path),
        }
    }

    /// Decode the trace at `path`, following it with the platform watcher if asked
    pub fn run_file<W: Write>(&self, path: &Path, output: W, follow: bool) -> Result<DecodeStats> {
        log::info!("Decoding trace file: {:?}", path);
        let input = BufReader::new(File::open(path)?);

        if follow {
            let mut watcher = platform_watcher()?;
            self.follow(input, output, watcher.as_mut(), path)
        } else {
            self.decode(input, output)
        }
    }

    pub fn provider_stats(&self) -> ProviderStats {
        match self {
            LogDecoder::Spt(decoder) => decoder.provider_stats(),
            LogDecoder::Icl(decoder) => decoder.provider_stats(),
        }
    }

    pub fn dump_providers(&self) -> ProviderDump<'_> {
        match self {
            LogDecoder::Spt(decoder) => ProviderDump::Csv(decoder.tables()),
            LogDecoder::Icl(decoder) => ProviderDump::Elf(decoder.tables()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{IclHeader, SptFields, SptHeader};
    use crate::providers::elf::{self, fixture};
    use crate::types::{DecoderError, RecordKey};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn spt_literal(file_id: u32, line: u32, message: &str) -> SptLiteral {
        SptLiteral {
            key: RecordKey::from_location(file_id, line),
            filename: "dsp.c".to_string(),
            provider: "core".to_string(),
            level: "INFO".to_string(),
            message: format!("{}\n", message),
            params: Default::default(),
        }
    }

    fn spt_decoder(library: LibraryId, literals: Vec<SptLiteral>) -> Decoder<SptCodec> {
        let mut decoder = Decoder::new();
        decoder.insert_table(library, literals.into_iter().map(|l| (l.key, l)).collect());
        decoder
    }

    fn spt_record(file_id: u16, line: u16, library: u8, payload: &[u32]) -> Vec<u8> {
        let header = SptHeader::pack(&SptFields {
            payload_words: payload.len() as u8,
            line,
            file_id,
            core_id: 1,
            module_id: 0x20,
            instance_id: 3,
            library,
            timestamp: 1000,
            ..SptFields::default()
        });
        let mut bytes = header.encode().to_vec();
        for word in payload {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    fn decode_to_string<C: RecordCodec>(decoder: &Decoder<C>, input: Vec<u8>) -> (String, DecodeStats) {
        let mut output = Vec::new();
        let stats = decoder.decode(Cursor::new(input), &mut output).unwrap();
        (String::from_utf8(output).unwrap(), stats)
    }

    #[test]
    fn test_decoder_creation() {
        let decoder = Decoder::<SptCodec>::new();
        let stats = decoder.provider_stats();
        assert_eq!(stats.num_libraries, 0);
        assert_eq!(stats.num_literals, 0);
    }

    #[test]
    fn test_decode_spt_match() {
        let decoder = spt_decoder(5, vec![spt_literal(7, 42, "gain %u offset %d")]);
        let input = spt_record(7, 42, 5, &[12, (-3i32) as u32]);

        let (text, stats) = decode_to_string(&decoder, input);
        assert_eq!(text, "1000: 1 32,3 dsp.c(42): INFO gain 12 offset -3\n");
        assert_eq!(stats.records_rendered, 1);
        assert_eq!(stats.records_unknown, 0);
        assert_eq!(stats.end_offset, 24);
    }

    #[test]
    fn test_empty_input() {
        let decoder = spt_decoder(0, vec![]);
        let (text, stats) = decode_to_string(&decoder, Vec::new());
        assert!(text.is_empty());
        assert_eq!(stats, DecodeStats::default());
    }

    #[test]
    fn test_resync_skips_one_word() {
        let decoder = spt_decoder(0, vec![spt_literal(1, 1, "ready")]);
        let mut input = vec![0u8; 4];
        input.extend(spt_record(1, 1, 0, &[0]));

        let (text, stats) = decode_to_string(&decoder, input);
        assert_eq!(
            text,
            "Unknown record at position: 0\n1000: 1 32,3 dsp.c(1): INFO ready\n"
        );
        assert_eq!(stats.records_unknown, 1);
        assert_eq!(stats.records_rendered, 1);
        assert_eq!(stats.end_offset, 24);
    }

    #[test]
    fn test_unknown_library_and_key() {
        let decoder = spt_decoder(0, vec![spt_literal(1, 1, "ready")]);

        // library 3 has no table
        let (text, _) = decode_to_string(&decoder, spt_record(1, 1, 3, &[0]));
        assert!(text.starts_with("Unknown record at position: 0\n"));

        // key (1, 2) not in library 0
        let (text, stats) = decode_to_string(&decoder, spt_record(1, 2, 0, &[0]));
        assert!(text.starts_with("Unknown record at position: 0\n"));
        assert_eq!(stats.records_rendered, 0);
        assert!(stats.records_unknown >= 1);
    }

    #[test]
    fn test_truncated_tail_is_not_consumed() {
        let decoder = spt_decoder(0, vec![spt_literal(1, 1, "ready")]);
        let mut input = spt_record(1, 1, 0, &[0]);
        let complete = input.len() as u64;
        input.extend_from_slice(&spt_record(1, 1, 0, &[0, 0])[..18]);

        let mut cursor = Cursor::new(input);
        let mut output = Vec::new();
        let stats = decoder.decode(&mut cursor, &mut output).unwrap();

        assert_eq!(stats.records_rendered, 1);
        assert_eq!(stats.records_unknown, 0);
        assert_eq!(stats.end_offset, complete);
        assert_eq!(cursor.position(), complete);
    }

    #[test]
    fn test_render_overflow_substitutes_zero() {
        let decoder = spt_decoder(0, vec![spt_literal(1, 1, "%u %u %u")]);
        let (text, stats) = decode_to_string(&decoder, spt_record(1, 1, 0, &[9]));

        assert_eq!(text, "1000: 1 32,3 dsp.c(1): INFO 9 0 0\n");
        assert_eq!(stats.render_overflows, 1);
        assert_eq!(stats.records_rendered, 1);
    }

    #[test]
    fn test_decode_icl_from_elf_provider() {
        let image = fixture::ElfFixture::new(vec![
            fixture::FixtureLiteral {
                level: 2,
                line: 88,
                filename: Some("mixer.c"),
                text: "gain %d dB",
            },
            fixture::FixtureLiteral {
                level: 1,
                line: 12,
                filename: None,
                text: "boot",
            },
        ])
        .build();
        let table = elf::build_from_reader(Cursor::new(image)).unwrap();

        let mut decoder = Decoder::<IclCodec>::new();
        decoder.insert_table(2, table);

        let mut input = IclHeader::new(1, 2, fixture::ElfFixture::entry_id(0), 77)
            .encode()
            .to_vec();
        input.extend_from_slice(&(-6i32).to_le_bytes());
        input.extend_from_slice(&IclHeader::new(0, 2, fixture::ElfFixture::entry_id(1), 78).encode());

        let (text, stats) = decode_to_string(&decoder, input);
        assert_eq!(
            text,
            "77: mixer.c(88):\n77: gain -6 dB\n78: unknown_filename(12):\n78: boot\n"
        );
        assert_eq!(stats.records_rendered, 2);
        assert_eq!(stats.end_offset, 16 + 12);
    }

    #[test]
    fn test_icl_invalid_header_resyncs_by_word() {
        let image = fixture::ElfFixture::new(vec![
            fixture::FixtureLiteral {
                level: 2,
                line: 88,
                filename: Some("mixer.c"),
                text: "gain %d dB",
            },
            fixture::FixtureLiteral {
                level: 1,
                line: 12,
                filename: None,
                text: "boot",
            },
        ])
        .build();
        let mut decoder = Decoder::<IclCodec>::new();
        decoder.insert_table(2, elf::build_from_reader(Cursor::new(image)).unwrap());

        // entry id 0 is never valid; the zero timestamp keeps the next two
        // word-aligned windows invalid as well
        let mut input = IclHeader::new(0, 2, 0, 0).encode().to_vec();
        input.extend_from_slice(&IclHeader::new(0, 2, fixture::ElfFixture::entry_id(1), 78).encode());
        // no provider is loaded for library 5
        input.extend_from_slice(&IclHeader::new(0, 5, fixture::ElfFixture::entry_id(0), 0).encode());

        let (text, stats) = decode_to_string(&decoder, input);
        assert_eq!(
            text,
            "Unknown record at position: 0\n\
             Unknown record at position: 4\n\
             Unknown record at position: 8\n\
             78: unknown_filename(12):\n78: boot\n\
             Unknown record at position: 24\n"
        );
        assert_eq!(stats.records_unknown, 4);
        assert_eq!(stats.records_rendered, 1);
        // 8 bytes after the last resync step are not a full header
        assert_eq!(stats.end_offset, 28);
    }

    /// Cursor that counts absolute seeks
    struct SeekCounting {
        inner: Cursor<Vec<u8>>,
        absolute_seeks: usize,
    }

    impl Read for SeekCounting {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for SeekCounting {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            if matches!(pos, SeekFrom::Start(_)) {
                self.absolute_seeks += 1;
            }
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_resync_reads_forward_only() {
        let decoder = spt_decoder(0, vec![spt_literal(1, 1, "ready")]);
        let mut input = vec![0u8; 400];
        input.extend(spt_record(1, 1, 0, &[0]));
        let total = input.len() as u64;

        let mut reader = SeekCounting {
            inner: Cursor::new(input),
            absolute_seeks: 0,
        };
        let stats = decoder.decode(&mut reader, io::sink()).unwrap();

        assert_eq!(stats.records_unknown, 100);
        assert_eq!(stats.records_rendered, 1);
        assert_eq!(stats.end_offset, total);
        assert_eq!(reader.absolute_seeks, 0);
    }

    #[derive(Default)]
    struct ScriptedWatcher {
        subscribed: Option<PathBuf>,
        subscribes: usize,
        unsubscribes: usize,
        waits: usize,
        fail_with_io: bool,
    }

    impl FileWatcher for ScriptedWatcher {
        fn subscribe(&mut self, path: &Path) -> std::result::Result<(), WatchError> {
            if self.subscribed.is_some() {
                return Err(WatchError::AlreadySubscribed(path.to_path_buf()));
            }
            self.subscribed = Some(path.to_path_buf());
            self.subscribes += 1;
            Ok(())
        }

        fn wait_for_signal(&mut self) -> std::result::Result<(), WatchError> {
            self.waits += 1;
            if self.fail_with_io {
                Err(WatchError::Io(io::Error::new(io::ErrorKind::Other, "gone")))
            } else {
                Err(WatchError::Closed)
            }
        }

        fn unsubscribe(&mut self) {
            if self.subscribed.take().is_some() {
                self.unsubscribes += 1;
            }
        }
    }

    #[test]
    fn test_follow_closed_returns_stats() {
        let decoder = spt_decoder(0, vec![spt_literal(1, 1, "ready")]);
        let mut watcher = ScriptedWatcher::default();
        let mut output = Vec::new();

        let stats = decoder
            .follow(
                Cursor::new(spt_record(1, 1, 0, &[0])),
                &mut output,
                &mut watcher,
                Path::new("trace.bin"),
            )
            .unwrap();

        assert_eq!(stats.records_rendered, 1);
        assert_eq!(watcher.waits, 1);
        assert_eq!(watcher.subscribes, 1);
        assert_eq!(watcher.unsubscribes, 1);
        assert!(watcher.subscribed.is_none());
    }

    #[test]
    fn test_follow_watch_failure_unsubscribes() {
        let decoder = spt_decoder(0, vec![]);
        let mut watcher = ScriptedWatcher {
            fail_with_io: true,
            ..ScriptedWatcher::default()
        };

        let err = decoder
            .follow(Cursor::new(Vec::new()), io::sink(), &mut watcher, Path::new("t.bin"))
            .unwrap_err();

        assert!(matches!(err, DecoderError::Watch(WatchError::Io(_))));
        assert_eq!(watcher.unsubscribes, 1);
    }

    #[test]
    fn test_follow_subscribe_rejected() {
        let decoder = spt_decoder(0, vec![]);
        let mut watcher = ScriptedWatcher {
            subscribed: Some(PathBuf::from("other.bin")),
            ..ScriptedWatcher::default()
        };

        let err = decoder
            .follow(Cursor::new(Vec::new()), io::sink(), &mut watcher, Path::new("t.bin"))
            .unwrap_err();
        assert!(matches!(err, DecoderError::Watch(WatchError::AlreadySubscribed(_))));
        assert_eq!(watcher.waits, 0);
    }

    #[test]
    fn test_log_decoder_variant_selection() {
        let decoder = LogDecoder::new(ProviderFormat::Elf);
        assert_eq!(decoder.format(), ProviderFormat::Elf);
        assert!(matches!(decoder.dump_providers(), ProviderDump::Elf(_)));

        let err = LogDecoder::from_config(&DecoderConfig::new(ProviderFormat::Csv));
        assert!(matches!(err, Err(DecoderError::InvalidConfig(_))));
    }

    #[test]
    fn test_dump_providers_json() {
        let decoder = LogDecoder::Spt(spt_decoder(1, vec![spt_literal(7, 42, "x")]));
        let json = serde_json::to_value(decoder.dump_providers()).unwrap();

        assert_eq!(json["format"], "csv");
        let key = RecordKey::from_location(7, 42).raw().to_string();
        assert_eq!(json["tables"]["libraries"]["1"][key.as_str()]["filename"], "dsp.c");
    }
}
