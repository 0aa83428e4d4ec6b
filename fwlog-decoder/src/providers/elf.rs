//! ELF provider builder (ICL literals)
//!
//! ICL firmware images carry their log literals in the binary itself:
//!
//! - every section whose name contains `log_entries` holds literal records,
//!   one per symbol, each a 28-byte header followed by the template text;
//! - `.function_strings` holds the NUL-terminated source file names the
//!   literal headers point to;
//! - `.symtab` lists the literal symbols. A literal's address shifted right by
//!   7 is the entry id the firmware writes into each record header.
//!
//! Only 32-bit little-endian images are accepted. Container parsing is done by
//! the `object` crate; literal headers are read from section data.

use super::{insert_first, LiteralTable};
use crate::types::{DecoderError, RecordKey, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use object::read::elf::ElfFile32;
use object::{Object, ObjectSection, ObjectSymbol};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

type ElfImage<'data> = ElfFile32<'data, object::LittleEndian>;

/// Section holding the symbol table
pub const SYMTAB_SECTION: &str = ".symtab";
/// Section holding source file names
pub const FUNCTION_STRINGS_SECTION: &str = ".function_strings";
/// Substring marking literal sections
pub const LOG_ENTRIES_MARKER: &str = "log_entries";
/// Literal address to entry id
pub const ENTRY_ID_SHIFT: u32 = 7;
/// Longest file name read from `.function_strings`
pub const FILENAME_CAPACITY: usize = 4096;
/// File name used when a literal's reference is outside `.function_strings`
pub const UNKNOWN_FILENAME: &str = "unknown_filename";

/// A literal extracted from an ELF image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IclLiteral {
    /// printf-style template
    pub text: String,
    /// Resolved source file name, or [`UNKNOWN_FILENAME`]
    pub filename: String,
    /// Literal header: offset field
    pub offset: u64,
    /// Literal header: severity level
    pub level: u32,
    /// Literal header: log source
    pub log_source: u32,
    /// Literal header: source line
    pub line: u32,
    /// Literal header: file name address
    pub file_ref: u32,
    /// Literal header: template length in bytes
    pub text_len: u32,
}

/// Parse an ELF provider image
pub fn build_provider(path: &Path) -> Result<LiteralTable<IclLiteral>> {
    log::info!("Parsing ELF provider: {:?}", path);

    let data = fs::read(path).map_err(|source| DecoderError::ProviderIo {
        path: path.to_path_buf(),
        source,
    })?;
    let table = build_from_bytes(&data)?;

    log::info!("Extracted {} literals from {:?}", table.len(), path);
    Ok(table)
}

/// Parse an ELF provider image from any reader
pub fn build_from_reader<R: Read>(mut reader: R) -> Result<LiteralTable<IclLiteral>> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    build_from_bytes(&data)
}

/// Parse an ELF provider image held in memory
pub fn build_from_bytes(data: &[u8]) -> Result<LiteralTable<IclLiteral>> {
    let image = ElfImage::parse(data).map_err(container_error)?;

    if image.section_by_name(SYMTAB_SECTION).is_none() {
        return Err(DecoderError::MissingSection(SYMTAB_SECTION.to_string()));
    }
    let function_strings = image
        .section_by_name(FUNCTION_STRINGS_SECTION)
        .ok_or_else(|| DecoderError::MissingSection(FUNCTION_STRINGS_SECTION.to_string()))?;
    let function_strings = Region::of(&function_strings)?;

    // section index -> literal section
    let mut literal_sections = BTreeMap::new();
    for section in image.sections() {
        let is_literal = section
            .name()
            .map(|name| name.contains(LOG_ENTRIES_MARKER))
            .unwrap_or(false);
        if is_literal {
            literal_sections.insert(section.index().0, Region::of(&section)?);
        }
    }

    log::debug!(
        "ELF image: {} literal sections, {} symbols",
        literal_sections.len(),
        image.symbols().count()
    );

    let mut table = LiteralTable::new();
    for symbol in image.symbols() {
        // absolute and undefined symbols have no section index
        let Some(index) = symbol.section_index() else {
            continue;
        };
        let Some(section) = literal_sections.get(&index.0) else {
            continue;
        };

        let value = symbol.address();
        let Some(literal) = read_literal(value, section, &function_strings)? else {
            continue;
        };
        let key = RecordKey::from_entry_id((value >> ENTRY_ID_SHIFT) as u32);
        if !insert_first(&mut table, key, literal) {
            log::debug!("Duplicate literal for entry {}, keeping first definition", key);
        }
    }

    Ok(table)
}

/// A loaded section: its address and file contents
struct Region<'data> {
    address: u64,
    data: &'data [u8],
}

impl<'data> Region<'data> {
    fn of<S: ObjectSection<'data>>(section: &S) -> Result<Self> {
        Ok(Self {
            address: section.address(),
            data: section.data().map_err(container_error)?,
        })
    }

    /// Section bytes from `addr` to the end; half-open on the section size
    fn tail_at(&self, addr: u64) -> Option<&'data [u8]> {
        let delta = usize::try_from(addr.checked_sub(self.address)?).ok()?;
        self.data.get(delta..).filter(|tail| !tail.is_empty())
    }
}

fn container_error(err: object::Error) -> DecoderError {
    DecoderError::ContainerFormat(err.to_string())
}

/// Map a short read of section data to a container error
fn truncated(what: &'static str) -> impl FnOnce(io::Error) -> DecoderError {
    move |_| DecoderError::ContainerFormat(format!("section data truncated while reading {}", what))
}

/// Read the literal a symbol points at. None if the symbol lies outside its
/// section.
fn read_literal(
    value: u64,
    section: &Region<'_>,
    function_strings: &Region<'_>,
) -> Result<Option<IclLiteral>> {
    let Some(mut cursor) = section.tail_at(value) else {
        log::warn!(
            "Symbol at 0x{:08x} lies outside its section (0x{:08x}, {} bytes), skipping",
            value,
            section.address,
            section.data.len()
        );
        return Ok(None);
    };

    let offset = cursor.read_u64::<LittleEndian>().map_err(truncated("literal header"))?;
    let mut fields = [0u32; 5];
    cursor
        .read_u32_into::<LittleEndian>(&mut fields)
        .map_err(truncated("literal header"))?;
    let [level, log_source, line, file_ref, text_len] = fields;

    let text = cursor
        .get(..text_len as usize)
        .ok_or_else(|| truncated("literal text")(io::ErrorKind::UnexpectedEof.into()))?;

    let filename = match function_strings.tail_at(u64::from(file_ref)) {
        Some(tail) => c_string(&tail[..tail.len().min(FILENAME_CAPACITY)]),
        None => UNKNOWN_FILENAME.to_string(),
    };

    Ok(Some(IclLiteral {
        text: c_string(text),
        filename,
        offset,
        level,
        log_source,
        line,
        file_ref,
        text_len,
    }))
}

/// Text up to the first NUL
fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}


/// Synthetic ELF images for tests
#[cfg(test)]
pub(crate) mod fixture {
    use byteorder::{LittleEndian, WriteBytesExt};

    /// Address of the literal section
    pub(crate) const LOG_ENTRIES_ADDR: u32 = 0x8000;
    /// Address of `.function_strings`
    pub(crate) const FUNCTION_STRINGS_ADDR: u32 = 0x1000;
    /// Spacing of literals inside the literal section
    pub(crate) const ENTRY_STRIDE: u32 = 128;
    /// Offset of the shadow literal that shares the first literal's entry id
    const SHADOW_OFFSET: u32 = 64;

    pub(crate) struct FixtureLiteral {
        pub(crate) level: u32,
        pub(crate) line: u32,
        pub(crate) filename: Option<&'static str>,
        pub(crate) text: &'static str,
    }

    pub(crate) struct ElfFixture {
        pub(crate) literals: Vec<FixtureLiteral>,
        pub(crate) with_symtab: bool,
        pub(crate) with_function_strings: bool,
        pub(crate) class: u8,
        /// Add a second literal whose entry id collides with the first one
        pub(crate) duplicate_first: bool,
    }

    fn write_literal(buf: &mut Vec<u8>, level: u32, line: u32, file_ref: u32, text: &str) {
        buf.write_u64::<LittleEndian>(0).unwrap();
        buf.write_u32::<LittleEndian>(level).unwrap();
        buf.write_u32::<LittleEndian>(1).unwrap();
        buf.write_u32::<LittleEndian>(line).unwrap();
        buf.write_u32::<LittleEndian>(file_ref).unwrap();
        buf.write_u32::<LittleEndian>(text.len() as u32 + 1).unwrap();
        buf.extend_from_slice(text.as_bytes());
        buf.push(0);
    }

    impl ElfFixture {
        pub(crate) fn new(literals: Vec<FixtureLiteral>) -> Self {
            Self {
                literals,
                with_symtab: true,
                with_function_strings: true,
                class: object::elf::ELFCLASS32,
                duplicate_first: false,
            }
        }

        /// Entry id of the literal at `index`
        pub(crate) fn entry_id(index: usize) -> u32 {
            (LOG_ENTRIES_ADDR + index as u32 * ENTRY_STRIDE) >> super::ENTRY_ID_SHIFT
        }

        pub(crate) fn build(&self) -> Vec<u8> {
            let mut names = vec![0u8];
            let mut add_name = |name: &str| {
                let offset = names.len() as u32;
                names.extend_from_slice(name.as_bytes());
                names.push(0);
                offset
            };
            let shstrtab_name = add_name(".shstrtab");
            let symtab_name = add_name(".symtab");
            let strings_name = add_name(".function_strings");
            let entries_name = add_name(".static_log_entries");

            // .function_strings
            let mut strings = Vec::new();
            let mut file_refs = Vec::new();
            for literal in &self.literals {
                match literal.filename {
                    Some(name) => {
                        file_refs.push(FUNCTION_STRINGS_ADDR + strings.len() as u32);
                        strings.extend_from_slice(name.as_bytes());
                        strings.push(0);
                    }
                    None => file_refs.push(0xdead_0000),
                }
            }

            // literal section
            let mut entries = Vec::new();
            for (literal, file_ref) in self.literals.iter().zip(&file_refs) {
                let start = entries.len();
                write_literal(&mut entries, literal.level, literal.line, *file_ref, literal.text);
                assert!(entries.len() - start <= ENTRY_STRIDE as usize);
                entries.resize(start + ENTRY_STRIDE as usize, 0);
            }
            if self.duplicate_first {
                // a second literal inside the first entry's 128-byte slot
                let mut shadow = Vec::new();
                write_literal(&mut shadow, 0, 1, 0, "shadowed");
                let start = SHADOW_OFFSET as usize;
                entries[start..start + shadow.len()].copy_from_slice(&shadow);
            }

            // section indices: 0 null, 1 .shstrtab, then the optional ones
            let mut next_index = 2u16;
            let symtab_index = self.with_symtab.then(|| {
                next_index += 1;
                next_index - 1
            });
            let strings_index = self.with_function_strings.then(|| {
                next_index += 1;
                next_index - 1
            });
            let entries_index = next_index;
            let section_count = next_index + 1;

            let mut symtab = vec![0u8; 16];
            let mut add_symbol = |value: u32, shndx: u16| {
                symtab.write_u32::<LittleEndian>(0).unwrap();
                symtab.write_u32::<LittleEndian>(value).unwrap();
                symtab.write_u32::<LittleEndian>(0).unwrap();
                symtab.write_u8(0).unwrap();
                symtab.write_u8(0).unwrap();
                symtab.write_u16::<LittleEndian>(shndx).unwrap();
            };
            for index in 0..self.literals.len() {
                add_symbol(LOG_ENTRIES_ADDR + index as u32 * ENTRY_STRIDE, entries_index);
            }
            if self.duplicate_first {
                add_symbol(LOG_ENTRIES_ADDR + SHADOW_OFFSET, entries_index);
            }
            // symbols outside literal sections are ignored
            add_symbol(FUNCTION_STRINGS_ADDR, strings_index.unwrap_or(1));
            add_symbol(0x1234, 0xfff1);

            // layout: header, section contents, section header table
            let mut image = vec![0u8; 52];
            let place = |image: &mut Vec<u8>, data: &[u8]| {
                while image.len() % 4 != 0 {
                    image.push(0);
                }
                let offset = image.len() as u32;
                image.extend_from_slice(data);
                offset
            };
            let shstrtab_off = place(&mut image, &names);
            let symtab_off = place(&mut image, &symtab);
            let strings_off = place(&mut image, &strings);
            let entries_off = place(&mut image, &entries);
            let shoff = place(&mut image, &[]);

            let shdr = |image: &mut Vec<u8>, name: u32, kind: u32, addr: u32, offset: u32, size: usize, link: u32, entsize: u32| {
                for field in [name, kind, 0, addr, offset, size as u32, link, 0, 4, entsize] {
                    image.write_u32::<LittleEndian>(field).unwrap();
                }
            };
            shdr(&mut image, 0, 0, 0, 0, 0, 0, 0);
            shdr(&mut image, shstrtab_name, 3, 0, shstrtab_off, names.len(), 0, 0);
            if symtab_index.is_some() {
                // symbol names live in .shstrtab (all empty)
                shdr(&mut image, symtab_name, 2, 0, symtab_off, symtab.len(), 1, 16);
            }
            if strings_index.is_some() {
                shdr(&mut image, strings_name, 1, FUNCTION_STRINGS_ADDR, strings_off, strings.len(), 0, 0);
            }
            shdr(&mut image, entries_name, 1, LOG_ENTRIES_ADDR, entries_off, entries.len(), 0, 0);

            let mut header = Vec::with_capacity(52);
            header.extend_from_slice(b"\x7fELF");
            header.extend_from_slice(&[self.class, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
            header.write_u16::<LittleEndian>(2).unwrap(); // e_type
            header.write_u16::<LittleEndian>(94).unwrap(); // e_machine
            header.write_u32::<LittleEndian>(1).unwrap(); // e_version
            header.write_u32::<LittleEndian>(0).unwrap(); // e_entry
            header.write_u32::<LittleEndian>(0).unwrap(); // e_phoff
            header.write_u32::<LittleEndian>(shoff).unwrap();
            header.write_u32::<LittleEndian>(0).unwrap(); // e_flags
            header.write_u16::<LittleEndian>(52).unwrap(); // e_ehsize
            header.write_u16::<LittleEndian>(0).unwrap(); // e_phentsize
            header.write_u16::<LittleEndian>(0).unwrap(); // e_phnum
            header.write_u16::<LittleEndian>(40).unwrap(); // e_shentsize
            header.write_u16::<LittleEndian>(section_count).unwrap();
            header.write_u16::<LittleEndian>(1).unwrap(); // e_shstrndx
            image[..52].copy_from_slice(&header);

            image
        }
    }
}
