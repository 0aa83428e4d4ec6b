//! CSV provider builder (SPT literals)
//!
//! Each line of the symbol cache describes one literal:
//!
//! ```text
//! file_id, line, filename, provider, level, message, param1, param2, param3, param4
//! ```
//!
//! The message may itself contain commas; everything between the fifth field
//! and the last four is joined back into it. Fields may be wrapped in any
//! number of `"` layers.

use super::{insert_first, LiteralTable};
use crate::types::{DecoderError, RecordKey, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Field separator
pub const FIELD_DELIMITER: char = ',';

const QUOTE: char = '"';

/// Minimum number of fields per record
const FIELD_COUNT: usize = 10;

/// Index of the message field; the last four fields are always the params
const MESSAGE_FIELD: usize = 5;

/// A literal from a CSV symbol cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SptLiteral {
    /// Composite (file id, line) key
    pub key: RecordKey,
    pub filename: String,
    /// Provider (module) name
    pub provider: String,
    /// Log level string, e.g. "INFO"
    pub level: String,
    /// printf-style template, always terminated with a line break
    pub message: String,
    /// Auxiliary parameter descriptions
    pub params: [String; 4],
}

/// Parse a CSV provider file
pub fn build_provider(path: &Path) -> Result<LiteralTable<SptLiteral>> {
    log::info!("Parsing CSV provider: {:?}", path);

    let file = File::open(path).map_err(|source| DecoderError::ProviderIo {
        path: path.to_path_buf(),
        source,
    })?;
    let table = build_from_reader(BufReader::new(file))?;

    log::info!("Parsed {} literals from {:?}", table.len(), path);
    Ok(table)
}

/// Parse CSV records from any buffered reader
///
/// Blank lines are skipped. The first malformed line aborts the build.
pub fn build_from_reader<R: BufRead>(reader: R) -> Result<LiteralTable<SptLiteral>> {
    let mut table = LiteralTable::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let record = line.strip_suffix('\r').unwrap_or(&line);
        if record.trim().is_empty() {
            continue;
        }

        let literal = parse_literal(record, index + 1)?;
        let key = literal.key;
        if !insert_first(&mut table, key, literal) {
            log::debug!(
                "Duplicate literal for file {} line {} at line {}, keeping first definition",
                key.file_id(),
                key.line(),
                index + 1
            );
        }
    }

    Ok(table)
}

/// Parse a single record; `line_number` is only used for error reporting
pub fn parse_literal(record: &str, line_number: usize) -> Result<SptLiteral> {
    let invalid = || DecoderError::ProviderFormat {
        line: line_number,
        record: record.to_string(),
    };

    let fields: Vec<&str> = record.split(FIELD_DELIMITER).collect();
    if fields.len() < FIELD_COUNT {
        return Err(invalid());
    }

    let params_start = fields.len() - 4;
    let message = fields[MESSAGE_FIELD..params_start].join(",");

    let file_id: u32 = unquote(fields[0]).parse().map_err(|_| invalid())?;
    let line: u32 = unquote(fields[1]).parse().map_err(|_| invalid())?;
    let param = |i: usize| unquote(fields[params_start + i]).to_string();

    Ok(SptLiteral {
        key: RecordKey::from_location(file_id, line),
        filename: unquote(fields[2]).to_string(),
        provider: unquote(fields[3]).to_string(),
        level: unquote(fields[4]).to_string(),
        message: format!("{}\n", unquote(&message)),
        params: [param(0), param(1), param(2), param(3)],
    })
}

/// Trim a field and strip enclosing quote layers
fn unquote(field: &str) -> &str {
    let mut s = field.trim();
    while s.len() >= 2 && s.starts_with(QUOTE) && s.ends_with(QUOTE) {
        s = s[1..s.len() - 1].trim();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RECORD: &str =
        r#"7,42,"dsp.c","core","INFO","gain %u","p1","p2","p3","p4""#;

    #[test]
    fn test_parse_simple_record() {
        let literal = parse_literal(RECORD, 1).unwrap();
        assert_eq!(literal.key, RecordKey::from_location(7, 42));
        assert_eq!(literal.filename, "dsp.c");
        assert_eq!(literal.provider, "core");
        assert_eq!(literal.level, "INFO");
        assert_eq!(literal.message, "gain %u\n");
        assert_eq!(literal.params, ["p1", "p2", "p3", "p4"].map(String::from));
    }

    #[test]
    fn test_message_with_commas_is_rejoined() {
        let record = r#"1,2,"a.c","mod","WARN","x=%u, y=%u, z=%u","","","","""#;
        let literal = parse_literal(record, 1).unwrap();
        assert_eq!(literal.message, "x=%u, y=%u, z=%u\n");
        assert_eq!(literal.params, ["", "", "", ""].map(String::from));
    }

    #[test]
    fn test_nested_quotes_and_whitespace() {
        assert_eq!(unquote(r#"  "" value ""  "#), "value");
        assert_eq!(unquote(r#"""#), r#"""#);
        assert_eq!(unquote(r#""""#), "");
        assert_eq!(unquote(r#""left"#), r#""left"#);
    }

    #[test]
    fn test_too_few_fields() {
        let record = "1,2,a.c,mod,INFO,msg,p1,p2";
        let err = parse_literal(record, 3).unwrap_err();
        match err {
            DecoderError::ProviderFormat { line, record: r } => {
                assert_eq!(line, 3);
                assert_eq!(r, record);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_non_numeric_key() {
        let record = "file,line,a.c,mod,INFO,msg,p1,p2,p3,p4";
        assert!(matches!(
            parse_literal(record, 1),
            Err(DecoderError::ProviderFormat { line: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let source = format!(
            "{}\r\n\n7,42,other.c,core,INFO,second,,,,\n1,1,b.c,core,INFO,msg,,,,\n",
            RECORD
        );
        let table = build_from_reader(source.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[&RecordKey::from_location(7, 42)].filename, "dsp.c");
    }

    #[test]
    fn test_malformed_line_aborts_build() {
        let source = format!("{}\n1,2,3\n", RECORD);
        let err = build_from_reader(source.as_bytes()).unwrap_err();
        assert!(matches!(err, DecoderError::ProviderFormat { line: 2, .. }));
    }

    #[test]
    fn test_build_from_file_is_repeatable() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", RECORD).unwrap();
        writeln!(file, r#"3,9,"b.c","aux","ERR","code %x","","","","""#).unwrap();

        let first = build_provider(file.path()).unwrap();
        let second = build_provider(file.path()).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file() {
        let err = build_provider(Path::new("nonexistent.csv")).unwrap_err();
        assert!(matches!(err, DecoderError::ProviderIo { .. }));
    }
}
