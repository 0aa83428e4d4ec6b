//! Inspect the raw record headers of a trace file
//!
//! Walks the trace record by record without any provider, printing the
//! decoded header fields and a per-library summary. Useful to check which
//! libraries a trace references before building providers for it.
//!
//! Usage:
//!   inspect_trace <trace.bin> [spt|icl] [--limit <count>]
//!
//! Set `RUST_LOG=debug` to log every skipped word.

use fwlog_decoder::formats::{IclHeader, SptHeader, WORD_SIZE};
use fwlog_decoder::{IclCodec, RecordCodec, SptCodec};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::process;

struct Summary {
    records: usize,
    invalid: usize,
    per_library: BTreeMap<u32, usize>,
    trailing_bytes: usize,
}

fn walk<C: RecordCodec>(bytes: &[u8], limit: usize, describe: impl Fn(&C::Header) -> String) -> Summary {
    let mut summary = Summary {
        records: 0,
        invalid: 0,
        per_library: BTreeMap::new(),
        trailing_bytes: 0,
    };

    let mut offset = 0;
    while offset + C::header_size() <= bytes.len() {
        let size = C::record_size(bytes[offset]);
        if offset + size > bytes.len() {
            break;
        }

        let header = C::parse_header(&bytes[offset..]);
        if !C::is_valid(&header) {
            log::debug!("Invalid header at {}, skipping one word", offset);
            summary.invalid += 1;
            offset += WORD_SIZE;
            continue;
        }

        if summary.records < limit {
            println!("{:>8}: {} ({} bytes)", offset, describe(&header), size);
        }
        *summary.per_library.entry(C::library_id(&header)).or_insert(0) += 1;
        summary.records += 1;
        offset += size;
    }

    summary.trailing_bytes = bytes.len() - offset;
    if summary.records >= limit {
        log::info!("Listed {} of {} records", limit, summary.records);
    }
    summary
}

fn describe_spt(header: &SptHeader) -> String {
    format!(
        "ts={} core={} lib={} module={} instance={} file={} line={} words={}",
        header.timestamp,
        header.core_id(),
        header.library(),
        header.module_id(),
        header.instance_id,
        header.file_id(),
        header.line(),
        header.payload_words()
    )
}

fn describe_icl(header: &IclHeader) -> String {
    format!(
        "ts={} provider={} entry=0x{:x} words={}",
        header.timestamp,
        header.provider_id(),
        header.entry_id(),
        header.payload_words()
    )
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <trace.bin> [spt|icl] [--limit <count>]", args[0]);
        process::exit(1);
    }

    let mut variant = "icl".to_string();
    let mut limit = 50usize;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" if i + 1 < args.len() => {
                limit = args[i + 1].parse().unwrap_or(limit);
                i += 2;
            }
            other => {
                variant = other.to_lowercase();
                i += 1;
            }
        }
    }

    let bytes = match fs::read(&args[1]) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("Cannot read {}: {}", args[1], e);
            process::exit(1);
        }
    };

    println!("Inspecting {} ({} bytes) as {}", args[1], bytes.len(), variant);
    let summary = match variant.as_str() {
        "spt" => walk::<SptCodec>(&bytes, limit, describe_spt),
        "icl" => walk::<IclCodec>(&bytes, limit, describe_icl),
        other => {
            log::error!("Unknown record variant '{}', expected spt or icl", other);
            process::exit(1);
        }
    };

    println!("\n=== SUMMARY ===");
    println!("Records: {}", summary.records);
    println!("Invalid headers skipped: {}", summary.invalid);
    for (library, count) in &summary.per_library {
        println!("  library {:2}: {} records", library, count);
    }
    if summary.trailing_bytes > 0 {
        println!("Incomplete trailing record: {} bytes", summary.trailing_bytes);
    }
}
