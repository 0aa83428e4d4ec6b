//! Firmware Log CLI Application
//!
//! This is the command-line interface for the firmware trace decoder.
//! It uses the fwlog-decoder library and adds:
//! - Argument and TOML configuration parsing
//! - Parallel provider builds
//! - Output sink selection (file or stdout)
//! - Console logging and exit status

use anyhow::{bail, Context, Result};
use clap::Parser;
use fwlog_decoder::{
    Decoder, DecoderConfig, IclCodec, LogDecoder, ProviderFormat, ProviderSource, RecordCodec,
    SptCodec,
};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

mod config;

/// Firmware Log Decoder - Render binary firmware traces as text
#[derive(Parser, Debug)]
#[command(name = "fwlog")]
#[command(about = "Decode binary firmware trace logs (SPT, ICL)", long_about = None)]
#[command(version)]
struct Args {
    /// CSV symbol cache as PATH:LIBRARY_ID (can be repeated; selects SPT records)
    #[arg(long, value_name = "PATH:LIB")]
    csv: Vec<ProviderSource>,

    /// ELF image as PATH:LIBRARY_ID (can be repeated; selects ICL records)
    #[arg(long, value_name = "PATH:LIB")]
    elf: Vec<ProviderSource>,

    /// Binary trace file to decode
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file for decoded text (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Keep decoding data appended to the input file
    #[arg(short, long)]
    follow: bool,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the loaded provider tables as JSON
    #[arg(long)]
    dump_providers: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

/// Everything needed for one run, after merging flags and config file
#[derive(Debug)]
struct RunSettings {
    decoder: DecoderConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Firmware Log Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using decoder library v{}", fwlog_decoder::VERSION);

    let settings = resolve_settings(&args)?;
    let decoder = build_decoder(&settings.decoder)?;

    let stats = decoder.provider_stats();
    log::info!(
        "Loaded {} literals for {} libraries ({} providers)",
        stats.num_literals,
        stats.num_libraries,
        settings.decoder.format
    );

    if args.dump_providers {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &decoder.dump_providers())
            .context("Failed to serialize provider tables")?;
        writeln!(out)?;
    }

    let Some(input) = &settings.input else {
        if !args.dump_providers {
            bail!("No input trace given (use --input or [input] file in the config)");
        }
        return Ok(());
    };

    let output: Box<dyn Write> = match &settings.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let stats = decoder
        .run_file(input, output, settings.decoder.follow)
        .with_context(|| format!("Failed to decode {:?}", input))?;

    if stats.records_unknown > 0 {
        log::warn!("{} unknown records in {:?}", stats.records_unknown, input);
    }
    if stats.render_overflows > 0 {
        log::warn!(
            "{} records had fewer payload words than their template",
            stats.render_overflows
        );
    }

    Ok(())
}

/// Merge the optional config file with command-line flags; flags win
fn resolve_settings(args: &Args) -> Result<RunSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            let app = config::load_config(path)?;
            RunSettings {
                decoder: app.decoder_config()?,
                input: app.input.file,
                output: app.output.file,
            }
        }
        None => RunSettings {
            decoder: DecoderConfig::default(),
            input: None,
            output: None,
        },
    };

    match (args.csv.is_empty(), args.elf.is_empty()) {
        (false, false) => bail!("--csv and --elf cannot be combined; pick one record format"),
        (false, true) => {
            settings.decoder = DecoderConfig::new(ProviderFormat::Csv)
                .with_providers(args.csv.iter().cloned())
                .with_follow(settings.decoder.follow);
        }
        (true, false) => {
            settings.decoder = DecoderConfig::new(ProviderFormat::Elf)
                .with_providers(args.elf.iter().cloned())
                .with_follow(settings.decoder.follow);
        }
        (true, true) => {}
    }

    if args.input.is_some() {
        settings.input = args.input.clone();
    }
    if args.output.is_some() {
        settings.output = args.output.clone();
    }
    if args.follow {
        settings.decoder.follow = true;
    }

    settings.decoder.validate().context("No usable provider configuration")?;
    if settings.decoder.follow && settings.input.is_none() {
        bail!("--follow needs an input file");
    }

    Ok(settings)
}

/// Build every provider of the configured format in parallel
fn build_decoder(config: &DecoderConfig) -> Result<LogDecoder> {
    Ok(match config.format {
        ProviderFormat::Csv => LogDecoder::Spt(build_tables::<SptCodec>(&config.providers)?),
        ProviderFormat::Elf => LogDecoder::Icl(build_tables::<IclCodec>(&config.providers)?),
    })
}

/// Tables are merged in configuration order so first-definition-wins holds
/// across sources sharing a library id
fn build_tables<C: RecordCodec>(sources: &[ProviderSource]) -> Result<Decoder<C>> {
    let tables = sources
        .par_iter()
        .map(|source| {
            log::info!("Building {} provider: {:?}", C::NAME, source.path);
            C::build_provider(&source.path)
                .map(|table| (source.library_id, table))
                .with_context(|| format!("Failed to build provider {:?}", source.path))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut decoder = Decoder::new();
    for (library_id, table) in tables {
        decoder.insert_table(library_id, table);
    }
    Ok(decoder)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    // stderr only; stdout carries decoded text
    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
