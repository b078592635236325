use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use libjyutping::{DictFormat, JyutpingDictionary, SYSTEM_DICT};

/// Convert a Jyutping dictionary between text and binary form.
#[derive(Parser)]
#[command(name = "jyutping_dict")]
struct Args {
    /// Dump a binary dictionary to text instead of compiling text to binary
    #[arg(short = 'd')]
    dump: bool,

    /// Source dictionary
    source: PathBuf,

    /// Destination file, `-` for standard output
    dest: String,
}

fn convert(args: &Args) -> Result<()> {
    let (from, to) = if args.dump {
        (DictFormat::Binary, DictFormat::Text)
    } else {
        (DictFormat::Text, DictFormat::Binary)
    };

    let mut dict = JyutpingDictionary::new();
    dict.load_file(SYSTEM_DICT, &args.source, from)
        .with_context(|| format!("failed to load {}", args.source.display()))?;
    tracing::info!(entries = dict.len(SYSTEM_DICT), "loaded dictionary");

    let writer: Box<dyn Write> = if args.dest == "-" {
        Box::new(io::stdout().lock())
    } else {
        let file = File::create(&args.dest)
            .with_context(|| format!("failed to create {}", args.dest))?;
        Box::new(BufWriter::new(file))
    };
    dict.save(SYSTEM_DICT, writer, to)
        .with_context(|| format!("failed to write {}", args.dest))?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match convert(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}
