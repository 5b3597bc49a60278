//! Stream a markdown document through the block parser, printing one JSON
//! event per line.
//!
//! Usage: md-blockstream [--structured] [--table-mode flat|structured]
//!                       [--chunk-size N] [--config path.json] [FILE|-]

mod args;
mod error;
mod settings;

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use md_blockstream::{ParserConfig, StreamParser};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::Args;
use crate::error::Error;
use crate::settings::{FileConfig, Settings};

fn read_input(path: Option<&Path>) -> Result<String, Error> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

/// Feed `input` in chunks of `chunk_size` chars and write every event as a
/// JSON line. Returns the number of events written.
fn stream<W: Write>(
    input: &str,
    config: ParserConfig,
    chunk_size: usize,
    out: &mut W,
) -> Result<usize, Error> {
    let mut parser = StreamParser::with_config(config);
    let chars: Vec<char> = input.chars().collect();
    let mut written = 0;

    for chunk in chars.chunks(chunk_size) {
        let chunk: String = chunk.iter().collect();
        for event in parser.process_chunk(&chunk) {
            serde_json::to_writer(&mut *out, &event)?;
            out.write_all(b"\n")?;
            written += 1;
        }
    }

    for event in parser.complete() {
        serde_json::to_writer(&mut *out, &event)?;
        out.write_all(b"\n")?;
        written += 1;
    }

    out.flush()?;
    Ok(written)
}

fn run(args: &Args) -> Result<(), Error> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(args, file)?;
    let input = read_input(args.input.as_deref())?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let written = stream(&input, settings.parser, settings.chunk_size, &mut out)?;
    info!(
        "wrote {} events for {} bytes in chunks of {}",
        written,
        input.len(),
        settings.chunk_size
    );
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}

fn main() {
    setup_logging();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let (args, unrecognized) = match Args::parse(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            error!("{err}");
            std::process::exit(2);
        }
    };

    for arg in unrecognized {
        warn!("ignoring unrecognized argument {arg}");
    }

    if let Err(err) = run(&args) {
        error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_blockstream::TableOutputMode;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn events(input: &str, config: ParserConfig, chunk_size: usize) -> Vec<Value> {
        let mut out = Vec::new();
        let written = stream(input, config, chunk_size, &mut out).unwrap();
        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), written);
        lines
    }

    #[test]
    fn writes_json_lines() {
        let lines = events("# Hi\n", ParserConfig::default(), 2);
        let types: Vec<&str> = lines.iter().map(|v| v["type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["begin", "delta", "end"]);
        assert_eq!(lines[0]["element"]["element_type"], "header");
        assert_eq!(lines[0]["element"]["level"], 1);
        assert_eq!(lines[2]["final_content"], "Hi");
    }

    #[test]
    fn structured_tables_in_json() {
        let config = ParserConfig::default().with_table_output_mode(TableOutputMode::Structured);
        let lines = events("| A | B |\n|---|---|\n| 1 | 2 |\n", config, 100);
        let cols: Vec<&Value> = lines
            .iter()
            .filter(|v| v["type"] == "begin" && v["element"]["element_type"] == "col")
            .collect();
        assert_eq!(cols.len(), 4);
        assert_eq!(cols[1]["element"]["index"], 1);
        assert_eq!(cols[1]["element"]["alignment"], "left");
    }

    #[test]
    fn reads_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        fs::write(&path, "plain text\n").unwrap();
        assert_eq!(read_input(Some(path.as_path())).unwrap(), "plain text\n");
    }
}
