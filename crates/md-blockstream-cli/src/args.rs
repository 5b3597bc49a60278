use std::collections::BTreeSet;
use std::path::PathBuf;

use md_blockstream::TableOutputMode;

use crate::error::Error;

#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub table_mode: Option<TableOutputMode>,
    pub chunk_size: Option<usize>,
    pub config: Option<PathBuf>,

    /// Input file, stdin when absent or `-`
    pub input: Option<PathBuf>,
}

pub fn parse_chunk_size(value: &str) -> Result<usize, Error> {
    match value.parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(Error::InvalidChunkSize(value.to_string())),
    }
}

impl Args {
    // parse arguments, return set of unrecognized args
    pub fn parse(args: &[String]) -> Result<(Self, BTreeSet<String>), Error> {
        let mut unrecognized_args = BTreeSet::new();
        let mut res = Args::default();

        let mut i = 0;
        let len = args.len();
        while i < len {
            let arg = &args[i];

            if arg == "--structured" {
                res.table_mode = Some(TableOutputMode::Structured);
            } else if arg == "--table-mode" {
                i += 1;
                let Some(mode) = args.get(i) else {
                    return Err(Error::MissingValue(arg.clone()));
                };
                res.table_mode = Some(mode.parse()?);
            } else if arg == "--chunk-size" {
                i += 1;
                let Some(size) = args.get(i) else {
                    return Err(Error::MissingValue(arg.clone()));
                };
                res.chunk_size = Some(parse_chunk_size(size)?);
            } else if arg == "--config" {
                i += 1;
                let Some(path) = args.get(i) else {
                    return Err(Error::MissingValue(arg.clone()));
                };
                res.config = Some(PathBuf::from(path));
            } else if arg == "-" {
                res.input = None;
            } else if arg.starts_with("--") || res.input.is_some() {
                unrecognized_args.insert(arg.clone());
            } else {
                res.input = Some(PathBuf::from(arg));
            }

            i += 1;
        }

        Ok((res, unrecognized_args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_blockstream::ConfigError;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags_and_input() {
        let (res, unrecognized) = Args::parse(&args(&[
            "--table-mode",
            "structured",
            "--chunk-size",
            "8",
            "notes.md",
            "--verbose",
        ]))
        .unwrap();

        assert_eq!(
            res,
            Args {
                table_mode: Some(TableOutputMode::Structured),
                chunk_size: Some(8),
                config: None,
                input: Some(PathBuf::from("notes.md")),
            }
        );
        assert_eq!(unrecognized, BTreeSet::from(["--verbose".to_string()]));
    }

    #[test]
    fn stdin_dash() {
        let (res, _) = Args::parse(&args(&["--structured", "-"])).unwrap();
        assert_eq!(res.input, None);
        assert_eq!(res.table_mode, Some(TableOutputMode::Structured));
    }

    #[test]
    fn bad_values() {
        assert!(matches!(
            Args::parse(&args(&["--chunk-size", "0"])),
            Err(Error::InvalidChunkSize(_))
        ));
        assert!(matches!(
            Args::parse(&args(&["--table-mode", "grid"])),
            Err(Error::Config(ConfigError::UnknownTableMode(_)))
        ));
        assert!(matches!(
            Args::parse(&args(&["--config"])),
            Err(Error::MissingValue(_))
        ));
    }
}
