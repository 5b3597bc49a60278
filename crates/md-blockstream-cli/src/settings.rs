use std::fs;
use std::path::Path;

use md_blockstream::{ParserConfig, TableOutputMode};
use serde::Deserialize;
use tracing::debug;

use crate::args::Args;
use crate::error::Error;

/// Chunk size used when neither flags nor the config file set one.
pub const DEFAULT_CHUNK_SIZE: usize = 16;

/// Settings read from a JSON config file. Every field is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub table_output_mode: Option<TableOutputMode>,
    pub chunk_size: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = fs::read_to_string(path)?;
        let config: FileConfig = serde_json::from_str(&raw)?;
        debug!("loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

#[derive(Debug)]
pub struct Settings {
    pub parser: ParserConfig,
    pub chunk_size: usize,
}

impl Settings {
    /// Flags win over the config file, which wins over defaults.
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self, Error> {
        let chunk_size = args
            .chunk_size
            .or(file.chunk_size)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize(chunk_size.to_string()));
        }

        let mode = args
            .table_mode
            .or(file.table_output_mode)
            .unwrap_or_default();

        Ok(Settings {
            parser: ParserConfig::default().with_table_output_mode(mode),
            chunk_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_config_file() {
        let file = write_config(r#"{ "table_output_mode": "structured", "chunk_size": 4 }"#);
        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(
            config,
            FileConfig {
                table_output_mode: Some(TableOutputMode::Structured),
                chunk_size: Some(4),
            }
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        let file = write_config(r#"{ "tables": "flat" }"#);
        assert!(matches!(FileConfig::load(file.path()), Err(Error::Json(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(FileConfig::load(&missing), Err(Error::Io(_))));
    }

    #[test]
    fn flags_override_file() {
        let args = Args {
            chunk_size: Some(2),
            ..Args::default()
        };
        let file = FileConfig {
            table_output_mode: Some(TableOutputMode::Structured),
            chunk_size: Some(9),
        };
        let settings = Settings::resolve(&args, file).unwrap();
        assert_eq!(settings.chunk_size, 2);
        assert!(settings.parser.structured_tables());

        let settings = Settings::resolve(&Args::default(), FileConfig::default()).unwrap();
        assert_eq!(settings.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(!settings.parser.structured_tables());

        let zero = FileConfig {
            chunk_size: Some(0),
            ..FileConfig::default()
        };
        assert!(Settings::resolve(&Args::default(), zero).is_err());
    }
}
