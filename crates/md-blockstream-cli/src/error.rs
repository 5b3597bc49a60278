use std::io;

use md_blockstream::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0} argument missing?")]
    MissingValue(String),

    #[error("invalid chunk size '{0}', expected a positive integer")]
    InvalidChunkSize(String),
}
