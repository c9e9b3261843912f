use std::path::PathBuf;
use thiserror::Error;
use tvlink_protocol::ParseError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("settings io failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings at {} are not valid json: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings store rejected the write: {0}")]
    Store(String),
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("no settings directory available on this platform")]
    NoConfigDir,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("http client setup failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transports need a tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

pub type Result<T> = std::result::Result<T, Error>;
