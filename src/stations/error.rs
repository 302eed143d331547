use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StationRegistryError {
    #[error("Failed to read station registry file '{0}'")]
    RegistryRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse station registry JSON")]
    JsonParse(#[from] serde_json::Error),

    #[error("Station registry is empty")]
    Empty,

    #[error("Station registry contains '{0}' more than once")]
    DuplicateStation(String),

    #[error("Station registry contains an empty station id at position {0}")]
    BlankStation(usize),
}
