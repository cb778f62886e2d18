use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Meta(#[from] rpmsite_meta::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Source directory not found: {0:?}")]
    SourceNotFound(PathBuf),

    #[error("No RPM packages found in {0:?}")]
    EmptyInput(PathBuf),

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Missing or empty input, as opposed to a failure while processing it
    pub fn is_input_validation(&self) -> bool {
        matches!(self, Error::SourceNotFound(_) | Error::EmptyInput(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
