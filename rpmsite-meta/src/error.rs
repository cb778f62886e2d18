use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Template not found: {0:?}")]
    TemplateNotFound(PathBuf),

    #[error("Unresolved placeholder(s) in {template}: {}", .keys.join(", "))]
    UnresolvedPlaceholder { template: String, keys: Vec<String> },

    #[error("Invalid binding '{0}', expected KEY=VALUE")]
    InvalidBinding(String),

    #[error("Version query failed for {path:?}: {message}")]
    VersionQuery { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
