use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevcontainerError {
    #[error("invalid mount syntax: {0} (expected source:target)")]
    InvalidMount(String),

    #[error("malformed descriptor at {path}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("copy source does not exist: {0}")]
    CopySourceMissing(PathBuf),

    #[error("cannot quote shell argument: {0}")]
    Quote(#[from] shlex::QuoteError),

    #[error(transparent)]
    Exec(#[from] canopy_exec::ExecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DevcontainerResult<T> = Result<T, DevcontainerError>;
