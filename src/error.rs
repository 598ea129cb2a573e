use std::path::PathBuf;

use thiserror::Error;

const DISCONNECTED: &str = "peer disconnected";

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid GSD data: {0}")]
    Format(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("atomic potential error: {0}")]
    AtomicPotential(String),
    #[error("integrator error: {0}")]
    Integrator(String),
    #[error("neighbor list error: {0}")]
    NeighborList(String),
    #[error("domain decomposition error: {0}")]
    Domain(String),
    #[error("communication error on rank {rank}: {message}")]
    Communication { rank: usize, message: String },
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
    pub(crate) fn disconnected(rank: usize) -> Self {
        Error::Communication {
            rank,
            message: String::from(DISCONNECTED),
        }
    }
    /// Whether this error only reports that another rank went away
    pub(crate) fn is_disconnect(&self) -> bool {
        matches!(self, Error::Communication { message, .. } if message == DISCONNECTED)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
