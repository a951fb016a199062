use arrow::error::ArrowError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single source could not be loaded. Never fatal to the run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file `{}` was not found", path.display())]
    NotFound { path: PathBuf },

    #[error("file `{}` is not valid {encoding}", path.display())]
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },

    #[error("unknown encoding `{label}` for `{}`", path.display())]
    UnknownEncoding { path: PathBuf, label: String },

    #[error("could not read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ArrowError,
    },

    #[error("no columns to parse in `{}`", path.display())]
    NoColumns { path: PathBuf },
}

/// Coarse failure classes reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailureKind {
    NotFound,
    Decode,
    Other,
}

impl LoadError {
    pub fn kind(&self) -> LoadFailureKind {
        match self {
            LoadError::NotFound { .. } => LoadFailureKind::NotFound,
            LoadError::Decode { .. } => LoadFailureKind::Decode,
            _ => LoadFailureKind::Other,
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            LoadError::NotFound { path }
            | LoadError::Decode { path, .. }
            | LoadError::UnknownEncoding { path, .. }
            | LoadError::Io { path, .. }
            | LoadError::Parse { path, .. }
            | LoadError::NoColumns { path } => path,
        }
    }
}
