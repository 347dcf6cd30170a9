use std::path::PathBuf;

use thiserror::Error;

use crate::store::ResourceLocation;

/// Errors raised while building a descriptor, store or scope.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("plugin base directory not found at {0}")]
    MissingBaseDirectory(PathBuf),
    #[error("invalid exclude pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid include glob `{glob}`: {reason}")]
    InvalidGlob { glob: String, reason: String },
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("invalid plugin manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures reading the image of a resource that a store located.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path} from {location}: {source}")]
    Io {
        path: String,
        location: ResourceLocation,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path} from {location}: {source}")]
    Archive {
        path: String,
        location: ResourceLocation,
        #[source]
        source: zip::result::ZipError,
    },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unit {0} not found")]
    NotFound(String),
    #[error("cannot resolve unit {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("no scope is installed as the ambient context of this thread")]
    NoAmbientScope,
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound(_))
    }
}
