use std::fmt::Display;

use thiserror::Error;

/// Coarse error category surfaced to the CLI and UI layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Ingestion,
    Store,
    ExternalService,
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Unsupported PDF loader '{0}' (expected lopdf or pdf-extract)")]
    UnsupportedLoader(String),

    #[error("Invalid chunking: chunk_overlap ({overlap}) must be less than chunk_size ({size})")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("Collection '{collection}' stores {expected}-dimension vectors, got {actual}")]
    DimensionMismatch { collection: String, expected: usize, actual: usize },

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("{service} call failed: {message}")]
    ExternalService { service: &'static str, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingSetting(_) | Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::Ingestion(_) | Self::UnsupportedLoader(_) | Self::InvalidChunking { .. } => ErrorKind::Ingestion,
            Self::DimensionMismatch { .. } | Self::CollectionNotFound(_) | Self::Store(_) => ErrorKind::Store,
            Self::ExternalService { .. } => ErrorKind::ExternalService,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn store(err: impl Display) -> Self {
        Self::Store(err.to_string())
    }

    pub fn external(service: &'static str, err: impl Display) -> Self {
        Self::ExternalService { service, message: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
