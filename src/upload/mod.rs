//! Upload module
//!
//! Stages an incoming body, probes and remuxes it, and stores the result
//! under a namespaced key.

use hyper::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::media::{ProbeError, RemuxError};
use crate::repo::RepoError;
use scratch::StageError;

pub mod key;
pub mod pipeline;
pub mod scratch;
pub mod service;

pub use pipeline::{PipelineConfig, PipelineOutcome, PipelineState, UploadPipeline};
pub use service::{UploadRequest, VideoUploadService};

/// Upload errors
///
/// Exactly one of these is produced per failed request.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Upload exceeds the limit of {0} bytes")]
    TooLarge(u64),

    #[error("Not the owner of this video")]
    Authorization,

    #[error("Video {0} not found")]
    NotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Remux failed: {0}")]
    Remux(#[from] RemuxError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl UploadError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Probe(_) | Self::Remux(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedMedia(_) => "unsupported-media",
            Self::TooLarge(_) => "payload-too-large",
            Self::Authorization => "forbidden",
            Self::NotFound(_) => "not-found",
            Self::Io(_) => "io-error",
            Self::Probe(_) => "probe-failed",
            Self::Remux(_) => "remux-failed",
            Self::Storage(_) => "storage-error",
        }
    }
}

impl From<StageError> for UploadError {
    fn from(e: StageError) -> Self {
        match e {
            StageError::Io(e) => Self::Io(e),
            StageError::TooLarge(limit) => Self::TooLarge(limit),
        }
    }
}

impl From<RepoError> for UploadError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Backend(msg) => Self::Storage(msg),
        }
    }
}
