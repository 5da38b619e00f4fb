//! Video upload pipeline
//!
//! ```text
//! Received -> Validated -> Staged -> Probed -> Classified
//!          -> Remuxed -> Keyed -> Uploaded -> Finalized
//! ```
//!
//! Any failure ends the run in `Failed`. Local files are [`ScratchFile`]s,
//! so every exit path releases them. The object store is written at most
//! once per run, and only after the remux has succeeded.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use super::key::KeyNamespacer;
use super::scratch::{write_limited, ScratchFile};
use super::UploadError;
use crate::config::Config;
use crate::media::{
    classify, CommandRunner, FastStartRemuxer, MediaProbe, OrientationBucket, ProbeResult,
    OUTPUT_CONTENT_TYPE,
};
use crate::metrics;
use crate::s3::ObjectStore;

const STAGING_PREFIX: &str = "reel-upload-";

/// Content types accepted for thumbnails
pub const THUMBNAIL_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Read-only settings shared by every run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub bucket: String,
    pub public_base_url: String,
    pub scratch_dir: PathBuf,
    pub probe_command: String,
    pub remux_command: String,
    /// Lowercase MIME essences
    pub allowed_video_types: Vec<String>,
    pub max_upload_bytes: u64,
    pub max_thumbnail_bytes: u64,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let allowed_video_types = config
            .media
            .allowed_video_types
            .iter()
            .filter_map(|ty| ty.parse::<mime::Mime>().ok())
            .map(|m| m.essence_str().to_ascii_lowercase())
            .collect();

        Self {
            bucket: config.storage.bucket.clone(),
            public_base_url: config.storage.public_base_url.clone(),
            scratch_dir: config.server.scratch_dir(),
            probe_command: config.media.probe_command.clone(),
            remux_command: config.media.remux_command.clone(),
            allowed_video_types,
            max_upload_bytes: config.media.max_upload_bytes,
            max_thumbnail_bytes: config.media.max_thumbnail_bytes,
        }
    }

    /// Public URL for a stored key
    pub fn location_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Validated,
    Staged,
    Probed,
    Classified,
    Remuxed,
    Keyed,
    Uploaded,
    Finalized,
    Failed,
}

impl PipelineState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "Received",
            Self::Validated => "Validated",
            Self::Staged => "Staged",
            Self::Probed => "Probed",
            Self::Classified => "Classified",
            Self::Remuxed => "Remuxed",
            Self::Keyed => "Keyed",
            Self::Uploaded => "Uploaded",
            Self::Finalized => "Finalized",
            Self::Failed => "Failed",
        }
    }

    /// The state a successful step leads to
    pub const fn next(self) -> Self {
        match self {
            Self::Received => Self::Validated,
            Self::Validated => Self::Staged,
            Self::Staged => Self::Probed,
            Self::Probed => Self::Classified,
            Self::Classified => Self::Remuxed,
            Self::Remuxed => Self::Keyed,
            Self::Keyed => Self::Uploaded,
            Self::Uploaded => Self::Finalized,
            Self::Finalized | Self::Failed => self,
        }
    }
}

/// Result of a finalized run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub key: String,
    pub location: String,
    pub orientation: OrientationBucket,
    pub dimensions: ProbeResult,
    pub bytes: u64,
}

/// Result of a stored thumbnail
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailOutcome {
    pub key: String,
    pub location: String,
    pub bytes: u64,
}

pub struct UploadPipeline {
    config: Arc<PipelineConfig>,
    probe: MediaProbe,
    remuxer: FastStartRemuxer,
    store: Arc<dyn ObjectStore>,
}

impl UploadPipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        runner: Arc<dyn CommandRunner>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            probe: MediaProbe::new(runner.clone(), config.probe_command.clone()),
            remuxer: FastStartRemuxer::new(runner, config.remux_command.clone()),
            config,
            store,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drive one video body from `Received` to `Finalized`
    #[tracing::instrument(name = "pipeline.run", skip(self, body))]
    pub async fn run<R>(&self, content_type: &str, body: R) -> Result<PipelineOutcome, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let start = Instant::now();
        let mut state = PipelineState::Received;

        let result = self.run_steps(content_type, body, &mut state).await;

        match &result {
            Ok(outcome) => {
                metrics::record_pipeline_duration(start.elapsed().as_secs_f64());
                info!(
                    key = %outcome.key,
                    orientation = %outcome.orientation,
                    width = outcome.dimensions.width,
                    height = outcome.dimensions.height,
                    bytes = outcome.bytes,
                    "Pipeline finalized"
                );
            }
            Err(e) => {
                let failed_at = state.next();
                metrics::record_pipeline_failure(failed_at.as_str());
                warn!(state = failed_at.as_str(), error = %e, "Pipeline failed");
                debug!(state = PipelineState::Failed.as_str(), "Pipeline transition");
            }
        }

        result
    }

    async fn run_steps<R>(
        &self,
        content_type: &str,
        body: R,
        state: &mut PipelineState,
    ) -> Result<PipelineOutcome, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        validate_content_type(content_type, &self.config.allowed_video_types)?;
        advance(state);

        let (staged, bytes) = self
            .stage(body, ".mp4", self.config.max_upload_bytes)
            .await?;
        advance(state);

        let dimensions = self.probe.probe(staged.path()).await?;
        advance(state);

        let orientation = classify(dimensions.width, dimensions.height);
        metrics::record_orientation(orientation.as_str());
        advance(state);

        let remuxed = self.remuxer.remux(staged.path()).await?;
        if let Err(e) = staged.cleanup().await {
            warn!(error = %e, "Failed to remove staged file");
        }
        advance(state);

        // The remux always writes an mp4 container.
        let key = KeyNamespacer::video_key(orientation, OUTPUT_CONTENT_TYPE).to_string();
        advance(state);

        self.store_file(remuxed, &key, OUTPUT_CONTENT_TYPE).await?;
        advance(state);

        let location = self.config.location_for(&key);
        advance(state);

        Ok(PipelineOutcome {
            key,
            location,
            orientation,
            dimensions,
            bytes,
        })
    }

    /// Validate, stage and store an image; no probe or remux
    #[tracing::instrument(name = "pipeline.thumbnail", skip(self, body))]
    pub async fn run_thumbnail<R>(
        &self,
        content_type: &str,
        body: R,
    ) -> Result<ThumbnailOutcome, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let allowed: Vec<String> = THUMBNAIL_TYPES.iter().map(|t| t.to_string()).collect();
        let essence = validate_content_type(content_type, &allowed)?;
        let extension = super::key::extension_for(&essence);

        let (staged, bytes) = self
            .stage(body, extension, self.config.max_thumbnail_bytes)
            .await?;

        let key = KeyNamespacer::thumbnail_key(&essence).to_string();
        self.store_file(staged, &key, &essence).await?;

        Ok(ThumbnailOutcome {
            location: self.config.location_for(&key),
            key,
            bytes,
        })
    }

    async fn stage<R>(
        &self,
        body: R,
        suffix: &str,
        limit: u64,
    ) -> Result<(ScratchFile, u64), UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let (scratch, mut file) =
            ScratchFile::create(&self.config.scratch_dir, STAGING_PREFIX, suffix).await?;

        // On error `scratch` drops here and takes the partial file with it.
        let bytes = write_limited(body, &mut file, limit).await?;
        drop(file);

        metrics::record_upload_bytes(bytes);
        debug!(path = %scratch.path().display(), bytes, "Staged upload");

        Ok((scratch, bytes))
    }

    /// Upload a local file once, then remove it whatever the outcome
    async fn store_file(
        &self,
        scratch: ScratchFile,
        key: &str,
        content_type: &str,
    ) -> Result<(), UploadError> {
        let file = scratch.open().await?;

        let result = self
            .store
            .put_object(&self.config.bucket, key, content_type, file)
            .await;

        if let Err(e) = scratch.cleanup().await {
            warn!(error = %e, "Failed to remove uploaded scratch file");
        }

        result
            .map(|_| ())
            .map_err(|e| UploadError::Storage(e.to_string()))
    }
}

fn advance(state: &mut PipelineState) {
    *state = state.next();
    debug!(state = state.as_str(), "Pipeline transition");
}

/// Parse a declared content type and check its essence against `allowed`
///
/// Returns the lowercase essence. Parameters such as `codecs` are ignored.
pub fn validate_content_type(claim: &str, allowed: &[String]) -> Result<String, UploadError> {
    let parsed: mime::Mime = claim
        .trim()
        .parse()
        .map_err(|_| UploadError::UnsupportedMedia(claim.to_string()))?;

    let essence = parsed.essence_str().to_ascii_lowercase();
    if allowed.iter().any(|a| a == &essence) {
        Ok(essence)
    } else {
        Err(UploadError::UnsupportedMedia(claim.to_string()))
    }
}
