//! Owner-checked uploads against video records

use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::info;
use uuid::Uuid;

use super::pipeline::UploadPipeline;
use super::UploadError;
use crate::metrics;
use crate::repo::{NewVideo, VideoRecord, VideoRepository};

/// One upload call, discarded once the pipeline returns
pub struct UploadRequest<R> {
    pub video_id: Uuid,
    pub owner_id: Uuid,
    pub content_type: String,
    pub content: R,
}

pub struct VideoUploadService {
    pipeline: UploadPipeline,
    repo: Arc<dyn VideoRepository>,
}

impl VideoUploadService {
    pub fn new(pipeline: UploadPipeline, repo: Arc<dyn VideoRepository>) -> Self {
        Self { pipeline, repo }
    }

    pub fn pipeline(&self) -> &UploadPipeline {
        &self.pipeline
    }

    /// Fetch the record and check the requester owns it
    ///
    /// Runs before anything touches disk.
    async fn authorize(&self, video_id: Uuid, owner_id: Uuid) -> Result<VideoRecord, UploadError> {
        let record = self.repo.get(video_id).await?;
        if record.owner_id != owner_id {
            return Err(UploadError::Authorization);
        }
        Ok(record)
    }

    /// Re-read the record after the pipeline and change one field on it
    ///
    /// The copy read by [`Self::authorize`] is stale by now; writing it back
    /// would drop URLs recorded by concurrent uploads to the same video.
    async fn record_url<F>(
        &self,
        video_id: Uuid,
        owner_id: Uuid,
        apply: F,
    ) -> Result<VideoRecord, UploadError>
    where
        F: FnOnce(&mut VideoRecord),
    {
        let mut record = self.authorize(video_id, owner_id).await?;
        apply(&mut record);
        self.repo
            .update(record.clone())
            .await
            .map_err(|e| UploadError::Storage(e.to_string()))?;
        Ok(record)
    }

    /// Run the video pipeline and record the resulting URL
    #[tracing::instrument(
        name = "upload.video",
        skip(self, request),
        fields(video_id = %request.video_id, owner_id = %request.owner_id)
    )]
    pub async fn upload<R>(&self, request: UploadRequest<R>) -> Result<VideoRecord, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let result = self.upload_video(request).await;
        match &result {
            Ok(_) => metrics::record_upload_success("video"),
            Err(_) => metrics::record_upload_failure("video"),
        }
        result
    }

    async fn upload_video<R>(&self, request: UploadRequest<R>) -> Result<VideoRecord, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.authorize(request.video_id, request.owner_id).await?;

        let outcome = self
            .pipeline
            .run(&request.content_type, request.content)
            .await?;

        let record = self
            .record_url(request.video_id, request.owner_id, |record| {
                record.video_url = Some(outcome.location.clone());
            })
            .await?;

        info!(location = %outcome.location, "Video URL recorded");
        Ok(record)
    }

    /// Store an image and record it as the video's thumbnail
    #[tracing::instrument(
        name = "upload.thumbnail",
        skip(self, request),
        fields(video_id = %request.video_id, owner_id = %request.owner_id)
    )]
    pub async fn upload_thumbnail<R>(
        &self,
        request: UploadRequest<R>,
    ) -> Result<VideoRecord, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let result = async {
            self.authorize(request.video_id, request.owner_id).await?;

            let outcome = self
                .pipeline
                .run_thumbnail(&request.content_type, request.content)
                .await?;

            let record = self
                .record_url(request.video_id, request.owner_id, |record| {
                    record.thumbnail_url = Some(outcome.location.clone());
                })
                .await?;

            info!(location = %outcome.location, "Thumbnail URL recorded");
            Ok(record)
        }
        .await;

        match &result {
            Ok(_) => metrics::record_upload_success("thumbnail"),
            Err(_) => metrics::record_upload_failure("thumbnail"),
        }
        result
    }

    /// Draft a new record owned by `owner_id`
    pub async fn create_video(
        &self,
        owner_id: Uuid,
        video: NewVideo,
    ) -> Result<VideoRecord, UploadError> {
        Ok(self.repo.create(owner_id, video).await?)
    }

    /// Fetch a record the requester owns
    pub async fn get_video(&self, video_id: Uuid, owner_id: Uuid) -> Result<VideoRecord, UploadError> {
        self.authorize(video_id, owner_id).await
    }
}
