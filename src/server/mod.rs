//! HTTP server module
//!
//! Wires configuration into the upload service and serves it over HTTP.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::auth::jwt::JwtAuthenticator;
use crate::auth::Authenticator;
use crate::config::Config;
use crate::media::SystemCommandRunner;
use crate::repo::MemoryVideoRepository;
use crate::s3::S3Client;
use crate::upload::{PipelineConfig, UploadPipeline, VideoUploadService};

pub mod http;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Server error: {0}")]
    RuntimeError(String),
}

/// Shared, read-only request context
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VideoUploadService>,
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    /// Build the production stack: S3, real subprocesses, in-memory records
    pub async fn from_config(config: &Config) -> Self {
        let pipeline_config = Arc::new(PipelineConfig::from_config(config));
        let runner = Arc::new(SystemCommandRunner::new(Duration::from_secs(
            config.media.process_timeout_secs,
        )));
        let store = Arc::new(S3Client::from_config(&config.storage).await);
        let repo = Arc::new(MemoryVideoRepository::new());

        let pipeline = UploadPipeline::new(pipeline_config, runner, store);

        Self {
            service: Arc::new(VideoUploadService::new(pipeline, repo)),
            authenticator: Arc::new(JwtAuthenticator::from_config(&config.auth)),
        }
    }
}

/// HTTP Server
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until ctrl-c
    pub async fn run(self) -> Result<(), ServerError> {
        let state = AppState::from_config(&self.config).await;
        let server = http::HttpServer::bind(&self.config.server.address, state).await?;

        info!(
            scratch_dir = %self.config.server.scratch_dir().display(),
            bucket = %self.config.storage.bucket,
            "Upload pipeline ready"
        );

        tokio::select! {
            result = server.run() => result,
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| ServerError::RuntimeError(e.to_string()))?;
                info!("Shutting down server");
                Ok(())
            }
        }
    }
}
