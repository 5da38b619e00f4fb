//! Shared test fixtures
//!
//! Fakes for the subprocess, object store and metadata boundaries, plus a
//! pipeline wired to a temporary scratch directory.

#![allow(dead_code)]

use async_trait::async_trait;
use reel_uploadr::media::{CommandRunner, ProcessError};
use reel_uploadr::repo::{MemoryVideoRepository, NewVideo, RepoError, VideoRecord, VideoRepository};
use reel_uploadr::s3::{ObjectStore, PutObjectResponse, S3ClientError};
use reel_uploadr::upload::{PipelineConfig, UploadPipeline, VideoUploadService};
use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

pub const BUCKET: &str = "reel-test-videos";
pub const PUBLIC_BASE_URL: &str = "https://d111111abcdef8.cloudfront.net";
pub const JWT_SECRET: &str = "reel-test-secret";

/// Marker prepended to remuxed output so tests can tell it from the input
pub const REMUX_MARKER: &[u8] = b"faststart:";

pub fn probe_json(width: u32, height: u32) -> Vec<u8> {
    format!(
        r#"{{"streams": [
            {{"index": 0, "codec_name": "aac", "codec_type": "audio"}},
            {{"index": 1, "codec_name": "h264", "codec_type": "video", "width": {}, "height": {}}}
        ]}}"#,
        width, height
    )
    .into_bytes()
}

// ============================================================================
// CommandRunner fake
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behaviour {
    Succeed,
    Fail,
}

/// Stands in for `ffprobe` and `ffmpeg`
///
/// The prober returns canned JSON. The remuxer copies its input to the last
/// argument with [`REMUX_MARKER`] in front, or writes a partial file and fails.
pub struct FakeRunner {
    probe_output: Vec<u8>,
    probe: Behaviour,
    remux: Behaviour,
    remux_delay: Option<Duration>,
    calls: Mutex<Vec<(String, Vec<OsString>)>>,
}

impl FakeRunner {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            probe_output: probe_json(width, height),
            probe: Behaviour::Succeed,
            remux: Behaviour::Succeed,
            remux_delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_probe_output(mut self, output: &[u8]) -> Self {
        self.probe_output = output.to_vec();
        self
    }

    pub fn failing_probe(mut self) -> Self {
        self.probe = Behaviour::Fail;
        self
    }

    pub fn failing_remux(mut self) -> Self {
        self.remux = Behaviour::Fail;
        self
    }

    /// Make the remuxer take `delay` before writing its output
    pub fn slow_remux(mut self, delay: Duration) -> Self {
        self.remux_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<OsString>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|(p, _)| p).collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<Vec<u8>, ProcessError> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));

        match program {
            "ffprobe" => match self.probe {
                Behaviour::Succeed => Ok(self.probe_output.clone()),
                Behaviour::Fail => Err(ProcessError::Timeout(program.to_string())),
            },
            "ffmpeg" => {
                if let Some(delay) = self.remux_delay {
                    tokio::time::sleep(delay).await;
                }
                let input = Path::new(&args[1]);
                let output = Path::new(args.last().unwrap());
                match self.remux {
                    Behaviour::Succeed => {
                        let mut data = REMUX_MARKER.to_vec();
                        data.extend(std::fs::read(input).unwrap());
                        std::fs::write(output, data).unwrap();
                        Ok(Vec::new())
                    }
                    Behaviour::Fail => {
                        std::fs::write(output, b"half a file").unwrap();
                        Err(ProcessError::Timeout(program.to_string()))
                    }
                }
            }
            other => Err(ProcessError::NotFound(other.to_string())),
        }
    }
}

// ============================================================================
// ObjectStore fake
// ============================================================================

#[derive(Debug, Clone)]
pub struct PutCall {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct RecordingStore {
    fail: bool,
    puts: Mutex<Vec<PutCall>>,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            puts: Mutex::new(Vec::new()),
        }
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        mut body: tokio::fs::File,
    ) -> Result<PutObjectResponse, S3ClientError> {
        let mut data = Vec::new();
        body.read_to_end(&mut data)
            .await
            .map_err(|e| S3ClientError::BodyError(e.to_string()))?;

        self.puts.lock().unwrap().push(PutCall {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            body: data,
        });

        if self.fail {
            return Err(S3ClientError::RequestError("injected failure".into()));
        }
        Ok(PutObjectResponse {
            etag: Some("\"etag\"".into()),
        })
    }
}

// ============================================================================
// VideoRepository fake
// ============================================================================

/// In-memory repository that counts updates and can refuse them
#[derive(Default)]
pub struct CountingRepo {
    inner: MemoryVideoRepository,
    updates: AtomicUsize,
    fail_updates: bool,
}

impl CountingRepo {
    pub fn failing_updates() -> Self {
        Self {
            fail_updates: true,
            ..Default::default()
        }
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub async fn seed(&self, owner_id: Uuid) -> VideoRecord {
        self.inner
            .create(
                owner_id,
                NewVideo {
                    title: "Boot camp".into(),
                    description: Some("First upload".into()),
                },
            )
            .await
            .unwrap()
    }
}

#[async_trait]
impl VideoRepository for CountingRepo {
    async fn get(&self, id: Uuid) -> Result<VideoRecord, RepoError> {
        self.inner.get(id).await
    }

    async fn update(&self, record: VideoRecord) -> Result<(), RepoError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates {
            return Err(RepoError::Backend("database is read-only".into()));
        }
        self.inner.update(record).await
    }

    async fn create(&self, owner_id: Uuid, video: NewVideo) -> Result<VideoRecord, RepoError> {
        self.inner.create(owner_id, video).await
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn pipeline_config(scratch_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        bucket: BUCKET.to_string(),
        public_base_url: PUBLIC_BASE_URL.to_string(),
        scratch_dir: scratch_dir.to_path_buf(),
        probe_command: "ffprobe".to_string(),
        remux_command: "ffmpeg".to_string(),
        allowed_video_types: vec!["video/mp4".to_string()],
        max_upload_bytes: 1 << 20,
        max_thumbnail_bytes: 1 << 16,
    }
}

pub fn pipeline(
    scratch_dir: &Path,
    runner: Arc<FakeRunner>,
    store: Arc<RecordingStore>,
) -> UploadPipeline {
    UploadPipeline::new(Arc::new(pipeline_config(scratch_dir)), runner, store)
}

/// Everything a service-level test needs, holding on to the fakes
pub struct Harness {
    pub scratch: tempfile::TempDir,
    pub runner: Arc<FakeRunner>,
    pub store: Arc<RecordingStore>,
    pub repo: Arc<CountingRepo>,
    pub service: Arc<VideoUploadService>,
}

impl Harness {
    pub fn new(runner: FakeRunner) -> Self {
        Self::with_parts(runner, RecordingStore::default(), CountingRepo::default())
    }

    pub fn with_parts(runner: FakeRunner, store: RecordingStore, repo: CountingRepo) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let runner = Arc::new(runner);
        let store = Arc::new(store);
        let repo = Arc::new(repo);
        let service = Arc::new(VideoUploadService::new(
            pipeline(scratch.path(), runner.clone(), store.clone()),
            repo.clone(),
        ));

        Self {
            scratch,
            runner,
            store,
            repo,
            service,
        }
    }

    /// Files left behind in the scratch directory
    pub fn scratch_files(&self) -> Vec<String> {
        scratch_files(self.scratch.path())
    }
}

pub fn scratch_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

/// Some bytes that look like an mp4 to nobody but the fakes
pub fn fake_mp4() -> Vec<u8> {
    let mut data = b"\0\0\0\x20ftypisom".to_vec();
    data.extend(std::iter::repeat(0xAB).take(4096));
    data
}
