//! Stream discovery through `ffprobe`

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use super::process::{CommandRunner, ProcessError};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to run prober")]
    Process(#[source] ProcessError),

    #[error("Failed to parse prober output")]
    Parse(#[source] serde_json::Error),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Video stream has invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Pixel dimensions of the primary video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, serde::Deserialize)]
struct FfProbeOutput {
    #[serde(default)]
    streams: Vec<FfProbeStream>,
}

#[derive(Debug, serde::Deserialize)]
struct FfProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

pub struct MediaProbe {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl MediaProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn probe(&self, path: &Path) -> Result<ProbeResult, ProbeError> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-print_format".into(),
            "json".into(),
            "-show_streams".into(),
            path.as_os_str().to_owned(),
        ];

        let output = self
            .runner
            .run(&self.program, &args)
            .await
            .map_err(ProbeError::Process)?;

        parse_output(&output)
    }
}

/// Extract the first video stream's dimensions from `ffprobe` JSON
pub(crate) fn parse_output(output: &[u8]) -> Result<ProbeResult, ProbeError> {
    let parsed: FfProbeOutput = serde_json::from_slice(output).map_err(ProbeError::Parse)?;

    let stream = parsed
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(ProbeError::NoVideoStream)?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(ProbeError::InvalidDimensions { width, height });
    }

    Ok(ProbeResult { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDSCAPE: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "h264", "codec_type": "video", "width": 1280, "height": 720, "r_frame_rate": "30/1"},
            {"index": 1, "codec_name": "aac", "codec_type": "audio", "sample_rate": "48000"}
        ]
    }"#;

    #[test]
    fn test_parse_video_stream() {
        let result = parse_output(LANDSCAPE.as_bytes()).unwrap();
        assert_eq!(
            result,
            ProbeResult {
                width: 1280,
                height: 720
            }
        );
    }

    #[test]
    fn test_audio_first_still_finds_video() {
        let output = r#"{"streams": [
            {"codec_type": "audio"},
            {"codec_type": "video", "width": 1080, "height": 1920}
        ]}"#;
        let result = parse_output(output.as_bytes()).unwrap();
        assert_eq!(result.width, 1080);
        assert_eq!(result.height, 1920);
    }

    #[test]
    fn test_no_video_stream() {
        let output = r#"{"streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_output(output.as_bytes()),
            Err(ProbeError::NoVideoStream)
        ));
    }

    #[test]
    fn test_empty_output() {
        assert!(matches!(parse_output(b"{}"), Err(ProbeError::NoVideoStream)));
        assert!(matches!(parse_output(b""), Err(ProbeError::Parse(_))));
    }

    #[test]
    fn test_zero_dimension() {
        let output = r#"{"streams": [{"codec_type": "video", "width": 0, "height": 720}]}"#;
        assert!(matches!(
            parse_output(output.as_bytes()),
            Err(ProbeError::InvalidDimensions { width: 0, .. })
        ));
    }

    #[test]
    fn test_missing_dimension() {
        let output = r#"{"streams": [{"codec_type": "video"}]}"#;
        assert!(matches!(
            parse_output(output.as_bytes()),
            Err(ProbeError::InvalidDimensions { .. })
        ));
    }
}
