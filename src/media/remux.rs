//! Fast-start remux
//!
//! Moves the `moov` atom to the front of an mp4 with a stream copy, so
//! players can start before the whole file has downloaded.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use super::process::{CommandRunner, ProcessError};
use crate::upload::scratch::ScratchFile;

/// Suffix appended to the input path to form the output path
pub const OUTPUT_SUFFIX: &str = ".processing";

/// Content type of every remux output, whatever container came in
pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, thiserror::Error)]
pub enum RemuxError {
    #[error("Failed to run remuxer")]
    Process(#[source] ProcessError),

    #[error("Remuxer produced no output")]
    MissingOutput(#[source] std::io::Error),
}

pub struct FastStartRemuxer {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl FastStartRemuxer {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Remux `input` into `<input>.processing`
    ///
    /// The input is left in place. On failure the partial output is removed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn remux(&self, input: &Path) -> Result<ScratchFile, RemuxError> {
        let mut output_path = input.as_os_str().to_owned();
        output_path.push(OUTPUT_SUFFIX);
        let output = ScratchFile::adopt(output_path.into());

        let args: Vec<OsString> = vec![
            "-i".into(),
            input.as_os_str().to_owned(),
            "-c".into(),
            "copy".into(),
            "-movflags".into(),
            "faststart".into(),
            "-f".into(),
            "mp4".into(),
            output.path().as_os_str().to_owned(),
        ];

        self.runner
            .run(&self.program, &args)
            .await
            .map_err(RemuxError::Process)?;

        tokio::fs::metadata(output.path())
            .await
            .map_err(RemuxError::MissingOutput)?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Writes a marker into the last argument, like ffmpeg writes its output
    struct WritingRunner {
        fail: bool,
        calls: Mutex<Vec<Vec<OsString>>>,
    }

    #[async_trait]
    impl CommandRunner for WritingRunner {
        async fn run(&self, program: &str, args: &[OsString]) -> Result<Vec<u8>, ProcessError> {
            self.calls.lock().unwrap().push(args.to_vec());
            if let Some(out) = args.last() {
                std::fs::write(out, b"partial").unwrap();
            }
            if self.fail {
                return Err(ProcessError::Timeout(program.to_string()));
            }
            Ok(Vec::new())
        }
    }

    fn runner(fail: bool) -> Arc<WritingRunner> {
        Arc::new(WritingRunner {
            fail,
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_remux_arguments_and_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"raw").unwrap();

        let fake = runner(false);
        let remuxer = FastStartRemuxer::new(fake.clone(), "ffmpeg");
        let output = remuxer.remux(&input).await.unwrap();

        assert_eq!(output.path(), dir.path().join("in.mp4.processing"));
        assert!(input.exists());

        let calls = fake.calls.lock().unwrap();
        let args: Vec<String> = calls[0]
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            &args[..8],
            &["-i", input.to_str().unwrap(), "-c", "copy", "-movflags", "faststart", "-f", "mp4"]
        );
    }

    #[tokio::test]
    async fn test_failed_remux_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"raw").unwrap();

        let remuxer = FastStartRemuxer::new(runner(true), "ffmpeg");
        let result = remuxer.remux(&input).await;

        assert!(matches!(result, Err(RemuxError::Process(_))));
        assert!(!dir.path().join("in.mp4.processing").exists());
        assert!(input.exists());
    }
}
