use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

use crate::encode::args::{EncoderConfig, encoder_args};
use crate::foundation::core::OutputTarget;
use crate::foundation::error::{FlipbookError, FlipbookResult};

/// A running encoder subprocess consuming raw frame images on stdin.
///
/// Frames are streamed to [`EncoderProcess::take_stdin`] by the ordered writer;
/// [`EncoderProcess::closed`] resolves once the process exits. Unless stdout/stderr forwarding is
/// requested, stderr is drained concurrently so the pipe cannot fill up and stall the encoder,
/// and its contents are reported when the process exits with a failure status.
#[derive(Debug)]
pub struct EncoderProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl EncoderProcess {
    /// Spawn the encoder described by `config`.
    ///
    /// Must be called from within a tokio runtime. The child is killed if the handle is dropped
    /// without awaiting [`EncoderProcess::closed`].
    pub fn spawn(config: &EncoderConfig) -> FlipbookResult<Self> {
        if let OutputTarget::File(path) = &config.output {
            ensure_parent_dir(path)?;
        }

        let mut cmd = Command::new(&config.ffmpeg_path);
        cmd.args(encoder_args(config))
            .stdin(Stdio::piped())
            .kill_on_drop(true);

        // With no output file the encoder writes video to its stdout, which must reach the
        // caller's stdout untouched.
        let video_on_stdout = matches!(config.output, OutputTarget::Stdout);
        if config.pipe_output || video_on_stdout {
            cmd.stdout(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null());
        }
        if config.pipe_output {
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stderr(Stdio::piped());
        }

        let mut child = cmd.spawn().map_err(|e| {
            FlipbookError::subprocess(format!(
                "failed to spawn '{}' (is it installed and on PATH?): {e}",
                config.ffmpeg_path.display()
            ))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            FlipbookError::subprocess("failed to open encoder stdin (unexpected)")
        })?;
        let stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>> = match child.stderr.take()
        {
            Some(mut stderr) => Some(tokio::spawn(async move {
                use tokio::io::AsyncReadExt as _;
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes).await?;
                Ok(bytes)
            })),
            None => None,
        };

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_drain,
        })
    }

    /// Take the encoder's input stream. Returns `None` after the first call.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Wait for the encoder to exit.
    ///
    /// Succeeds only on a zero exit status; a failure status is reported together with the tail
    /// of the captured stderr output.
    pub async fn closed(mut self) -> FlipbookResult<()> {
        drop(self.stdin.take());
        let status = self.child.wait().await.map_err(|e| {
            FlipbookError::subprocess(format!("failed to wait for encoder to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .await
                .map_err(|_| FlipbookError::subprocess("encoder stderr drain task panicked"))?
                .map_err(|e| {
                    FlipbookError::subprocess(format!("encoder stderr read failed: {e}"))
                })?,
            None => Vec::new(),
        };

        if !status.success() {
            return Err(FlipbookError::subprocess(format!(
                "encoder exited with status {}: {}",
                status,
                stderr_tail(&stderr_bytes)
            )));
        }
        Ok(())
    }
}

fn stderr_tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.trim().lines().collect();
    let keep = lines.len().saturating_sub(8);
    lines[keep..].join("\n")
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> FlipbookResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when the encoder executable at `ffmpeg` can be invoked.
pub fn is_ffmpeg_on_path(ffmpeg: &Path) -> bool {
    std::process::Command::new(ffmpeg)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
