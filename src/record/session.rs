use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::browser::driver::BrowserPool;
use crate::browser::pool::PagePool;
use crate::encode::args::EncoderConfig;
use crate::encode::ffmpeg::EncoderProcess;
use crate::foundation::core::{CaptureSettings, FrameIndex, OutputTarget, RenderJob};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::record::producer::produce_frame;
use crate::record::progress::{ConsoleProgress, NullProgress, ProgressSink};
use crate::record::script::FrameScript;
use crate::record::writer::stream_frames;

/// Options controlling a recording run.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RecordOptions {
    /// Total number of frames to record.
    pub frames: u64,
    /// Maximum number of concurrently open pages. This is the pipeline's concurrency limit; the
    /// default of 1 renders fully sequentially.
    pub page_count: usize,
    /// Output frame rate.
    pub fps: u32,
    /// Image format and quality for captured frames.
    pub capture: CaptureSettings,
    /// Optional media file whose audio track is copied into the output untouched.
    pub audio_path: Option<PathBuf>,
    /// Optional sizing hint for the encoder's stdin packet queue.
    pub thread_queue_size: Option<u32>,
    /// Encoded video destination.
    pub output: OutputTarget,
    /// Forward the encoder subprocess's stdout/stderr to this process's own streams.
    pub pipe_output: bool,
    /// Encoder executable, resolved on the search path when not an absolute path.
    pub ffmpeg_path: PathBuf,
    /// Emit one progress line to stderr per frame.
    pub log_each_frame: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            frames: 1,
            page_count: 1,
            fps: 60,
            capture: CaptureSettings::default(),
            audio_path: None,
            thread_queue_size: None,
            output: OutputTarget::Stdout,
            pipe_output: false,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            log_each_frame: false,
        }
    }
}

impl RecordOptions {
    /// Options for recording `frames` frames, everything else at defaults.
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    fn validate(&self) -> FlipbookResult<()> {
        if self.frames == 0 {
            return Err(FlipbookError::validation("frames must be >= 1"));
        }
        if self.page_count == 0 {
            return Err(FlipbookError::validation("page_count must be >= 1"));
        }
        if self.fps == 0 {
            return Err(FlipbookError::validation("fps must be >= 1"));
        }
        Ok(())
    }

    fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            fps: self.fps,
            audio_path: self.audio_path.clone(),
            thread_queue_size: self.thread_queue_size,
            output: self.output.clone(),
            pipe_output: self.pipe_output,
        }
    }
}

/// Recording run statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordStats {
    /// Frames rendered, captured, and streamed to the encoder.
    pub frames_written: u64,
    /// Total bytes streamed to the encoder's stdin.
    pub bytes_streamed: u64,
}

/// Session-oriented recorder.
///
/// A session validates its options up front; [`RecordSession::record`] then drives the whole
/// pipeline: page pool, concurrent frame producers, ordered streaming into the encoder
/// subprocess, and teardown of both sides.
pub struct RecordSession<B: BrowserPool> {
    browsers: Arc<B>,
    script: Arc<dyn FrameScript<B::Browser>>,
    progress: Arc<dyn ProgressSink>,
    opts: RecordOptions,
}

impl<B: BrowserPool> RecordSession<B> {
    /// Construct a new recording session over `browsers`, driven by `script`.
    pub fn new(
        browsers: Arc<B>,
        script: Arc<dyn FrameScript<B::Browser>>,
        opts: RecordOptions,
    ) -> FlipbookResult<Self> {
        opts.validate()?;
        let progress: Arc<dyn ProgressSink> = if opts.log_each_frame {
            Arc::new(ConsoleProgress)
        } else {
            Arc::new(NullProgress)
        };
        Ok(Self {
            browsers,
            script,
            progress,
            opts,
        })
    }

    /// Replace the progress sink, overriding the `log_each_frame` selection.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Record all frames and wait for both the encoder exit and the pool teardown.
    pub async fn record(&self) -> FlipbookResult<RecordStats> {
        let total = self.opts.frames;
        let pool = PagePool::new(
            Arc::clone(&self.browsers),
            Arc::clone(&self.script),
            self.opts.page_count,
        )?;

        // Every producer is launched immediately; the pool itself throttles concurrency. Each
        // task holds a clone of `done`, and the teardown task fires once all clones are dropped,
        // which is when every job has been dispatched and finished with its page.
        let (done, finished) = mpsc::channel::<()>(1);
        let mut handles = Vec::with_capacity(total as usize);
        for frame in 1..=total {
            let pool = pool.clone();
            let script = Arc::clone(&self.script);
            let progress = Arc::clone(&self.progress);
            let settings = self.opts.capture;
            let done = done.clone();
            handles.push(tokio::spawn(async move {
                let _done = done;
                let job = RenderJob {
                    frame: FrameIndex(frame),
                    total,
                };
                produce_frame(&pool, script.as_ref(), progress.as_ref(), &settings, job).await
            }));
        }
        drop(done);
        let lifecycle = tokio::spawn(teardown_when_done(pool, finished));

        let mut encoder = match EncoderProcess::spawn(&self.opts.encoder_config()) {
            Ok(encoder) => encoder,
            Err(err) => {
                // Producers keep rendering into the void; let the pool wind down before
                // reporting the spawn failure.
                drop(handles);
                let _ = await_teardown(lifecycle).await;
                return Err(err);
            }
        };
        let Some(stdin) = encoder.take_stdin() else {
            drop(handles);
            let _ = await_teardown(lifecycle).await;
            return Err(FlipbookError::subprocess(
                "encoder stdin already taken (unexpected)",
            ));
        };

        let streamed = stream_frames(stdin, handles).await;
        let (closed_res, drained_res) = tokio::join!(encoder.closed(), await_teardown(lifecycle));

        let bytes_streamed = match streamed {
            Ok(bytes) => bytes,
            Err(e) => {
                // The writer-side failure is the one reported; the others still surface in logs.
                if let Err(closed_err) = closed_res {
                    tracing::warn!(error = %closed_err, "encoder close failed after stream failure");
                }
                if let Err(drained_err) = drained_res {
                    tracing::warn!(error = %drained_err, "pool teardown failed after stream failure");
                }
                return Err(e);
            }
        };
        closed_res?;
        drained_res?;

        Ok(RecordStats {
            frames_written: total,
            bytes_streamed,
        })
    }
}

/// Record `opts.frames` frames with `script` over `browsers`.
///
/// Convenience wrapper over [`RecordSession`] for one-shot recordings.
pub async fn record<B: BrowserPool>(
    browsers: Arc<B>,
    script: Arc<dyn FrameScript<B::Browser>>,
    opts: RecordOptions,
) -> FlipbookResult<RecordStats> {
    RecordSession::new(browsers, script, opts)?.record().await
}

async fn teardown_when_done<B: BrowserPool>(
    pool: PagePool<B>,
    mut finished: mpsc::Receiver<()>,
) -> FlipbookResult<()> {
    // Resolves once the last producer drops its sender.
    let _ = finished.recv().await;
    pool.drain().await?;
    pool.clear().await?;
    pool.drain().await
}

async fn await_teardown(lifecycle: JoinHandle<FlipbookResult<()>>) -> FlipbookResult<()> {
    match lifecycle.await {
        Ok(result) => result,
        Err(_) => Err(FlipbookError::pool("pool teardown task panicked")),
    }
}
