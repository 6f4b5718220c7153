//! Flipbook records programmatically driven browser frames into an encoded video.
//!
//! Frames are rendered and captured in parallel on a bounded pool of browser pages, then
//! streamed to an `ffmpeg` subprocess strictly in frame order. The public API is
//! session-oriented:
//!
//! - Implement the browser traits ([`BrowserPool`], [`BrowserHandle`], [`PageHandle`]) over an
//!   automation engine
//! - Describe per-frame behavior with a [`FrameScript`]
//! - Create a [`RecordSession`] (or call [`record`]) and await the run's [`RecordStats`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Browser abstraction traits and the bounded page pool.
pub mod browser;
/// Encoder subprocess control.
pub mod encode;
/// The recording pipeline.
pub mod record;

pub use crate::foundation::core::{
    CaptureSettings, FrameBuffer, FrameIndex, ImageFormat, OutputTarget, RenderJob,
};
pub use crate::foundation::error::{FlipbookError, FlipbookResult};

pub use crate::browser::driver::{BrowserHandle, BrowserPool, PageHandle, PageOf};
pub use crate::browser::pool::{PagePool, PagePoolStats, PooledPage};
pub use crate::encode::args::{EncoderConfig, encoder_args};
pub use crate::encode::ffmpeg::{EncoderProcess, ensure_parent_dir, is_ffmpeg_on_path};
pub use crate::record::producer::produce_frame;
pub use crate::record::progress::{ConsoleProgress, NullProgress, ProgressSink};
pub use crate::record::script::FrameScript;
pub use crate::record::session::{RecordOptions, RecordSession, RecordStats, record};
pub use crate::record::writer::stream_frames;
