use std::path::PathBuf;

/// Absolute 1-based frame index in recording timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// One unit of capture work: a frame index plus the total frame count of the recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenderJob {
    /// Frame to render, in `1..=total`.
    pub frame: FrameIndex,
    /// Total frame count of the recording.
    pub total: u64,
}

/// Encoded image bytes for one captured frame.
///
/// Produced by exactly one frame job; ownership transfers to the ordered stream writer.
pub type FrameBuffer = Vec<u8>;

/// Image container format for captured frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG (default).
    #[default]
    Png,
    /// Lossy JPEG; honors [`CaptureSettings::quality`].
    Jpeg,
}

/// Per-frame capture settings handed to
/// [`PageHandle::capture`](crate::browser::driver::PageHandle::capture).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptureSettings {
    /// Image encoding for captured frames.
    pub format: ImageFormat,
    /// Quality hint in `0..=100`, meaningful only for lossy formats.
    pub quality: Option<u8>,
}

/// Destination of the encoded video stream.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTarget {
    /// Write the container to a file, creating parent directories as needed.
    File(PathBuf),
    /// Stream the container to the caller's standard output (default).
    #[default]
    Stdout,
}
