use crate::foundation::core::RenderJob;

/// Receives per-frame progress notifications during a recording.
pub trait ProgressSink: Send + Sync {
    /// Called just before a frame starts rendering.
    fn frame_started(&self, job: RenderJob);
}

/// Discards all progress notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn frame_started(&self, _job: RenderJob) {}
}

/// Prints one line per frame to stderr.
///
/// Stdout is left untouched so it stays safe to stream video to.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn frame_started(&self, job: RenderJob) {
        eprintln!("{}", progress_line(job));
    }
}

pub(crate) fn progress_line(job: RenderJob) -> String {
    format!(
        "[flipbook] rendering frame {} of {}.",
        job.frame.0, job.total
    )
}
