/// Crate-wide result alias.
pub type FlipbookResult<T> = Result<T, FlipbookError>;

/// Error taxonomy for a recording run.
///
/// Failures are never retried internally; every variant propagates to the caller of the operation
/// that observed it.
#[derive(thiserror::Error, Debug)]
pub enum FlipbookError {
    /// Rejected configuration, reported before any resource is touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failure creating, preparing, or destroying a page or browser.
    #[error("page pool error: {0}")]
    Pool(String),

    /// Failure in the caller-supplied render logic for one frame.
    #[error("render error: {0}")]
    Render(String),

    /// Failure capturing a frame from a page.
    #[error("capture error: {0}")]
    Capture(String),

    /// The encoder's input stream rejected a write.
    #[error("stream write error: {0}")]
    StreamWrite(String),

    /// The encoder process failed to spawn or exited with an error status.
    #[error("encoder process error: {0}")]
    Subprocess(String),

    /// Any other error, preserved with its source chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlipbookError {
    /// Build a [`FlipbookError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FlipbookError::Pool`].
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }

    /// Build a [`FlipbookError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`FlipbookError::Capture`].
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Build a [`FlipbookError::StreamWrite`].
    pub fn stream_write(msg: impl Into<String>) -> Self {
        Self::StreamWrite(msg.into())
    }

    /// Build a [`FlipbookError::Subprocess`].
    pub fn subprocess(msg: impl Into<String>) -> Self {
        Self::Subprocess(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            FlipbookError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            FlipbookError::pool("x")
                .to_string()
                .contains("page pool error:")
        );
        assert!(
            FlipbookError::render("x")
                .to_string()
                .contains("render error:")
        );
        assert!(
            FlipbookError::capture("x")
                .to_string()
                .contains("capture error:")
        );
        assert!(
            FlipbookError::stream_write("x")
                .to_string()
                .contains("stream write error:")
        );
        assert!(
            FlipbookError::subprocess("x")
                .to_string()
                .contains("encoder process error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = FlipbookError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
