/// Result alias used throughout the crate.
pub type StillcutResult<T> = Result<T, StillcutError>;

/// Error taxonomy for image-sequence encoding.
///
/// `Extract` is the only recoverable per-frame failure: the encoder logs it and skips the frame.
/// Every other variant aborts the conversion it occurs in.
#[derive(thiserror::Error, Debug)]
pub enum StillcutError {
    /// A caller-supplied value is out of range.
    #[error("validation error: {0}")]
    Validation(String),

    /// The session could not be prepared (stale output, writer attach, container format).
    #[error("construction error: {0}")]
    Construction(String),

    /// A pixel buffer could not be allocated or drawn into.
    #[error("render error: {0}")]
    Render(String),

    /// The video writer failed or was driven out of contract.
    #[error("writer error: {0}")]
    Writer(String),

    /// A single frame source could not be resolved to an image.
    #[error("extract error: {0}")]
    Extract(String),

    /// A manifest could not be parsed.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, usually an I/O failure carrying `anyhow` context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StillcutError {
    /// Build a [`StillcutError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StillcutError::Construction`].
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    /// Build a [`StillcutError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`StillcutError::Writer`].
    pub fn writer(msg: impl Into<String>) -> Self {
        Self::Writer(msg.into())
    }

    /// Build a [`StillcutError::Extract`].
    pub fn extract(msg: impl Into<String>) -> Self {
        Self::Extract(msg.into())
    }

    /// Build a [`StillcutError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors that abort a whole conversion rather than a single frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Extract(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
