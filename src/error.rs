use thiserror::Error;

/// Library error type for flipbook operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine task has shut down; the handle can no longer reach it.
    #[error("flipbook engine is no longer running")]
    EngineClosed,

    /// An external decode collaborator failed while producing frames.
    #[error("frame load failed: {0}")]
    Load(#[from] anyhow::Error),
}
