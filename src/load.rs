use anyhow::{Result, anyhow};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::store::Frame;

/// Terminal outcome of one load attempt. Cancellation is cooperative and is
/// not an error; there are no retries.
pub enum LoadOutcome {
    Loaded(Vec<Frame>),
    Cancelled,
    Failed(anyhow::Error),
}

impl std::fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded(frames) => f.debug_tuple("Loaded").field(&frames.len()).finish(),
            Self::Cancelled => f.write_str("Cancelled"),
            Self::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Runs a caller-supplied blocking decode off the runtime threads.
///
/// Decoding multi-frame containers stays outside this crate; the decoder is
/// handed a predicate to poll between frames and should bail out (any error
/// will do) once it reports true. A cancellation observed here outranks
/// whatever the decoder returned.
pub async fn decode_frames<F>(decode: F, cancel: CancellationToken) -> LoadOutcome
where
    F: FnOnce(&dyn Fn() -> bool) -> Result<Vec<Frame>> + Send + 'static,
{
    let token = cancel.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let cancelled = || token.is_cancelled();
        if cancelled() {
            return LoadOutcome::Cancelled;
        }
        match decode(&cancelled) {
            Ok(frames) if token.is_cancelled() => {
                debug!(count = frames.len(), "decode finished after cancellation");
                LoadOutcome::Cancelled
            }
            Ok(frames) => LoadOutcome::Loaded(frames),
            Err(_) if token.is_cancelled() => LoadOutcome::Cancelled,
            Err(err) => LoadOutcome::Failed(err),
        }
    })
    .await;

    match joined {
        Ok(outcome) => outcome,
        Err(err) => LoadOutcome::Failed(anyhow!("decode task failed: {err}")),
    }
}
