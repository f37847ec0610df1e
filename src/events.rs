use crate::store::Frame;

/// Payload pushed on every frame emission, both to the continuous
/// subscription channel and to the per-start callback.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    pub frame: Frame,
    /// Index of the emitted frame within the store at emission time.
    pub index: usize,
    /// Store length at emission time.
    pub count: usize,
}

/// Why playback reached Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A finite repeat count was exhausted.
    AnimationComplete,
    /// Explicit stop, scrub, or sequence replacement.
    UserStopped,
}

/// Per-start frame callback. One slot; each `start` replaces it wholesale.
pub type FrameCallback = Box<dyn FnMut(FrameEvent) + Send>;

/// Completion hook, fired once per logical stop.
pub type CompletionHook = Box<dyn FnMut(StopReason) + Send>;
