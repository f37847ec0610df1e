use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::events::{CompletionHook, FrameCallback, FrameEvent, StopReason};
use crate::hub::NotificationHub;
use crate::store::{Frame, FrameStore};

/// Allowed playback speed range. A requested speed outside it (or a
/// non-finite one) silently falls back to 1.0.
pub const MIN_SPEED: f64 = 1.0 / 16.0;
pub const MAX_SPEED: f64 = 16.0;

/// How many full passes over the sequence to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Infinite,
    Finite(u32),
}

/// Where `start` should begin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartAt {
    /// Restart at 0 when parked on the last frame, otherwise resume at the
    /// current index.
    #[default]
    Auto,
    /// Explicit index; out of range falls back to 0.
    Index(usize),
}

/// Arguments to [`Flipbook::start`]. The defaults play forever from the
/// resolved resume position at speed 1.0 with no per-start callback.
pub struct StartOptions {
    pub start_at: StartAt,
    pub speed: f64,
    pub repeat: Repeat,
    pub on_frame: Option<FrameCallback>,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            start_at: StartAt::Auto,
            speed: 1.0,
            repeat: Repeat::Infinite,
            on_frame: None,
        }
    }
}

impl StartOptions {
    pub fn at(mut self, index: usize) -> Self {
        self.start_at = StartAt::Index(index);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn on_frame(mut self, callback: impl FnMut(FrameEvent) + Send + 'static) -> Self {
        self.on_frame = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for StartOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartOptions")
            .field("start_at", &self.start_at)
            .field("speed", &self.speed)
            .field("repeat", &self.repeat)
            .field("on_frame", &self.on_frame.is_some())
            .finish()
    }
}

#[derive(Debug)]
struct Session {
    speed: f64,
    remaining: Repeat,
}

/// The playback state machine: frame store, current index, running session,
/// and the notification fan-out. Fully synchronous; the async engine task
/// owns one of these and drives [`Flipbook::tick`] from its timer.
///
/// Methods that schedule (`start`, `tick`) return the delay until the next
/// tick; `None` means nothing is scheduled.
pub struct Flipbook {
    store: FrameStore,
    hub: NotificationHub,
    current: usize,
    session: Option<Session>,
}

impl Default for Flipbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Flipbook {
    pub fn new() -> Self {
        Self {
            store: FrameStore::new(),
            hub: NotificationHub::new(),
            current: 0,
            session: None,
        }
    }

    // --- store surface ---

    /// Setup-time operation; does not disturb a running session.
    pub fn append(&mut self, frame: Frame) {
        self.store.append(frame);
    }

    /// Installs a new sequence. Any pending tick is cancelled via the
    /// implicit stop, and the position resets to 0.
    pub fn replace_all(&mut self, frames: Vec<Frame>) {
        self.stop(StopReason::UserStopped);
        self.store.replace_all(frames);
        self.current = 0;
        debug!(count = self.store.len(), "sequence replaced");
    }

    pub fn clear(&mut self) {
        self.stop(StopReason::UserStopped);
        self.store.clear();
        self.current = 0;
    }

    pub fn set_uniform_duration(&mut self, duration: Duration) {
        self.store.set_uniform_duration(duration);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        self.store.total_duration()
    }

    pub fn index_range(&self) -> std::ops::Range<usize> {
        self.store.index_range()
    }

    // --- notification surface ---

    pub fn subscribe(&mut self) -> mpsc::Receiver<FrameEvent> {
        self.hub.subscribe()
    }

    pub fn set_completion_hook(&mut self, hook: CompletionHook) {
        self.hub.set_completion_hook(hook);
    }

    // --- playback ---

    /// Begins playback. Emits the resolved starting frame synchronously and
    /// returns the delay until the first tick, or `None` when the store is
    /// empty (a defined no-op). A `Repeat::Finite(0)` request is treated as
    /// a single pass.
    pub fn start(&mut self, opts: StartOptions) -> Option<Duration> {
        if self.store.is_empty() {
            debug!("start on empty store, skipping");
            return None;
        }

        self.current = self.resolve_start(opts.start_at);
        let speed = clamp_speed(opts.speed);
        let remaining = match opts.repeat {
            Repeat::Finite(0) => Repeat::Finite(1),
            other => other,
        };
        self.hub.set_frame_callback(opts.on_frame);
        self.session = Some(Session { speed, remaining });
        debug!(index = self.current, speed, ?remaining, "playback started");

        self.emit_current(true);
        self.next_delay()
    }

    /// One timer fire. If the pre-advance index is the last frame and the
    /// repeat budget runs out, playback stops with `AnimationComplete` and
    /// no wrap emission occurs. Otherwise the index advances modulo the
    /// count, the new frame is emitted, and the next delay is returned.
    pub fn tick(&mut self) -> Option<Duration> {
        let count = self.store.len();
        if count == 0 {
            return None;
        }
        let session = self.session.as_mut()?;

        if self.current == count - 1 {
            if let Repeat::Finite(n) = &mut session.remaining {
                *n = n.saturating_sub(1);
                if *n == 0 {
                    self.stop(StopReason::AnimationComplete);
                    return None;
                }
            }
        }

        self.current = (self.current + 1) % count;
        self.emit_current(true);
        self.next_delay()
    }

    /// Idempotent. Clears the session and the per-start callback; fires the
    /// completion hook only when a session was actually running.
    pub fn stop(&mut self, reason: StopReason) {
        if self.session.take().is_some() {
            self.hub.clear_frame_callback();
            debug!(?reason, index = self.current, "playback stopped");
            self.hub.notify_complete(reason);
        }
    }

    /// Scrubbing. Always halts autoplay first; an out-of-range offset
    /// returns `None` with the position unchanged. On success the selected
    /// frame goes to the continuous channel only — no start is in effect,
    /// so the per-start callback stays silent.
    pub fn set_current_frame(&mut self, offset: usize) -> Option<usize> {
        self.stop(StopReason::UserStopped);
        if offset >= self.store.len() {
            debug!(offset, count = self.store.len(), "scrub offset out of range");
            return None;
        }
        self.current = offset;
        self.emit_current(false);
        Some(offset)
    }

    /// Frame at the current index, without side effects.
    pub fn peek(&self) -> Option<&Frame> {
        self.store.get(self.current)
    }

    pub fn frame_at(&self, offset: usize) -> Option<&Frame> {
        self.store.get(offset)
    }

    pub fn is_animating(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    fn resolve_start(&self, start_at: StartAt) -> usize {
        let count = self.store.len();
        match start_at {
            StartAt::Index(i) if i < count => i,
            StartAt::Index(_) => 0,
            StartAt::Auto => {
                if self.store.last_index() == Some(self.current) {
                    0
                } else if self.current < count {
                    self.current
                } else {
                    0
                }
            }
        }
    }

    fn emit_current(&mut self, to_callback: bool) {
        if let Some(frame) = self.store.get(self.current) {
            let event = FrameEvent {
                frame: frame.clone(),
                index: self.current,
                count: self.store.len(),
            };
            self.hub.emit(event, to_callback);
        }
    }

    fn next_delay(&self) -> Option<Duration> {
        let session = self.session.as_ref()?;
        let frame = self.store.get(self.current)?;
        Some(frame.duration.div_f64(session.speed))
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() && (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        speed
    } else {
        1.0
    }
}
