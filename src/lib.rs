//! Frame-sequencing playback engine.
//!
//! Feed an ordered sequence of (image, duration) frames into a [`playback::Flipbook`]
//! and it presents them one at a time at the right pace, with looping,
//! variable speed, scrubbing, and cancellation. The async engine task in
//! [`tasks::engine`] pins all state to a single task; [`handle::FlipbookHandle`]
//! is the thread-safe front door.

pub mod error;
pub mod events;
pub mod handle;
pub mod hub;
pub mod load;
pub mod playback;
pub mod store;
pub mod tasks {
    pub mod engine;
}
