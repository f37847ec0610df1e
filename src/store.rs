use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

/// Opaque handle to a decoded raster. The engine never reads or mutates the
/// pixels; it only hands the reference on to subscribers.
pub type ImageRef = Arc<image::RgbaImage>;

/// One entry of the sequence: an externally owned image plus how long it
/// should stay on screen at speed 1.0. A zero duration is legal and means
/// "advance immediately on the next tick".
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: ImageRef,
    pub duration: Duration,
}

impl Frame {
    pub fn new(image: ImageRef, duration: Duration) -> Self {
        Self { image, duration }
    }
}

/// Ordered, mutable frame sequence. Lives inside the engine state; all
/// access happens on the engine task, so there is no locking here.
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Vec<Frame>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Clears and bulk-loads a caller-decoded sequence.
    pub fn replace_all(&mut self, frames: Vec<Frame>) {
        self.frames = frames;
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Rewrites every frame's duration to a single value, preserving images
    /// and order.
    pub fn set_uniform_duration(&mut self, duration: Duration) {
        for frame in &mut self.frames {
            frame.duration = duration;
        }
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sum of all frame durations, ignoring playback speed.
    pub fn total_duration(&self) -> Duration {
        self.frames.iter().map(|f| f.duration).sum()
    }

    /// Valid index range, empty when the store is empty.
    pub fn index_range(&self) -> Range<usize> {
        0..self.frames.len()
    }

    /// Index of the final frame, `None` when empty.
    pub fn last_index(&self) -> Option<usize> {
        self.frames.len().checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(secs: f64) -> Frame {
        Frame::new(
            Arc::new(image::RgbaImage::new(1, 1)),
            Duration::from_secs_f64(secs),
        )
    }

    #[test]
    fn replace_all_swaps_sequence() {
        let mut store = FrameStore::new();
        store.append(frame(0.1));
        store.append(frame(0.2));
        store.replace_all(vec![frame(1.0)]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().duration, Duration::from_secs(1));
        assert!(store.get(1).is_none());
    }

    #[test]
    fn uniform_duration_preserves_images_and_order() {
        let a = Arc::new(image::RgbaImage::new(2, 1));
        let b = Arc::new(image::RgbaImage::new(1, 2));
        let mut store = FrameStore::new();
        store.append(Frame::new(a.clone(), Duration::from_millis(100)));
        store.append(Frame::new(b.clone(), Duration::from_millis(200)));

        store.set_uniform_duration(Duration::from_millis(40));

        assert!(Arc::ptr_eq(&store.get(0).unwrap().image, &a));
        assert!(Arc::ptr_eq(&store.get(1).unwrap().image, &b));
        for idx in store.index_range() {
            assert_eq!(store.get(idx).unwrap().duration, Duration::from_millis(40));
        }
    }

    #[test]
    fn totals_and_ranges() {
        let mut store = FrameStore::new();
        assert!(store.index_range().is_empty());
        assert_eq!(store.total_duration(), Duration::ZERO);
        assert_eq!(store.last_index(), None);

        store.append(frame(0.5));
        store.append(frame(2.0));
        assert_eq!(store.total_duration(), Duration::from_millis(2500));
        assert_eq!(store.index_range(), 0..2);
        assert_eq!(store.last_index(), Some(1));

        store.clear();
        assert!(store.is_empty());
    }
}
