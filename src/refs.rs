//! Reconstructed reference frame management.

use std::collections::VecDeque;

use crate::frame::Frame;

/// One retained anchor reconstruction.
#[derive(Debug)]
pub struct ReferenceFrame {
    /// Coding index of the frame this reconstruction belongs to.
    pub frame_number: u64,
    pub frame: Frame,
}

/// Sliding window of anchor reconstructions, newest last.
///
/// Only intra and predicted frames enter. With window w, an anchor is
/// retired once w newer anchors exist; under the intra/predicted/
/// bidirectional structure no later frame can still reference it.
#[derive(Debug)]
pub struct ReferenceFrameSet {
    window: usize,
    entries: VecDeque<ReferenceFrame>,
}

impl ReferenceFrameSet {
    pub fn new(window: usize) -> Self {
        debug_assert!(window >= 1);
        Self {
            window,
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Admits a new anchor reconstruction, retiring the oldest once the
    /// window is full.
    pub fn insert(&mut self, frame_number: u64, frame: Frame) {
        self.entries.push_back(ReferenceFrame {
            frame_number,
            frame,
        });
        while self.entries.len() > self.window {
            self.entries.pop_front();
        }
    }

    /// Most recent anchor: the forward reference of predicted frames.
    pub fn latest(&self) -> Option<&ReferenceFrame> {
        self.entries.back()
    }

    /// The two most recent anchors as (older, newer): the forward and
    /// backward references of bidirectional frames.
    pub fn two_latest(&self) -> Option<(&ReferenceFrame, &ReferenceFrame)> {
        let n = self.entries.len();
        if n < 2 {
            return None;
        }
        Some((&self.entries[n - 2], &self.entries[n - 1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_frame(v: u8) -> Frame {
        Frame::solid(16, 16, v, 128, 128)
    }

    #[test]
    fn window_retires_oldest() {
        let mut set = ReferenceFrameSet::new(2);
        set.insert(0, marker_frame(10));
        set.insert(1, marker_frame(11));
        set.insert(2, marker_frame(12));
        assert_eq!(set.len(), 2);
        let (older, newer) = set.two_latest().unwrap();
        assert_eq!(older.frame_number, 1);
        assert_eq!(newer.frame_number, 2);
    }

    #[test]
    fn latest_is_newest_insert() {
        let mut set = ReferenceFrameSet::new(3);
        assert!(set.latest().is_none());
        set.insert(0, marker_frame(1));
        set.insert(1, marker_frame(2));
        assert_eq!(set.latest().unwrap().frame_number, 1);
        assert_eq!(set.latest().unwrap().frame.y[0], 2);
    }

    #[test]
    fn two_latest_needs_two_anchors() {
        let mut set = ReferenceFrameSet::new(4);
        assert!(set.two_latest().is_none());
        set.insert(0, marker_frame(1));
        assert!(set.two_latest().is_none());
        set.insert(1, marker_frame(2));
        assert!(set.two_latest().is_some());
    }

    #[test]
    fn window_of_one_keeps_only_newest() {
        let mut set = ReferenceFrameSet::new(1);
        set.insert(0, marker_frame(1));
        set.insert(1, marker_frame(2));
        assert_eq!(set.len(), 1);
        assert_eq!(set.latest().unwrap().frame_number, 1);
        assert!(set.two_latest().is_none());
    }
}
