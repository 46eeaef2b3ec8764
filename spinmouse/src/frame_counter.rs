use serde::{Deserialize, Serialize};

/// Snapshot of the acquisition counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub acquired: u64,
    pub buffered: usize,
    pub dropped: u64,
}

impl std::fmt::Display for Counters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Acquired: {:>12}  |  Buffered: {:>12}  |  Dropped: {:>12}",
            self.acquired, self.buffered, self.dropped
        )
    }
}

/// Counts saved frames and detects dropped ones from gaps in the camera
/// frame ID.
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    counters: Counters,
    last_frame_id: Option<i64>,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one frame taken from a queue which still holds
    /// `queue_len` frames.
    ///
    /// Frames without chunk data have no ID and cannot reveal drops.
    pub fn update(&mut self, queue_len: usize, frame_id: Option<i64>) {
        self.counters.acquired += 1;
        self.counters.buffered = queue_len;
        let Some(frame_id) = frame_id else {
            return;
        };
        if let Some(last) = self.last_frame_id {
            if frame_id > last {
                self.counters.dropped += (frame_id - last - 1) as u64;
            } else {
                tracing::warn!("frame ID went from {last} to {frame_id}, camera counter reset?");
            }
        }
        self.last_frame_id = Some(frame_id);
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn last_frame_id(&self) -> Option<i64> {
        self.last_frame_id
    }
}

impl std::fmt::Display for FrameCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.counters.fmt(f)
    }
}
