//! Writing queued frames to the outputs.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use indicatif::ProgressBar;

use crate::{
    Result,
    acquire::QueuedFrame,
    display::{DisplayData, DisplaySender},
    frame_counter::FrameCounter,
    timestamps::TimestampLog,
    video::VideoSink,
};

/// Counters are printed to the terminal every this many frames.
pub const TERMINAL_REPORT_INTERVAL: u64 = 100;

/// Where counters go while saving.
pub enum SaveProgress<'a> {
    /// Publish every frame and the counters to the preview.
    Display(&'a DisplaySender),
    /// Print the counters periodically.
    Terminal(ProgressBar),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub saved: u64,
    pub dropped: u64,
}

impl std::fmt::Display for SaveSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Saved frames: {}  |  Dropped frames: {}",
            self.saved, self.dropped
        )
    }
}

/// Save every frame from `frames` until the sender is dropped and the queue
/// is drained. The outputs are closed even if saving fails.
pub fn save_images(
    frames: Receiver<QueuedFrame>,
    mut video: Box<dyn VideoSink>,
    mut log: TimestampLog,
    progress: &SaveProgress<'_>,
) -> Result<SaveSummary> {
    let mut counter = FrameCounter::new();
    let result = save_loop(&frames, video.as_mut(), &mut log, progress, &mut counter);
    // Stop the acquire side promptly if we failed.
    drop(frames);
    let closed_video = video.finish();
    let closed_log = log.close();
    result?;
    let n_video = closed_video?;
    closed_log?;

    let counters = counter.counters();
    if let SaveProgress::Display(tx) = progress {
        tx.send_modify(|d| d.counters = counters);
    }
    tracing::debug!("video has {n_video} frames, {counters}");
    Ok(SaveSummary {
        saved: counters.acquired,
        dropped: counters.dropped,
    })
}

fn save_loop(
    frames: &Receiver<QueuedFrame>,
    video: &mut dyn VideoSink,
    log: &mut TimestampLog,
    progress: &SaveProgress<'_>,
    counter: &mut FrameCounter,
) -> Result<()> {
    for frame in frames.iter() {
        video.write_frame(&frame.image)?;
        log.write(frame.chunk.as_ref())?;
        counter.update(frames.len(), frame.chunk.map(|c| c.frame_id));
        let counters = counter.counters();
        match progress {
            SaveProgress::Display(tx) => {
                tx.send_replace(DisplayData {
                    image: Some(Arc::new(frame.image)),
                    counters,
                });
            }
            SaveProgress::Terminal(pb) => {
                if counters.acquired % TERMINAL_REPORT_INTERVAL == 0 {
                    pb.println(counters.to_string());
                }
            }
        }
    }
    Ok(())
}
