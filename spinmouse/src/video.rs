use std::path::Path;

use ffmpeg_writer::{FfmpegWriter, FfmpegWriterOptions};
use spinmouse_ci::Mono8Frame;

use crate::Result;

/// Destination of saved frames.
pub trait VideoSink: Send {
    fn write_frame(&mut self, frame: &Mono8Frame) -> Result<()>;
    /// Finish the video, returning the number of frames written.
    fn finish(self: Box<Self>) -> Result<u64>;
}

/// MJPEG-in-AVI video written by ffmpeg.
pub struct FfmpegVideoSink {
    writer: FfmpegWriter,
}

impl FfmpegVideoSink {
    pub fn create(path: &Path, width: u32, height: u32, framerate: u32) -> Result<Self> {
        let opts = FfmpegWriterOptions {
            framerate,
            ..Default::default()
        };
        let writer = FfmpegWriter::new(path, width, height, &opts)?;
        tracing::debug!("writing {width}x{height} video to {}", path.display());
        Ok(Self { writer })
    }
}

impl VideoSink for FfmpegVideoSink {
    fn write_frame(&mut self, frame: &Mono8Frame) -> Result<()> {
        self.writer.write_gray8(frame.data())?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<u64> {
        Ok(self.writer.close()?)
    }
}
