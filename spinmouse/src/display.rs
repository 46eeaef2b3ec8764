//! Latest frame and counters for the preview.

use std::{io::Cursor, sync::Arc};

use image::{ExtendedColorType, codecs::jpeg::JpegEncoder};
use spinmouse_ci::Mono8Frame;

use crate::{Result, frame_counter::Counters};

pub const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Clone, Default)]
pub struct DisplayData {
    pub image: Option<Arc<Mono8Frame>>,
    pub counters: Counters,
}

pub type DisplaySender = tokio::sync::watch::Sender<DisplayData>;
pub type DisplayReceiver = tokio::sync::watch::Receiver<DisplayData>;

pub fn display_channel() -> (DisplaySender, DisplayReceiver) {
    tokio::sync::watch::channel(DisplayData::default())
}

/// Publish a frame, keeping the current counters.
pub fn show_frame(tx: &DisplaySender, frame: Mono8Frame) {
    tx.send_modify(|d| d.image = Some(Arc::new(frame)));
}

pub fn encode_jpeg(frame: &Mono8Frame) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder.encode(
        frame.data(),
        frame.width(),
        frame.height(),
        ExtendedColorType::L8,
    )?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_has_markers() {
        let frame = Mono8Frame::new(32, 16, (0..32 * 16).map(|i| i as u8).collect()).unwrap();
        let jpeg = encode_jpeg(&frame).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn watch_keeps_latest() {
        let (tx, rx) = display_channel();
        show_frame(&tx, Mono8Frame::new(1, 1, vec![1]).unwrap());
        show_frame(&tx, Mono8Frame::new(1, 1, vec![2]).unwrap());
        let latest = rx.borrow().image.clone().unwrap();
        assert_eq!(latest.data(), &[2]);
    }
}
