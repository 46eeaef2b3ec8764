use chrono::{DateTime, Utc};

use crate::{Camera, Error, Result, genicam};

/// Pixel formats delivered by the supported cameras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Mono8,
    /// Little-endian, 16 bits per pixel.
    Mono16,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Mono8 => 1,
            PixelFormat::Mono16 => 2,
        }
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Mono8" => Ok(PixelFormat::Mono8),
            "Mono16" => Ok(PixelFormat::Mono16),
            other => Err(Error::UnsupportedPixelFormat(other.to_string())),
        }
    }
}

/// Make the camera deliver a pixel format [RawFrame] can hold.
///
/// Mono8 and Mono16 are kept. Anything else (packed Mono10/12, Bayer) is
/// switched to Mono8. Must be called while not acquiring.
pub fn select_mono_pixel_format<C: Camera + ?Sized>(cam: &mut C) -> Result<PixelFormat> {
    let current = cam.feature_enum(genicam::PIXEL_FORMAT)?;
    if let Ok(format) = current.parse() {
        return Ok(format);
    }
    let has_mono8 = cam
        .feature_enum_entries(genicam::PIXEL_FORMAT)?
        .iter()
        .any(|e| e == "Mono8");
    if !has_mono8 || !cam.feature_is_writable(genicam::PIXEL_FORMAT)? {
        return Err(Error::UnsupportedPixelFormat(current));
    }
    cam.feature_enum_set(genicam::PIXEL_FORMAT, "Mono8")?;
    tracing::info!("pixel format changed from {current} to Mono8");
    Ok(PixelFormat::Mono8)
}

/// An image as delivered by the camera, possibly with row padding.
#[derive(Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Number of bytes per row, including padding.
    pub stride: usize,
    pub pixel_format: PixelFormat,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("pixel_format", &self.pixel_format)
            .finish_non_exhaustive()
    }
}

impl RawFrame {
    /// Convert to packed 8 bit grayscale.
    ///
    /// Mono16 pixels keep their most significant byte.
    pub fn to_mono8(&self) -> Result<Mono8Frame> {
        let width = self.width as usize;
        let height = self.height as usize;
        let row_bytes = width * self.pixel_format.bytes_per_pixel();
        if self.stride < row_bytes || self.data.len() < self.stride * height.saturating_sub(1) + row_bytes
        {
            return Err(Error::SingleFrameError(format!(
                "image buffer of {} bytes too small for {}x{} {:?} with stride {}",
                self.data.len(),
                self.width,
                self.height,
                self.pixel_format,
                self.stride
            )));
        }

        let mut packed = Vec::with_capacity(width * height);
        for row in self.data.chunks(self.stride).take(height) {
            let row = &row[..row_bytes];
            match self.pixel_format {
                PixelFormat::Mono8 => packed.extend_from_slice(row),
                PixelFormat::Mono16 => packed.extend(row.chunks_exact(2).map(|px| px[1])),
            }
        }
        Ok(Mono8Frame {
            width: self.width,
            height: self.height,
            data: packed,
        })
    }
}

/// Packed 8 bit grayscale image (stride equals width).
#[derive(Clone, PartialEq, Eq)]
pub struct Mono8Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for Mono8Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mono8Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Mono8Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::SingleFrameError(format!(
                "expected {expected} bytes for {width}x{height} image, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Per-frame metadata embedded by the camera in the image stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkData {
    /// Camera frame counter. Gaps indicate dropped frames.
    pub frame_id: i64,
    /// Camera clock at exposure, in ticks (nanoseconds on Blackfly cameras).
    pub timestamp: i64,
}

/// Timing information from the host computer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTimingInfo {
    /// Host-side frame number, counting every frame returned by the backend.
    pub fno: usize,
    pub datetime: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FrameWithInfo {
    pub image: RawFrame,
    pub host_timing: HostTimingInfo,
    /// `None` if chunk data was not enabled or could not be parsed.
    pub chunk: Option<ChunkData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_mono8_rows_are_packed() {
        let raw = RawFrame {
            width: 3,
            height: 2,
            stride: 4,
            pixel_format: PixelFormat::Mono8,
            data: vec![1, 2, 3, 99, 4, 5, 6, 99],
        };
        let packed = raw.to_mono8().unwrap();
        assert_eq!(packed.data(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!((packed.width(), packed.height()), (3, 2));
    }

    #[test]
    fn mono16_keeps_high_byte() {
        let raw = RawFrame {
            width: 2,
            height: 1,
            stride: 4,
            pixel_format: PixelFormat::Mono16,
            data: vec![0x34, 0x12, 0xff, 0xab],
        };
        assert_eq!(raw.to_mono8().unwrap().data(), &[0x12, 0xab]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let raw = RawFrame {
            width: 4,
            height: 2,
            stride: 4,
            pixel_format: PixelFormat::Mono8,
            data: vec![0; 7],
        };
        assert!(raw.to_mono8().is_err());
        assert!(Mono8Frame::new(2, 2, vec![0; 3]).is_err());
    }
}
