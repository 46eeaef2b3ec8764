//! Camera interface traits for triggered acquisition with machine vision
//! cameras.
//!
//! Backends (the Spinnaker SDK, a simulated camera) implement [CameraModule]
//! and [Camera]. Operations which only need GenICam feature access, such as
//! toggling chunk data or moving the image offset, are implemented once here
//! on top of the weakly typed feature API.

use serde::{Deserialize, Serialize};

mod chunk;
mod frame;
mod offset;

pub use chunk::{ChunkEntryProblem, ChunkReport, disable_chunk_data, enable_chunk_data};
pub use frame::{
    ChunkData, FrameWithInfo, HostTimingInfo, Mono8Frame, PixelFormat, RawFrame,
    select_mono_pixel_format,
};
pub use offset::{IntFeatureRange, click_to_offset_delta, update_image_offset, with_acquisition_paused};

// ---------------------------
// errors

pub type Result<M> = std::result::Result<M, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("SingleFrameError({0})")]
    SingleFrameError(String),
    #[error("Timeout")]
    Timeout,
    #[error("CI2Error({msg})")]
    CI2Error { msg: String },
    #[error("feature \"{name}\" not present")]
    FeatureNotPresent { name: String },
    #[error("feature \"{name}\" not writable")]
    FeatureNotWritable { name: String },
    #[error("unsupported pixel format {0}")]
    UnsupportedPixelFormat(String),
    #[error("BackendError({0})")]
    BackendError(#[from] anyhow::Error),
    #[error("io error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
    #[error("try from int error: {source}")]
    TryFromIntError {
        #[from]
        source: std::num::TryFromIntError,
    },
}

fn _test_error_is_send() {
    // Compile-time test to ensure Error implements Send trait.
    fn implements<T: Send>() {}
    implements::<Error>();
}

impl<'a> From<&'a str> for Error {
    fn from(orig: &'a str) -> Error {
        Error::CI2Error {
            msg: orig.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Error {
        Error::CI2Error { msg }
    }
}

// ---------------------------
// feature names

/// GenICam feature names (Standard Features Naming Convention) used here.
pub mod genicam {
    pub const WIDTH: &str = "Width";
    pub const HEIGHT: &str = "Height";
    pub const OFFSET_X: &str = "OffsetX";
    pub const OFFSET_Y: &str = "OffsetY";
    pub const TRIGGER_MODE: &str = "TriggerMode";
    pub const PIXEL_FORMAT: &str = "PixelFormat";
    pub const CHUNK_MODE_ACTIVE: &str = "ChunkModeActive";
    pub const CHUNK_SELECTOR: &str = "ChunkSelector";
    pub const CHUNK_ENABLE: &str = "ChunkEnable";
    pub const DEVICE_SERIAL_NUMBER: &str = "DeviceSerialNumber";
    pub const DEVICE_MODEL_NAME: &str = "DeviceModelName";
    pub const DEVICE_VENDOR_NAME: &str = "DeviceVendorName";
}

// ---------------------------
// TriggerMode

/// Camera trigger enable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Free-running capture.
    Off,
    /// Each frame is started by an external trigger signal.
    On,
}

// use Debug to impl Display
impl std::fmt::Display for TriggerMode {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        std::fmt::Debug::fmt(self, fmt)
    }
}

impl std::str::FromStr for TriggerMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Off" => Ok(TriggerMode::Off),
            "On" => Ok(TriggerMode::On),
            other => Err(format!("unknown TriggerMode \"{other}\"").into()),
        }
    }
}

impl From<bool> for TriggerMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            TriggerMode::On
        } else {
            TriggerMode::Off
        }
    }
}

// ---------------------------
// CameraModule

/// A module for opening cameras (e.g. Spinnaker).
pub trait CameraModule: Send {
    type CameraType: Camera;

    fn name(&self) -> &str;
    fn camera_infos(&self) -> Result<Vec<Box<dyn CameraInfo>>>;
    /// Open the camera with the given name as returned by [CameraInfo::name].
    fn camera(&mut self, name: &str) -> Result<Self::CameraType>;
}

// ---------------------------
// CameraInfo

pub trait CameraInfo {
    fn name(&self) -> &str;
    fn serial(&self) -> &str;
    fn model(&self) -> &str;
    fn vendor(&self) -> &str;
}

// ---------------------------
// Camera

pub trait Camera: CameraInfo + Send {
    // ----- start: weakly typed but easier to implement API -----

    fn command_execute(&mut self, name: &str) -> Result<()>;
    /// Return whether the feature can currently be written.
    ///
    /// Returns [Error::FeatureNotPresent] if the feature is not available.
    fn feature_is_writable(&self, name: &str) -> Result<bool>;
    fn feature_bool(&self, name: &str) -> Result<bool>;
    fn feature_bool_set(&mut self, name: &str, value: bool) -> Result<()>;
    fn feature_enum(&self, name: &str) -> Result<String>;
    fn feature_enum_set(&mut self, name: &str, value: &str) -> Result<()>;
    /// The symbolic names of the available and readable entries of an
    /// enumeration feature.
    fn feature_enum_entries(&self, name: &str) -> Result<Vec<String>>;
    fn feature_float(&self, name: &str) -> Result<f64>;
    fn feature_float_set(&mut self, name: &str, value: f64) -> Result<()>;
    fn feature_int(&self, name: &str) -> Result<i64>;
    fn feature_int_set(&mut self, name: &str, value: i64) -> Result<()>;
    fn feature_int_range(&self, name: &str) -> Result<IntFeatureRange>;

    // ----- end: weakly typed but easier to implement API -----

    /// Name and value of each feature in the transport layer device
    /// information category.
    fn device_information(&self) -> Result<Vec<(String, String)>>;

    /// Return the image width in pixels
    fn width(&self) -> Result<u32> {
        Ok(self.feature_int(genicam::WIDTH)?.try_into()?)
    }
    /// Return the image height in pixels
    fn height(&self) -> Result<u32> {
        Ok(self.feature_int(genicam::HEIGHT)?.try_into()?)
    }

    // Settings: TriggerMode ----------------------------
    fn trigger_mode(&self) -> Result<TriggerMode> {
        self.feature_enum(genicam::TRIGGER_MODE)?.parse()
    }
    fn set_trigger_mode(&mut self, value: TriggerMode) -> Result<()> {
        self.feature_enum_set(genicam::TRIGGER_MODE, &value.to_string())
    }

    // Acquisition ----------------------------
    fn acquisition_start(&mut self) -> Result<()>;
    fn acquisition_stop(&mut self) -> Result<()>;
    fn is_acquiring(&self) -> bool;

    /// synchronous (blocking) frame acquisition
    ///
    /// Returns [Error::Timeout] if no frame arrives within `timeout`. This is
    /// expected in trigger mode while no trigger pulses arrive.
    fn next_frame(&mut self, timeout: std::time::Duration) -> Result<FrameWithInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_mode_roundtrips_through_strings() {
        for mode in [TriggerMode::On, TriggerMode::Off] {
            let parsed: TriggerMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
        assert!("Maybe".parse::<TriggerMode>().is_err());
        assert_eq!(TriggerMode::from(true), TriggerMode::On);
    }
}
