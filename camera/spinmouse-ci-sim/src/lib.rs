//! A deterministic software camera implementing the `spinmouse-ci` traits.
//!
//! It models the handful of GenICam features needed for triggered acquisition
//! (image size and offset, trigger mode, chunk data) and produces a synthetic
//! Mono8 pattern fixed to the sensor, so moving the offset moves the image.
//! Frame IDs to skip or to deliver incomplete can be configured to exercise
//! dropped-frame handling.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::{Duration, Instant},
};

use spinmouse_ci::{
    ChunkData, Error, FrameWithInfo, HostTimingInfo, IntFeatureRange, PixelFormat, RawFrame,
    Result, TriggerMode, genicam,
};

const SIM_VENDOR: &str = "Simulated";
const SIZE_INC: i64 = 16;
/// Timestamp spacing used when frames are produced without delay.
const NOMINAL_FRAME_PERIOD_NS: i64 = 10_000_000;

/// Chunk selector entries of a Blackfly S.
pub const DEFAULT_CHUNK_ENTRIES: &[&str] = &[
    "Image",
    "CRC",
    "FrameID",
    "OffsetX",
    "OffsetY",
    "Width",
    "Height",
    "ExposureTime",
    "Gain",
    "BlackLevel",
    "PixelFormat",
    "Timestamp",
];

#[derive(Debug, Clone)]
pub struct SimCameraConfig {
    pub serial: String,
    pub model: String,
    pub sensor_width: u32,
    pub sensor_height: u32,
    /// Initial image width.
    pub width: u32,
    /// Initial image height.
    pub height: u32,
    /// Increment of OffsetX and OffsetY.
    pub offset_inc: i64,
    /// Time between frames. Zero delivers frames as fast as they are requested.
    pub frame_interval: Duration,
    /// Stop producing frames after this many (later grabs time out).
    pub n_frames: Option<u64>,
    /// Frame IDs the camera skips, as if those frames were lost.
    pub dropped_frame_ids: BTreeSet<i64>,
    /// Frame IDs delivered as incomplete images.
    pub incomplete_frame_ids: BTreeSet<i64>,
    /// Frame IDs delivered with a buffer shorter than the image.
    pub truncated_frame_ids: BTreeSet<i64>,
    /// Initial `PixelFormat`. Only Mono8 and Mono16 images can be rendered.
    pub pixel_format: String,
    pub pixel_format_entries: Vec<String>,
    pub chunk_entries: Vec<String>,
    /// Chunk entries whose `ChunkEnable` cannot be written.
    pub read_only_chunk_entries: BTreeSet<String>,
}

impl SimCameraConfig {
    pub fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            model: "Simulated Blackfly S".to_string(),
            sensor_width: 1440,
            sensor_height: 1080,
            width: 640,
            height: 480,
            offset_inc: 4,
            frame_interval: Duration::from_millis(10),
            n_frames: None,
            dropped_frame_ids: BTreeSet::new(),
            incomplete_frame_ids: BTreeSet::new(),
            truncated_frame_ids: BTreeSet::new(),
            pixel_format: "Mono8".to_string(),
            pixel_format_entries: ["Mono8", "Mono16", "Mono12p"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            chunk_entries: DEFAULT_CHUNK_ENTRIES.iter().map(|s| s.to_string()).collect(),
            read_only_chunk_entries: BTreeSet::new(),
        }
    }
}

impl Default for SimCameraConfig {
    fn default() -> Self {
        Self::new("SIM0001")
    }
}

pub struct SimModule {
    cameras: Vec<SimCameraConfig>,
}

impl SimModule {
    pub fn new(cameras: Vec<SimCameraConfig>) -> Self {
        Self { cameras }
    }
}

impl Default for SimModule {
    fn default() -> Self {
        Self::new(vec![SimCameraConfig::default()])
    }
}

#[derive(Debug, Clone)]
pub struct SimCameraInfo {
    serial: String,
    model: String,
}

impl spinmouse_ci::CameraInfo for SimCameraInfo {
    fn name(&self) -> &str {
        &self.serial
    }
    fn serial(&self) -> &str {
        &self.serial
    }
    fn model(&self) -> &str {
        &self.model
    }
    fn vendor(&self) -> &str {
        SIM_VENDOR
    }
}

impl spinmouse_ci::CameraModule for SimModule {
    type CameraType = SimCamera;

    fn name(&self) -> &str {
        "sim"
    }

    fn camera_infos(&self) -> Result<Vec<Box<dyn spinmouse_ci::CameraInfo>>> {
        Ok(self
            .cameras
            .iter()
            .map(|cfg| {
                let ci: Box<dyn spinmouse_ci::CameraInfo> = Box::new(SimCameraInfo {
                    serial: cfg.serial.clone(),
                    model: cfg.model.clone(),
                });
                ci
            })
            .collect())
    }

    fn camera(&mut self, name: &str) -> Result<Self::CameraType> {
        let cfg = self
            .cameras
            .iter()
            .find(|cfg| cfg.serial == name)
            .ok_or_else(|| Error::from(format!("no simulated camera named \"{name}\"")))?;
        let mut cam = SimCamera::new(cfg.clone());
        spinmouse_ci::select_mono_pixel_format(&mut cam)?;
        Ok(cam)
    }
}

pub struct SimCamera {
    info: SimCameraInfo,
    cfg: SimCameraConfig,
    width: i64,
    height: i64,
    offset_x: i64,
    offset_y: i64,
    trigger_mode: TriggerMode,
    exposure_time: f64,
    pixel_format: String,
    chunk_mode_active: bool,
    chunk_selector: String,
    chunk_enabled: BTreeMap<String, bool>,
    acquiring: bool,
    next_frame_id: i64,
    frames_delivered: u64,
    next_due: Option<Instant>,
    store_fno: usize,
}

fn _test_camera_is_send() {
    // Compile-time test to ensure SimCamera implements Send trait.
    fn implements<T: Send>() {}
    implements::<SimCamera>();
}

impl SimCamera {
    pub fn new(cfg: SimCameraConfig) -> Self {
        let chunk_enabled = cfg
            .chunk_entries
            .iter()
            .map(|e| (e.clone(), e == "Image"))
            .collect();
        let chunk_selector = cfg.chunk_entries.first().cloned().unwrap_or_default();
        Self {
            info: SimCameraInfo {
                serial: cfg.serial.clone(),
                model: cfg.model.clone(),
            },
            width: cfg.width.into(),
            height: cfg.height.into(),
            pixel_format: cfg.pixel_format.clone(),
            cfg,
            offset_x: 0,
            offset_y: 0,
            trigger_mode: TriggerMode::Off,
            exposure_time: 5000.0,
            chunk_mode_active: false,
            chunk_selector,
            chunk_enabled,
            acquiring: false,
            next_frame_id: 0,
            frames_delivered: 0,
            next_due: None,
            store_fno: 0,
        }
    }

    /// Whether the chunk entry named `entry` is currently enabled.
    pub fn chunk_enabled(&self, entry: &str) -> bool {
        self.chunk_enabled.get(entry).copied().unwrap_or(false)
    }

    pub fn chunk_mode_active(&self) -> bool {
        self.chunk_mode_active
    }

    /// A camera configured without chunk entries has no chunk features.
    fn check_chunk_support(&self, name: &str) -> Result<()> {
        if self.cfg.chunk_entries.is_empty() {
            Err(not_present(name))
        } else {
            Ok(())
        }
    }

    fn check_not_acquiring(&self, name: &str) -> Result<()> {
        if self.acquiring {
            Err(Error::FeatureNotWritable {
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn int_range(&self, name: &str) -> Result<IntFeatureRange> {
        let sensor_w = i64::from(self.cfg.sensor_width);
        let sensor_h = i64::from(self.cfg.sensor_height);
        let inc = self.cfg.offset_inc;
        let range = match name {
            genicam::WIDTH => IntFeatureRange {
                value: self.width,
                min: SIZE_INC,
                max: sensor_w - self.offset_x,
                inc: SIZE_INC,
            },
            genicam::HEIGHT => IntFeatureRange {
                value: self.height,
                min: SIZE_INC,
                max: sensor_h - self.offset_y,
                inc: SIZE_INC,
            },
            genicam::OFFSET_X => IntFeatureRange {
                value: self.offset_x,
                min: 0,
                max: sensor_w - self.width,
                inc,
            },
            genicam::OFFSET_Y => IntFeatureRange {
                value: self.offset_y,
                min: 0,
                max: sensor_h - self.height,
                inc,
            },
            _ => return Err(not_present(name)),
        };
        Ok(range)
    }

    fn render(&self) -> Result<RawFrame> {
        let pixel_format: PixelFormat = self.pixel_format.parse()?;
        let width = self.width as usize;
        let height = self.height as usize;
        let stride = width * pixel_format.bytes_per_pixel();
        let mut data = Vec::with_capacity(stride * height);
        for row in 0..height {
            let sy = row + self.offset_y as usize;
            for col in 0..width {
                let sx = col + self.offset_x as usize;
                let check = ((sx / 32 + sy / 32) % 2) * 160;
                let value = (check + (sx + sy) % 64) as u8;
                match pixel_format {
                    PixelFormat::Mono8 => data.push(value),
                    PixelFormat::Mono16 => data.extend_from_slice(&[0x80, value]),
                }
            }
        }
        Ok(RawFrame {
            width: self.width as u32,
            height: self.height as u32,
            stride,
            pixel_format,
            data,
        })
    }

    fn chunk_for(&self, frame_id: i64) -> Option<ChunkData> {
        if !self.chunk_mode_active || !self.chunk_enabled("FrameID") {
            return None;
        }
        let period = match self.cfg.frame_interval.as_nanos() {
            0 => NOMINAL_FRAME_PERIOD_NS,
            ns => i64::try_from(ns).unwrap_or(i64::MAX),
        };
        let timestamp = if self.chunk_enabled("Timestamp") {
            frame_id.saturating_mul(period)
        } else {
            0
        };
        Some(ChunkData {
            frame_id,
            timestamp,
        })
    }
}

fn not_present(name: &str) -> Error {
    Error::FeatureNotPresent {
        name: name.to_string(),
    }
}

impl spinmouse_ci::CameraInfo for SimCamera {
    fn name(&self) -> &str {
        spinmouse_ci::CameraInfo::name(&self.info)
    }
    fn serial(&self) -> &str {
        spinmouse_ci::CameraInfo::serial(&self.info)
    }
    fn model(&self) -> &str {
        spinmouse_ci::CameraInfo::model(&self.info)
    }
    fn vendor(&self) -> &str {
        spinmouse_ci::CameraInfo::vendor(&self.info)
    }
}

impl spinmouse_ci::Camera for SimCamera {
    // ----- start: weakly typed but easier to implement API -----

    fn command_execute(&mut self, name: &str) -> Result<()> {
        match name {
            "TriggerSoftware" => Ok(()),
            _ => Err(not_present(name)),
        }
    }

    fn feature_is_writable(&self, name: &str) -> Result<bool> {
        match name {
            genicam::WIDTH
            | genicam::HEIGHT
            | genicam::OFFSET_X
            | genicam::OFFSET_Y
            | genicam::TRIGGER_MODE
            | genicam::PIXEL_FORMAT => Ok(!self.acquiring),
            genicam::CHUNK_MODE_ACTIVE => {
                self.check_chunk_support(name)?;
                Ok(!self.acquiring)
            }
            genicam::CHUNK_SELECTOR => {
                self.check_chunk_support(name)?;
                Ok(true)
            }
            "ExposureTime" => Ok(true),
            genicam::CHUNK_ENABLE => {
                if !self.chunk_enabled.contains_key(&self.chunk_selector) {
                    return Err(not_present(name));
                }
                Ok(!self.acquiring && !self.cfg.read_only_chunk_entries.contains(&self.chunk_selector))
            }
            _ => Err(not_present(name)),
        }
    }

    fn feature_bool(&self, name: &str) -> Result<bool> {
        match name {
            genicam::CHUNK_MODE_ACTIVE => {
                self.check_chunk_support(name)?;
                Ok(self.chunk_mode_active)
            }
            genicam::CHUNK_ENABLE => self
                .chunk_enabled
                .get(&self.chunk_selector)
                .copied()
                .ok_or_else(|| not_present(name)),
            _ => Err(not_present(name)),
        }
    }

    fn feature_bool_set(&mut self, name: &str, value: bool) -> Result<()> {
        if !self.feature_is_writable(name)? {
            return Err(Error::FeatureNotWritable {
                name: name.to_string(),
            });
        }
        match name {
            genicam::CHUNK_MODE_ACTIVE => self.chunk_mode_active = value,
            genicam::CHUNK_ENABLE => {
                self.chunk_enabled.insert(self.chunk_selector.clone(), value);
            }
            _ => return Err(not_present(name)),
        }
        Ok(())
    }

    fn feature_enum(&self, name: &str) -> Result<String> {
        match name {
            genicam::TRIGGER_MODE => Ok(self.trigger_mode.to_string()),
            genicam::CHUNK_SELECTOR => {
                self.check_chunk_support(name)?;
                Ok(self.chunk_selector.clone())
            }
            genicam::PIXEL_FORMAT => Ok(self.pixel_format.clone()),
            _ => Err(not_present(name)),
        }
    }

    fn feature_enum_set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            genicam::TRIGGER_MODE => {
                self.check_not_acquiring(name)?;
                self.trigger_mode = value.parse()?;
            }
            genicam::PIXEL_FORMAT => {
                self.check_not_acquiring(name)?;
                if !self.cfg.pixel_format_entries.iter().any(|e| e == value) {
                    return Err(Error::from(format!("\"{value}\" is not a {name} entry")));
                }
                self.pixel_format = value.to_string();
            }
            genicam::CHUNK_SELECTOR => {
                if !self.chunk_enabled.contains_key(value) {
                    return Err(Error::from(format!(
                        "\"{value}\" is not a {name} entry"
                    )));
                }
                self.chunk_selector = value.to_string();
            }
            _ => return Err(not_present(name)),
        }
        Ok(())
    }

    fn feature_enum_entries(&self, name: &str) -> Result<Vec<String>> {
        match name {
            genicam::TRIGGER_MODE => Ok(vec!["Off".into(), "On".into()]),
            genicam::CHUNK_SELECTOR => {
                self.check_chunk_support(name)?;
                Ok(self.cfg.chunk_entries.clone())
            }
            genicam::PIXEL_FORMAT => Ok(self.cfg.pixel_format_entries.clone()),
            _ => Err(not_present(name)),
        }
    }

    fn feature_float(&self, name: &str) -> Result<f64> {
        match name {
            "ExposureTime" => Ok(self.exposure_time),
            _ => Err(not_present(name)),
        }
    }

    fn feature_float_set(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "ExposureTime" => {
                self.exposure_time = value;
                Ok(())
            }
            _ => Err(not_present(name)),
        }
    }

    fn feature_int(&self, name: &str) -> Result<i64> {
        Ok(self.int_range(name)?.value)
    }

    fn feature_int_set(&mut self, name: &str, value: i64) -> Result<()> {
        let range = self.int_range(name)?;
        self.check_not_acquiring(name)?;
        if value < range.min || value > range.max || (value - range.min) % range.inc.max(1) != 0 {
            return Err(Error::from(format!(
                "{value} is not a valid value for {name} (min {}, max {}, inc {})",
                range.min, range.max, range.inc
            )));
        }
        match name {
            genicam::WIDTH => self.width = value,
            genicam::HEIGHT => self.height = value,
            genicam::OFFSET_X => self.offset_x = value,
            genicam::OFFSET_Y => self.offset_y = value,
            _ => return Err(not_present(name)),
        }
        Ok(())
    }

    fn feature_int_range(&self, name: &str) -> Result<IntFeatureRange> {
        self.int_range(name)
    }

    // ----- end: weakly typed but easier to implement API -----

    fn device_information(&self) -> Result<Vec<(String, String)>> {
        Ok(vec![
            (genicam::DEVICE_VENDOR_NAME.into(), SIM_VENDOR.into()),
            (genicam::DEVICE_MODEL_NAME.into(), self.cfg.model.clone()),
            (genicam::DEVICE_SERIAL_NUMBER.into(), self.cfg.serial.clone()),
            ("DeviceType".into(), "Simulated".into()),
        ])
    }

    fn acquisition_start(&mut self) -> Result<()> {
        if !self.acquiring {
            self.acquiring = true;
            self.next_due = Some(Instant::now() + self.cfg.frame_interval);
            tracing::debug!("simulated acquisition started");
        }
        Ok(())
    }

    fn acquisition_stop(&mut self) -> Result<()> {
        if self.acquiring {
            self.acquiring = false;
            self.next_due = None;
            tracing::debug!("simulated acquisition stopped");
        }
        Ok(())
    }

    fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    fn next_frame(&mut self, timeout: Duration) -> Result<FrameWithInfo> {
        let due = match (self.acquiring, self.next_due) {
            (true, Some(due)) => due,
            _ => return Err(Error::from("next_frame called while not acquiring")),
        };
        if let Some(n_frames) = self.cfg.n_frames {
            if self.frames_delivered >= n_frames {
                std::thread::sleep(timeout);
                return Err(Error::Timeout);
            }
        }

        let now = Instant::now();
        if due > now {
            let wait = due - now;
            if wait > timeout {
                std::thread::sleep(timeout);
                return Err(Error::Timeout);
            }
            std::thread::sleep(wait);
        }
        self.next_due = Some(due.max(now) + self.cfg.frame_interval);

        while self.cfg.dropped_frame_ids.contains(&self.next_frame_id) {
            self.next_frame_id += 1;
        }
        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;
        self.frames_delivered += 1;

        if self.cfg.incomplete_frame_ids.contains(&frame_id) {
            return Err(Error::SingleFrameError(format!(
                "image {frame_id} incomplete"
            )));
        }

        let host_timing = HostTimingInfo {
            fno: self.store_fno,
            datetime: chrono::Utc::now(),
        };
        self.store_fno += 1;
        let mut image = self.render()?;
        if self.cfg.truncated_frame_ids.contains(&frame_id) {
            image.data.truncate(image.data.len() / 2);
        }
        Ok(FrameWithInfo {
            image,
            host_timing,
            chunk: self.chunk_for(frame_id),
        })
    }
}
