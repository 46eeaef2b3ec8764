//! `spinmouse-ci` backend for FLIR cameras using the Spinnaker SDK.
//!
//! Cameras are named by serial number.

use std::{sync::Arc, time::Duration};

use spinmouse_ci::{
    ChunkData, FrameWithInfo, HostTimingInfo, IntFeatureRange, PixelFormat, RawFrame, genicam,
};
use spinnaker_c::{SpinnakerLibrary, System};

const CHUNK_FRAME_ID: &str = "ChunkFrameID";
const CHUNK_TIMESTAMP: &str = "ChunkTimestamp";
const DEVICE_INFORMATION: &str = "DeviceInformation";

fn se2ce(orig: spinnaker_c::Error) -> spinmouse_ci::Error {
    use spinnaker_c::Error as E;
    match orig {
        E::NodeNotAvailable { name } => spinmouse_ci::Error::FeatureNotPresent { name },
        E::NodeNotWritable { name } => spinmouse_ci::Error::FeatureNotWritable { name },
        e if e.is_timeout() => spinmouse_ci::Error::Timeout,
        e => spinmouse_ci::Error::from(anyhow::Error::new(e).context("Spinnaker")),
    }
}

trait ExtendedError<T> {
    fn map_spin_err(self) -> spinmouse_ci::Result<T>;
}

impl<T> ExtendedError<T> for std::result::Result<T, spinnaker_c::Error> {
    fn map_spin_err(self) -> spinmouse_ci::Result<T> {
        self.map_err(se2ce)
    }
}

pub struct SpinnakerModule {
    system: Arc<System>,
}

/// Check the GenTL producer, load the Spinnaker library and open the system.
pub fn new_module() -> spinmouse_ci::Result<SpinnakerModule> {
    if let Some(cti) = spinnaker_c::check_gentl_producer().map_spin_err()? {
        tracing::debug!("using GenTL producer {}", cti.display());
    }
    let lib = SpinnakerLibrary::new().map_spin_err()?;
    let system = System::new(lib).map_spin_err()?;
    Ok(SpinnakerModule { system })
}

#[derive(Debug, Clone)]
pub struct SpinnakerCameraInfo {
    serial: String,
    model: String,
    vendor: String,
}

impl spinmouse_ci::CameraInfo for SpinnakerCameraInfo {
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
        &self.vendor
    }
}

fn camera_info(cam: &spinnaker_c::Camera) -> spinnaker_c::Result<SpinnakerCameraInfo> {
    let nodemap = cam.tl_device_node_map()?;
    let read = |name: &str| nodemap.node(name)?.value_string();
    Ok(SpinnakerCameraInfo {
        serial: read(genicam::DEVICE_SERIAL_NUMBER)?,
        model: read(genicam::DEVICE_MODEL_NAME)?,
        vendor: read(genicam::DEVICE_VENDOR_NAME)?,
    })
}

impl spinmouse_ci::CameraModule for SpinnakerModule {
    type CameraType = SpinnakerCamera;

    fn name(&self) -> &str {
        "spinnaker"
    }

    fn camera_infos(&self) -> spinmouse_ci::Result<Vec<Box<dyn spinmouse_ci::CameraInfo>>> {
        let list = self.system.cameras().map_spin_err()?;
        let n_cams = list.len().map_spin_err()?;
        let mut infos = Vec::with_capacity(n_cams);
        for i in 0..n_cams {
            let cam = list.get(i).map_spin_err()?;
            let ci: Box<dyn spinmouse_ci::CameraInfo> =
                Box::new(camera_info(&cam).map_spin_err()?);
            infos.push(ci);
        }
        Ok(infos)
    }

    fn camera(&mut self, name: &str) -> spinmouse_ci::Result<Self::CameraType> {
        let list = self.system.cameras().map_spin_err()?;
        let mut cam = list.get_by_serial(name).map_spin_err()?;
        let info = camera_info(&cam).map_spin_err()?;
        cam.init().map_spin_err()?;
        tracing::debug!("opened camera {} ({})", info.serial, info.model);
        let mut cam = SpinnakerCamera {
            cam,
            info,
            store_fno: 0,
        };
        spinmouse_ci::select_mono_pixel_format(&mut cam)?;
        Ok(cam)
    }
}

pub struct SpinnakerCamera {
    cam: spinnaker_c::Camera,
    info: SpinnakerCameraInfo,
    store_fno: usize,
}

fn _test_camera_is_send() {
    // Compile-time test to ensure SpinnakerCamera implements Send trait.
    fn implements<T: Send>() {}
    implements::<SpinnakerCamera>();
}

impl SpinnakerCamera {
    fn with_node<T>(
        &self,
        name: &str,
        f: impl FnOnce(&spinnaker_c::Node<'_>) -> spinnaker_c::Result<T>,
    ) -> spinmouse_ci::Result<T> {
        let nodemap = self.cam.node_map().map_spin_err()?;
        let node = nodemap.node(name).map_spin_err()?;
        f(&node).map_spin_err()
    }
}

impl spinmouse_ci::CameraInfo for SpinnakerCamera {
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

impl spinmouse_ci::Camera for SpinnakerCamera {
    // ----- start: weakly typed but easier to implement API -----

    fn command_execute(&mut self, name: &str) -> spinmouse_ci::Result<()> {
        self.with_node(name, |n| n.execute())
    }

    fn feature_is_writable(&self, name: &str) -> spinmouse_ci::Result<bool> {
        self.with_node(name, |n| n.is_writable())
    }

    fn feature_bool(&self, name: &str) -> spinmouse_ci::Result<bool> {
        self.with_node(name, |n| n.bool_value())
    }

    fn feature_bool_set(&mut self, name: &str, value: bool) -> spinmouse_ci::Result<()> {
        self.with_node(name, |n| n.set_bool_value(value))
    }

    fn feature_enum(&self, name: &str) -> spinmouse_ci::Result<String> {
        self.with_node(name, |n| n.enum_value())
    }

    fn feature_enum_set(&mut self, name: &str, value: &str) -> spinmouse_ci::Result<()> {
        self.with_node(name, |n| n.set_enum_value(value))
    }

    fn feature_enum_entries(&self, name: &str) -> spinmouse_ci::Result<Vec<String>> {
        self.with_node(name, |n| n.enum_entries())
    }

    fn feature_float(&self, name: &str) -> spinmouse_ci::Result<f64> {
        self.with_node(name, |n| n.float_value())
    }

    fn feature_float_set(&mut self, name: &str, value: f64) -> spinmouse_ci::Result<()> {
        self.with_node(name, |n| n.set_float_value(value))
    }

    fn feature_int(&self, name: &str) -> spinmouse_ci::Result<i64> {
        self.with_node(name, |n| n.int_value())
    }

    fn feature_int_set(&mut self, name: &str, value: i64) -> spinmouse_ci::Result<()> {
        self.with_node(name, |n| n.set_int_value(value))
    }

    fn feature_int_range(&self, name: &str) -> spinmouse_ci::Result<IntFeatureRange> {
        self.with_node(name, |n| {
            Ok(IntFeatureRange {
                value: n.int_value()?,
                min: n.int_min()?,
                max: n.int_max()?,
                inc: n.int_inc()?,
            })
        })
    }

    // ----- end: weakly typed but easier to implement API -----

    fn device_information(&self) -> spinmouse_ci::Result<Vec<(String, String)>> {
        let nodemap = self.cam.tl_device_node_map().map_spin_err()?;
        let category = nodemap.node(DEVICE_INFORMATION).map_spin_err()?;
        let features = category.category_features().map_spin_err()?;
        Ok(features
            .iter()
            .map(|feature| {
                let value = match feature.value_string() {
                    Ok(value) => value,
                    Err(_) => "Node not readable".to_string(),
                };
                (feature.name().to_string(), value)
            })
            .collect())
    }

    fn acquisition_start(&mut self) -> spinmouse_ci::Result<()> {
        self.cam.begin_acquisition().map_spin_err()
    }

    fn acquisition_stop(&mut self) -> spinmouse_ci::Result<()> {
        self.cam.end_acquisition().map_spin_err()
    }

    fn is_acquiring(&self) -> bool {
        self.cam.is_streaming()
    }

    fn next_frame(&mut self, timeout: Duration) -> spinmouse_ci::Result<FrameWithInfo> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let image = self.cam.next_image(timeout_ms).map_spin_err()?;
        let now = chrono::Utc::now(); // earliest possible timestamp

        if image.is_incomplete().map_spin_err()? {
            let status = image.status().map_spin_err()?;
            return Err(spinmouse_ci::Error::SingleFrameError(format!(
                "Image incomplete with image status {status}"
            )));
        }

        let pixel_format: PixelFormat = image.pixel_format_name().map_spin_err()?.parse()?;
        let width = image.width().map_spin_err()?;
        let height = image.height().map_spin_err()?;
        let stride = image.stride().map_spin_err()?;
        let data = image.data().map_spin_err()?;
        let data = data[..data.len().min(stride * height)].to_vec();

        let chunk = match (image.chunk_int(CHUNK_FRAME_ID), image.chunk_int(CHUNK_TIMESTAMP)) {
            (Ok(frame_id), Ok(timestamp)) => Some(ChunkData {
                frame_id,
                timestamp,
            }),
            (Err(e), _) | (_, Err(e)) => {
                tracing::trace!("no chunk data: {e}");
                None
            }
        };

        let host_timing = HostTimingInfo {
            fno: self.store_fno,
            datetime: now,
        };
        self.store_fno += 1;

        Ok(FrameWithInfo {
            image: RawFrame {
                width: width.try_into()?,
                height: height.try_into()?,
                stride,
                pixel_format,
                data,
            },
            host_timing,
            chunk,
        })
    }
}
