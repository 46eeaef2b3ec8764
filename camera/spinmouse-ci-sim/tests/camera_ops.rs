use std::time::Duration;

use spinmouse_ci::{
    Camera, CameraInfo, CameraModule, ChunkEntryProblem, Error, PixelFormat, TriggerMode,
    click_to_offset_delta, disable_chunk_data, enable_chunk_data, genicam,
    select_mono_pixel_format, update_image_offset,
};
use spinmouse_ci_sim::{SimCamera, SimCameraConfig, SimModule};
use test_log::test;

fn camera() -> SimCamera {
    let mut cfg = SimCameraConfig::new("12345678");
    cfg.frame_interval = Duration::ZERO;
    SimCamera::new(cfg)
}

#[test]
fn chunk_data_enable_then_disable() {
    let mut cam = camera();

    let report = enable_chunk_data(&mut cam).unwrap();
    assert!(report.is_ok(), "{report:?}");
    assert!(cam.chunk_mode_active());
    assert!(cam.chunk_enabled("FrameID"));
    assert!(cam.chunk_enabled("Timestamp"));
    // "Image" is enabled from the start
    assert!(report.unchanged.contains(&"Image".to_string()));

    cam.acquisition_start().unwrap();
    let frame = cam.next_frame(Duration::from_millis(50)).unwrap();
    assert_eq!(frame.chunk.unwrap().frame_id, 0);
    cam.acquisition_stop().unwrap();

    let report = disable_chunk_data(&mut cam).unwrap();
    assert!(report.is_ok(), "{report:?}");
    assert!(!cam.chunk_mode_active());
    assert!(!cam.chunk_enabled("FrameID"));
}

#[test]
fn chunk_problems_are_reported_not_fatal() {
    let mut cfg = SimCameraConfig::new("1");
    cfg.read_only_chunk_entries = ["Gain".to_string()].into_iter().collect();
    let mut cam = SimCamera::new(cfg);

    let report = enable_chunk_data(&mut cam).unwrap();
    assert_eq!(
        report.problems,
        vec![("Gain".to_string(), ChunkEntryProblem::NotWritable)]
    );
    assert!(cam.chunk_enabled("Timestamp"));
}

#[test]
fn missing_chunk_selector_is_an_error() {
    let mut cfg = SimCameraConfig::new("1");
    cfg.chunk_entries.clear();
    let mut cam = SimCamera::new(cfg);
    assert!(matches!(
        enable_chunk_data(&mut cam),
        Err(Error::FeatureNotPresent { name }) if name == genicam::CHUNK_SELECTOR
    ));
    assert!(disable_chunk_data(&mut cam).is_err());
}

#[test]
fn offset_moves_to_clicked_point_and_restarts_acquisition() {
    let mut cam = camera();
    cam.acquisition_start().unwrap();

    // click right of and below the center of a 640x480 image
    let (dx, dy) = click_to_offset_delta((330.0, 255.0), (640, 480));
    assert_eq!((dx, dy), (10.0, 15.0));
    let (x, y) = update_image_offset(&mut cam, dx, dy).unwrap();
    // increment 4: 10 -> 8 (tie rounds down), 15 -> 16
    assert_eq!((x, y), (8, 16));
    assert_eq!(cam.feature_int(genicam::OFFSET_X).unwrap(), 8);
    assert!(cam.is_acquiring());

    // far outside the sensor: clamps to the maximum offset
    let (x, y) = update_image_offset(&mut cam, 1e6, -1e6).unwrap();
    assert_eq!((x, y), (1440 - 640, 0));
}

#[test]
fn non_finite_offset_change_is_refused() {
    let mut cam = camera();
    update_image_offset(&mut cam, 40.0, 40.0).unwrap();
    assert!(update_image_offset(&mut cam, f64::NAN, 0.0).is_err());
    assert!(update_image_offset(&mut cam, 0.0, f64::INFINITY).is_err());
    assert_eq!(cam.feature_int(genicam::OFFSET_X).unwrap(), 40);
    assert_eq!(cam.feature_int(genicam::OFFSET_Y).unwrap(), 40);
}

#[test]
fn offset_update_leaves_stopped_camera_stopped() {
    let mut cam = camera();
    update_image_offset(&mut cam, 100.0, 100.0).unwrap();
    assert!(!cam.is_acquiring());
}

#[test]
fn trigger_mode_via_feature_api() {
    let mut cam = camera();
    assert_eq!(cam.trigger_mode().unwrap(), TriggerMode::Off);
    cam.set_trigger_mode(TriggerMode::On).unwrap();
    assert_eq!(cam.feature_enum(genicam::TRIGGER_MODE).unwrap(), "On");
}

#[test]
fn module_opens_cameras_by_serial() {
    let mut module = SimModule::new(vec![
        SimCameraConfig::new("111"),
        SimCameraConfig::new("222"),
    ]);
    let infos = module.camera_infos().unwrap();
    let names: Vec<_> = infos.iter().map(|i| i.name().to_string()).collect();
    assert_eq!(names, vec!["111", "222"]);

    let cam = module.camera("222").unwrap();
    assert_eq!(cam.serial(), "222");
    assert!(module.camera("333").is_err());
}

#[test]
fn packed_pixel_format_switched_to_mono8() {
    let mut cfg = SimCameraConfig::new("1");
    cfg.pixel_format = "Mono12p".to_string();
    let mut module = SimModule::new(vec![cfg]);

    let mut cam = module.camera("1").unwrap();
    assert_eq!(cam.feature_enum(genicam::PIXEL_FORMAT).unwrap(), "Mono8");
    cam.acquisition_start().unwrap();
    let frame = cam.next_frame(Duration::from_millis(200)).unwrap();
    assert_eq!(frame.image.pixel_format, PixelFormat::Mono8);
}

#[test]
fn mono16_is_kept_and_converted() {
    let mut cfg = SimCameraConfig::new("1");
    cfg.frame_interval = Duration::ZERO;
    cfg.width = 32;
    cfg.height = 16;
    cfg.pixel_format = "Mono16".to_string();
    let mut cam = SimCamera::new(cfg);

    assert_eq!(select_mono_pixel_format(&mut cam).unwrap(), PixelFormat::Mono16);
    cam.acquisition_start().unwrap();
    let frame = cam.next_frame(Duration::from_millis(50)).unwrap();
    assert_eq!(frame.image.stride, 64);
    let mono8 = frame.image.to_mono8().unwrap();
    assert_eq!(mono8.data().len(), 32 * 16);
}

#[test]
fn pixel_format_without_mono8_is_refused() {
    let mut cfg = SimCameraConfig::new("1");
    cfg.pixel_format = "BayerRG8".to_string();
    cfg.pixel_format_entries = vec!["BayerRG8".to_string()];
    let mut cam = SimCamera::new(cfg);
    assert!(matches!(
        select_mono_pixel_format(&mut cam),
        Err(Error::UnsupportedPixelFormat(f)) if f == "BayerRG8"
    ));
}
