use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use spinmouse::{
    Result,
    commands::{CameraCommand, UiEvent},
    display::{DisplayReceiver, display_channel},
    session::{OutputSettings, SessionIo, SetupOutcome, run_acquisition, run_setup},
    timestamps::{FrameGap, TimestampLog, analyze_timestamps},
    video::VideoSink,
    web::{Phase, SharedStatus, UiStatus},
};
use spinmouse_ci::{Camera, Mono8Frame, TriggerMode, genicam};
use spinmouse_ci_sim::{SimCamera, SimCameraConfig};

#[derive(Clone, Default)]
struct MemorySink {
    sizes: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, frame: &Mono8Frame) -> Result<()> {
        self.sizes
            .lock()
            .unwrap()
            .push((frame.width(), frame.height()));
        Ok(())
    }
    fn finish(self: Box<Self>) -> Result<u64> {
        Ok(self.sizes.lock().unwrap().len() as u64)
    }
}

fn session_io() -> (
    SessionIo,
    crossbeam_channel::Sender<UiEvent>,
    DisplayReceiver,
    SharedStatus,
) {
    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let (display_tx, display_rx) = display_channel();
    let status = SharedStatus::new(UiStatus::new("TEST", "20240131_01_"));
    let io = SessionIo {
        events: events_rx,
        display: display_tx,
        status: Some(status.clone()),
        show_progress: false,
    };
    (io, events_tx, display_rx, status)
}

fn small_fast_camera() -> SimCameraConfig {
    let mut cfg = SimCameraConfig::new("TEST");
    cfg.width = 64;
    cfg.height = 32;
    cfg.frame_interval = Duration::ZERO;
    cfg
}

#[test_log::test]
fn acquisition_saves_all_frames_and_counts_drops() {
    let mut cfg = small_fast_camera();
    cfg.n_frames = Some(50);
    cfg.dropped_frame_ids = [10, 11].into_iter().collect();
    cfg.incomplete_frame_ids = [20].into_iter().collect();
    let mut cam = SimCamera::new(cfg);

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("exp__timestamps.csv");
    let log = TimestampLog::create(&csv_path).unwrap();
    let sink = MemorySink::default();
    let (io, events, display_rx, status) = session_io();

    // Stop once everything the camera will deliver has been saved.
    let stopper = std::thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(20);
        while display_rx.borrow().counters.acquired < 49 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        events.send(UiEvent::Stop).unwrap();
    });

    let summary =
        run_acquisition(&mut cam, &io, TriggerMode::On, Box::new(sink.clone()), log).unwrap();
    stopper.join().unwrap();

    assert_eq!(summary.saved, 49);
    assert_eq!(summary.dropped, 3);
    assert_eq!(sink.sizes.lock().unwrap().len(), 49);
    assert!(sink.sizes.lock().unwrap().iter().all(|s| *s == (64, 32)));

    let report = analyze_timestamps(&csv_path).unwrap();
    assert_eq!(report.n_rows, 49);
    assert_eq!(report.n_without_chunk, 0);
    assert_eq!(report.first_frame_id, Some(0));
    assert_eq!(report.last_frame_id, Some(51));
    assert_eq!(
        report.gaps,
        vec![
            FrameGap {
                after_frame_id: 9,
                missing: 2,
                interval: Some(30_000_000),
            },
            FrameGap {
                after_frame_id: 19,
                missing: 1,
                interval: Some(20_000_000),
            },
        ]
    );

    // chunk data is switched off again, the trigger mode stays
    assert!(!cam.chunk_mode_active());
    assert!(!cam.chunk_enabled("FrameID"));
    assert!(!cam.is_acquiring());
    assert_eq!(cam.trigger_mode().unwrap(), TriggerMode::On);
    assert_eq!(status.get().phase, Phase::Finished);
}

#[test_log::test]
fn acquisition_without_chunk_support_still_records() {
    let mut cfg = small_fast_camera();
    cfg.n_frames = Some(5);
    cfg.chunk_entries.clear();
    let mut cam = SimCamera::new(cfg);

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("t.csv");
    let log = TimestampLog::create(&csv_path).unwrap();
    let (io, events, display_rx, status) = session_io();
    let sink = MemorySink::default();

    let stopper = std::thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(20);
        while display_rx.borrow().counters.acquired < 5 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        events.send(UiEvent::Stop).unwrap();
    });
    let summary =
        run_acquisition(&mut cam, &io, TriggerMode::Off, Box::new(sink.clone()), log).unwrap();
    stopper.join().unwrap();

    assert_eq!(summary.saved, 5);
    assert_eq!(summary.dropped, 0);
    assert_eq!(sink.sizes.lock().unwrap().len(), 5);
    assert!(!cam.is_acquiring());
    assert_eq!(status.get().phase, Phase::Finished);

    // one row of empty fields per frame
    let report = analyze_timestamps(&csv_path).unwrap();
    assert_eq!(report.n_rows, 5);
    assert_eq!(report.n_without_chunk, 5);
    assert_eq!(report.first_frame_id, None);
}

#[test_log::test]
fn trigger_mode_toggled_while_recording() {
    let mut cfg = small_fast_camera();
    cfg.n_frames = Some(1000);
    let mut cam = SimCamera::new(cfg);

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("t.csv");
    let log = TimestampLog::create(&csv_path).unwrap();
    let (io, events, display_rx, status) = session_io();
    let sink = MemorySink::default();

    let toggler = std::thread::spawn(move || {
        let wait_for = |n: u64| {
            let deadline = Instant::now() + Duration::from_secs(20);
            while display_rx.borrow().counters.acquired < n && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(5));
            }
            display_rx.borrow().counters.acquired
        };
        let before = wait_for(10);
        events
            .send(UiEvent::Camera(CameraCommand::SetTriggerMode(
                TriggerMode::Off,
            )))
            .unwrap();
        // frames keep coming after the restart
        let after = wait_for(before + 10);
        events.send(UiEvent::Stop).unwrap();
        (before, after)
    });
    let summary =
        run_acquisition(&mut cam, &io, TriggerMode::On, Box::new(sink.clone()), log).unwrap();
    let (before, after) = toggler.join().unwrap();

    assert!(after >= before + 10, "{before} then {after}");
    assert!(summary.saved >= after);
    assert_eq!(summary.dropped, 0);
    assert_eq!(cam.trigger_mode().unwrap(), TriggerMode::Off);
    assert_eq!(status.get().trigger_mode, TriggerMode::Off);
    assert!(!cam.is_acquiring());

    let report = analyze_timestamps(&csv_path).unwrap();
    assert!(report.gaps.is_empty(), "{report}");
    assert_eq!(report.n_rows, summary.saved);
}

#[test_log::test]
fn setup_applies_clicks_then_begins() {
    let mut cam = SimCamera::new(SimCameraConfig::new("TEST"));
    let dir = tempfile::tempdir().unwrap();
    let outputs = OutputSettings {
        data_directory: dir.path().to_path_buf(),
        filename_suffix: String::new(),
        default_experiment_id: "20240131_01_".into(),
    };
    let (io, events, _display_rx, status) = session_io();

    // 640x480 image: a click at (330, 255) asks to move by (10, 15)
    events.send(UiEvent::Click { x: 330.0, y: 255.0 }).unwrap();
    events
        .send(UiEvent::Begin(Some("mouse1".to_string())))
        .unwrap();

    let outcome = run_setup(&mut cam, &io, &outputs).unwrap();
    match outcome {
        SetupOutcome::Begin {
            experiment_id,
            paths,
        } => {
            assert_eq!(experiment_id, "mouse1");
            assert_eq!(paths.video, dir.path().join("mouse1_.avi"));
            assert_eq!(paths.timestamps, dir.path().join("mouse1__timestamps.csv"));
        }
        SetupOutcome::Cancel => panic!("expected begin"),
    }
    assert_eq!(cam.feature_int(genicam::OFFSET_X).unwrap(), 8);
    assert_eq!(cam.feature_int(genicam::OFFSET_Y).unwrap(), 16);
    assert!(!cam.is_acquiring());
    assert_eq!(cam.trigger_mode().unwrap(), TriggerMode::Off);
    let status = status.get();
    assert_eq!((status.image_width, status.image_height), (640, 480));
}

#[test_log::test]
fn setup_refuses_existing_outputs() {
    let mut cam = SimCamera::new(SimCameraConfig::new("TEST"));
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("taken_.avi"), b"").unwrap();
    let outputs = OutputSettings {
        data_directory: dir.path().to_path_buf(),
        filename_suffix: String::new(),
        default_experiment_id: "taken".into(),
    };
    let (io, events, _display_rx, status) = session_io();

    events.send(UiEvent::Begin(None)).unwrap();
    events.send(UiEvent::Cancel).unwrap();

    let outcome = run_setup(&mut cam, &io, &outputs).unwrap();
    assert_eq!(outcome, SetupOutcome::Cancel);
    let message = status.get().message.unwrap();
    assert!(message.contains("already exists"), "{message}");
}

#[test_log::test]
fn setup_shows_preview() {
    let mut cam = SimCamera::new(small_fast_camera());
    let dir = tempfile::tempdir().unwrap();
    let outputs = OutputSettings {
        data_directory: dir.path().to_path_buf(),
        filename_suffix: String::new(),
        default_experiment_id: "x".into(),
    };
    let (io, events, display_rx, _status) = session_io();

    let canceller = std::thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(20);
        while display_rx.borrow().image.is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        let size = display_rx
            .borrow()
            .image
            .as_ref()
            .map(|i| (i.width(), i.height()));
        events.send(UiEvent::Cancel).unwrap();
        size
    });
    let outcome = run_setup(&mut cam, &io, &outputs).unwrap();
    assert_eq!(outcome, SetupOutcome::Cancel);
    assert_eq!(canceller.join().unwrap(), Some((64, 32)));
}

#[test_log::test]
fn acquisition_writes_avi_with_ffmpeg() {
    if !ffmpeg_writer::ffmpeg_available(std::path::Path::new("ffmpeg")) {
        tracing::warn!("ffmpeg not available, skipping");
        return;
    }
    let mut cfg = small_fast_camera();
    cfg.n_frames = Some(20);
    let mut cam = SimCamera::new(cfg);

    let dir = tempfile::tempdir().unwrap();
    let paths = spinmouse::naming::OutputPaths::new(dir.path(), "exp", "");
    let log = TimestampLog::create(&paths.timestamps).unwrap();
    let video = spinmouse::video::FfmpegVideoSink::create(&paths.video, 64, 32, 100).unwrap();
    let (io, events, display_rx, _status) = session_io();

    let stopper = std::thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(20);
        while display_rx.borrow().counters.acquired < 20 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        events.send(UiEvent::Stop).unwrap();
    });
    let summary = run_acquisition(&mut cam, &io, TriggerMode::On, Box::new(video), log).unwrap();
    stopper.join().unwrap();

    assert_eq!(summary.saved, 20);
    assert_eq!(summary.dropped, 0);
    let avi = std::fs::read(&paths.video).unwrap();
    assert_eq!(&avi[..4], b"RIFF");
    assert_eq!(&avi[8..12], b"AVI ");
    assert_eq!(analyze_timestamps(&paths.timestamps).unwrap().n_rows, 20);
}
