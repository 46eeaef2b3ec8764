//! One experiment: setup with a live preview, then the triggered
//! acquisition.
//!
//! The camera is lent to a single acquiring thread per phase. Front ends only
//! reach it through [CameraCommand]s, which that thread applies between grabs.

use std::{path::PathBuf, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use spinmouse_ci::{
    Camera, ChunkReport, TriggerMode, click_to_offset_delta, disable_chunk_data,
    enable_chunk_data,
};

use crate::{
    Error, Result,
    acquire::{AcquireStats, acquire_images, progress_spinner},
    commands::{CameraCommand, UiEvent},
    config::Config,
    display::{DisplaySender, display_channel, show_frame},
    naming::{OutputPaths, resolve_experiment_id, todays_experiment_id},
    save::{SaveProgress, SaveSummary, save_images},
    stop::{self, StopSignal},
    terminal::{HELP, spawn_stdin_reader},
    timestamps::TimestampLog,
    video::{FfmpegVideoSink, VideoSink},
    web::{AppState, Phase, SharedStatus, UiStatus, WebServer},
};

/// How often the session checks for stop while waiting for UI events.
const EVENT_POLL: Duration = Duration::from_millis(100);

/// Channels between the session and its front end.
pub struct SessionIo {
    pub events: Receiver<UiEvent>,
    pub display: DisplaySender,
    /// Browser status. `None` with the terminal front end.
    pub status: Option<SharedStatus>,
    /// Show a spinner in the terminal while acquiring.
    pub show_progress: bool,
}

impl SessionIo {
    fn set_status(&self, f: impl FnOnce(&mut UiStatus)) {
        if let Some(status) = &self.status {
            status.modify(f);
        }
    }

    /// Tell the operator about a problem they can fix.
    fn notify(&self, msg: String) {
        tracing::warn!("{msg}");
        if self.status.is_some() {
            self.set_status(|s| s.message = Some(msg));
        } else {
            println!("{msg}");
        }
    }

    /// Wait briefly for the next event. `None` on timeout or when the front end
    /// is gone.
    fn next_event(&self) -> Option<UiEvent> {
        match self.events.recv_timeout(EVENT_POLL) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(EVENT_POLL);
                None
            }
        }
    }
}

/// Where the outputs of an experiment go.
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub data_directory: PathBuf,
    pub filename_suffix: String,
    pub default_experiment_id: String,
}

impl OutputSettings {
    /// Output paths for what the operator entered, if usable.
    pub fn paths_for(&self, input: Option<&str>) -> Result<(String, OutputPaths)> {
        let id = resolve_experiment_id(input.unwrap_or(""), &self.default_experiment_id)?;
        let paths = OutputPaths::new(&self.data_directory, &id, &self.filename_suffix);
        paths.check_not_existing()?;
        Ok((id, paths))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    Begin {
        experiment_id: String,
        paths: OutputPaths,
    },
    Cancel,
}

fn join<T>(handle: std::thread::ScopedJoinHandle<'_, T>, name: &'static str) -> Result<T> {
    handle.join().map_err(|_| Error::ThreadPanicked(name))
}

/// Free-running preview until the operator begins or cancels.
///
/// Ctrl-C cancels.
pub fn run_setup<C: Camera + ?Sized>(
    cam: &mut C,
    io: &SessionIo,
    outputs: &OutputSettings,
) -> Result<SetupOutcome> {
    let image_size = (cam.width()?, cam.height()?);
    io.set_status(|s| {
        s.phase = Phase::Setup;
        s.image_width = image_size.0;
        s.image_height = image_size.1;
        s.trigger_mode = TriggerMode::Off;
    });

    let stop = StopSignal::new();
    let _armed = stop::arm(&stop);
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let progress = progress_spinner(false);

    std::thread::scope(|s| {
        let preview = std::thread::Builder::new()
            .name("acquire-preview".to_string())
            .spawn_scoped(s, || {
                acquire_images(&mut *cam, TriggerMode::Off, &stop, &cmd_rx, &progress, |frame| {
                    show_frame(&io.display, frame.image);
                    true
                })
            })?;

        let outcome = loop {
            if stop.is_stopped() || preview.is_finished() {
                break SetupOutcome::Cancel;
            }
            let Some(event) = io.next_event() else {
                continue;
            };
            match event {
                UiEvent::Camera(cmd) => send_command(&cmd_tx, cmd),
                UiEvent::Click { x, y } => {
                    let (dx, dy) = click_to_offset_delta((x, y), image_size);
                    send_command(&cmd_tx, CameraCommand::MoveOffset { dx, dy });
                }
                UiEvent::Begin(input) => match outputs.paths_for(input.as_deref()) {
                    Ok((experiment_id, paths)) => {
                        break SetupOutcome::Begin {
                            experiment_id,
                            paths,
                        };
                    }
                    Err(e) => io.notify(e.to_string()),
                },
                UiEvent::Cancel => break SetupOutcome::Cancel,
                UiEvent::Stop => tracing::debug!("ignoring stop during setup"),
            }
        };
        stop.stop();
        let stats = join(preview, "acquire-preview")??;
        tracing::debug!("preview ended: {stats:?}");
        Ok(outcome)
    })
}

fn send_command(tx: &Sender<CameraCommand>, cmd: CameraCommand) {
    if tx.send(cmd).is_err() {
        tracing::warn!("acquisition ended, dropping {cmd:?}");
    }
}

fn log_chunk_report(action: &str, report: &ChunkReport) {
    tracing::debug!(
        "{action} chunk data: {} changed, {} unchanged",
        report.changed.len(),
        report.unchanged.len()
    );
    for (entry, problem) in &report.problems {
        tracing::warn!("Unable to {action} chunk data for {entry}: {problem}");
    }
}

/// Triggered acquisition into `video` and `log` until stopped.
///
/// Chunk data is enabled for the duration if the camera supports it. Frames
/// queued before the stop are all saved.
pub fn run_acquisition<C: Camera + ?Sized>(
    cam: &mut C,
    io: &SessionIo,
    trigger_mode: TriggerMode,
    video: Box<dyn VideoSink>,
    log: TimestampLog,
) -> Result<SaveSummary> {
    match enable_chunk_data(cam) {
        Ok(report) => log_chunk_report("enable", &report),
        Err(e) => tracing::error!("Unable to enable chunk data, frame IDs will not be logged: {e}"),
    }
    io.set_status(|s| {
        s.phase = Phase::Acquisition;
        s.trigger_mode = trigger_mode;
        s.message = None;
    });

    let stop = StopSignal::new();
    let _armed = stop::arm(&stop);
    let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let pb = progress_spinner(io.show_progress);
    let progress = if io.status.is_some() {
        SaveProgress::Display(&io.display)
    } else {
        SaveProgress::Terminal(pb.clone())
    };

    let result: Result<(AcquireStats, SaveSummary)> = std::thread::scope(|s| {
        let progress = &progress;
        let saver = std::thread::Builder::new()
            .name("save".to_string())
            .spawn_scoped(s, move || save_images(frame_rx, video, log, progress))?;
        let acquirer = {
            let cam = &mut *cam;
            let (stop, cmd_rx, pb) = (&stop, &cmd_rx, &pb);
            std::thread::Builder::new()
                .name("acquire".to_string())
                .spawn_scoped(s, move || {
                    acquire_images(cam, trigger_mode, stop, cmd_rx, pb, |frame| {
                        frame_tx.send(frame).is_ok()
                    })
                })?
        };

        while !stop.is_stopped() && !acquirer.is_finished() && !saver.is_finished() {
            match io.next_event() {
                Some(UiEvent::Stop) => stop.stop(),
                Some(UiEvent::Camera(cmd)) => {
                    if let CameraCommand::SetTriggerMode(mode) = cmd {
                        io.set_status(|s| s.trigger_mode = mode);
                    }
                    send_command(&cmd_tx, cmd);
                }
                Some(other) => tracing::debug!("ignoring {other:?} during acquisition"),
                None => {}
            }
        }
        stop.stop();
        let acquired = join(acquirer, "acquire")?;
        let saved = join(saver, "save")?;
        Ok((acquired?, saved?))
    });

    match disable_chunk_data(cam) {
        Ok(report) => log_chunk_report("disable", &report),
        Err(e) => tracing::error!("disabling chunk data: {e}"),
    }
    io.set_status(|s| s.phase = Phase::Finished);

    let (stats, summary) = result?;
    if stats.incomplete > 0 {
        tracing::warn!("{} incomplete images were skipped", stats.incomplete);
    }
    tracing::info!("{summary}");
    Ok(summary)
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub trigger_mode: TriggerMode,
    /// Default experiment ID offered to the operator. Today's date if `None`.
    pub experiment_id: Option<String>,
    pub show_progress: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            trigger_mode: TriggerMode::On,
            experiment_id: None,
            show_progress: true,
        }
    }
}

/// Run setup and, unless cancelled, an acquisition with the configured front
/// end. Returns `None` if cancelled.
pub fn run_session<C: Camera + ?Sized>(
    cam: &mut C,
    config: &Config,
    opts: &SessionOptions,
) -> Result<Option<SaveSummary>> {
    stop::install_ctrlc_handler()?;
    let params = &config.parameters;
    let outputs = OutputSettings {
        data_directory: params.data_directory.clone(),
        filename_suffix: params.filename_suffix.clone(),
        default_experiment_id: opts
            .experiment_id
            .clone()
            .unwrap_or_else(todays_experiment_id),
    };

    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let (display_tx, display_rx) = display_channel();
    let (status, web) = if params.use_acquisition_gui {
        let status = SharedStatus::new(UiStatus::new(cam.name(), &outputs.default_experiment_id));
        let app_state = AppState::new(status.clone(), display_rx, events_tx);
        let web = WebServer::start(&params.gui_address, app_state)?;
        (Some(status), Some(web))
    } else {
        spawn_stdin_reader(events_tx)?;
        println!("{HELP}");
        println!(
            "Default experiment ID: {}",
            outputs.default_experiment_id
        );
        (None, None)
    };
    let io = SessionIo {
        events: events_rx,
        display: display_tx,
        status,
        show_progress: opts.show_progress,
    };

    let result = run_experiment(cam, config, opts, &io, &outputs);
    if let Some(web) = web {
        web.shutdown()?;
    }
    result
}

fn run_experiment<C: Camera + ?Sized>(
    cam: &mut C,
    config: &Config,
    opts: &SessionOptions,
    io: &SessionIo,
    outputs: &OutputSettings,
) -> Result<Option<SaveSummary>> {
    let (experiment_id, paths) = match run_setup(cam, io, outputs)? {
        SetupOutcome::Begin {
            experiment_id,
            paths,
        } => (experiment_id, paths),
        SetupOutcome::Cancel => {
            io.set_status(|s| s.phase = Phase::Finished);
            println!("Cancelled, nothing saved.");
            return Ok(None);
        }
    };
    tracing::info!("starting experiment {experiment_id}");

    let log = TimestampLog::create(&paths.timestamps)?;
    let video = FfmpegVideoSink::create(
        &paths.video,
        cam.width()?,
        cam.height()?,
        config.parameters.video_save_framerate,
    )?;
    let summary = run_acquisition(cam, io, opts.trigger_mode, Box::new(video), log)?;
    println!("{summary}");
    println!("Saved to {}", paths.directory().display());
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_for_input() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = OutputSettings {
            data_directory: dir.path().to_path_buf(),
            filename_suffix: "cam1".into(),
            default_experiment_id: "20240131_01_".into(),
        };
        let (id, paths) = outputs.paths_for(None).unwrap();
        assert_eq!(id, "20240131_01_");
        assert_eq!(paths.video, dir.path().join("20240131_01__cam1.avi"));

        std::fs::write(&paths.video, b"").unwrap();
        assert!(outputs.paths_for(Some("")).is_err());
        assert!(outputs.paths_for(Some("mouse2")).is_ok());
        assert!(outputs.paths_for(Some("a/b")).is_err());
    }
}
