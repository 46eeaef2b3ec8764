//! Grabbing frames from the camera.

use std::time::Duration;

use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use spinmouse_ci::{Camera, ChunkData, HostTimingInfo, Mono8Frame, TriggerMode};

use crate::{
    Result,
    commands::{CameraCommand, apply_command},
    stop::StopSignal,
};

pub const GRAB_TIMEOUT: Duration = Duration::from_millis(50);

const WAITING_MSG: &str = "Waiting for images from camera...(press 'Ctrl-C' to end)";
const RECEIVING_MSG: &str = "Receiving images from camera...(press 'Ctrl-C' to end)";

/// A converted frame on its way to the saver or the preview.
#[derive(Debug)]
pub struct QueuedFrame {
    pub image: Mono8Frame,
    pub chunk: Option<ChunkData>,
    pub host_timing: HostTimingInfo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquireStats {
    pub frames: u64,
    pub timeouts: u64,
    pub incomplete: u64,
}

/// A terminal spinner, or a hidden one.
pub fn progress_spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Acquire frames until `stop` is set or `on_frame` returns false.
///
/// Sets the trigger mode, starts acquisition and always stops it again. Grab
/// timeouts, incomplete images and frames which cannot be converted are
/// skipped, not errors. Pending commands are
/// applied between grabs.
pub fn acquire_images<C, F>(
    cam: &mut C,
    trigger_mode: TriggerMode,
    stop: &StopSignal,
    commands: &Receiver<CameraCommand>,
    progress: &ProgressBar,
    on_frame: F,
) -> Result<AcquireStats>
where
    C: Camera + ?Sized,
    F: FnMut(QueuedFrame) -> bool,
{
    cam.set_trigger_mode(trigger_mode)?;
    cam.acquisition_start()?;
    tracing::debug!("acquisition started, trigger mode {trigger_mode}");
    let result = grab_loop(cam, stop, commands, progress, on_frame);
    // Commands sent before the stop still apply.
    apply_pending(cam, commands);
    let stopped = if cam.is_acquiring() {
        cam.acquisition_stop()
    } else {
        Ok(())
    };
    progress.finish_and_clear();
    let stats = result?;
    stopped?;
    tracing::debug!("acquisition ended: {stats:?}");
    Ok(stats)
}

fn apply_pending<C: Camera + ?Sized>(cam: &mut C, commands: &Receiver<CameraCommand>) {
    for cmd in commands.try_iter() {
        if let Err(e) = apply_command(cam, cmd) {
            tracing::error!("applying {cmd:?}: {e}");
        }
    }
}

fn grab_loop<C, F>(
    cam: &mut C,
    stop: &StopSignal,
    commands: &Receiver<CameraCommand>,
    progress: &ProgressBar,
    mut on_frame: F,
) -> Result<AcquireStats>
where
    C: Camera + ?Sized,
    F: FnMut(QueuedFrame) -> bool,
{
    let mut stats = AcquireStats::default();
    let mut waiting = true;
    progress.set_message(WAITING_MSG);
    while !stop.is_stopped() {
        apply_pending(cam, commands);

        match cam.next_frame(GRAB_TIMEOUT) {
            Ok(frame) => {
                if waiting {
                    progress.set_message(RECEIVING_MSG);
                    waiting = false;
                }
                let image = match frame.image.to_mono8() {
                    Ok(image) => image,
                    Err(e) => {
                        stats.incomplete += 1;
                        tracing::warn!("skipping frame {}: {e}", frame.host_timing.fno);
                        progress.tick();
                        continue;
                    }
                };
                stats.frames += 1;
                let keep_going = on_frame(QueuedFrame {
                    image,
                    chunk: frame.chunk,
                    host_timing: frame.host_timing,
                });
                if !keep_going {
                    tracing::debug!("frame consumer gone, ending acquisition");
                    break;
                }
            }
            Err(spinmouse_ci::Error::Timeout) => {
                stats.timeouts += 1;
                if !waiting {
                    progress.set_message(WAITING_MSG);
                    waiting = true;
                }
            }
            Err(spinmouse_ci::Error::SingleFrameError(msg)) => {
                stats.incomplete += 1;
                tracing::warn!("{msg}");
            }
            Err(e) => return Err(e.into()),
        }
        progress.tick();
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinmouse_ci_sim::{SimCamera, SimCameraConfig};

    #[test_log::test]
    fn unconvertible_frames_are_skipped() {
        let mut cfg = SimCameraConfig::new("TEST");
        cfg.width = 32;
        cfg.height = 16;
        cfg.frame_interval = Duration::ZERO;
        cfg.truncated_frame_ids = [2, 3].into_iter().collect();
        let mut cam = SimCamera::new(cfg);

        let stop = StopSignal::new();
        let (_cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let mut received = Vec::new();
        let stats = acquire_images(
            &mut cam,
            TriggerMode::Off,
            &stop,
            &cmd_rx,
            &ProgressBar::hidden(),
            |frame| {
                received.push(frame.host_timing.fno);
                if received.len() == 4 {
                    stop.stop();
                }
                true
            },
        )
        .unwrap();

        assert_eq!(received, vec![0, 1, 4, 5]);
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.incomplete, 2);
        assert!(!cam.is_acquiring());
    }
}
