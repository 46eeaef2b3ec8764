//! Requests from the front ends.

use spinmouse_ci::{Camera, TriggerMode, update_image_offset, with_acquisition_paused};

/// A change applied to the camera by the acquiring thread, between grabs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
    /// Move the sensor window by this many pixels.
    MoveOffset { dx: f64, dy: f64 },
    SetTriggerMode(TriggerMode),
}

/// What the operator asked for, from the browser or the terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Camera(CameraCommand),
    /// Click on the preview image, in image pixels.
    Click { x: f64, y: f64 },
    /// Start the acquisition with this experiment ID (the default if `None`).
    Begin(Option<String>),
    Cancel,
    Stop,
}

pub fn apply_command<C: Camera + ?Sized>(cam: &mut C, cmd: CameraCommand) -> spinmouse_ci::Result<()> {
    match cmd {
        CameraCommand::MoveOffset { dx, dy } => {
            let (x, y) = update_image_offset(cam, dx, dy)?;
            tracing::info!("image offset now ({x}, {y})");
        }
        CameraCommand::SetTriggerMode(mode) => {
            with_acquisition_paused(cam, |cam| cam.set_trigger_mode(mode))?;
            tracing::info!("trigger mode {mode}");
        }
    }
    Ok(())
}
