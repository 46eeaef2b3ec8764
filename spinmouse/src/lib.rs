//! Externally triggered video acquisition from FLIR machine vision cameras.
//!
//! A session has two phases. During setup the camera runs free into a live
//! preview while the operator positions the image and names the experiment.
//! During acquisition, chunk data and the external trigger are enabled and
//! every frame is written to an MJPEG video plus a `frame_id,timestamp` CSV
//! from which dropped frames can be found.

pub mod acquire;
pub mod camera_select;
pub mod commands;
pub mod config;
pub mod display;
mod error;
pub mod frame_counter;
pub mod logging;
pub mod naming;
pub mod save;
pub mod session;
pub mod stop;
pub mod terminal;
pub mod timestamps;
pub mod video;
pub mod web;

pub use error::{Error, Result};
