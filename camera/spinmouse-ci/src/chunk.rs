//! Switching per-frame chunk data (frame ID, timestamp, ...) on and off.
//!
//! The camera exposes one `ChunkEnable` boolean which refers to whichever
//! entry is currently chosen with the `ChunkSelector` enumeration, so every
//! entry is selected in turn and its `ChunkEnable` written.

use crate::{Camera, Error, Result, genicam};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEntryProblem {
    NotAvailable,
    NotWritable,
}

impl std::fmt::Display for ChunkEntryProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkEntryProblem::NotAvailable => write!(f, "not available"),
            ChunkEntryProblem::NotWritable => write!(f, "not writable"),
        }
    }
}

/// Outcome of [enable_chunk_data] or [disable_chunk_data].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    /// Selector entries whose `ChunkEnable` was written.
    pub changed: Vec<String>,
    /// Selector entries which already had the requested state.
    pub unchanged: Vec<String>,
    /// Entries (or `ChunkModeActive`) which could not be set.
    pub problems: Vec<(String, ChunkEntryProblem)>,
}

impl ChunkReport {
    /// True if every entry ended up in the requested state.
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Activate chunk mode and enable every chunk selector entry.
///
/// Entries which cannot be enabled are collected in the returned report.
/// Returns an error if the `ChunkSelector` feature is missing.
pub fn enable_chunk_data<C: Camera + ?Sized>(cam: &mut C) -> Result<ChunkReport> {
    let mut report = ChunkReport::default();
    set_chunk_mode_active(cam, true, &mut report)?;
    set_all_entries(cam, true, &mut report)?;
    Ok(report)
}

/// Disable every chunk selector entry, then deactivate chunk mode.
pub fn disable_chunk_data<C: Camera + ?Sized>(cam: &mut C) -> Result<ChunkReport> {
    let mut report = ChunkReport::default();
    set_all_entries(cam, false, &mut report)?;
    set_chunk_mode_active(cam, false, &mut report)?;
    Ok(report)
}

fn set_chunk_mode_active<C: Camera + ?Sized>(
    cam: &mut C,
    value: bool,
    report: &mut ChunkReport,
) -> Result<()> {
    let name = genicam::CHUNK_MODE_ACTIVE;
    match cam.feature_is_writable(name) {
        Ok(true) => cam.feature_bool_set(name, value),
        Ok(false) => {
            report
                .problems
                .push((name.to_string(), ChunkEntryProblem::NotWritable));
            Ok(())
        }
        Err(Error::FeatureNotPresent { .. }) => {
            report
                .problems
                .push((name.to_string(), ChunkEntryProblem::NotAvailable));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn set_all_entries<C: Camera + ?Sized>(
    cam: &mut C,
    value: bool,
    report: &mut ChunkReport,
) -> Result<()> {
    let entries = cam.feature_enum_entries(genicam::CHUNK_SELECTOR)?;
    for entry in entries {
        cam.feature_enum_set(genicam::CHUNK_SELECTOR, &entry)?;

        let writable = match cam.feature_is_writable(genicam::CHUNK_ENABLE) {
            Ok(writable) => writable,
            Err(Error::FeatureNotPresent { .. }) => {
                tracing::debug!("ChunkEnable not available for chunk \"{entry}\"");
                report.problems.push((entry, ChunkEntryProblem::NotAvailable));
                continue;
            }
            Err(e) => return Err(e),
        };

        if cam.feature_bool(genicam::CHUNK_ENABLE)? == value {
            report.unchanged.push(entry);
        } else if writable {
            cam.feature_bool_set(genicam::CHUNK_ENABLE, value)?;
            tracing::debug!("chunk \"{entry}\" set to {value}");
            report.changed.push(entry);
        } else {
            report.problems.push((entry, ChunkEntryProblem::NotWritable));
        }
    }
    Ok(())
}
