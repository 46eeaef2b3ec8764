//! Experiment IDs and output file names.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::{Error, Result};

const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// The default experiment ID for a date, e.g. `20240131_01_`.
pub fn default_experiment_id(date: NaiveDate) -> String {
    format!("{}_01_", date.format("%Y%m%d"))
}

/// The default experiment ID for today in local time.
pub fn todays_experiment_id() -> String {
    default_experiment_id(chrono::Local::now().date_naive())
}

/// Turn what the operator typed into an experiment ID.
///
/// Blank input means the default ID.
pub fn resolve_experiment_id(input: &str, default: &str) -> Result<String> {
    let id = input.trim();
    let id = if id.is_empty() { default } else { id };
    if id == "." || id == ".." || id.chars().any(|c| FORBIDDEN_CHARS.contains(&c) || c.is_control())
    {
        return Err(Error::InvalidExperimentId(id.to_string()));
    }
    Ok(id.to_string())
}

/// Files written by one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// `<data_directory>/<experiment_id>_<filename_suffix>`
    pub base: PathBuf,
    pub video: PathBuf,
    pub timestamps: PathBuf,
}

impl OutputPaths {
    pub fn new(data_directory: &Path, experiment_id: &str, filename_suffix: &str) -> Self {
        let stem = format!("{experiment_id}_{filename_suffix}");
        let base = data_directory.join(&stem);
        Self {
            video: data_directory.join(format!("{stem}.avi")),
            timestamps: data_directory.join(format!("{stem}_timestamps.csv")),
            base,
        }
    }

    /// Directory the outputs are written to.
    pub fn directory(&self) -> &Path {
        self.base.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Fail if any output already exists.
    pub fn check_not_existing(&self) -> Result<()> {
        for path in [&self.video, &self.timestamps] {
            if path.exists() {
                return Err(Error::OutputExists { path: path.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_id_is_date_and_counter() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(default_experiment_id(date), "20240131_01_");
    }

    #[test]
    fn blank_input_uses_default() {
        assert_eq!(resolve_experiment_id("  ", "20240131_01_").unwrap(), "20240131_01_");
        assert_eq!(resolve_experiment_id(" mouse3 ", "x").unwrap(), "mouse3");
    }

    #[test]
    fn ids_must_be_file_names() {
        for bad in ["a/b", "a\\b", "..", "what?", "tab\there"] {
            assert!(resolve_experiment_id(bad, "x").is_err(), "{bad}");
        }
    }

    #[test]
    fn output_names() {
        let paths = OutputPaths::new(Path::new("/data"), "20240131_01_", "cam1");
        assert_eq!(paths.video, Path::new("/data/20240131_01__cam1.avi"));
        assert_eq!(
            paths.timestamps,
            Path::new("/data/20240131_01__cam1_timestamps.csv")
        );
        assert_eq!(paths.directory(), Path::new("/data"));
    }

    #[test]
    fn existing_outputs_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(dir.path(), "exp", "");
        paths.check_not_existing().unwrap();
        std::fs::write(&paths.timestamps, "").unwrap();
        assert!(matches!(
            paths.check_not_existing(),
            Err(Error::OutputExists { .. })
        ));
    }
}
