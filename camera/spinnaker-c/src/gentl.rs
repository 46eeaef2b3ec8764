//! Checking the GenTL producer (`.cti` file) before opening the system.
//!
//! The Spinnaker installer registers its producer through an environment
//! variable. When that variable is missing or stale, opening the system
//! fails or finds no cameras, with little indication of why.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{Error, Result};

/// Environment variable naming the GenTL producer on this platform.
#[cfg(target_os = "windows")]
pub const GENTL_ENV_VAR: &str = "FLIR_GENTL64_CTI_VS140";
#[cfg(not(target_os = "windows"))]
pub const GENTL_ENV_VAR: &str = "FLIR_GENTL64_CTI";

/// Whether the producer variable must be set on this platform.
const GENTL_REQUIRED: bool = cfg!(target_os = "windows");

/// Check that the GenTL producer named by [GENTL_ENV_VAR] exists.
///
/// Returns the producer path, or `None` if the variable is unset on a platform
/// where it is optional.
pub fn check_gentl_producer() -> Result<Option<PathBuf>> {
    check_gentl_value(
        GENTL_ENV_VAR,
        std::env::var_os(GENTL_ENV_VAR),
        GENTL_REQUIRED,
    )
}

pub(crate) fn check_gentl_value(
    var: &str,
    value: Option<OsString>,
    required: bool,
) -> Result<Option<PathBuf>> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        if required {
            return Err(Error::GenTlProducer {
                var: var.to_string(),
                path: None,
            });
        }
        tracing::debug!("{var} not set, relying on default GenTL producer search");
        return Ok(None);
    };
    let path = PathBuf::from(value);
    if !is_file(&path) {
        return Err(Error::GenTlProducer {
            var: var.to_string(),
            path: Some(path),
        });
    }
    tracing::debug!("GenTL producer: {}", path.display());
    Ok(Some(path))
}

fn is_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
