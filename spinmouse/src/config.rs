//! The `spinmouse_config.toml` parameter file.
//!
//! A missing file is generated with defaults on first use. Paths may contain
//! shell variables such as `~`, `$A`, or `${B}`; relative paths are relative
//! to the directory containing the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const CONFIG_FILENAME: &str = "spinmouse_config.toml";

const DEFAULT_DATA_DIRECTORY: &str = "video_data";
const DEFAULT_GUI_ADDRESS: &str = "127.0.0.1:3440";

fn default_data_directory() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIRECTORY)
}

fn default_video_save_framerate() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_gui_address() -> String {
    DEFAULT_GUI_ADDRESS.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameters {
    /// Directory where videos and timestamp files are saved.
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,
    /// Frame rate written into the video file. Playback only, this does not
    /// affect acquisition.
    #[serde(default = "default_video_save_framerate")]
    pub video_save_framerate: u32,
    /// Appended to the experiment ID to form the output file names.
    #[serde(default)]
    pub filename_suffix: String,
    /// Use the browser UI for setup and acquisition. If false, the terminal is
    /// used.
    #[serde(default = "default_true")]
    pub use_acquisition_gui: bool,
    /// Listen address of the browser UI.
    #[serde(default = "default_gui_address")]
    pub gui_address: String,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            video_save_framerate: default_video_save_framerate(),
            filename_suffix: String::new(),
            use_acquisition_gui: true,
            gui_address: default_gui_address(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    parameters: Parameters,
}

/// Contents of a freshly generated config file.
pub fn default_config_text() -> String {
    let defaults = Parameters::default();
    format!(
        "# Spinmouse parameters. If deleted, this file will re-generate with defaults\n\
         \n\
         [parameters]\n\
         data_directory = '{}'\n\
         video_save_framerate = {} # this does not affect acquisition\n\
         filename_suffix = '{}'\n\
         use_acquisition_gui = {}\n\
         gui_address = '{}'\n",
        defaults.data_directory.display(),
        defaults.video_save_framerate,
        defaults.filename_suffix,
        defaults.use_acquisition_gui,
        defaults.gui_address,
    )
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the parameters were read from.
    pub path: PathBuf,
    pub parameters: Parameters,
    /// The file did not exist and was generated with defaults.
    pub created: bool,
}

impl Config {
    /// Read the config file at `path`, creating it with defaults if missing.
    ///
    /// When the file is generated, the default data directory is created too.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let mut created = false;
        if !path.exists() {
            tracing::info!("creating default config file {}", path.display());
            std::fs::write(path, default_config_text())?;
            created = true;
        }
        let mut config = Self::load(path)?;
        config.created = created;
        if created && !config.parameters.data_directory.exists() {
            tracing::info!(
                "creating data directory {}",
                config.parameters.data_directory.display()
            );
            std::fs::create_dir_all(&config.parameters.data_directory)?;
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut parameters = parse_config(&contents)?;
        let dirname = path.parent().unwrap_or_else(|| Path::new(""));
        fixup_relative_path(&mut parameters.data_directory, dirname)?;
        Ok(Self {
            path: path.to_path_buf(),
            parameters,
            created: false,
        })
    }

    /// Check the parameters before any camera is touched.
    pub fn validate(&self) -> Result<()> {
        let p = &self.parameters;
        if !p.data_directory.is_dir() {
            return Err(Error::DataDirectoryMissing {
                data_directory: p.data_directory.clone(),
                config_path: self.path.clone(),
            });
        }
        if p.video_save_framerate == 0 {
            return Err(self.invalid("'video_save_framerate' must be greater than zero"));
        }
        if p.use_acquisition_gui && p.gui_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(self.invalid(&format!(
                "'gui_address' \"{}\" is not an address like {DEFAULT_GUI_ADDRESS}",
                p.gui_address
            )));
        }
        Ok(())
    }

    fn invalid(&self, msg: &str) -> Error {
        Error::InvalidConfig {
            msg: msg.to_string(),
            config_path: self.path.clone(),
        }
    }
}

/// Parse config file contents without resolving paths.
pub fn parse_config(contents: &str) -> Result<Parameters> {
    let file: ConfigFile = toml::from_str(contents)?;
    Ok(file.parameters)
}

fn fixup_relative_path(path: &mut PathBuf, dirname: &Path) -> Result<()> {
    let pathstr = path.to_string_lossy().to_string();
    let expanded = shellexpand::full(&pathstr)?;
    *path = PathBuf::from(expanded.to_string());

    if path.is_relative() {
        *path = dirname.join(&path);
    }
    Ok(())
}
