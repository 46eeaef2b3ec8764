use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(
        "CONFIG ISSUE: Folder defined in 'data_directory' ({}) does not exist. Please create the folder or edit {}",
        .data_directory.display(),
        .config_path.display()
    )]
    DataDirectoryMissing {
        data_directory: PathBuf,
        config_path: PathBuf,
    },
    #[error("CONFIG ISSUE: {msg} (in {})", .config_path.display())]
    InvalidConfig { msg: String, config_path: PathBuf },
    #[error("output file {} already exists, choose another experiment ID", .path.display())]
    OutputExists { path: PathBuf },
    #[error("invalid experiment ID \"{0}\": it must be usable as a file name")]
    InvalidExperimentId(String),
    #[error("no cameras detected")]
    NoCameras,
    #[error("camera \"{0}\" not found")]
    CameraNotFound(String),
    #[error("no camera selected")]
    NoCameraSelected,
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
    #[error("camera error: {source}")]
    Camera {
        #[from]
        source: spinmouse_ci::Error,
    },
    #[error("video error: {source}")]
    Video {
        #[from]
        source: ffmpeg_writer::Error,
    },
    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },
    #[error("image encoding error: {source}")]
    Image {
        #[from]
        source: image::ImageError,
    },
    #[error("lookup error on variable: {source}")]
    ShellExpandLookupVarError {
        #[from]
        source: shellexpand::LookupError<std::env::VarError>,
    },
    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
    #[error("TOML deserialization error: {source}")]
    TomlDeError {
        #[from]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
