use std::{
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffmpeg not found (tried \"{}\"); install ffmpeg and make sure it is on the PATH", .program.display())]
    FfmpegNotFound { program: PathBuf },
    #[error("ffmpeg error ({}): {}", output.status, String::from_utf8_lossy(&output.stderr).trim())]
    FfmpegError { output: std::process::Output },
    #[error("frame of {actual} bytes does not match {width}x{height} video")]
    FrameSize {
        width: u32,
        height: u32,
        actual: usize,
    },
    #[error("video dimensions must be nonzero (got {width}x{height})")]
    InvalidSize { width: u32, height: u32 },
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegWriterOptions {
    /// Playback frame rate written into the file.
    pub framerate: u32,
    /// MJPEG quantizer scale, 2 (best) to 31 (worst).
    pub quality: u8,
    /// The ffmpeg executable.
    pub ffmpeg: PathBuf,
}

impl Default for FfmpegWriterOptions {
    fn default() -> Self {
        Self {
            framerate: 100,
            quality: 3,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

fn zq(x: &[&str]) -> Vec<String> {
    x.iter().map(|x| String::from(*x)).collect()
}

/// Arguments for ffmpeg reading raw gray8 frames from stdin and writing
/// MJPEG in AVI to `path`.
pub fn args(path: &Path, width: u32, height: u32, opts: &FfmpegWriterOptions) -> Vec<String> {
    let mut args = zq(&["-hide_banner", "-nostdin", "-y", "-loglevel", "error"]);
    args.extend(zq(&["-f", "rawvideo", "-pix_fmt", "gray"]));
    args.extend([
        "-video_size".into(),
        format!("{width}x{height}"),
        "-framerate".into(),
        opts.framerate.to_string(),
    ]);
    args.extend(zq(&["-i", "-", "-c:v", "mjpeg"]));
    args.extend([
        "-q:v".into(),
        opts.quality.clamp(2, 31).to_string(),
        "-pix_fmt".into(),
        "yuvj420p".into(),
        "-f".into(),
        "avi".into(),
        path.display().to_string(),
    ]);
    args
}

/// True if `ffmpeg -version` can be run.
pub fn ffmpeg_available(ffmpeg: &Path) -> bool {
    Command::new(ffmpeg)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Writes 8 bit grayscale frames to a video file using an ffmpeg child
/// process.
pub struct FfmpegWriter {
    stdin: Option<BufWriter<ChildStdin>>,
    ffmpeg_child: Option<Child>,
    width: u32,
    height: u32,
    n_frames: u64,
}

impl FfmpegWriter {
    pub fn new(path: &Path, width: u32, height: u32, opts: &FfmpegWriterOptions) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidSize { width, height });
        }
        let args = args(path, width, height, opts);
        tracing::debug!("spawning {} {}", opts.ffmpeg.display(), args.join(" "));
        let mut ffmpeg_child = match Command::new(&opts.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FfmpegNotFound {
                    program: opts.ffmpeg.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let stdin = ffmpeg_child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("failed to get ffmpeg stdin"))?;

        Ok(Self {
            stdin: Some(BufWriter::new(stdin)),
            ffmpeg_child: Some(ffmpeg_child),
            width,
            height,
            n_frames: 0,
        })
    }

    /// Write one packed (stride equals width) grayscale frame.
    pub fn write_gray8(&mut self, data: &[u8]) -> Result<()> {
        let expected = self.width as usize * self.height as usize;
        if data.len() != expected {
            return Err(Error::FrameSize {
                width: self.width,
                height: self.height,
                actual: data.len(),
            });
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(std::io::Error::other("writer already closed").into());
        };
        match stdin.write_all(data) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                // Apparently ffmpeg died.
                self.stdin = None;
                return Err(self.collect_ffmpeg_failure()?);
            }
            Err(e) => return Err(e.into()),
        }
        self.n_frames += 1;
        Ok(())
    }

    fn collect_ffmpeg_failure(&mut self) -> Result<Error> {
        let Some(mut ffmpeg_child) = self.ffmpeg_child.take() else {
            return Ok(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        };
        let status = ffmpeg_child.wait()?;
        let mut stderr = Vec::new();
        if let Some(mut err) = ffmpeg_child.stderr.take() {
            err.read_to_end(&mut stderr)?;
        }
        let output = std::process::Output {
            status,
            stdout: Vec::new(),
            stderr,
        };
        Ok(Error::FfmpegError { output })
    }

    /// Finish the file, waiting for ffmpeg to exit. Returns the number of
    /// frames written.
    pub fn close(mut self) -> Result<u64> {
        // Close stdin, telling ffmpeg to end.
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        if let Some(ffmpeg_child) = self.ffmpeg_child.take() {
            let output = ffmpeg_child.wait_with_output()?;
            if !output.status.success() {
                return Err(Error::FfmpegError { output });
            }
        }
        Ok(self.n_frames)
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        self.stdin.take();
        if let Some(mut ffmpeg_child) = self.ffmpeg_child.take() {
            if let Err(e) = ffmpeg_child.wait() {
                tracing::error!("waiting for ffmpeg: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_describe_raw_gray_input_and_mjpeg_output() {
        let opts = FfmpegWriterOptions {
            framerate: 30,
            ..Default::default()
        };
        let args = args(Path::new("out.avi"), 640, 480, &opts);
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt gray -video_size 640x480 -framerate 30 -i -"));
        assert!(joined.contains("-c:v mjpeg -q:v 3"));
        assert_eq!(args.last().map(String::as_str), Some("out.avi"));
    }

    #[test]
    fn quality_is_clamped() {
        let opts = FfmpegWriterOptions {
            quality: 0,
            ..Default::default()
        };
        let args = args(Path::new("x.avi"), 2, 2, &opts);
        let i = args.iter().position(|a| a == "-q:v").unwrap();
        assert_eq!(args[i + 1], "2");
    }

    #[test]
    fn missing_ffmpeg_is_reported() {
        let opts = FfmpegWriterOptions {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg"),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let result = FfmpegWriter::new(&dir.path().join("x.avi"), 16, 16, &opts);
        assert!(matches!(result, Err(Error::FfmpegNotFound { .. })));
        assert!(!ffmpeg_available(&opts.ffmpeg));
    }
}
