//! Choosing which camera to open.

use std::io::{BufRead, Write};

use spinmouse_ci::CameraInfo;
use tabled::{Table, Tabled};

use crate::{Error, Result};

#[derive(Tabled)]
struct CameraRow<'a> {
    #[tabled(rename = "Camera")]
    index: usize,
    #[tabled(rename = "DeviceModelName")]
    model: &'a str,
    #[tabled(rename = "DeviceSerialNumber")]
    serial: &'a str,
}

pub fn camera_table(infos: &[Box<dyn CameraInfo>]) -> String {
    let rows = infos.iter().enumerate().map(|(index, info)| CameraRow {
        index,
        model: info.model(),
        serial: info.serial(),
    });
    Table::new(rows).to_string()
}

/// Pick a camera, returning its name.
///
/// `requested` may be a camera name or serial number. Without it, a single
/// camera is used directly and several lead to a prompt on `input`.
pub fn select_camera<R: BufRead, W: Write>(
    infos: &[Box<dyn CameraInfo>],
    requested: Option<&str>,
    mut input: R,
    mut output: W,
) -> Result<String> {
    if let Some(requested) = requested {
        return infos
            .iter()
            .find(|i| i.name() == requested || i.serial() == requested)
            .map(|i| i.name().to_string())
            .ok_or_else(|| Error::CameraNotFound(requested.to_string()));
    }
    match infos {
        [] => Err(Error::NoCameras),
        [only] => {
            tracing::info!("using camera {} ({})", only.serial(), only.model());
            Ok(only.name().to_string())
        }
        _ => {
            writeln!(output, "{}", camera_table(infos))?;
            let last = infos.len() - 1;
            loop {
                write!(output, "Select a camera from [0-{last}]: ")?;
                output.flush()?;
                let mut line = String::new();
                if input.read_line(&mut line)? == 0 {
                    return Err(Error::NoCameraSelected);
                }
                match line.trim().parse::<usize>() {
                    Ok(i) if i <= last => return Ok(infos[i].name().to_string()),
                    _ => writeln!(output, "\"{}\" is not a camera number", line.trim())?,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Info(&'static str, &'static str);

    impl CameraInfo for Info {
        fn name(&self) -> &str {
            self.0
        }
        fn serial(&self) -> &str {
            self.0
        }
        fn model(&self) -> &str {
            self.1
        }
        fn vendor(&self) -> &str {
            "FLIR"
        }
    }

    fn infos(n: usize) -> Vec<Box<dyn CameraInfo>> {
        let all: [(&'static str, &'static str); 3] = [
            ("20010001", "Blackfly S BFS-U3-16S2M"),
            ("20010002", "Blackfly S BFS-U3-16S2M"),
            ("20010003", "Blackfly S BFS-U3-04S2M"),
        ];
        all[..n]
            .iter()
            .map(|&(s, m)| Box::new(Info(s, m)) as Box<dyn CameraInfo>)
            .collect()
    }

    #[test]
    fn no_cameras() {
        let err = select_camera(&infos(0), None, &b""[..], Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "no cameras detected");
    }

    #[test]
    fn single_camera_needs_no_prompt() {
        let mut out = Vec::new();
        let name = select_camera(&infos(1), None, &b""[..], &mut out).unwrap();
        assert_eq!(name, "20010001");
        assert!(out.is_empty());
    }

    #[test]
    fn prompt_repeats_until_valid() {
        let mut out = Vec::new();
        let name = select_camera(&infos(3), None, &b"7\nx\n2\n"[..], &mut out).unwrap();
        assert_eq!(name, "20010003");
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("DeviceSerialNumber"));
        assert_eq!(out.matches("Select a camera").count(), 3);
    }

    #[test]
    fn end_of_input_is_an_error() {
        let result = select_camera(&infos(2), None, &b""[..], Vec::new());
        assert!(matches!(result, Err(Error::NoCameraSelected)));
    }

    #[test]
    fn requested_serial() {
        let name = select_camera(&infos(3), Some("20010002"), &b""[..], Vec::new()).unwrap();
        assert_eq!(name, "20010002");
        assert!(select_camera(&infos(3), Some("nope"), &b""[..], Vec::new()).is_err());
    }
}
