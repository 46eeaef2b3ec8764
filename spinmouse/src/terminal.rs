//! Terminal front end: commands typed on stdin.

use std::io::BufRead;

use crossbeam_channel::Sender;
use spinmouse_ci::TriggerMode;

use crate::commands::{CameraCommand, UiEvent};

pub const HELP: &str = "\
commands during setup:
  offset DX DY     move the image offset by DX, DY pixels
  center X Y       move the image so pixel X, Y is in the center
  begin [ID]       start the acquisition (default experiment ID if none given)
  cancel           quit without acquiring
commands during acquisition:
  trigger on|off   enable or disable the external trigger
  stop             end the acquisition (or press 'Ctrl-C')
  help             show this message";

#[derive(Debug, Clone, PartialEq)]
pub enum TerminalCommand {
    Event(UiEvent),
    Help,
}

fn parse_f64(word: Option<&str>, what: &str) -> Result<f64, String> {
    let word = word.ok_or_else(|| format!("missing {what}"))?;
    match word.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("\"{word}\" is not a number ({what})")),
    }
}

/// Parse one line. Blank lines give `None`.
pub fn parse_command(line: &str) -> Result<Option<TerminalCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(None);
    };
    let parsed = match cmd.to_lowercase().as_str() {
        "offset" => {
            let dx = parse_f64(words.next(), "DX")?;
            let dy = parse_f64(words.next(), "DY")?;
            TerminalCommand::Event(UiEvent::Camera(CameraCommand::MoveOffset { dx, dy }))
        }
        "center" => {
            let x = parse_f64(words.next(), "X")?;
            let y = parse_f64(words.next(), "Y")?;
            TerminalCommand::Event(UiEvent::Click { x, y })
        }
        "begin" => {
            let id = words.next().map(str::to_string);
            TerminalCommand::Event(UiEvent::Begin(id))
        }
        "cancel" => TerminalCommand::Event(UiEvent::Cancel),
        "stop" => TerminalCommand::Event(UiEvent::Stop),
        "trigger" => {
            let mode = match words.next() {
                Some("on") => TriggerMode::On,
                Some("off") => TriggerMode::Off,
                _ => return Err("expected 'trigger on' or 'trigger off'".into()),
            };
            TerminalCommand::Event(UiEvent::Camera(CameraCommand::SetTriggerMode(mode)))
        }
        "help" | "?" => TerminalCommand::Help,
        other => return Err(format!("unknown command \"{other}\"")),
    };
    if let Some(extra) = words.next() {
        return Err(format!("unexpected \"{extra}\""));
    }
    Ok(Some(parsed))
}

/// Read commands from stdin on a background thread, forwarding events.
///
/// The thread ends at end of input or once the receiver is gone and another
/// line arrives.
pub fn spawn_stdin_reader(tx: Sender<UiEvent>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("reading stdin: {e}");
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(TerminalCommand::Help)) => println!("{HELP}"),
                    Ok(Some(TerminalCommand::Event(ev))) => {
                        if tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(msg) => println!("{msg}; type 'help' for commands"),
                }
            }
        })?;
    Ok(())
}
