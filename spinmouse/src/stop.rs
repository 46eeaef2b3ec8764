//! Stopping the active phase, from Ctrl-C or a front end.

use std::sync::{
    Arc, Mutex, OnceLock,
    atomic::{AtomicBool, Ordering},
};

#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

static ARMED: Mutex<Option<StopSignal>> = Mutex::new(None);
static HANDLER: OnceLock<Result<(), String>> = OnceLock::new();

/// Install the process-wide Ctrl-C handler.
///
/// Ctrl-C stops the armed [StopSignal]. With nothing armed, the process exits.
pub fn install_ctrlc_handler() -> crate::Result<()> {
    HANDLER
        .get_or_init(|| {
            ctrlc::set_handler(|| {
                let armed = match ARMED.lock() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                match armed {
                    Some(signal) => {
                        println!("'Ctrl-C' pressed: stopping...");
                        signal.stop();
                    }
                    None => {
                        tracing::info!("got Ctrl-C, exiting");
                        std::process::exit(130);
                    }
                }
            })
            .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(|e| std::io::Error::other(format!("setting Ctrl-C handler: {e}")).into())
}

/// Route Ctrl-C to `signal` until the guard is dropped.
pub fn arm(signal: &StopSignal) -> ArmGuard {
    set_armed(Some(signal.clone()));
    ArmGuard { _priv: () }
}

fn set_armed(value: Option<StopSignal>) {
    match ARMED.lock() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

#[must_use]
pub struct ArmGuard {
    _priv: (),
}

impl Drop for ArmGuard {
    fn drop(&mut self) {
        set_armed(None);
    }
}
