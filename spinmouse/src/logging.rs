use std::path::Path;

use time::{UtcOffset, format_description::well_known::Iso8601};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
};

/// Used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "spinmouse=info,warn";

/// Start logging to the console and, optionally, to a file.
pub fn init_logging(log_file: Option<&Path>) -> eyre::Result<()> {
    // Create a fixed offset time formatter based on the timezone at the
    // time this line of code runs.
    let timer = OffsetTime::new(
        UtcOffset::from_whole_seconds(chrono::Local::now().offset().local_minus_utc())?,
        Iso8601::DEFAULT,
    );

    let file_layer = if let Some(path) = log_file {
        let file = std::fs::File::create(path)?;
        let file_writer = std::sync::Mutex::new(file);
        Some(
            fmt::layer()
                .with_timer(timer.clone())
                .with_writer(file_writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
    } else {
        None
    };

    let with_ansi = !cfg!(windows);
    let console_layer = fmt::layer().with_timer(timer).with_ansi(with_ansi);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let collector = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(filter);
    tracing::subscriber::set_global_default(collector)?;

    let log_var = if let Ok(var) = std::env::var("RUST_LOG") {
        format!(" with RUST_LOG=\"{var}\".")
    } else {
        format!(" with default filter \"{DEFAULT_LOG_FILTER}\".")
    };
    if let Some(path) = log_file {
        tracing::debug!("Logging initiated to file \"{}\"{log_var}", path.display());
    }
    tracing::debug!("Logging initiated to console{log_var}");

    Ok(())
}
