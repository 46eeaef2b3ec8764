use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use eyre::WrapErr;
use spinmouse_ci::{Camera, CameraInfo, CameraModule, TriggerMode};

use spinmouse::{
    camera_select::{camera_table, select_camera},
    config::{CONFIG_FILENAME, Config, default_config_text},
    logging::init_logging,
    session::{SessionOptions, run_session},
    timestamps::analyze_timestamps,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// FLIR cameras through the Spinnaker SDK.
    Spinnaker,
    /// A simulated camera, for trying things out without hardware.
    Sim,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Set up and record an experiment (the default).
    Run,
    /// List the detected cameras and their device information.
    ListCameras,
    /// Report frame ID gaps in a saved timestamp file.
    CheckTimestamps {
        /// The `_timestamps.csv` file.
        csv: PathBuf,
    },
    /// Print the contents of a newly generated config file.
    PrintDefaultConfig,
}

/// Record externally triggered video from FLIR machine vision cameras.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Parameter file, created with defaults if missing.
    #[arg(long, global = true, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    #[arg(long, global = true, value_enum, default_value_t = Backend::Spinnaker)]
    backend: Backend,

    /// Serial number of the camera to use. Without it, a single camera is used
    /// directly and several lead to a prompt.
    #[arg(long, global = true)]
    camera: Option<String>,

    /// Experiment ID offered by default, instead of today's date.
    #[arg(long)]
    experiment_id: Option<String>,

    /// Acquire free-running instead of waiting for the external trigger.
    #[arg(long)]
    no_trigger: bool,

    /// Also write the log to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

fn list_cameras<M: CameraModule>(mut module: M) -> eyre::Result<()> {
    let infos = module.camera_infos()?;
    if infos.is_empty() {
        println!("no cameras detected");
        return Ok(());
    }
    println!("{}", camera_table(&infos));
    let names: Vec<String> = infos.iter().map(|i| i.name().to_string()).collect();
    for name in names {
        let cam = module
            .camera(&name)
            .wrap_err_with(|| format!("opening camera {name}"))?;
        println!();
        println!("*** DEVICE INFORMATION {name} ***");
        for (feature, value) in cam.device_information()? {
            println!("{feature}: {value}");
        }
    }
    Ok(())
}

fn run<M: CameraModule>(mut module: M, cli: &Cli) -> eyre::Result<()> {
    let config = Config::load_or_create(&cli.config)
        .wrap_err_with(|| format!("reading config file {}", cli.config.display()))?;
    if config.created {
        println!(
            "Created {} with default parameters.",
            config.path.display()
        );
    }
    config.validate()?;
    tracing::debug!("{config:?}");

    let infos = module.camera_infos()?;
    let name = select_camera(
        &infos,
        cli.camera.as_deref(),
        std::io::stdin().lock(),
        std::io::stdout(),
    )?;
    let mut cam = module
        .camera(&name)
        .wrap_err_with(|| format!("opening camera {name}"))?;
    for (feature, value) in cam.device_information()? {
        tracing::debug!("{feature}: {value}");
    }

    let opts = SessionOptions {
        trigger_mode: if cli.no_trigger {
            TriggerMode::Off
        } else {
            TriggerMode::On
        },
        experiment_id: cli.experiment_id.clone(),
        show_progress: true,
    };
    run_session(&mut cam, &config, &opts)?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;
    tracing::debug!("{cli:?}");

    match cli.command.as_ref().unwrap_or(&Command::Run) {
        Command::PrintDefaultConfig => print!("{}", default_config_text()),
        Command::CheckTimestamps { csv } => {
            let report = analyze_timestamps(csv)
                .wrap_err_with(|| format!("reading {}", csv.display()))?;
            println!("{report}");
        }
        Command::ListCameras => match cli.backend {
            Backend::Spinnaker => list_cameras(spinmouse_ci_spinnaker::new_module()?)?,
            Backend::Sim => list_cameras(spinmouse_ci_sim::SimModule::default())?,
        },
        Command::Run => match cli.backend {
            Backend::Spinnaker => run(spinmouse_ci_spinnaker::new_module()?, &cli)?,
            Backend::Sim => run(spinmouse_ci_sim::SimModule::default(), &cli)?,
        },
    }
    Ok(())
}
