use chrono::Utc;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use rot_o_mat::config::{Config, InterpolationConfig};
use rot_o_mat::ephemeris::{find_passes, GroundStation, TleLoader};
use rot_o_mat::executor::PassControl;
use rot_o_mat::jobs::{self, JobRegistry, JobState, ParkCommand, TrackOutcome, TrackRequest};
use rot_o_mat::link::{Connector, SerialConnector, SimulatedRotator};
use rot_o_mat::pass::{interpolate, SatellitePass};

#[derive(Parser)]
#[command(name = "rot-o-mat")]
#[command(about = "Satellite pass interpolation and antenna rotator control")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "rot-o-mat.yaml")]
    config: String,
    /// Drive an in-process simulated rotator instead of the serial port
    #[arg(long)]
    simulate: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the trajectory for a pass file as JSON
    Interpolate {
        pass: String,
        /// Seconds between samples
        #[arg(long)]
        step: Option<i64>,
        /// Decimal digits kept in the angles
        #[arg(long)]
        digits: Option<u32>,
    },
    /// List upcoming passes from the local TLE folder
    Passes {
        /// Prediction window
        #[arg(long, default_value = "24h")]
        window: String,
        /// Only this satellite
        #[arg(long)]
        norad: Option<u32>,
        /// Write the next pass to this file, ready for `track`
        #[arg(long)]
        save: Option<String>,
    },
    /// Track a pass file
    Track {
        pass: String,
        /// Send UNSTOW before the pass
        #[arg(long)]
        unstow: bool,
        /// Send STOW after the pass
        #[arg(long)]
        stow: bool,
        /// Compass reading to calibrate azimuth with before the pass
        #[arg(long, allow_hyphen_values = true)]
        compass: Option<i32>,
        /// Play the pass faster than real time
        #[arg(long)]
        time_scale: Option<f64>,
    },
    /// Point the antenna at one position
    Seek {
        azimuth: f64,
        elevation: f64,
        /// Time allowed for the move
        #[arg(long, default_value = "5s")]
        duration: String,
    },
    /// Move the antenna to its rest position
    Stow,
    /// Leave the rest position
    Unstow,
    /// Tell the controller its current azimuth
    Calibrate {
        #[arg(allow_hyphen_values = true)]
        angle: i32,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Commands::Interpolate { pass, step, digits } = &cli.command {
        return print_trajectory(&cli.config, pass, *step, *digits);
    }

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading {}: {}", cli.config, e);
            return ExitCode::FAILURE;
        }
    };

    if let Commands::Passes {
        window,
        norad,
        save,
    } = &cli.command
    {
        return list_passes(&config, window, *norad, save.as_deref());
    }

    if cli.simulate {
        log::info!("Using the simulated rotator");
        drive(SimulatedRotator::new(), config, cli.command)
    } else {
        drive(SerialConnector, config, cli.command)
    }
}

fn print_trajectory(
    config_path: &str,
    pass_path: &str,
    step: Option<i64>,
    digits: Option<u32>,
) -> ExitCode {
    // The config file is optional here; nothing talks to the rotator.
    let defaults = if Path::new(config_path).exists() {
        match Config::from_file(config_path) {
            Ok(config) => config.interpolation,
            Err(e) => {
                eprintln!("Error loading {}: {}", config_path, e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        InterpolationConfig::default()
    };

    let pass = match read_pass(pass_path) {
        Ok(pass) => pass,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let step = step.unwrap_or(defaults.step_seconds);
    let digits = digits.unwrap_or(defaults.rounding_digits);
    match interpolate(&pass, step, digits) {
        Ok(points) => match serde_json::to_string_pretty(&points) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Invalid pass: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn list_passes(config: &Config, window: &str, norad: Option<u32>, save: Option<&str>) -> ExitCode {
    let (Some(station_config), Some(tle_config)) = (&config.station, &config.tle) else {
        eprintln!("Pass prediction needs both `station` and `tle` in the config");
        return ExitCode::FAILURE;
    };

    let Some(station) =
        GroundStation::from_coordinates(&station_config.coordinates, Some(station_config.altitude_m))
    else {
        eprintln!("Invalid station coordinates: {}", station_config.coordinates);
        return ExitCode::FAILURE;
    };

    let window = match humantime::parse_duration(window) {
        Ok(window) => window,
        Err(e) => {
            eprintln!("Invalid window: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let start = Utc::now();
    let end = match chrono::Duration::from_std(window) {
        Ok(span) => start + span,
        Err(e) => {
            eprintln!("Invalid window: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut loader = TleLoader::new(&tle_config.folder);
    if let Err(e) = loader.load() {
        eprintln!("Error loading TLEs: {}", e);
        return ExitCode::FAILURE;
    }

    let mut passes = Vec::new();
    for satellite in loader.satellites() {
        if norad.is_some_and(|id| id != satellite.info.norad_id) {
            continue;
        }
        match find_passes(&station, satellite, start, end, tle_config.min_elevation) {
            Ok(found) => passes.extend(found),
            Err(e) => log::warn!("Skipping {}: {}", satellite.info.name, e),
        }
    }
    passes.sort_by_key(|p| p.aos.time);

    if passes.is_empty() {
        println!("No passes in the next {}", humantime::format_duration(window));
        return ExitCode::SUCCESS;
    }

    for pass in &passes {
        println!(
            "{:<24} {:>6}  AOS {} az {:>5.1}  TCA {} el {:>4.1}  LOS {} az {:>5.1}  ({} s)",
            pass.satellite,
            pass.norad_id,
            pass.aos.time.format("%Y-%m-%d %H:%M:%S"),
            pass.aos.azimuth_deg,
            pass.tca.time.format("%H:%M:%S"),
            pass.max_elevation_deg(),
            pass.los.time.format("%H:%M:%S"),
            pass.los.azimuth_deg,
            pass.duration_seconds
        );
    }

    if let Some(path) = save {
        let next = &passes[0];
        let written = next
            .to_satellite_pass()
            .map_err(|e| e.to_string())
            .and_then(|pass| serde_yaml::to_string(&pass).map_err(|e| e.to_string()))
            .and_then(|yaml| fs::write(path, yaml).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("Saved {} pass at {} to {}", next.satellite, next.aos.time, path),
            Err(e) => {
                eprintln!("Error saving pass to {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn drive<C: Connector + Clone + 'static>(connector: C, config: Config, command: Commands) -> ExitCode {
    let outcome = match command {
        Commands::Track {
            pass,
            unstow,
            stow,
            compass,
            time_scale,
        } => {
            let pass = match read_pass(&pass) {
                Ok(pass) => pass,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            let mut request = TrackRequest::new(pass, &config.interpolation);
            request.unstow_first = unstow;
            request.stow_after = stow;
            request.compass_calibration = compass;

            let mut executor = config.executor.clone();
            if let Some(scale) = time_scale {
                executor.time_scale = scale;
            }
            let registry = JobRegistry::new(connector, config.link, executor);
            match track(registry, request) {
                Ok(outcome) => outcome,
                Err(code) => return code,
            }
        }
        Commands::Seek {
            azimuth,
            elevation,
            duration,
        } => {
            let duration = match humantime::parse_duration(&duration) {
                Ok(duration) => duration,
                Err(e) => {
                    eprintln!("Invalid duration: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let control = PassControl::with_time_scale(config.executor.time_scale);
            jobs::seek(
                connector,
                config.link,
                config.executor,
                azimuth,
                elevation,
                duration,
                control,
            )
        }
        Commands::Stow => jobs::park(connector, config.link, ParkCommand::Stow),
        Commands::Unstow => jobs::park(connector, config.link, ParkCommand::Unstow),
        Commands::Calibrate { angle } => {
            jobs::park(connector, config.link, ParkCommand::Calibrate(angle))
        }
        // Handled in main, no rotator involved.
        Commands::Interpolate { .. } | Commands::Passes { .. } => return ExitCode::SUCCESS,
    };

    report(&outcome)
}

fn track<C: Connector + Clone + 'static>(
    registry: JobRegistry<C>,
    request: TrackRequest,
) -> Result<TrackOutcome, ExitCode> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        eprintln!("Error starting runtime: {}", e);
        ExitCode::FAILURE
    })?;

    runtime.block_on(async {
        let id = match registry.submit(request) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Error: {}", e);
                return Err(ExitCode::FAILURE);
            }
        };
        println!("Tracking job {}", id);

        let finished = tokio::select! {
            status = registry.wait(id) => status,
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted, cancelling job {}", id);
                // A second Ctrl-C still kills the process the usual way.
                let _ = registry.cancel(id);
                registry.wait(id).await
            }
        };

        match finished.map(|status| status.state) {
            Ok(JobState::Completed(outcome)) | Ok(JobState::Failed(outcome)) => Ok(outcome),
            Ok(state) => {
                eprintln!("Job ended in unexpected state {:?}", state);
                Err(ExitCode::FAILURE)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                Err(ExitCode::FAILURE)
            }
        }
    })
}

fn report(outcome: &TrackOutcome) -> ExitCode {
    match outcome {
        TrackOutcome::Completed(report) => {
            println!(
                "Done: {} segments sent, {} paced",
                report.segments_sent,
                humantime::format_duration(Duration::from_millis(report.pacing_millis))
            );
            ExitCode::SUCCESS
        }
        TrackOutcome::NoHardware { reason } => {
            eprintln!("No rotator found: {}", reason);
            ExitCode::from(2)
        }
        TrackOutcome::ProtocolFailure { reason } => {
            eprintln!("Rotator error: {}", reason);
            ExitCode::FAILURE
        }
        TrackOutcome::Cancelled => {
            eprintln!("Cancelled");
            ExitCode::FAILURE
        }
    }
}

fn read_pass(path: &str) -> Result<SatellitePass, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Error reading {}: {}", path, e))?;
    // YAML parses JSON pass files too.
    let pass: SatellitePass =
        serde_yaml::from_str(&content).map_err(|e| format!("Parse error in {}: {}", path, e))?;
    pass.validate()
        .map_err(|e| format!("Invalid pass in {}: {}", path, e))?;
    Ok(pass)
}
