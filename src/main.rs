/// skewt_service
///
/// Usage: skewt_service <serial> [--file history.json]
///
/// Loads the flight history of one radiosonde (from SondeHub, or from a
/// saved response with --file), runs it through the sounding pipeline and
/// prints the sounding and convection estimate as JSON on stdout.

use std::env;
use std::process::ExitCode;

use skewt_service::config::{self, ServiceConfig};
use skewt_service::dev_mode::DevMode;
use skewt_service::ingest::sondehub;
use skewt_service::logging::{self, DataSource, LogLevel};
use skewt_service::model::{RawFrame, SondeError};
use skewt_service::session::FlightSession;

struct Args {
    serial: String,
    file: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut serial = None;
    let mut file = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--file" => {
                file = Some(args.next().ok_or("--file needs a path")?);
            }
            other if other.starts_with("--") => return Err(format!("unknown option {}", other)),
            other => serial = Some(other.to_string()),
        }
    }
    let serial = serial.ok_or("missing sonde serial")?;
    Ok(Args { serial, file })
}

fn load_config() -> Result<ServiceConfig, SondeError> {
    let path = env::var("SKEWT_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let mut config = config::load_config_or_default(&path).inspect_err(|e| {
        logging::error(DataSource::Config, Some(&path), &e.to_string());
    })?;
    logging::debug(DataSource::Config, Some(&path), "Configuration loaded");
    if let Ok(base) = env::var("SONDEHUB_API_BASE") {
        config.sondehub.api_base = base;
    }
    Ok(config)
}

fn load_frames(args: &Args, config: &ServiceConfig) -> Result<Vec<RawFrame>, Box<dyn std::error::Error>> {
    match &args.file {
        Some(path) => {
            logging::info(DataSource::System, Some(&args.serial), &format!("Reading history from {}", path));
            Ok(DevMode::from_file(path)?.frames)
        }
        None => {
            let client = sondehub::build_client(&config.sondehub)?;
            sondehub::fetch_history(&client, &config.sondehub, &args.serial).inspect_err(|e| {
                logging::log_sondehub_failure(&args.serial, "History fetch", &**e);
            })
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args().map_err(|e| {
        eprintln!("Usage: skewt_service <serial> [--file history.json]");
        e
    })?;
    let config = load_config()?;

    let frames = load_frames(&args, &config)?;
    let mut session = FlightSession::new(config);
    session.switch_to(&args.serial);
    let summary = session.load_history(&frames);
    if summary.accepted == 0 {
        return Err(SondeError::NoFramesAvailable(args.serial).into());
    }

    if session.should_subscribe_live() {
        logging::info(
            DataSource::Live,
            Some(&args.serial),
            &format!("Flight still ascending, live topic {}", sondehub::live_topic(&args.serial)),
        );
    }

    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let level = match env::var("SKEWT_LOG_LEVEL").as_deref() {
        Ok("debug") => LogLevel::Debug,
        Ok("warn") => LogLevel::Warning,
        Ok("error") => LogLevel::Error,
        _ => LogLevel::Info,
    };
    let log_file = env::var("SKEWT_LOG_FILE").ok();
    logging::init_logger(level, log_file.as_deref(), true);

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(DataSource::System, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}
