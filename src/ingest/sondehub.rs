/// SondeHub v2 API client
///
/// Retrieves radiosonde telemetry history, launch sites and the flights
/// seen at a site from the SondeHub REST API, and decodes packets pushed on
/// the live feed. Transport is deliberately thin: no retry, no backoff.
///
/// API: https://api.v2.sondehub.org
/// Live feed topic per sonde: `sondes/{serial}`

use std::time::Duration;

use crate::config::SondeHubConfig;
use crate::logging::{self, DataSource};
use crate::model::{RawFrame, SondeError};
use crate::sites::{self, FlightSummary, LaunchSite};

pub const DEFAULT_API_BASE: &str = "https://api.v2.sondehub.org";

// ---------------------------------------------------------------------------
// URL builders
// ---------------------------------------------------------------------------

pub fn build_sites_url(base: &str) -> String {
    format!("{}/sites", base.trim_end_matches('/'))
}

/// Flights seen at `site` during the last `last_secs` seconds.
pub fn build_site_sondes_url(base: &str, site: &str, last_secs: u64) -> String {
    format!("{}/sondes/site/{}?last={}", base.trim_end_matches('/'), site, last_secs)
}

/// Full telemetry history of one sonde over the last `last_secs` seconds.
pub fn build_sonde_history_url(base: &str, serial: &str, last_secs: u64) -> String {
    format!("{}/sonde/{}?last={}", base.trim_end_matches('/'), serial, last_secs)
}

/// Live feed topic carrying packets for one sonde.
pub fn live_topic(serial: &str) -> String {
    format!("sondes/{}", serial)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses a history response body (a JSON array of frames), oldest first as
/// SondeHub returns it.
///
/// Entries that cannot be read as a frame are logged and skipped; only a
/// body that is not a JSON array at all is an error.
pub fn parse_history(body: &str) -> Result<Vec<RawFrame>, SondeError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| SondeError::ParseError(e.to_string()))?;
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        other => {
            return Err(SondeError::ParseError(format!(
                "expected an array of frames, got {}",
                json_kind(&other)
            )));
        }
    };

    let total = entries.len();
    let mut frames = Vec::with_capacity(total);
    let mut skipped = 0usize;
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<RawFrame>(entry) {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                skipped += 1;
                logging::debug(
                    DataSource::SondeHub,
                    None,
                    &format!("Skipping history entry {}: {}", index, e),
                );
            }
        }
    }
    if skipped > 0 {
        logging::warn(
            DataSource::SondeHub,
            None,
            &format!("Skipped {} of {} malformed history entries", skipped, total),
        );
    }
    Ok(frames)
}

/// Decodes one live feed payload.
pub fn parse_live_message(payload: &str) -> Result<RawFrame, SondeError> {
    serde_json::from_str(payload).map_err(|e| SondeError::ParseError(e.to_string()))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// API client functions
// ---------------------------------------------------------------------------

/// Blocking HTTP client with the configured timeout.
pub fn build_client(config: &SondeHubConfig) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
}

fn get_body(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;

    if !response.status().is_success() {
        return Err(SondeError::HttpError(response.status().as_u16()).into());
    }
    Ok(response.text()?)
}

/// Fetch the telemetry history of one sonde
///
/// # Returns
/// Every frame SondeHub holds for the window, oldest first. An empty
/// vector means the sonde was not heard in the window.
pub fn fetch_history(
    client: &reqwest::blocking::Client,
    config: &SondeHubConfig,
    serial: &str,
) -> Result<Vec<RawFrame>, Box<dyn std::error::Error>> {
    let url = build_sonde_history_url(&config.api_base, serial, config.range_secs);
    logging::debug(DataSource::SondeHub, Some(serial), &format!("GET {}", url));
    let body = get_body(client, &url)?;
    Ok(parse_history(&body)?)
}

/// Fetch every known launch site, sorted by name
pub fn fetch_sites(
    client: &reqwest::blocking::Client,
    config: &SondeHubConfig,
) -> Result<Vec<LaunchSite>, Box<dyn std::error::Error>> {
    let body = get_body(client, &build_sites_url(&config.api_base))?;
    Ok(sites::parse_sites(&body)?)
}

/// Fetch the flights seen at a site, newest first
pub fn fetch_site_flights(
    client: &reqwest::blocking::Client,
    config: &SondeHubConfig,
    site: &str,
) -> Result<Vec<FlightSummary>, Box<dyn std::error::Error>> {
    let url = build_site_sondes_url(&config.api_base, site, config.range_secs);
    let body = get_body(client, &url)?;
    Ok(sites::parse_site_flights(&body)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
