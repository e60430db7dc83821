/// Live tests against the real SondeHub API
///
/// These tests verify:
/// 1. The sites endpoint returns the default launch site
/// 2. The site flight listing parses and is newest first
/// 3. A recent flight's history runs through the pipeline
///
/// Prerequisites:
/// - Internet connectivity to reach api.v2.sondehub.org
/// - SONDEHUB_API_BASE in .env to point at a mirror (optional)
///
/// Run with: cargo test --test sondehub_live -- --ignored --test-threads=1
///
/// Note: results depend on what is flying. A site with no launch in the
/// last 12 hours makes the history test skip rather than fail.

use skewt_service::config::{SondeHubConfig, ServiceConfig};
use skewt_service::ingest::sondehub;
use skewt_service::session::FlightSession;
use skewt_service::sites::DEFAULT_SITE;

fn test_config() -> SondeHubConfig {
    dotenv::dotenv().ok();
    let mut config = SondeHubConfig::default();
    if let Ok(base) = std::env::var("SONDEHUB_API_BASE") {
        config.api_base = base;
    }
    config
}

fn test_client(config: &SondeHubConfig) -> reqwest::blocking::Client {
    sondehub::build_client(config).expect("Failed to create HTTP client")
}

#[test]
#[ignore]
fn test_sites_include_default_site() {
    let config = test_config();
    let client = test_client(&config);
    let sites = sondehub::fetch_sites(&client, &config).expect("sites request should succeed");

    assert!(!sites.is_empty(), "SondeHub should know at least one launch site");
    assert!(
        sites.iter().any(|s| s.id == DEFAULT_SITE),
        "default site {} missing from the site list",
        DEFAULT_SITE
    );
}

#[test]
#[ignore]
fn test_site_flights_are_newest_first() {
    let config = test_config();
    let client = test_client(&config);
    let flights = sondehub::fetch_site_flights(&client, &config, DEFAULT_SITE)
        .expect("site flight request should succeed");

    println!("{} flights at {} in the last {} s", flights.len(), DEFAULT_SITE, config.range_secs);
    assert!(flights.windows(2).all(|w| w[0].first_seen >= w[1].first_seen));
}

#[test]
#[ignore]
fn test_recent_flight_history_runs_through_pipeline() {
    let config = test_config();
    let client = test_client(&config);
    let flights = sondehub::fetch_site_flights(&client, &config, DEFAULT_SITE)
        .expect("site flight request should succeed");
    let Some(flight) = flights.first() else {
        println!("No flights at {} in range, skipping", DEFAULT_SITE);
        return;
    };

    let frames = sondehub::fetch_history(&client, &config, &flight.serial)
        .expect("history request should succeed");
    println!("{} ({}): {} frames", flight.serial, flight.label(), frames.len());

    let mut session = FlightSession::new(ServiceConfig::default());
    session.switch_to(&flight.serial);
    let summary = session.load_history(&frames);
    assert_eq!(summary.total(), frames.len());

    let snapshot = session.snapshot();
    assert!(snapshot.sounding.iter().all(|p| p.press >= 300.0));
}
