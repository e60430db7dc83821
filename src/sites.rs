/// Launch sites and the flights seen at them
///
/// SondeHub keys both the site list and a site's flight list by
/// identifier, so both responses are JSON objects rather than arrays.
/// Flights are labelled with the synoptic launch period (00/06/12/18Z) they
/// belong to, which is how soundings are usually referred to.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;

use crate::model::{parse_timestamp, SondeError};

/// Adelaide Airport.
pub const DEFAULT_SITE: &str = "94672";

const SYNOPTIC_HOURS: [u32; 4] = [0, 6, 12, 18];
const SYNOPTIC_WINDOW_HOURS: f64 = 3.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchSite {
    pub id: String,
    /// `station_name`, or the id when the site has none.
    pub name: String,
    pub position: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSummary {
    pub serial: String,
    pub first_seen: Option<DateTime<Utc>>,
}

impl FlightSummary {
    pub fn label(&self) -> String {
        self.first_seen
            .map(synoptic_label)
            .unwrap_or_else(|| "unknown".to_string())
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_object(body: &str) -> Result<serde_json::Map<String, serde_json::Value>, SondeError> {
    match serde_json::from_str(body).map_err(|e| SondeError::ParseError(e.to_string()))? {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(serde_json::Map::new()),
        _ => Err(SondeError::ParseError("expected a JSON object".to_string())),
    }
}

/// Parses the `/sites` response, sorted by display name.
pub fn parse_sites(body: &str) -> Result<Vec<LaunchSite>, SondeError> {
    let mut sites: Vec<LaunchSite> = parse_object(body)?
        .into_iter()
        .map(|(id, info)| {
            let name = info
                .get("station_name")
                .and_then(|n| n.as_str())
                .filter(|n| !n.is_empty())
                .map(String::from)
                .unwrap_or_else(|| id.clone());
            let position = info
                .get("position")
                .and_then(|p| p.as_array())
                .map(|coords| coords.iter().filter_map(|c| c.as_f64()).collect());
            LaunchSite { id, name, position }
        })
        .collect();
    sites.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(sites)
}

/// Parses the `/sondes/site/{site}` response, newest flight first.
/// Flights with no usable timestamp sort last.
pub fn parse_site_flights(body: &str) -> Result<Vec<FlightSummary>, SondeError> {
    let mut flights: Vec<FlightSummary> = parse_object(body)?
        .into_iter()
        .map(|(serial, info)| FlightSummary {
            first_seen: info
                .get("datetime")
                .and_then(|d| d.as_str())
                .and_then(parse_timestamp),
            serial,
        })
        .collect();
    flights.sort_by(|a, b| b.first_seen.cmp(&a.first_seen));
    Ok(flights)
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// `YYYY-MM-DD HH:MM:SSZ`
pub fn format_utc(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%SZ").to_string()
}

/// Label for a flight's first packet, e.g. `2024-05-02 00Z (23:15Z)`.
///
/// Returns `unknown` for a missing or unparseable timestamp.
pub fn first_packet_label(ts: Option<&str>) -> String {
    ts.and_then(parse_timestamp)
        .map(synoptic_label)
        .unwrap_or_else(|| "unknown".to_string())
}

fn synoptic_label(ts: DateTime<Utc>) -> String {
    let hours = f64::from(ts.hour()) + f64::from(ts.minute()) / 60.0;

    // Nearest synoptic hour, wrapping around midnight; ties go to the earlier entry
    let mut closest = SYNOPTIC_HOURS[0];
    let mut min_dist = f64::INFINITY;
    for syn in SYNOPTIC_HOURS {
        let dist = (hours - f64::from(syn)).abs();
        let wrapped = dist.min(24.0 - dist);
        if wrapped < min_dist {
            min_dist = wrapped;
            closest = syn;
        }
    }

    let time_part = ts.format("%H:%MZ");
    if min_dist > SYNOPTIC_WINDOW_HOURS {
        return format!("{} {}", ts.format("%Y-%m-%d"), time_part);
    }

    let mut date = ts.date_naive();
    if closest == 0 && 24.0 - hours <= SYNOPTIC_WINDOW_HOURS {
        // Evening launches belong to the next day's 00Z sounding
        date += Duration::days(1);
    }
    format!("{} {:02}Z ({})", date.format("%Y-%m-%d"), closest, time_part)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sites_sorted_by_name_with_id_fallback() {
        let body = r#"{
            "94672": {"station_name": "Adelaide Airport", "position": [138.52, -34.95]},
            "94610": {"station_name": "Perth Airport", "position": [115.97, -31.93]},
            "A1234": {"position": [0.0, 0.0]}
        }"#;
        let sites = parse_sites(body).expect("valid site list");
        let names: Vec<&str> = sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A1234", "Adelaide Airport", "Perth Airport"]);
        assert_eq!(sites[1].id, "94672");
        assert_eq!(sites[1].position, Some(vec![138.52, -34.95]));
    }

    #[test]
    fn test_sites_reject_non_object() {
        assert!(matches!(parse_sites("[1, 2, 3]"), Err(SondeError::ParseError(_))));
    }

    #[test]
    fn test_site_flights_newest_first() {
        let body = r#"{
            "T1000001": {"datetime": "2024-05-01T11:05:00Z"},
            "T1000002": {"datetime": "2024-05-01T23:10:00Z"},
            "T1000003": {}
        }"#;
        let flights = parse_site_flights(body).expect("valid flight list");
        let serials: Vec<&str> = flights.iter().map(|f| f.serial.as_str()).collect();
        assert_eq!(serials, vec!["T1000002", "T1000001", "T1000003"]);
        assert_eq!(flights[2].label(), "unknown");
    }

    #[test]
    fn test_site_flights_null_body_is_empty() {
        assert!(parse_site_flights("null").expect("null body").is_empty());
    }

    #[test]
    fn test_format_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 7, 3, 9).unwrap();
        assert_eq!(format_utc(&ts), "2024-05-01 07:03:09Z");
    }

    #[test]
    fn test_label_near_synoptic_hour() {
        assert_eq!(
            first_packet_label(Some("2024-05-01T11:15:00Z")),
            "2024-05-01 12Z (11:15Z)"
        );
        assert_eq!(
            first_packet_label(Some("2024-05-01T05:30:00Z")),
            "2024-05-01 06Z (05:30Z)"
        );
    }

    #[test]
    fn test_evening_launch_rolls_to_next_day_00z() {
        assert_eq!(
            first_packet_label(Some("2024-05-01T23:15:00Z")),
            "2024-05-02 00Z (23:15Z)"
        );
        // Month boundary
        assert_eq!(
            first_packet_label(Some("2024-05-31T22:40:00Z")),
            "2024-06-01 00Z (22:40Z)"
        );
    }

    #[test]
    fn test_early_morning_stays_on_same_day() {
        assert_eq!(
            first_packet_label(Some("2024-05-02T01:20:00Z")),
            "2024-05-02 00Z (01:20Z)"
        );
    }

    #[test]
    fn test_label_unknown_for_missing_or_bad_timestamp() {
        assert_eq!(first_packet_label(None), "unknown");
        assert_eq!(first_packet_label(Some("yesterday")), "unknown");
    }
}
