/// Development mode utilities for working with saved flights
///
/// When no sonde is airborne, use this module to replay a saved SondeHub
/// history response: the first part is loaded as history and the rest is
/// pushed frame by frame through the live path, exactly as the live feed
/// would deliver it.

use std::path::Path;

use serde::Serialize;

use crate::ingest::sondehub::parse_history;
use crate::logging::{self, DataSource};
use crate::model::{RawFrame, SondeError};
use crate::session::{FlightSession, HistorySummary, LiveOutcome};

/// A saved flight ready for replay.
pub struct DevMode {
    /// Frames in delivery order (oldest first)
    pub frames: Vec<RawFrame>,
}

/// Counts from one replay run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub history: HistorySummary,
    pub live_applied: usize,
    pub live_rejected: usize,
    pub renders: usize,
    /// The session asked for the live feed to be retired.
    pub retired: bool,
    /// Live frames never delivered because of the retirement.
    pub undelivered: usize,
}

impl DevMode {
    /// Load a saved `/sonde/{serial}` response
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SondeError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path)
            .map_err(|e| SondeError::ParseError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&body)
    }

    pub fn from_json(body: &str) -> Result<Self, SondeError> {
        Ok(Self {
            frames: parse_history(body)?,
        })
    }

    /// Serial of the first frame that carries one
    pub fn serial(&self) -> Option<&str> {
        self.frames.iter().find_map(|f| f.serial.as_deref())
    }

    /// Replay into `session`
    ///
    /// # Arguments
    /// * `split` - Number of leading frames loaded as history; the rest go
    ///   through the live path until the session retires the feed.
    ///
    /// A session not yet following a flight is switched to the saved one.
    pub fn replay(&self, session: &mut FlightSession, split: usize) -> ReplayReport {
        if session.serial().is_none() {
            session.switch_to(self.serial().unwrap_or("replay"));
        }
        let id = session.id();
        let split = split.min(self.frames.len());
        let (history, live) = self.frames.split_at(split);

        let mut report = ReplayReport {
            history: session.load_history(history),
            live_applied: 0,
            live_rejected: 0,
            renders: 0,
            retired: false,
            undelivered: 0,
        };

        for (i, raw) in live.iter().enumerate() {
            match session.apply_live(id, raw) {
                LiveOutcome::Applied { render } => {
                    report.live_applied += 1;
                    report.renders += usize::from(render);
                }
                LiveOutcome::Rejected | LiveOutcome::StaleSession => report.live_rejected += 1,
                LiveOutcome::Retire => {
                    report.retired = true;
                    report.undelivered = live.len() - i - 1;
                    break;
                }
            }
        }

        logging::info(
            DataSource::System,
            session.serial(),
            &format!(
                "Replay finished: {} history frames, {} live applied, {} live rejected{}",
                history.len(),
                report.live_applied,
                report.live_rejected,
                if report.retired { ", live feed retired" } else { "" }
            ),
        );
        report
    }
}
