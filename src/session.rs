/// Flight session: the state of the one flight currently being followed.
///
/// A session owns the phase detector, the telemetry store and the live
/// counters for a single sonde. Switching flights resets all of it in one
/// step and hands out a new `SessionId`; live packets still tagged with an
/// older id are ignored, so late deliveries from the previous flight cannot
/// leak into the new one.
///
/// History is loaded first, then live frames are applied one at a time
/// through the same phase detector and normalizer, carrying state forward.
/// Once the burst cutoff is frozen the session asks its caller to retire
/// the live subscription.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::convection::{self, ConvectionLevels, ConvectionResult};
use crate::analysis::sounding::{self, SoundingPoint};
use crate::config::ServiceConfig;
use crate::ingest::normalize::FrameNormalizer;
use crate::ingest::sondehub::parse_live_message;
use crate::logging::{self, DataSource};
use crate::model::{NormalizedFrame, RawFrame};
use crate::phase::{FlightPhaseDetector, PhaseDecision};
use crate::store::TelemetryStore;

// ---------------------------------------------------------------------------
// Identity and outcomes
// ---------------------------------------------------------------------------

/// Generation number of a session. Increases on every flight switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

/// Result of loading a history batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    /// Frames that reached the store (a repeated key counts each time).
    pub accepted: usize,
    pub rejected: usize,
    pub cutoff: Option<DateTime<Utc>>,
}

impl HistorySummary {
    pub fn total(&self) -> usize {
        self.accepted + self.rejected
    }
}

/// What happened to one live frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    /// Stored. `render` is set every `live_render_every` applied frames,
    /// never when the interval is 0.
    Applied { render: bool },
    /// Not part of the ascent profile, or failed validation.
    Rejected,
    /// Tagged with an old session, or for a different sonde.
    StaleSession,
    /// The burst cutoff is frozen; stop delivering live frames.
    Retire,
}

/// Everything a renderer needs for one redraw.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub serial: Option<String>,
    pub frames_stored: usize,
    pub descent_cutoff: Option<DateTime<Utc>>,
    pub latest: Option<NormalizedFrame>,
    pub sounding: Vec<SoundingPoint>,
    pub convection: ConvectionResult,
    pub levels: Option<ConvectionLevels>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FlightSession {
    id: SessionId,
    serial: Option<String>,
    phase: FlightPhaseDetector,
    normalizer: FrameNormalizer,
    store: TelemetryStore,
    latest: Option<NormalizedFrame>,
    live_count: u64,
    config: ServiceConfig,
}

impl FlightSession {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            id: SessionId(0),
            serial: None,
            phase: FlightPhaseDetector::new(&config.pipeline),
            normalizer: FrameNormalizer::new(&config.pipeline),
            store: TelemetryStore::new(),
            latest: None,
            live_count: 0,
            config,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn live_count(&self) -> u64 {
        self.live_count
    }

    /// Starts following `serial`. All previous flight state is dropped.
    pub fn switch_to(&mut self, serial: &str) -> SessionId {
        self.store.clear();
        self.phase.reset();
        self.latest = None;
        self.live_count = 0;
        self.serial = Some(serial.to_string());
        self.id = SessionId(self.id.0 + 1);

        logging::debug(
            DataSource::Pipeline,
            Some(serial),
            &format!("Session {} started", self.id.0),
        );
        self.id
    }

    /// Runs a history batch (oldest first) through phase detection,
    /// normalization and the store.
    pub fn load_history(&mut self, frames: &[RawFrame]) -> HistorySummary {
        let mut accepted = 0;
        let mut rejected = 0;
        for raw in frames {
            let decision = self.phase.observe(raw);
            if let PhaseDecision::BurstDetected(ts) = decision {
                self.log_burst(ts);
            }
            if decision != PhaseDecision::Eligible {
                rejected += 1;
                continue;
            }
            match self.normalizer.normalize(raw, self.phase.descent_cutoff()) {
                Some(frame) => {
                    self.store.upsert(frame.clone());
                    self.latest = Some(frame);
                    accepted += 1;
                }
                None => rejected += 1,
            }
        }

        let serial = self.serial.clone().unwrap_or_default();
        logging::log_history_summary(&serial, self.store.len(), frames.len());
        HistorySummary {
            accepted,
            rejected,
            cutoff: self.phase.descent_cutoff(),
        }
    }

    /// Applies one live frame for `session_id`.
    pub fn apply_live(&mut self, session_id: SessionId, raw: &RawFrame) -> LiveOutcome {
        if session_id != self.id {
            return LiveOutcome::StaleSession;
        }
        let Some(serial) = self.serial.as_deref() else {
            return LiveOutcome::StaleSession;
        };
        if raw.serial.as_deref().is_some_and(|s| s != serial) {
            return LiveOutcome::StaleSession;
        }
        if self.phase.burst_found() {
            return LiveOutcome::Retire;
        }

        match self.phase.observe(raw) {
            PhaseDecision::Eligible => {}
            PhaseDecision::Excluded => return LiveOutcome::Rejected,
            PhaseDecision::PastCutoff => return LiveOutcome::Retire,
            PhaseDecision::BurstDetected(ts) => {
                self.log_burst(ts);
                return LiveOutcome::Retire;
            }
        }

        let Some(frame) = self.normalizer.normalize(raw, self.phase.descent_cutoff()) else {
            return LiveOutcome::Rejected;
        };
        self.store.upsert(frame.clone());
        self.latest = Some(frame);
        self.live_count += 1;
        // An interval of 0 never signals a render
        let render = self
            .live_count
            .checked_rem(self.config.pipeline.live_render_every)
            .is_some_and(|r| r == 0);
        LiveOutcome::Applied { render }
    }

    /// Decodes a live payload and applies it. Undecodable payloads are
    /// logged and rejected; the subscription stays open.
    pub fn apply_live_payload(&mut self, session_id: SessionId, payload: &str) -> LiveOutcome {
        match parse_live_message(payload) {
            Ok(raw) => self.apply_live(session_id, &raw),
            Err(e) => {
                let serial = self.serial.clone().unwrap_or_default();
                logging::log_live_failure(&serial, "Live message", &e);
                LiveOutcome::Rejected
            }
        }
    }

    /// A live subscription is only worth holding before the burst.
    pub fn should_subscribe_live(&self) -> bool {
        self.serial.is_some() && !self.phase.burst_found()
    }

    pub fn latest_frame(&self) -> Option<&NormalizedFrame> {
        self.latest.as_ref()
    }

    pub fn descent_cutoff(&self) -> Option<DateTime<Utc>> {
        self.phase.descent_cutoff()
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn sounding(&self) -> Vec<SoundingPoint> {
        sounding::build_sounding(
            &self.store.ordered_by_pressure_descending(),
            self.config.convection.min_pressure,
            self.config.pipeline.decimate_factor,
        )
    }

    pub fn convection(&self) -> ConvectionResult {
        convection::estimate(
            &self.store.ordered_by_pressure_descending(),
            &self.config.convection,
        )
    }

    /// LCL/LFC/EL for a parcel with the surface sample's own temperature
    /// and dewpoint.
    pub fn surface_parcel_levels(&self) -> Option<ConvectionLevels> {
        let frames = self.store.ordered_by_pressure_descending();
        let surface = frames.first()?;
        convection::convection_levels(&frames, surface.temp, surface.dewpoint)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            serial: self.serial.clone(),
            frames_stored: self.store.len(),
            descent_cutoff: self.descent_cutoff(),
            latest: self.latest.clone(),
            sounding: self.sounding(),
            convection: self.convection(),
            levels: self.surface_parcel_levels(),
        }
    }

    fn log_burst(&self, ts: DateTime<Utc>) {
        logging::info(
            DataSource::Pipeline,
            self.serial.as_deref(),
            &format!("Burst detected, descent cutoff frozen at {}", crate::sites::format_utc(&ts)),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FrameKey;
    use chrono::{Duration, TimeZone};

    const SERIAL: &str = "T1234567";

    fn launch_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 23, 0, 0).unwrap()
    }

    /// Frame `n` seconds after launch at 5 m/s per second of flight.
    fn frame(n: i64, vel_v: f64) -> RawFrame {
        let alt = 50.0 + 5.0 * n as f64;
        RawFrame {
            frame: Some(FrameKey::Number(n)),
            serial: Some(SERIAL.to_string()),
            datetime: Some((launch_time() + Duration::seconds(n)).to_rfc3339()),
            alt: Some(alt),
            temp: Some(20.0 - 0.0065 * alt),
            humidity: Some(60.0),
            heading: Some(45.0),
            vel_h: Some(6.0),
            vel_v: Some(vel_v),
            ..RawFrame::default()
        }
    }

    fn ascent(range: std::ops::Range<i64>) -> Vec<RawFrame> {
        range.map(|n| frame(n, 5.0)).collect()
    }

    fn session() -> (FlightSession, SessionId) {
        let mut s = FlightSession::new(ServiceConfig::default());
        let id = s.switch_to(SERIAL);
        (s, id)
    }

    #[test]
    fn test_history_load_stores_ascent() {
        let (mut s, _) = session();
        let mut frames = vec![frame(-2, 0.0), frame(-1, 0.2)];
        frames.extend(ascent(0..50));
        let summary = s.load_history(&frames);
        assert_eq!(summary.accepted, 50);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.total(), 52);
        assert_eq!(s.store().len(), 50);
        assert_eq!(s.latest_frame().map(|f| f.key.clone()), Some(FrameKey::Number(49)));
        assert!(s.should_subscribe_live());
    }

    #[test]
    fn test_history_with_burst_freezes_cutoff() {
        let (mut s, _) = session();
        let mut frames = ascent(0..301);
        frames.extend((301..312).map(|n| frame(n, -2.0)));
        let summary = s.load_history(&frames);
        assert_eq!(summary.cutoff, Some(launch_time() + Duration::seconds(311)));
        assert!(!s.should_subscribe_live());
        assert_eq!(s.store().len(), 301);
    }

    #[test]
    fn test_live_frames_extend_profile_and_signal_render() {
        let (mut s, id) = session();
        s.load_history(&ascent(0..10));
        let mut renders = 0;
        for n in 10..70 {
            match s.apply_live(id, &frame(n, 5.0)) {
                LiveOutcome::Applied { render } => renders += usize::from(render),
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!(s.store().len(), 70);
        assert_eq!(s.live_count(), 60);
        assert_eq!(renders, 2);
    }

    #[test]
    fn test_zero_render_interval_applies_without_render() {
        let mut config = ServiceConfig::default();
        config.pipeline.live_render_every = 0;
        let mut s = FlightSession::new(config);
        let id = s.switch_to(SERIAL);
        for n in 0..5 {
            assert_eq!(
                s.apply_live(id, &frame(n, 5.0)),
                LiveOutcome::Applied { render: false },
                "a zero interval must not panic or signal renders"
            );
        }
        assert_eq!(s.store().len(), 5);
    }

    #[test]
    fn test_live_duplicate_key_replaces_history_frame() {
        let (mut s, id) = session();
        s.load_history(&ascent(0..10));
        let mut repeat = frame(5, 5.0);
        repeat.temp = Some(-1.0);
        assert_eq!(s.apply_live(id, &repeat), LiveOutcome::Applied { render: false });
        assert_eq!(s.store().len(), 10);
        assert_eq!(s.store().get(&FrameKey::Number(5)).map(|f| f.temp), Some(-1.0));
    }

    #[test]
    fn test_stale_session_and_foreign_serial_are_ignored() {
        let (mut s, old) = session();
        let new = s.switch_to("T7654321");
        assert_ne!(old, new);

        let mut f = frame(0, 5.0);
        f.serial = Some("T7654321".to_string());
        assert_eq!(s.apply_live(old, &f), LiveOutcome::StaleSession);
        assert_eq!(s.apply_live(new, &frame(0, 5.0)), LiveOutcome::StaleSession);
        assert!(s.store().is_empty());
        assert_eq!(s.apply_live(new, &f), LiveOutcome::Applied { render: false });
    }

    #[test]
    fn test_live_burst_retires_subscription() {
        let (mut s, id) = session();
        s.load_history(&ascent(0..301));
        let outcomes: Vec<LiveOutcome> = (301..313).map(|n| s.apply_live(id, &frame(n, -2.0))).collect();
        assert!(outcomes[..10].iter().all(|o| *o == LiveOutcome::Rejected));
        assert_eq!(outcomes[10], LiveOutcome::Retire);
        assert_eq!(outcomes[11], LiveOutcome::Retire);
        assert!(!s.should_subscribe_live());
        assert_eq!(s.store().len(), 301);
    }

    #[test]
    fn test_switch_resets_everything() {
        let (mut s, _) = session();
        let mut frames = ascent(0..301);
        frames.extend((301..312).map(|n| frame(n, -2.0)));
        s.load_history(&frames);
        assert!(s.descent_cutoff().is_some());

        s.switch_to("T7654321");
        assert!(s.store().is_empty());
        assert!(s.descent_cutoff().is_none());
        assert!(s.latest_frame().is_none());
        assert_eq!(s.live_count(), 0);
        assert!(s.should_subscribe_live());
    }

    #[test]
    fn test_bad_payload_is_rejected_not_fatal() {
        let (mut s, id) = session();
        assert_eq!(s.apply_live_payload(id, "{not json"), LiveOutcome::Rejected);
        let payload = serde_json::to_string(&frame(0, 5.0)).expect("frame serializes");
        assert_eq!(s.apply_live_payload(id, &payload), LiveOutcome::Applied { render: false });
    }

    #[test]
    fn test_views_reflect_store() {
        let (mut s, _) = session();
        assert!(s.sounding().is_empty());
        assert!(s.convection().message.is_some());

        s.load_history(&ascent(0..100));
        let snapshot = s.snapshot();
        assert_eq!(snapshot.frames_stored, 100);
        assert!(!snapshot.sounding.is_empty());
        assert_eq!(snapshot.serial.as_deref(), Some(SERIAL));
    }
}
