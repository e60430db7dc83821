/// Flight phase detection: ascent, burst, descent.
///
/// Scans the chronologically ordered frame sequence (oldest first) and
/// locates the balloon burst. Momentary velocity noise near the ground or
/// at apogee must not look like a burst, so descent is only considered once
/// enough ascending frames have been confirmed, and the cutoff is only frozen
/// after a run of clearly descending frames.
///
/// Once frozen, the cutoff never moves for the lifetime of the detector. A
/// new flight gets a new detector (see `session::FlightSession`).
///
/// Frames must be observed in chronological order; out-of-order delivery
/// corrupts the counters.

use chrono::{DateTime, Utc};

use crate::config::PipelineConfig;
use crate::model::RawFrame;

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// What the detector decided about one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseDecision {
    /// Climbing above the ascent threshold; may go on to normalization.
    Eligible,
    /// Not part of the ascent profile (ground, apogee, descent run).
    Excluded,
    /// Timestamped after the frozen cutoff.
    PastCutoff,
    /// This frame completed the descent run; the cutoff is now frozen at
    /// its timestamp.
    BurstDetected(DateTime<Utc>),
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FlightPhaseDetector {
    ascent_count: u32,
    descent_run: u32,
    cutoff: Option<DateTime<Utc>>,

    ascent_rate_threshold: f64,
    descent_rate_threshold: f64,
    min_ascent_frames: u32,
    descent_run_length: u32,
}

impl Default for FlightPhaseDetector {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl FlightPhaseDetector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            ascent_count: 0,
            descent_run: 0,
            cutoff: None,
            ascent_rate_threshold: config.ascent_rate_threshold,
            descent_rate_threshold: config.descent_rate_threshold,
            min_ascent_frames: config.burst_min_ascent_frames,
            descent_run_length: config.burst_descent_run,
        }
    }

    /// The frozen burst timestamp, if a burst has been found.
    pub fn descent_cutoff(&self) -> Option<DateTime<Utc>> {
        self.cutoff
    }

    pub fn burst_found(&self) -> bool {
        self.cutoff.is_some()
    }

    pub fn ascent_count(&self) -> u32 {
        self.ascent_count
    }

    pub fn descent_run(&self) -> u32 {
        self.descent_run
    }

    /// Forgets everything, including a frozen cutoff. Only for switching to
    /// a different flight.
    pub fn reset(&mut self) {
        self.ascent_count = 0;
        self.descent_run = 0;
        self.cutoff = None;
    }

    /// Advances the state machine by one frame.
    pub fn observe(&mut self, frame: &RawFrame) -> PhaseDecision {
        let ts = frame.timestamp();
        if let (Some(cutoff), Some(ts)) = (self.cutoff, ts) {
            if ts > cutoff {
                return PhaseDecision::PastCutoff;
            }
        }

        match frame.vel_v {
            Some(v) if v > self.ascent_rate_threshold => {
                self.ascent_count += 1;
                self.descent_run = 0;
                PhaseDecision::Eligible
            }
            Some(v)
                if v < self.descent_rate_threshold
                    && self.ascent_count > self.min_ascent_frames
                    && self.cutoff.is_none() =>
            {
                self.descent_run += 1;
                if self.descent_run > self.descent_run_length {
                    // No timestamp: keep counting, the next descending frame freezes it
                    if let Some(ts) = ts {
                        self.cutoff = Some(ts);
                        return PhaseDecision::BurstDetected(ts);
                    }
                }
                PhaseDecision::Excluded
            }
            // Near the ground or apogee, or no velocity at all
            _ => PhaseDecision::Excluded,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
