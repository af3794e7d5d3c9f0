//! Recording session lifecycle: an accumulator that is either idle or armed.
//!
//! All transitions are non-blocking. Duration-limited sessions are ended by
//! the caller polling `tick(now)` from its own loop, never by sleeping inside
//! a delivery callback. Timestamps come in from the caller so replayed data
//! and tests behave deterministically.

use log::info;

use crate::sampling::calib::{DerivedSample, RawSample};
use crate::sampling::error::RigError;

/// Minimum spacing between accepted edge triggers, to swallow switch bounce
/// and accidental double presses.
pub const TRIGGER_COOLDOWN_SECONDS: f64 = 7.0;

/// Session length armed by an edge trigger.
pub const EDGE_RECORD_SECONDS: f64 = 5.0;

/// One recorded sample with everything any sink variant needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordedRow {
    pub timestamp: f64,
    pub channels: [i32; 4],
    pub flags: [u8; 3],
    pub positions: [u8; 3],
    pub resistances: [f64; 3],
}

impl RecordedRow {
    pub fn new(raw: &RawSample, derived: &DerivedSample) -> Self {
        Self {
            timestamp: raw.timestamp,
            channels: raw.channels,
            flags: raw.flags.map(u8::from),
            positions: raw.positions.map(u8::from),
            resistances: derived.resistances,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Idle,
    Armed { deadline: Option<f64> },
}

/// Buffers every observed sample while armed, independent of window pruning.
/// At most one session runs at a time; arming while armed is a no-op.
///
/// Flushing is the caller's job, so a failed sink write leaves `rows()`
/// intact for a retry instead of silently losing the session.
pub struct RecordingSession {
    state: State,
    rows: Vec<RecordedRow>,
    last_trigger: Option<f64>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            rows: Vec::new(),
            last_trigger: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, State::Armed { .. })
    }

    /// Start a session, optionally with an auto-stop deadline `duration`
    /// seconds after `now`. Returns false (and changes nothing) when a
    /// session is already running.
    pub fn arm(&mut self, now: f64, duration: Option<f64>) -> Result<bool, RigError> {
        if let Some(d) = duration {
            if d <= 0.0 {
                return Err(RigError::invalid_config(format!(
                    "record duration must be positive, got {d}"
                )));
            }
        }
        if self.is_armed() {
            return Ok(false);
        }
        self.rows.clear();
        self.state = State::Armed {
            deadline: duration.map(|d| now + d),
        };
        info!(
            "recording armed{}",
            duration.map(|d| format!(" for {d} s")).unwrap_or_default()
        );
        Ok(true)
    }

    /// Digital-input edge: arms a fixed-length session, subject to the
    /// cooldown between accepted triggers. Returns whether the edge took
    /// effect.
    pub fn edge_trigger(&mut self, now: f64) -> bool {
        if self.is_armed() {
            return false;
        }
        if let Some(last) = self.last_trigger {
            if now - last < TRIGGER_COOLDOWN_SECONDS {
                return false;
            }
        }
        self.last_trigger = Some(now);
        // Cannot fail: the duration constant is positive and we are idle.
        self.arm(now, Some(EDGE_RECORD_SECONDS)).unwrap_or(false)
    }

    /// True once an armed deadline has elapsed; the caller should disarm and
    /// flush. Open-ended sessions never tick over.
    pub fn tick(&self, now: f64) -> bool {
        matches!(self.state, State::Armed { deadline: Some(d) } if now >= d)
    }

    /// Append while armed; ignored while idle.
    pub fn observe(&mut self, raw: &RawSample, derived: &DerivedSample) {
        if self.is_armed() {
            self.rows.push(RecordedRow::new(raw, derived));
        }
    }

    pub fn disarm(&mut self) {
        self.state = State::Idle;
    }

    /// Rows captured by the most recent session. Still populated after a
    /// failed flush; call `clear` once they are safely on disk.
    pub fn rows(&self) -> &[RecordedRow] {
        &self.rows
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}
