//! Rolling time window over derived samples, with flag rising-edge events.

use std::collections::VecDeque;

use crate::sampling::calib::{DerivedSample, RawSample};
use crate::sampling::error::RigError;

/// Default retention span in seconds.
pub const DEFAULT_WINDOW_SECONDS: f64 = 10.0;

/// Rising edge of a photo-interrupter flag, kept for plot annotation only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Event {
    pub timestamp: f64,
    /// Flag channel, 1..=3.
    pub channel: u8,
}

/// By-value copy of the current window contents. Two snapshots taken with no
/// intervening ingest compare equal.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct WindowSnapshot {
    pub samples: Vec<DerivedSample>,
    pub events: Vec<Event>,
}

/// Time-bounded buffer of recent samples and their derived channel values.
///
/// Pruning is anchored at the newest sample's timestamp, never at the wall
/// clock, so replayed data behaves identically to live data. Entries leave
/// from the old end only; the retained set always satisfies
/// `t >= newest - window_seconds`.
pub struct SampleWindow {
    samples: VecDeque<DerivedSample>,
    events: VecDeque<Event>,
    window_seconds: f64,
    previous_flags: [bool; 3],
}

impl SampleWindow {
    pub fn new(window_seconds: f64) -> Result<Self, RigError> {
        if window_seconds <= 0.0 {
            return Err(RigError::invalid_config(format!(
                "window must be positive, got {window_seconds}"
            )));
        }
        Ok(Self {
            samples: VecDeque::new(),
            events: VecDeque::new(),
            window_seconds,
            previous_flags: [false; 3],
        })
    }

    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    /// Change the retention span used by subsequent ingests. Already evicted
    /// data is gone; shrinking does not prune until the next ingest.
    pub fn set_window_seconds(&mut self, seconds: f64) -> Result<(), RigError> {
        if seconds <= 0.0 {
            return Err(RigError::invalid_config(format!(
                "window must be positive, got {seconds}"
            )));
        }
        self.window_seconds = seconds;
        Ok(())
    }

    /// Append a sample, record any flag rising edges, prune the window, and
    /// hand back the derived values for republication.
    pub fn ingest(&mut self, raw: &RawSample) -> DerivedSample {
        let derived = DerivedSample::from_raw(raw);
        for (i, (&now, &before)) in raw.flags.iter().zip(&self.previous_flags).enumerate() {
            if now && !before {
                self.events.push_back(Event {
                    timestamp: raw.timestamp,
                    channel: (i + 1) as u8,
                });
            }
        }
        self.previous_flags = raw.flags;
        self.samples.push_back(derived);

        let cutoff = raw.timestamp - self.window_seconds;
        while self.samples.front().is_some_and(|s| s.timestamp < cutoff) {
            self.samples.pop_front();
        }
        while self.events.front().is_some_and(|e| e.timestamp < cutoff) {
            self.events.pop_front();
        }
        derived
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            samples: self.samples.iter().copied().collect(),
            events: self.events.iter().copied().collect(),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(timestamp: f64, flags: [bool; 3]) -> RawSample {
        RawSample {
            timestamp,
            channels: [100, 200, 300, 400],
            flags,
            positions: [false; 3],
        }
    }

    #[test]
    fn rejects_non_positive_window() {
        assert!(SampleWindow::new(0.0).is_err());
        assert!(SampleWindow::new(-1.0).is_err());

        let mut w = SampleWindow::new(10.0).unwrap();
        let err = w.set_window_seconds(0.0).unwrap_err();
        assert!(matches!(err, RigError::InvalidConfiguration { .. }));
        // Prior value stays in force.
        assert_eq!(w.window_seconds(), 10.0);
    }

    #[test]
    fn prunes_relative_to_newest_sample() {
        let mut w = SampleWindow::new(10.0).unwrap();
        for t in 0..25 {
            w.ingest(&raw(t as f64, [false; 3]));
            let snap = w.snapshot();
            let newest = snap.samples.last().unwrap().timestamp;
            assert!(snap
                .samples
                .iter()
                .all(|s| s.timestamp >= newest - w.window_seconds()));
        }
        // 14.0 .. 24.0 inclusive survive the 10 s window.
        assert_eq!(w.snapshot().samples.len(), 11);
    }

    #[test]
    fn snapshot_is_idempotent_and_detached() {
        let mut w = SampleWindow::new(10.0).unwrap();
        w.ingest(&raw(1.0, [true, false, false]));
        w.ingest(&raw(2.0, [true, false, false]));
        let a = w.snapshot();
        let b = w.snapshot();
        assert_eq!(a, b);
        w.ingest(&raw(3.0, [false; 3]));
        // Earlier snapshots are unaffected by later ingests.
        assert_eq!(a.samples.len(), 2);
        assert_eq!(w.snapshot().samples.len(), 3);
    }

    #[test]
    fn shrinking_window_takes_effect_on_next_ingest() {
        let mut w = SampleWindow::new(10.0).unwrap();
        for t in 0..8 {
            w.ingest(&raw(t as f64, [false; 3]));
        }
        w.set_window_seconds(2.0).unwrap();
        // No retroactive prune.
        assert_eq!(w.snapshot().samples.len(), 8);
        w.ingest(&raw(8.0, [false; 3]));
        // 6.0, 7.0, 8.0 remain.
        assert_eq!(w.snapshot().samples.len(), 3);
    }

    #[test]
    fn events_record_rising_edges_only() {
        let mut w = SampleWindow::new(10.0).unwrap();
        w.ingest(&raw(1.0, [true, false, false]));
        w.ingest(&raw(2.0, [true, true, false])); // F1 held, F2 rises
        w.ingest(&raw(3.0, [false, true, false]));
        w.ingest(&raw(4.0, [true, true, false])); // F1 rises again
        let snap = w.snapshot();
        let got: Vec<(f64, u8)> = snap.events.iter().map(|e| (e.timestamp, e.channel)).collect();
        assert_eq!(got, vec![(1.0, 1), (2.0, 2), (4.0, 1)]);
    }

    #[test]
    fn events_are_pruned_with_the_window() {
        let mut w = SampleWindow::new(5.0).unwrap();
        w.ingest(&raw(0.0, [true, false, false]));
        w.ingest(&raw(10.0, [false, false, true]));
        let snap = w.snapshot();
        assert_eq!(snap.events.len(), 1);
        assert_eq!(snap.events[0].channel, 3);
    }

    #[test]
    fn derived_values_flow_through() {
        let mut w = SampleWindow::new(10.0).unwrap();
        let d = w.ingest(&RawSample {
            timestamp: 1.0,
            channels: [8192, 16384, 24576, 32767],
            flags: [false; 3],
            positions: [false; 3],
        });
        assert_eq!(d.voltages[0], 1.024);
        assert_eq!(d.resistances[0], 10.0);
        assert_eq!(w.snapshot().samples[0], d);
    }
}
