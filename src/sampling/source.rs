//! Pull-based message sources feeding the bridge.
//!
//! The transport proper (an MQTT subscriber in the deployed rig) stays outside
//! this crate; whatever delivers messages only has to speak `SampleSource`.
//! `JsonLineSource` covers the common wiring of piping a subscriber's output
//! into stdin, `ManualSource` gives tests deterministic playback, and
//! `SimulatedSource` fabricates rig traffic for bench runs without hardware.

use std::collections::VecDeque;
use std::io::BufRead;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::sampling::error::RigError;
use crate::sampling::payload::wall_clock_millis;

/// Something that can yield raw message payloads on demand. `Ok(None)` means
/// the source is exhausted and the bridge should wind down.
pub trait SampleSource {
    fn next_payload(&mut self) -> Result<Option<String>, RigError>;
}

/// In-memory source for deterministic tests.
pub struct ManualSource {
    queue: VecDeque<String>,
}

impl ManualSource {
    pub fn new(payloads: impl IntoIterator<Item = String>) -> Self {
        Self {
            queue: payloads.into_iter().collect(),
        }
    }
}

impl SampleSource for ManualSource {
    fn next_payload(&mut self) -> Result<Option<String>, RigError> {
        Ok(self.queue.pop_front())
    }
}

/// Reads newline-delimited JSON from any `BufRead`; blank lines are skipped.
pub struct JsonLineSource<R: BufRead> {
    reader: R,
}

impl<R: BufRead> JsonLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> SampleSource for JsonLineSource<R> {
    fn next_payload(&mut self) -> Result<Option<String>, RigError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }
}

/// Fabricates plausible rig traffic: a slowly breathing ladder with occasional
/// photo-interrupter pulses, stamped and encoded exactly like the real sender.
pub struct SimulatedSource {
    period_millis: f64,
    next_millis: f64,
    phase: f64,
    rng: StdRng,
    paced: bool,
}

impl SimulatedSource {
    pub fn new(rate_hz: f64) -> Result<Self, RigError> {
        let mut s = Self::seeded(rate_hz, rand::random())?;
        s.paced = true;
        Ok(s)
    }

    /// Unpaced, reproducible variant for tests.
    pub fn seeded(rate_hz: f64, seed: u64) -> Result<Self, RigError> {
        if rate_hz <= 0.0 {
            return Err(RigError::invalid_config(format!(
                "sample rate must be positive, got {rate_hz}"
            )));
        }
        Ok(Self {
            period_millis: 1000.0 / rate_hz,
            next_millis: wall_clock_millis(),
            phase: 0.0,
            rng: StdRng::seed_from_u64(seed),
            paced: false,
        })
    }
}

impl SampleSource for SimulatedSource {
    fn next_payload(&mut self) -> Result<Option<String>, RigError> {
        if self.paced {
            thread::sleep(Duration::from_millis(self.period_millis as u64));
        }
        self.phase += 0.05;
        let timestamp = self.next_millis;
        self.next_millis += self.period_millis;

        // Reference tap around 1 V with drift, each ladder segment adding a
        // comparable step plus converter noise.
        let base = 7000.0 + 400.0 * self.phase.sin();
        let mut channels = [0i32; 4];
        let mut level = base;
        for c in channels.iter_mut() {
            level += self.rng.gen_range(-40.0..40.0);
            *c = level as i32;
            level += base;
        }
        let pulse = |rng: &mut StdRng| rng.gen_bool(0.02);
        let payload = serde_json::json!({
            "timestamp": timestamp,
            "C1": channels[0],
            "C2": channels[1],
            "C3": channels[2],
            "C4": channels[3],
            "F1": pulse(&mut self.rng),
            "F2": pulse(&mut self.rng),
            "F3": pulse(&mut self.rng),
        });
        Ok(Some(payload.to_string()))
    }
}
