//! The run loop: transport source → window → recording session → sink, with
//! fan-out republication of every derived reading.
//!
//! The window sits behind a mutex so a renderer or stats thread can snapshot
//! it while the loop ingests. Recording deadlines are polled against each
//! sample's timestamp; the loop itself never sleeps waiting for a session to
//! end, so message delivery is never starved by a recording.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::publish::FanOut;
use crate::recording::sink::RecordSink;
use crate::recording::RecordingSession;
use crate::sampling::payload::{wall_clock_millis, OutboundReading, RawPayload};
use crate::sampling::source::SampleSource;
use crate::sampling::window::SampleWindow;
use crate::sampling::RigError;

pub struct Bridge {
    window: Arc<Mutex<SampleWindow>>,
    session: RecordingSession,
    sink: Box<dyn RecordSink>,
    fanout: FanOut,
}

impl Bridge {
    pub fn new(window: Arc<Mutex<SampleWindow>>, sink: Box<dyn RecordSink>, fanout: FanOut) -> Self {
        Self {
            window,
            session: RecordingSession::new(),
            sink,
            fanout,
        }
    }

    /// Handle for consumers that snapshot the window from another thread.
    pub fn window(&self) -> Arc<Mutex<SampleWindow>> {
        Arc::clone(&self.window)
    }

    pub fn arm_recording(&mut self, now: f64, duration: Option<f64>) -> Result<bool, RigError> {
        self.expire_deadline(now);
        self.session.arm(now, duration)
    }

    /// Digital-input edge from an input collaborator; cooldown applies.
    pub fn edge_trigger(&mut self, now: f64) -> bool {
        self.expire_deadline(now);
        self.session.edge_trigger(now)
    }

    /// Explicit stop: flush whatever the session has captured.
    pub fn stop_recording(&mut self) {
        if self.session.is_armed() {
            self.finish_session("stopped");
        }
    }

    /// Drain the source until it is exhausted. A malformed message is logged
    /// and skipped; it never takes the loop down.
    pub fn run(&mut self, source: &mut dyn SampleSource) -> Result<()> {
        while let Some(payload) = source.next_payload().context("transport source failed")? {
            self.handle_message(payload.as_bytes());
        }
        if self.session.is_armed() {
            self.finish_session("transport closed");
        }
        Ok(())
    }

    pub fn handle_message(&mut self, bytes: &[u8]) {
        let payload = match RawPayload::parse(bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping message: {e}");
                return;
            }
        };
        let raw = payload.into_sample(wall_clock_millis());
        let derived = self.lock_window().ingest(&raw);

        self.expire_deadline(raw.timestamp);
        self.session.observe(&raw, &derived);

        self.fanout.publish_all(&OutboundReading::new(&raw, &derived));
    }

    /// A session whose deadline has passed is over even if no sample has
    /// arrived since; expire it before acting on `now`. Without this, a quiet
    /// transport would leave an elapsed session blocking the next trigger.
    fn expire_deadline(&mut self, now: f64) {
        if self.session.tick(now) {
            self.finish_session("duration elapsed");
        }
    }

    fn lock_window(&self) -> MutexGuard<'_, SampleWindow> {
        // A panic elsewhere must not wedge ingestion; the window holds no
        // invariant that survives half an ingest anyway.
        self.window.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn finish_session(&mut self, reason: &str) {
        self.session.disarm();
        let rows = self.session.rows();
        if rows.is_empty() {
            warn!("recording ended ({reason}) with no samples, nothing written");
            return;
        }
        match self.sink.write_session(rows) {
            Ok(path) => {
                info!(
                    "recording ended ({reason}): {} samples written to {}",
                    rows.len(),
                    path.display()
                );
                self.session.clear();
            }
            Err(e) => {
                error!(
                    "failed to flush {} samples to the {} sink, keeping them buffered: {e}",
                    rows.len(),
                    self.sink.kind()
                );
            }
        }
    }

    #[cfg(test)]
    fn buffered_rows(&self) -> usize {
        self.session.rows().len()
    }
}
