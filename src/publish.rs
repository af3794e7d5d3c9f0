//! Best-effort fan-out of derived readings to downstream consumers.
//!
//! Each destination gets every reading; a destination that errors is logged
//! and skipped for that reading, the rest still receive it. No retries and no
//! buffering: downstream consumers that care about gaps must handle them.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use log::warn;

use crate::sampling::error::RigError;
use crate::sampling::payload::OutboundReading;

pub trait ReadingPublisher {
    /// Identifier used in log lines when this destination misbehaves.
    fn name(&self) -> &str;

    fn publish(&mut self, reading: &OutboundReading) -> Result<(), RigError>;
}

/// Writes one JSON object per line to any `Write` destination.
pub struct JsonLinePublisher<W: Write> {
    name: String,
    writer: W,
}

impl<W: Write> JsonLinePublisher<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }
}

impl<W: Write> ReadingPublisher for JsonLinePublisher<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&mut self, reading: &OutboundReading) -> Result<(), RigError> {
        serde_json::to_writer(&mut self.writer, reading)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn stdout_publisher() -> JsonLinePublisher<io::Stdout> {
    JsonLinePublisher::new("stdout", io::stdout())
}

pub fn file_publisher(path: &Path) -> Result<JsonLinePublisher<std::fs::File>, RigError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(JsonLinePublisher::new(path.display().to_string(), file))
}

/// All configured destinations. Empty fan-out is fine; publishing then does
/// nothing.
#[derive(Default)]
pub struct FanOut {
    destinations: Vec<Box<dyn ReadingPublisher>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, destination: Box<dyn ReadingPublisher>) {
        self.destinations.push(destination);
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Publish to every destination; returns how many accepted the reading.
    pub fn publish_all(&mut self, reading: &OutboundReading) -> usize {
        let mut delivered = 0;
        for destination in &mut self.destinations {
            match destination.publish(reading) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("publish to {} failed: {e}", destination.name()),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn reading() -> OutboundReading {
        OutboundReading {
            timestamp: 1.0,
            c1: 1,
            c2: 2,
            c3: 3,
            c4: 4,
            f1: 0,
            f2: 0,
            f3: 1,
            p1: 0,
            p2: 0,
            p3: 0,
            r1: 0.5,
            r2: 0.5,
            r3: 0.5,
        }
    }

    /// Shared in-memory destination for asserting on published bytes.
    struct MemoryPublisher {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl ReadingPublisher for MemoryPublisher {
        fn name(&self) -> &str {
            "memory"
        }

        fn publish(&mut self, reading: &OutboundReading) -> Result<(), RigError> {
            let mut lines = self.lines.lock().unwrap();
            lines.push(serde_json::to_string(reading)?);
            Ok(())
        }
    }

    struct FailingPublisher;

    impl ReadingPublisher for FailingPublisher {
        fn name(&self) -> &str {
            "flaky"
        }

        fn publish(&mut self, _reading: &OutboundReading) -> Result<(), RigError> {
            Err(RigError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "destination down",
            )))
        }
    }

    #[test]
    fn json_line_publisher_emits_one_line_per_reading() {
        let mut buffer = Vec::new();
        {
            let mut publisher = JsonLinePublisher::new("buffer", &mut buffer);
            publisher.publish(&reading()).unwrap();
            publisher.publish(&reading()).unwrap();
        }
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["C1"], 1);
        assert_eq!(value["F3"], 1);
        assert_eq!(value["R2"], 0.5);
    }

    #[test]
    fn failing_destination_does_not_block_the_others() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut fanout = FanOut::new();
        fanout.add(Box::new(FailingPublisher));
        fanout.add(Box::new(MemoryPublisher {
            lines: Arc::clone(&lines),
        }));

        assert_eq!(fanout.publish_all(&reading()), 1);
        assert_eq!(fanout.publish_all(&reading()), 1);
        assert_eq!(lines.lock().unwrap().len(), 2);
    }

    #[test]
    fn empty_fanout_is_harmless() {
        let mut fanout = FanOut::new();
        assert!(fanout.is_empty());
        assert_eq!(fanout.publish_all(&reading()), 0);
    }
}
