// src/recording/mod.rs

pub mod binary;
pub mod naming;
pub mod session;
pub mod sink;

pub use binary::convert_to_csv;
pub use session::{
    RecordedRow, RecordingSession, EDGE_RECORD_SECONDS, TRIGGER_COOLDOWN_SECONDS,
};
pub use sink::{BinarySink, CsvColumns, CsvSink, RecordSink, XlsxSink};
