// src/sampling/mod.rs

pub mod calib;
pub mod error;
pub mod payload;
pub mod source;
pub mod window;

pub use calib::{DerivedSample, RawSample, ADC_MAX, MIN_REFERENCE_CURRENT, VREF};
pub use error::RigError;
pub use payload::{wall_clock_millis, OutboundReading, RawPayload};
pub use source::{JsonLineSource, ManualSource, SampleSource, SimulatedSource};
pub use window::{Event, SampleWindow, WindowSnapshot, DEFAULT_WINDOW_SECONDS};
