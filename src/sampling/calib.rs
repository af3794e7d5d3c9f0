//! ADC calibration and the ladder resistance calculation.
//!
//! The rig drives a 3-segment resistive ladder from channel 1 and samples the
//! four tap voltages with a signed 16-bit ADC. Per sample:
//!
//! - `voltage = raw / ADC_MAX * VREF`
//! - `reference_current = v1 / 10.0`, substituted with `1e-6` outright when
//!   `|v1| <= 1e-6` so a quiescent reference channel never blows up the
//!   division (the substitute is the positive constant, not a sign-preserving
//!   clamp).
//! - `r[i] = (v[i+1] - v[i]) / reference_current`

/// ADC reference voltage (volts).
pub const VREF: f64 = 4.096;

/// Full-scale ADC count (signed 16-bit converter).
pub const ADC_MAX: f64 = 32768.0;

/// Substitute reference current when channel 1 is effectively zero (amps).
pub const MIN_REFERENCE_CURRENT: f64 = 1e-6;

/// Convert a raw ADC count to volts. The raw value itself is never clamped.
pub fn raw_to_voltage(raw: i32) -> f64 {
    raw as f64 / ADC_MAX * VREF
}

/// Reference current through the ladder, derived from the channel-1 voltage.
pub fn reference_current(v1: f64) -> f64 {
    if v1.abs() > MIN_REFERENCE_CURRENT {
        v1 / 10.0
    } else {
        MIN_REFERENCE_CURRENT
    }
}

/// One raw sample as delivered by the rig, timestamped in epoch seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawSample {
    pub timestamp: f64,
    pub channels: [i32; 4],
    /// Photo-interrupter flags F1..F3.
    pub flags: [bool; 3],
    /// Position flags P1..P3.
    pub positions: [bool; 3],
}

/// Derived per-sample values: tap voltages and ladder segment resistances.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedSample {
    pub timestamp: f64,
    pub voltages: [f64; 4],
    pub reference_current: f64,
    pub resistances: [f64; 3],
}

impl DerivedSample {
    pub fn from_raw(raw: &RawSample) -> Self {
        let voltages = raw.channels.map(raw_to_voltage);
        let i_ref = reference_current(voltages[0]);
        let resistances = [
            (voltages[1] - voltages[0]) / i_ref,
            (voltages[2] - voltages[1]) / i_ref,
            (voltages[3] - voltages[2]) / i_ref,
        ];
        Self {
            timestamp: raw.timestamp,
            voltages,
            reference_current: i_ref,
            resistances,
        }
    }
}
