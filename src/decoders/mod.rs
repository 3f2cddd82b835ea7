//! Report decoders
//!
//! One pure function per report kind, mapping a typed payload to at most one
//! validated [`DecodedMetric`]. A payload that fails its validity check (or
//! carries the no-reading sentinel) decodes to `None`; that is the expected
//! outcome for a large share of device reports, not an error.
//!
//! The ECG decoder is the only one that touches state, and only through the
//! [`EcgFilter`] handed in by the caller.

mod activity;
mod vitals;
mod waveform;

pub use activity::{sport_session, step};
pub use vitals::{blood_oxygen, blood_pressure, body_index, comprehensive, heart_rate};
pub use waveform::{ecg, motion, multi_channel_ppg, raw_ppg};

use crate::ecg::EcgFilter;
use crate::schema::ReportPayload;
use crate::types::DecodedMetric;

/// Reserved device value meaning "no reading" (glucose and temperature digit)
pub const SENTINEL_NO_READING: i32 = 0x0F;

/// Upper bound (inclusive) for a reportable HRV value
pub const HRV_MAX: i32 = 150;

/// Decode one typed payload.
///
/// Audio payloads are not metrics and always decode to `None` here; the
/// dispatcher relays them separately.
pub fn decode(payload: &ReportPayload, ecg_filter: &mut EcgFilter) -> Option<DecodedMetric> {
    match payload {
        ReportPayload::HeartRate(v) => heart_rate(*v),
        ReportPayload::BloodPressure(p) => blood_pressure(p),
        ReportPayload::BloodOxygen(v) => blood_oxygen(*v),
        ReportPayload::Comprehensive(p) => comprehensive(p),
        ReportPayload::BodyIndex(p) => body_index(p),
        ReportPayload::Step(p) => step(p),
        ReportPayload::SportSession(p) => sport_session(p),
        ReportPayload::Ppg(samples) => raw_ppg(samples),
        ReportPayload::Ecg(samples) => ecg(samples, ecg_filter),
        ReportPayload::Motion(samples) => motion(samples),
        ReportPayload::MultiChannelPpg(p) => multi_channel_ppg(p),
        ReportPayload::AudioState(_) | ReportPayload::AudioResult(_) => None,
    }
}
