//! Vital sign decoders: heart rate, blood pressure / HRV, blood oxygen,
//! temperature / glucose and pressure index.

use crate::schema::{BloodPressurePayload, BodyIndexPayload, ComprehensivePayload};
use crate::types::{BloodPressureReading, DecodedMetric};

use super::{HRV_MAX, SENTINEL_NO_READING};

/// Heart rate is valid when non-zero
pub fn heart_rate(value: u8) -> Option<DecodedMetric> {
    (value > 0).then_some(DecodedMetric::HeartRate(value))
}

/// Blood pressure report.
///
/// A usable HRV value in (0, 150] takes priority: only HRV is emitted for that
/// report, whatever the pressure fields contain.
pub fn blood_pressure(payload: &BloodPressurePayload) -> Option<DecodedMetric> {
    if let Some(hrv) = payload.hrv.filter(|v| *v > 0 && *v <= HRV_MAX) {
        return Some(DecodedMetric::Hrv(hrv));
    }

    let valid = payload.heart_rate >= 0
        && payload.systolic_blood_pressure >= 0
        && payload.diastolic_blood_pressure >= 0
        && payload.systolic_blood_pressure >= payload.diastolic_blood_pressure;

    valid.then(|| {
        DecodedMetric::BloodPressure(BloodPressureReading {
            heart_rate: payload.heart_rate,
            systolic_blood_pressure: payload.systolic_blood_pressure,
            diastolic_blood_pressure: payload.diastolic_blood_pressure,
        })
    })
}

/// Blood oxygen is valid when non-zero
pub fn blood_oxygen(value: u8) -> Option<DecodedMetric> {
    (value > 0).then_some(DecodedMetric::BloodOxygen(value))
}

/// Comprehensive report: glucose first, temperature otherwise.
///
/// Glucose is reported when it is neither zero nor the sentinel. Otherwise
/// temperature is rendered with one decimal place and dropped when the digit
/// after the point reads as the sentinel. Decimal formatting cannot produce
/// that digit, so in practice only a non-finite temperature is dropped here.
pub fn comprehensive(payload: &ComprehensivePayload) -> Option<DecodedMetric> {
    let glucose = payload.blood_glucose.to_string();
    if !glucose.is_empty()
        && payload.blood_glucose != 0
        && payload.blood_glucose != SENTINEL_NO_READING
    {
        return Some(DecodedMetric::BloodGlucose(glucose));
    }

    let formatted = format!("{:.1}", payload.temperature);
    let (_, fraction) = formatted.rsplit_once('.')?;
    let digit: i32 = fraction.parse().ok()?;
    if digit == SENTINEL_NO_READING {
        return None;
    }

    Some(DecodedMetric::Temperature(formatted))
}

/// Pressure index is valid when present and positive
pub fn body_index(payload: &BodyIndexPayload) -> Option<DecodedMetric> {
    payload
        .pressure_index
        .filter(|v| *v > 0.0)
        .map(DecodedMetric::PressureIndex)
}
