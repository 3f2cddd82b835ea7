//! Decoded metric records
//!
//! This module defines what leaves the relay: the validated metric variants
//! produced by the decoders and the fixed set of outbound event keys the UI
//! layer subscribes to.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::motion::{AxisLayout, AxisSample};
use crate::schema::ReportTag;

/// Key/value record handed to the UI layer
pub type SinkRecord = Map<String, Value>;

/// Outbound event keys understood by the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKey {
    #[serde(rename = "deviceRealHeartRate")]
    HeartRate,
    #[serde(rename = "deviceRealBloodPressure")]
    BloodPressure,
    #[serde(rename = "deviceRealHRV")]
    Hrv,
    #[serde(rename = "deviceRealBloodOxygen")]
    BloodOxygen,
    #[serde(rename = "deviceRealBloodGlucose")]
    BloodGlucose,
    #[serde(rename = "deviceRealTemperature")]
    Temperature,
    #[serde(rename = "deviceRealPressure")]
    Pressure,
    #[serde(rename = "deviceRealStep")]
    Step,
    #[serde(rename = "deviceRealSport")]
    Sport,
    #[serde(rename = "deviceRealPPGData")]
    PpgData,
    #[serde(rename = "deviceRealECGData")]
    EcgData,
    #[serde(rename = "deviceRealECGFilteredData")]
    EcgFilteredData,
    #[serde(rename = "deviceRealACCData")]
    AccData,
    #[serde(rename = "deviceRealACCFilteredData")]
    AccFilteredData,
    #[serde(rename = "deviceMultiChannelPPGData")]
    MultiChannelPpgData,
    #[serde(rename = "deviceJLAudioState")]
    AudioState,
    #[serde(rename = "deviceJLAudioComplete")]
    AudioComplete,
}

impl EventKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKey::HeartRate => "deviceRealHeartRate",
            EventKey::BloodPressure => "deviceRealBloodPressure",
            EventKey::Hrv => "deviceRealHRV",
            EventKey::BloodOxygen => "deviceRealBloodOxygen",
            EventKey::BloodGlucose => "deviceRealBloodGlucose",
            EventKey::Temperature => "deviceRealTemperature",
            EventKey::Pressure => "deviceRealPressure",
            EventKey::Step => "deviceRealStep",
            EventKey::Sport => "deviceRealSport",
            EventKey::PpgData => "deviceRealPPGData",
            EventKey::EcgData => "deviceRealECGData",
            EventKey::EcgFilteredData => "deviceRealECGFilteredData",
            EventKey::AccData => "deviceRealACCData",
            EventKey::AccFilteredData => "deviceRealACCFilteredData",
            EventKey::MultiChannelPpgData => "deviceMultiChannelPPGData",
            EventKey::AudioState => "deviceJLAudioState",
            EventKey::AudioComplete => "deviceJLAudioComplete",
        }
    }

    /// Keys a report of kind `tag` can produce
    pub fn for_tag(tag: ReportTag) -> &'static [EventKey] {
        match tag {
            ReportTag::HeartRate => &[EventKey::HeartRate],
            ReportTag::BloodPressure => &[EventKey::Hrv, EventKey::BloodPressure],
            ReportTag::BloodOxygen => &[EventKey::BloodOxygen],
            ReportTag::Comprehensive => &[EventKey::BloodGlucose, EventKey::Temperature],
            ReportTag::BodyIndex => &[EventKey::Pressure],
            ReportTag::Step => &[EventKey::Step],
            ReportTag::SportSession => &[EventKey::Sport],
            ReportTag::Ppg => &[EventKey::PpgData],
            ReportTag::Ecg => &[EventKey::EcgData, EventKey::EcgFilteredData],
            ReportTag::Motion => &[EventKey::AccData, EventKey::AccFilteredData],
            ReportTag::MultiChannelPpg => &[EventKey::MultiChannelPpgData],
            ReportTag::AudioState => &[EventKey::AudioState],
            ReportTag::AudioResult => &[EventKey::AudioComplete],
        }
    }
}

/// Blood pressure reading (systolic >= diastolic, all fields >= 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodPressureReading {
    pub heart_rate: i32,
    pub systolic_blood_pressure: i32,
    pub diastolic_blood_pressure: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReading {
    pub distance: u32,
    pub step: u32,
    pub calories: u32,
}

/// Real-time sport session snapshot, passed through unvalidated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportSessionReading {
    /// Session start timestamp as reported by the device
    pub time: i64,
    pub heart_rate: u32,
    pub distance: i64,
    pub step: i64,
    pub calories: i64,
    pub ppi: i64,
    pub vo2max: i64,
}

/// Decoded accelerometer stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionReading {
    pub samples: Vec<AxisSample>,
    pub layout: AxisLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiChannelPpgReading {
    pub composite: Vec<i32>,
    pub green: Vec<i32>,
    pub ir: Vec<i32>,
    pub red: Vec<i32>,
    pub sample_type: i32,
}

/// Completed on-device voice recording, relayed as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioResultReading {
    pub text: String,
    pub wav_file_path: String,
    pub opus_file_path: String,
    pub is_device_initiated: bool,
    pub error: String,
}

/// One validated record, ready for the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DecodedMetric {
    HeartRate(u8),
    BloodPressure(BloodPressureReading),
    /// Heart rate variability in (0, 150]
    Hrv(i32),
    BloodOxygen(u8),
    BloodGlucose(String),
    /// One decimal place, e.g. "36.5"
    Temperature(String),
    PressureIndex(f64),
    Step(StepReading),
    SportSession(SportSessionReading),
    RawPpg(Vec<i32>),
    /// `filtered.len()` follows the filter's modulo-3 phase: `ceil(raw.len() / 3)`
    /// on a fresh filter, not `raw.len()`
    Ecg { raw: Vec<i32>, filtered: Vec<f32> },
    Motion(MotionReading),
    MultiChannelPpg(MultiChannelPpgReading),
    AudioState(String),
    AudioResult(AudioResultReading),
}

impl DecodedMetric {
    /// The key that identifies this record on the outbound channel
    pub fn event_key(&self) -> EventKey {
        match self {
            DecodedMetric::HeartRate(_) => EventKey::HeartRate,
            DecodedMetric::BloodPressure(_) => EventKey::BloodPressure,
            DecodedMetric::Hrv(_) => EventKey::Hrv,
            DecodedMetric::BloodOxygen(_) => EventKey::BloodOxygen,
            DecodedMetric::BloodGlucose(_) => EventKey::BloodGlucose,
            DecodedMetric::Temperature(_) => EventKey::Temperature,
            DecodedMetric::PressureIndex(_) => EventKey::Pressure,
            DecodedMetric::Step(_) => EventKey::Step,
            DecodedMetric::SportSession(_) => EventKey::Sport,
            DecodedMetric::RawPpg(_) => EventKey::PpgData,
            DecodedMetric::Ecg { .. } => EventKey::EcgData,
            DecodedMetric::Motion(_) => EventKey::AccData,
            DecodedMetric::MultiChannelPpg(_) => EventKey::MultiChannelPpgData,
            DecodedMetric::AudioState(_) => EventKey::AudioState,
            DecodedMetric::AudioResult(_) => EventKey::AudioComplete,
        }
    }

    /// Render the outbound key/value record.
    ///
    /// ECG carries its raw and filtered streams under two keys, and motion
    /// repeats the same `{data, type}` object under both ACC keys.
    pub fn to_record(&self) -> SinkRecord {
        let mut record = SinkRecord::new();
        let mut put = |key: EventKey, value: Value| {
            record.insert(key.as_str().to_string(), value);
        };

        match self {
            DecodedMetric::HeartRate(v) | DecodedMetric::BloodOxygen(v) => {
                put(self.event_key(), json!(v))
            }
            DecodedMetric::BloodPressure(reading) => put(self.event_key(), json!(reading)),
            DecodedMetric::Hrv(v) => put(self.event_key(), json!(v)),
            DecodedMetric::BloodGlucose(s) | DecodedMetric::Temperature(s) => {
                put(self.event_key(), json!(s))
            }
            DecodedMetric::PressureIndex(v) => put(self.event_key(), json!(v)),
            DecodedMetric::Step(reading) => put(self.event_key(), json!(reading)),
            DecodedMetric::SportSession(reading) => put(self.event_key(), json!(reading)),
            DecodedMetric::RawPpg(samples) => put(self.event_key(), json!(samples)),
            DecodedMetric::Ecg { raw, filtered } => {
                put(EventKey::EcgData, json!(raw));
                put(EventKey::EcgFilteredData, json!(filtered));
            }
            DecodedMetric::Motion(reading) => {
                let data = json!({
                    "data": reading.samples,
                    "type": reading.layout.code(),
                });
                put(EventKey::AccData, data.clone());
                put(EventKey::AccFilteredData, data);
            }
            DecodedMetric::MultiChannelPpg(reading) => put(
                self.event_key(),
                json!({
                    "data": reading.composite,
                    "green": reading.green,
                    "ir": reading.ir,
                    "red": reading.red,
                    "sampleType": reading.sample_type,
                }),
            ),
            DecodedMetric::AudioState(state) => {
                put(self.event_key(), json!({ "state": state }))
            }
            DecodedMetric::AudioResult(result) => {
                put(self.event_key(), json!({ "resultDict": result }))
            }
        }

        record
    }
}
