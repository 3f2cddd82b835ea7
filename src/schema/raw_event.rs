//! Raw tagged device reports
//!
//! A device callback delivers one report object whose keys name the report
//! kind and whose values are opaque payloads. This module defines the closed
//! tag set, the event envelope, and the typed payload shapes each tag decodes
//! into. Shape checking happens exactly once, in [`ReportPayload::decode`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

/// Reserved envelope key carrying the receive timestamp
pub const RECEIVED_AT_KEY: &str = "receivedAt";

/// Report kinds a device can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportTag {
    #[serde(rename = "heartRate")]
    HeartRate,
    #[serde(rename = "bloodPressure")]
    BloodPressure,
    #[serde(rename = "bloodOxygen")]
    BloodOxygen,
    /// Temperature and blood glucose
    #[serde(rename = "comprehensiveData")]
    Comprehensive,
    /// Pressure (stress) index
    #[serde(rename = "bodyIndexData")]
    BodyIndex,
    #[serde(rename = "step")]
    Step,
    /// Real-time monitoring mode (sport session)
    #[serde(rename = "realTimeMonitoringMode")]
    SportSession,
    #[serde(rename = "ppg")]
    Ppg,
    #[serde(rename = "ecg")]
    Ecg,
    /// Multi-axis motion sensor (accelerometer)
    #[serde(rename = "nAxisSensor")]
    Motion,
    #[serde(rename = "multiChannelPPG")]
    MultiChannelPpg,
    #[serde(rename = "audioState")]
    AudioState,
    #[serde(rename = "audioResult")]
    AudioResult,
}

impl ReportTag {
    /// First-match-wins order used by the dispatcher. Audio relay comes last.
    pub const PRIORITY: [ReportTag; 13] = [
        ReportTag::HeartRate,
        ReportTag::BloodPressure,
        ReportTag::BloodOxygen,
        ReportTag::Comprehensive,
        ReportTag::BodyIndex,
        ReportTag::Step,
        ReportTag::SportSession,
        ReportTag::Ppg,
        ReportTag::Ecg,
        ReportTag::Motion,
        ReportTag::MultiChannelPpg,
        ReportTag::AudioState,
        ReportTag::AudioResult,
    ];

    /// Key used by the device SDK for this report kind
    pub fn wire_key(&self) -> &'static str {
        match self {
            ReportTag::HeartRate => "heartRate",
            ReportTag::BloodPressure => "bloodPressure",
            ReportTag::BloodOxygen => "bloodOxygen",
            ReportTag::Comprehensive => "comprehensiveData",
            ReportTag::BodyIndex => "bodyIndexData",
            ReportTag::Step => "step",
            ReportTag::SportSession => "realTimeMonitoringMode",
            ReportTag::Ppg => "ppg",
            ReportTag::Ecg => "ecg",
            ReportTag::Motion => "nAxisSensor",
            ReportTag::MultiChannelPpg => "multiChannelPPG",
            ReportTag::AudioState => "audioState",
            ReportTag::AudioResult => "audioResult",
        }
    }

    pub fn from_wire_key(key: &str) -> Option<Self> {
        Self::PRIORITY.iter().copied().find(|tag| tag.wire_key() == key)
    }

    /// Position in [`ReportTag::PRIORITY`] (0 is highest)
    pub fn priority(&self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|tag| tag == self)
            .unwrap_or(Self::PRIORITY.len())
    }

    /// Audio reports are relayed untouched and never reach a metric decoder
    pub fn is_audio(&self) -> bool {
        matches!(self, ReportTag::AudioState | ReportTag::AudioResult)
    }

    /// Human-readable payload shape, used by the CLI schema listing
    pub fn payload_shape(&self) -> &'static str {
        match self {
            ReportTag::HeartRate | ReportTag::BloodOxygen => "u8",
            ReportTag::BloodPressure => {
                "{heartRate, systolicBloodPressure, diastolicBloodPressure, hrv?}"
            }
            ReportTag::Comprehensive => "{temperature: f64, bloodGlucose: i32}",
            ReportTag::BodyIndex => "{pressureIndex?: f64}",
            ReportTag::Step => "{distance, step, calories}",
            ReportTag::SportSession => {
                "{startTimeStamp, heartRate, modeStep, modeCalories, modeDistance, ppi, vo2max}"
            }
            ReportTag::Ppg | ReportTag::Ecg | ReportTag::Motion => "[i32]",
            ReportTag::MultiChannelPpg => {
                "{compositeData, greenData, irData, redData: [i32], compositeType}"
            }
            ReportTag::AudioState => "{state?}",
            ReportTag::AudioResult => {
                "{text?, wavFilePath?, opusFilePath?, isDeviceInitiated?, error?}"
            }
        }
    }
}

/// Blood pressure report, optionally carrying HRV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodPressurePayload {
    pub heart_rate: i32,
    pub systolic_blood_pressure: i32,
    pub diastolic_blood_pressure: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrv: Option<i32>,
}

/// Comprehensive report: body temperature and blood glucose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensivePayload {
    pub temperature: f64,
    pub blood_glucose: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyIndexPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_index: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPayload {
    pub distance: u32,
    pub step: u32,
    pub calories: u32,
}

/// Real-time monitoring mode snapshot. Counters arrive as floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringModePayload {
    pub start_time_stamp: i64,
    pub heart_rate: u32,
    pub mode_step: f64,
    pub mode_calories: f64,
    pub mode_distance: f64,
    pub ppi: f64,
    pub vo2max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiChannelPpgPayload {
    pub composite_data: Vec<i32>,
    pub green_data: Vec<i32>,
    pub ir_data: Vec<i32>,
    pub red_data: Vec<i32>,
    pub composite_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioStatePayload {
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioResultPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub wav_file_path: Option<String>,
    #[serde(default)]
    pub opus_file_path: Option<String>,
    #[serde(default)]
    pub is_device_initiated: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Typed payload shapes, one per report tag
#[derive(Debug, Clone, PartialEq)]
pub enum ReportPayload {
    HeartRate(u8),
    BloodPressure(BloodPressurePayload),
    BloodOxygen(u8),
    Comprehensive(ComprehensivePayload),
    BodyIndex(BodyIndexPayload),
    Step(StepPayload),
    SportSession(MonitoringModePayload),
    Ppg(Vec<i32>),
    Ecg(Vec<i32>),
    Motion(Vec<i32>),
    MultiChannelPpg(MultiChannelPpgPayload),
    AudioState(AudioStatePayload),
    AudioResult(AudioResultPayload),
}

impl ReportPayload {
    /// Decode an opaque payload into the shape its tag requires.
    ///
    /// Returns `None` when the payload has the wrong shape (wrong JSON type,
    /// missing field, integer out of range for the field).
    pub fn decode(tag: ReportTag, value: &Value) -> Option<Self> {
        let payload = match tag {
            ReportTag::HeartRate => ReportPayload::HeartRate(shape(value)?),
            ReportTag::BloodPressure => ReportPayload::BloodPressure(shape(value)?),
            ReportTag::BloodOxygen => ReportPayload::BloodOxygen(shape(value)?),
            ReportTag::Comprehensive => ReportPayload::Comprehensive(shape(value)?),
            ReportTag::BodyIndex => ReportPayload::BodyIndex(shape(value)?),
            ReportTag::Step => ReportPayload::Step(shape(value)?),
            ReportTag::SportSession => ReportPayload::SportSession(shape(value)?),
            ReportTag::Ppg => ReportPayload::Ppg(shape(value)?),
            ReportTag::Ecg => ReportPayload::Ecg(shape(value)?),
            ReportTag::Motion => ReportPayload::Motion(shape(value)?),
            ReportTag::MultiChannelPpg => ReportPayload::MultiChannelPpg(shape(value)?),
            ReportTag::AudioState => ReportPayload::AudioState(shape(value)?),
            ReportTag::AudioResult => ReportPayload::AudioResult(shape(value)?),
        };
        Some(payload)
    }

    pub fn tag(&self) -> ReportTag {
        match self {
            ReportPayload::HeartRate(_) => ReportTag::HeartRate,
            ReportPayload::BloodPressure(_) => ReportTag::BloodPressure,
            ReportPayload::BloodOxygen(_) => ReportTag::BloodOxygen,
            ReportPayload::Comprehensive(_) => ReportTag::Comprehensive,
            ReportPayload::BodyIndex(_) => ReportTag::BodyIndex,
            ReportPayload::Step(_) => ReportTag::Step,
            ReportPayload::SportSession(_) => ReportTag::SportSession,
            ReportPayload::Ppg(_) => ReportTag::Ppg,
            ReportPayload::Ecg(_) => ReportTag::Ecg,
            ReportPayload::Motion(_) => ReportTag::Motion,
            ReportPayload::MultiChannelPpg(_) => ReportTag::MultiChannelPpg,
            ReportPayload::AudioState(_) => ReportTag::AudioState,
            ReportPayload::AudioResult(_) => ReportTag::AudioResult,
        }
    }
}

fn shape<T: DeserializeOwned>(value: &Value) -> Option<T> {
    T::deserialize(value).ok()
}

/// One tagged entry of a raw event
#[derive(Debug, Clone, PartialEq)]
pub struct RawReport {
    pub tag: ReportTag,
    pub payload: Value,
}

/// One device notification as delivered by the connection layer
#[derive(Debug, Clone, PartialEq)]
pub struct RawTelemetryEvent {
    /// When the host received the notification (UTC)
    pub received_at: DateTime<Utc>,
    reports: Vec<RawReport>,
}

impl Default for RawTelemetryEvent {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl RawTelemetryEvent {
    /// Create an empty event received at `received_at`
    pub fn new(received_at: DateTime<Utc>) -> Self {
        Self {
            received_at,
            reports: Vec::new(),
        }
    }

    /// Attach an opaque payload under `tag`, replacing any previous entry
    pub fn with_report(mut self, tag: ReportTag, payload: Value) -> Self {
        self.reports.retain(|r| r.tag != tag);
        self.reports.push(RawReport { tag, payload });
        self
    }

    /// Parse an event from a JSON object keyed by wire keys.
    ///
    /// Unknown keys are skipped. `receivedAt` (RFC 3339) is optional and
    /// defaults to the current time.
    pub fn from_json(json: &str) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RelayError> {
        let Value::Object(map) = value else {
            return Err(RelayError::ParseError(
                "raw event must be a JSON object".to_string(),
            ));
        };

        let mut event = RawTelemetryEvent::default();
        for (key, payload) in map {
            if key == RECEIVED_AT_KEY {
                event.received_at = serde_json::from_value(payload).map_err(|e| {
                    RelayError::ParseError(format!("Invalid {}: {}", RECEIVED_AT_KEY, e))
                })?;
                continue;
            }
            match ReportTag::from_wire_key(&key) {
                Some(tag) => event = event.with_report(tag, payload),
                None => tracing::trace!(key = %key, "ignoring unrecognized report key"),
            }
        }
        Ok(event)
    }

    /// Opaque payload for `tag`, if present
    pub fn payload(&self, tag: ReportTag) -> Option<&Value> {
        self.reports
            .iter()
            .find(|r| r.tag == tag)
            .map(|r| &r.payload)
    }

    pub fn reports(&self) -> &[RawReport] {
        &self.reports
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Tags present in this event, in dispatch priority order
    pub fn tags_by_priority(&self) -> impl Iterator<Item = ReportTag> + '_ {
        ReportTag::PRIORITY
            .iter()
            .copied()
            .filter(move |tag| self.payload(*tag).is_some())
    }
}
