//! Device voice-recording relay
//!
//! Audio state changes and recording results are not metrics. They are
//! forwarded as-is, with the device's placeholder text for missing fields,
//! and never touch decoder state.

use crate::schema::ReportPayload;
use crate::types::{AudioResultReading, DecodedMetric};

pub const UNKNOWN_STATE: &str = "unknown";
pub const NO_RESULT_TEXT: &str = "no result";
pub const NO_FILE_PATH: &str = "none";

/// Relay an audio payload; `None` for every non-audio payload
pub fn relay(payload: &ReportPayload) -> Option<DecodedMetric> {
    match payload {
        ReportPayload::AudioState(p) => Some(DecodedMetric::AudioState(
            p.state.clone().unwrap_or_else(|| UNKNOWN_STATE.to_string()),
        )),
        ReportPayload::AudioResult(p) => Some(DecodedMetric::AudioResult(AudioResultReading {
            text: p.text.clone().unwrap_or_else(|| NO_RESULT_TEXT.to_string()),
            wav_file_path: p.wav_file_path.clone().unwrap_or_else(|| NO_FILE_PATH.to_string()),
            opus_file_path: p
                .opus_file_path
                .clone()
                .unwrap_or_else(|| NO_FILE_PATH.to_string()),
            is_device_initiated: p.is_device_initiated.unwrap_or(false),
            error: p.error.clone().unwrap_or_default(),
        })),
        _ => None,
    }
}
