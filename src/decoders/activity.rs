//! Activity decoders: step counter and real-time sport session.
//!
//! Neither applies a validity filter; a correctly shaped payload always
//! produces a record.

use crate::schema::{MonitoringModePayload, StepPayload};
use crate::types::{DecodedMetric, SportSessionReading, StepReading};

pub fn step(payload: &StepPayload) -> Option<DecodedMetric> {
    Some(DecodedMetric::Step(StepReading {
        distance: payload.distance,
        step: payload.step,
        calories: payload.calories,
    }))
}

/// Sport session snapshot. Float counters are truncated toward zero.
///
/// The device also reports a standalone VO2max (start timestamp 0 with a
/// non-zero vo2max). That variant is not split out; it is forwarded as an
/// ordinary session snapshot.
pub fn sport_session(payload: &MonitoringModePayload) -> Option<DecodedMetric> {
    Some(DecodedMetric::SportSession(SportSessionReading {
        time: payload.start_time_stamp,
        heart_rate: payload.heart_rate,
        distance: payload.mode_distance as i64,
        step: payload.mode_step as i64,
        calories: payload.mode_calories as i64,
        ppi: payload.ppi as i64,
        vo2max: payload.vo2max as i64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_step_passes_through() {
        let payload = StepPayload {
            distance: 0,
            step: 0,
            calories: 0,
        };
        assert_eq!(
            step(&payload),
            Some(DecodedMetric::Step(StepReading {
                distance: 0,
                step: 0,
                calories: 0
            }))
        );
    }

    #[test]
    fn test_sport_session_truncates_counters() {
        let payload = MonitoringModePayload {
            start_time_stamp: 1_700_000_000,
            heart_rate: 132,
            mode_step: 1234.9,
            mode_calories: 88.2,
            mode_distance: 950.99,
            ppi: 455.7,
            vo2max: 41.6,
        };

        assert_eq!(
            sport_session(&payload),
            Some(DecodedMetric::SportSession(SportSessionReading {
                time: 1_700_000_000,
                heart_rate: 132,
                distance: 950,
                step: 1234,
                calories: 88,
                ppi: 455,
                vo2max: 41,
            }))
        );
    }

    #[test]
    fn test_sport_session_standalone_vo2max_is_not_split() {
        let payload = MonitoringModePayload {
            start_time_stamp: 0,
            heart_rate: 0,
            mode_step: 0.0,
            mode_calories: 0.0,
            mode_distance: 0.0,
            ppi: 0.0,
            vo2max: 48.0,
        };

        match sport_session(&payload) {
            Some(DecodedMetric::SportSession(reading)) => assert_eq!(reading.vo2max, 48),
            other => panic!("unexpected decode: {:?}", other),
        }
    }
}
