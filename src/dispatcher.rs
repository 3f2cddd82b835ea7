//! Telemetry dispatch
//!
//! The dispatcher owns the per-session state (ECG filter, throttle, pause
//! flag) and the sink. For each raw event it picks one report by fixed
//! priority, decodes it, and forwards the result synchronously before
//! returning.
//!
//! Calls must be serialized and in device order: the ECG filter's modulo-3
//! phase depends on it. The dispatcher holds no locks; `&mut self` is the
//! only guard.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio;
use crate::config::RelayConfig;
use crate::decoders;
use crate::ecg::EcgFilter;
use crate::error::RelayError;
use crate::schema::{RawTelemetryEvent, ReportPayload, ReportTag};
use crate::sink::MetricSink;
use crate::throttle::Throttle;
use crate::types::{DecodedMetric, EventKey};

/// Why a selected report produced no delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Failed its validity check or carried the no-reading sentinel
    Invalid,
    /// Same report kind delivered too recently
    Throttled,
    /// Delivery paused by the host
    Paused,
    /// Audio relay disabled in configuration
    AudioDisabled,
}

/// Result of dispatching one raw event. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered { tag: ReportTag, key: EventKey },
    Dropped { tag: ReportTag, reason: DropReason },
    /// No present tag carried a payload of the expected shape
    Unrecognized,
}

/// Running counters, reported by the CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub delivered: u64,
    pub dropped: u64,
    pub unrecognized: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Delivered { .. } => self.delivered += 1,
            DispatchOutcome::Dropped { .. } => self.dropped += 1,
            DispatchOutcome::Unrecognized => self.unrecognized += 1,
        }
    }
}

pub struct TelemetryDispatcher<S: MetricSink> {
    sink: S,
    ecg_filter: EcgFilter,
    throttle: Option<Throttle>,
    relay_audio: bool,
    paused: bool,
    session_id: Uuid,
    stats: DispatchStats,
}

impl<S: MetricSink> TelemetryDispatcher<S> {
    /// Create a dispatcher with the default configuration
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, &RelayConfig::default())
    }

    pub fn with_config(sink: S, config: &RelayConfig) -> Self {
        Self {
            sink,
            ecg_filter: EcgFilter::new(),
            throttle: config.throttle_interval_ms.map(Throttle::from_millis),
            relay_audio: config.relay_audio,
            paused: config.start_paused,
            session_id: Uuid::new_v4(),
            stats: DispatchStats::default(),
        }
    }

    /// Replace the ECG filter (e.g. one with a device-specific conditioner)
    pub fn with_ecg_filter(mut self, filter: EcgFilter) -> Self {
        self.ecg_filter = filter;
        self
    }

    /// Dispatch one raw event
    pub fn dispatch(&mut self, event: &RawTelemetryEvent) -> DispatchOutcome {
        let outcome = self.dispatch_inner(event);
        self.stats.record(&outcome);
        outcome
    }

    /// Parse a JSON event and dispatch it
    pub fn dispatch_json(&mut self, json: &str) -> Result<DispatchOutcome, RelayError> {
        let event = RawTelemetryEvent::from_json(json)?;
        Ok(self.dispatch(&event))
    }

    fn dispatch_inner(&mut self, event: &RawTelemetryEvent) -> DispatchOutcome {
        let _span = tracing::debug_span!("dispatch", session = %self.session_id).entered();

        let (tag, metric) = match self.select(event) {
            Selection::Decoded(tag, metric) => (tag, metric),
            Selection::Dropped(tag, reason) => {
                tracing::debug!(tag = tag.wire_key(), ?reason, "report dropped");
                return DispatchOutcome::Dropped { tag, reason };
            }
            Selection::Unrecognized => {
                tracing::trace!("no decodable report in event");
                return DispatchOutcome::Unrecognized;
            }
        };

        if self.paused {
            return DispatchOutcome::Dropped {
                tag,
                reason: DropReason::Paused,
            };
        }

        if let Some(throttle) = self.throttle.as_mut() {
            if !throttle.admit(tag, event.received_at) {
                tracing::trace!(tag = tag.wire_key(), "report throttled");
                return DispatchOutcome::Dropped {
                    tag,
                    reason: DropReason::Throttled,
                };
            }
        }

        let key = metric.event_key();
        self.sink.deliver(metric);
        DispatchOutcome::Delivered { tag, key }
    }

    /// Walk the present tags in priority order and decode the first usable
    /// report.
    ///
    /// A payload of the wrong shape, or a reading that fails its validity
    /// check, moves on to the next tag. A comprehensive report ends the
    /// search whatever its outcome.
    fn select(&mut self, event: &RawTelemetryEvent) -> Selection {
        let mut first_invalid = None;

        for tag in event.tags_by_priority() {
            let Some(payload) = event
                .payload(tag)
                .and_then(|value| ReportPayload::decode(tag, value))
            else {
                tracing::trace!(tag = tag.wire_key(), "payload shape mismatch");
                continue;
            };

            let metric = if tag.is_audio() {
                if !self.relay_audio {
                    return Selection::Dropped(tag, DropReason::AudioDisabled);
                }
                audio::relay(&payload)
            } else {
                decoders::decode(&payload, &mut self.ecg_filter)
            };

            match metric {
                Some(metric) => return Selection::Decoded(tag, metric),
                None if tag == ReportTag::Comprehensive => {
                    return Selection::Dropped(tag, DropReason::Invalid)
                }
                None => {
                    tracing::trace!(tag = tag.wire_key(), "invalid reading, trying next tag");
                    first_invalid.get_or_insert(tag);
                }
            }
        }

        match first_invalid {
            Some(tag) => Selection::Dropped(tag, DropReason::Invalid),
            None => Selection::Unrecognized,
        }
    }

    /// Start a new recording session: zero the ECG filter, forget throttle
    /// history and issue a new session id.
    pub fn begin_session(&mut self) -> Uuid {
        self.ecg_filter.reset();
        if let Some(throttle) = self.throttle.as_mut() {
            throttle.clear();
        }
        self.session_id = Uuid::new_v4();
        tracing::info!(session = %self.session_id, "telemetry session started");
        self.session_id
    }

    /// Stop delivering to the sink. Reports are still decoded so the ECG
    /// filter keeps its phase.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn ecg_filter(&self) -> &EcgFilter {
        &self.ecg_filter
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

enum Selection {
    Decoded(ReportTag, DecodedMetric),
    Dropped(ReportTag, DropReason),
    Unrecognized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecg::SampleConditioner;
    use crate::sink::CollectingSink;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + millis).unwrap()
    }

    fn event() -> RawTelemetryEvent {
        RawTelemetryEvent::new(at(0))
    }

    fn dispatcher() -> TelemetryDispatcher<CollectingSink> {
        TelemetryDispatcher::new(CollectingSink::new())
    }

    #[test]
    fn test_heart_rate_delivered() {
        let mut d = dispatcher();
        let outcome = d.dispatch(&event().with_report(ReportTag::HeartRate, json!(72)));

        assert_eq!(
            outcome,
            DispatchOutcome::Delivered {
                tag: ReportTag::HeartRate,
                key: EventKey::HeartRate
            }
        );
        assert_eq!(d.sink().metrics(), &[DecodedMetric::HeartRate(72)]);
    }

    #[test]
    fn test_two_tags_resolve_to_higher_priority() {
        let mut d = dispatcher();
        let raw = event()
            .with_report(ReportTag::BloodOxygen, json!(98))
            .with_report(ReportTag::HeartRate, json!(65));

        d.dispatch(&raw);
        assert_eq!(d.sink().metrics(), &[DecodedMetric::HeartRate(65)]);
    }

    #[test]
    fn test_undecodable_payload_falls_through_to_next_tag() {
        let mut d = dispatcher();
        let raw = event()
            .with_report(ReportTag::HeartRate, json!("seventy"))
            .with_report(ReportTag::Step, json!({"distance": 10, "step": 20, "calories": 1}));

        let outcome = d.dispatch(&raw);
        assert!(matches!(
            outcome,
            DispatchOutcome::Delivered {
                tag: ReportTag::Step,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_reading_falls_through_to_next_tag() {
        let mut d = dispatcher();
        let raw = event()
            .with_report(ReportTag::HeartRate, json!(0))
            .with_report(ReportTag::BloodOxygen, json!(97));

        let outcome = d.dispatch(&raw);
        assert_eq!(
            outcome,
            DispatchOutcome::Delivered {
                tag: ReportTag::BloodOxygen,
                key: EventKey::BloodOxygen
            }
        );
        assert_eq!(d.sink().metrics(), &[DecodedMetric::BloodOxygen(97)]);
    }

    #[test]
    fn test_invalid_blood_pressure_falls_through() {
        let mut d = dispatcher();
        let raw = event()
            .with_report(
                ReportTag::BloodPressure,
                json!({
                    "heartRate": 70,
                    "systolicBloodPressure": 60,
                    "diastolicBloodPressure": 90
                }),
            )
            .with_report(ReportTag::Step, json!({"distance": 5, "step": 8, "calories": 1}));

        d.dispatch(&raw);
        assert_eq!(d.sink().len(), 1);
        assert_eq!(d.sink().metrics()[0].event_key(), EventKey::Step);
    }

    #[test]
    fn test_usable_hrv_wins_over_invalid_pressure() {
        let mut d = dispatcher();
        let raw = event()
            .with_report(
                ReportTag::BloodPressure,
                json!({
                    "heartRate": -1,
                    "systolicBloodPressure": 60,
                    "diastolicBloodPressure": 90,
                    "hrv": 42
                }),
            )
            .with_report(ReportTag::BloodOxygen, json!(97));

        d.dispatch(&raw);
        assert_eq!(d.sink().metrics(), &[DecodedMetric::Hrv(42)]);
    }

    #[test]
    fn test_comprehensive_report_ends_the_search() {
        let mut d = dispatcher();
        // Glucose sentinel falls back to temperature; the step report is never reached
        let raw = event()
            .with_report(
                ReportTag::Comprehensive,
                json!({"temperature": 36.5, "bloodGlucose": 15}),
            )
            .with_report(ReportTag::Step, json!({"distance": 5, "step": 8, "calories": 1}));

        d.dispatch(&raw);
        assert_eq!(
            d.sink().metrics(),
            &[DecodedMetric::Temperature("36.5".to_string())]
        );
    }

    #[test]
    fn test_all_invalid_reports_drop_at_first_tag() {
        let mut d = dispatcher();
        let raw = event()
            .with_report(ReportTag::BloodOxygen, json!(0))
            .with_report(ReportTag::HeartRate, json!(0))
            .with_report(ReportTag::BodyIndex, json!({}));

        assert_eq!(
            d.dispatch(&raw),
            DispatchOutcome::Dropped {
                tag: ReportTag::HeartRate,
                reason: DropReason::Invalid
            }
        );
        assert!(d.sink().is_empty());
        assert_eq!(d.stats().dropped, 1);
    }

    #[test]
    fn test_unrecognized_event() {
        let mut d = dispatcher();
        assert_eq!(d.dispatch(&event()), DispatchOutcome::Unrecognized);

        let outcome = d.dispatch_json(r#"{"batteryLevel": 80}"#).unwrap();
        assert_eq!(outcome, DispatchOutcome::Unrecognized);
        assert_eq!(d.stats().unrecognized, 2);
    }

    #[test]
    fn test_ecg_phase_spans_dispatches() {
        let mut d = dispatcher();
        d.dispatch(&event().with_report(ReportTag::Ecg, json!([3, 6, 9, 12, 15])));
        d.dispatch(&event().with_report(ReportTag::Ecg, json!([18, 21, 24, 27])));

        let lengths: Vec<usize> = d
            .sink()
            .metrics()
            .iter()
            .map(|m| match m {
                DecodedMetric::Ecg { filtered, .. } => filtered.len(),
                other => panic!("unexpected metric: {:?}", other),
            })
            .collect();
        // Counters 0 and 3 fall in the first report, 6 in the second
        assert_eq!(lengths, vec![2, 1]);
    }

    #[test]
    fn test_begin_session_resets_filter_and_session_id() {
        let mut d = dispatcher();
        let first_session = d.session_id();
        d.dispatch(&event().with_report(ReportTag::Ecg, json!([1, 2])));
        assert_eq!(d.ecg_filter().state().sample_count, 2);

        let second_session = d.begin_session();
        assert_ne!(first_session, second_session);
        assert_eq!(d.ecg_filter().state().sample_count, 0);
    }

    #[test]
    fn test_pause_keeps_filter_phase() {
        let mut d = dispatcher();
        d.pause();
        let outcome = d.dispatch(&event().with_report(ReportTag::Ecg, json!([1, 2])));
        assert_eq!(
            outcome,
            DispatchOutcome::Dropped {
                tag: ReportTag::Ecg,
                reason: DropReason::Paused
            }
        );
        assert_eq!(d.ecg_filter().state().sample_count, 2);
        assert!(d.sink().is_empty());

        // Counters 2 and 3: only counter 3 emits
        d.resume();
        d.dispatch(&event().with_report(ReportTag::Ecg, json!([3, 4])));
        match &d.sink().metrics()[0] {
            DecodedMetric::Ecg { filtered, .. } => assert_eq!(filtered.len(), 1),
            other => panic!("unexpected metric: {:?}", other),
        }
    }

    #[test]
    fn test_throttle_per_tag() {
        let config = RelayConfig {
            throttle_interval_ms: Some(1000),
            ..RelayConfig::default()
        };
        let mut d = TelemetryDispatcher::with_config(CollectingSink::new(), &config);

        let hr = |millis: i64| {
            RawTelemetryEvent::new(at(millis)).with_report(ReportTag::HeartRate, json!(70))
        };
        assert!(matches!(d.dispatch(&hr(0)), DispatchOutcome::Delivered { .. }));
        assert_eq!(
            d.dispatch(&hr(400)),
            DispatchOutcome::Dropped {
                tag: ReportTag::HeartRate,
                reason: DropReason::Throttled
            }
        );
        let spo2 = RawTelemetryEvent::new(at(500)).with_report(ReportTag::BloodOxygen, json!(99));
        assert!(matches!(d.dispatch(&spo2), DispatchOutcome::Delivered { .. }));
        assert!(matches!(d.dispatch(&hr(1200)), DispatchOutcome::Delivered { .. }));

        assert_eq!(d.sink().len(), 3);
        assert_eq!(
            d.stats(),
            DispatchStats {
                delivered: 3,
                dropped: 1,
                unrecognized: 0
            }
        );
    }

    #[test]
    fn test_audio_relay_has_lowest_priority() {
        let mut d = dispatcher();
        let raw = event()
            .with_report(ReportTag::AudioState, json!({"state": "recording"}))
            .with_report(ReportTag::BloodOxygen, json!(96));
        d.dispatch(&raw);
        assert_eq!(d.sink().metrics(), &[DecodedMetric::BloodOxygen(96)]);

        d.dispatch(&event().with_report(ReportTag::AudioState, json!({"state": "recording"})));
        assert_eq!(
            d.sink().metrics()[1],
            DecodedMetric::AudioState("recording".to_string())
        );
    }

    #[test]
    fn test_audio_relay_can_be_disabled() {
        let config = RelayConfig {
            relay_audio: false,
            ..RelayConfig::default()
        };
        let mut d = TelemetryDispatcher::with_config(CollectingSink::new(), &config);
        let outcome = d.dispatch(&event().with_report(ReportTag::AudioResult, json!({})));
        assert_eq!(
            outcome,
            DispatchOutcome::Dropped {
                tag: ReportTag::AudioResult,
                reason: DropReason::AudioDisabled
            }
        );
    }

    #[test]
    fn test_dispatch_json_parse_error() {
        let mut d = dispatcher();
        assert!(d.dispatch_json("{not json").is_err());
        assert_eq!(d.stats(), DispatchStats::default());
    }

    #[test]
    fn test_closure_sink_receives_records_synchronously() {
        let mut keys = Vec::new();
        {
            let mut d = TelemetryDispatcher::new(|m: DecodedMetric| keys.push(m.event_key()));
            d.dispatch(&event().with_report(ReportTag::Motion, json!([1, 2, 3])));
            d.dispatch(&event().with_report(
                ReportTag::BloodPressure,
                json!({
                    "heartRate": 70,
                    "systolicBloodPressure": 120,
                    "diastolicBloodPressure": 80,
                    "hrv": 55
                }),
            ));
        }
        assert_eq!(keys, vec![EventKey::AccData, EventKey::Hrv]);
    }

    struct Doubler;

    impl SampleConditioner for Doubler {
        fn condition(&mut self, raw: i32) -> f32 {
            raw as f32 * 2.0
        }
    }

    #[test]
    fn test_device_conditioner_reaches_sink() {
        let mut d = dispatcher().with_ecg_filter(EcgFilter::with_conditioner(Doubler));
        d.dispatch(&event().with_report(ReportTag::Ecg, json!([3, 6, 9])));

        match &d.sink().metrics()[0] {
            DecodedMetric::Ecg { raw, filtered } => {
                assert_eq!(raw, &vec![3, 6, 9]);
                assert_eq!(filtered.len(), 1);
                // (2 * 3 + 0 + 0) / 3 / 40 / 1000
                assert!((filtered[0] - 2.0 / 40_000.0).abs() < 1e-9);
            }
            other => panic!("unexpected metric: {:?}", other),
        }
        assert_eq!(d.ecg_filter().state().previous, 18.0);
    }

    #[test]
    fn test_begin_session_clears_throttle() {
        let config = RelayConfig {
            throttle_interval_ms: Some(1000),
            ..RelayConfig::default()
        };
        let mut d = TelemetryDispatcher::with_config(CollectingSink::new(), &config);
        let hr = |millis: i64| {
            RawTelemetryEvent::new(at(millis)).with_report(ReportTag::HeartRate, json!(70))
        };

        assert!(matches!(d.dispatch(&hr(0)), DispatchOutcome::Delivered { .. }));
        d.begin_session();
        assert!(matches!(d.dispatch(&hr(100)), DispatchOutcome::Delivered { .. }));
    }
}
