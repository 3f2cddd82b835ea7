//! ECG conditioning
//!
//! Converts raw integer-coded ECG samples into a smoothed millivolt stream.
//! Each raw sample is first passed through a [`SampleConditioner`]; every
//! third conditioned sample is averaged with the two before it and scaled to
//! millivolts.
//!
//! The sample counter is never realigned at call boundaries: a report of
//! five samples followed by a report of four yields outputs at counter
//! values 0, 3 and 6, wherever those fall. Callers must not expect one output
//! per report.

use serde::{Deserialize, Serialize};

/// Device calibration: raw conditioned units per microvolt
pub const ECG_GAIN: f32 = 40.0;

/// Microvolts per millivolt
pub const MICROVOLT_PER_MILLIVOLT: f32 = 1000.0;

/// Averaging window and decimation factor
pub const DECIMATION: u64 = 3;

/// Per-sample transform applied before smoothing
pub trait SampleConditioner: Send {
    /// Condition one raw sample
    fn condition(&mut self, raw: i32) -> f32;

    /// Drop any internal history (start of a recording session)
    fn reset(&mut self) {}
}

/// Conditioner that forwards the raw value unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl SampleConditioner for PassThrough {
    fn condition(&mut self, raw: i32) -> f32 {
        raw as f32
    }
}

/// Running filter state: sample counter and the last two conditioned values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EcgFilterState {
    pub sample_count: u64,
    pub previous: f32,
    pub previous_previous: f32,
}

/// Stateful moving-average ECG filter, one per device session
pub struct EcgFilter {
    state: EcgFilterState,
    conditioner: Box<dyn SampleConditioner>,
}

impl Default for EcgFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EcgFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcgFilter")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl EcgFilter {
    /// Create a filter with the pass-through conditioner
    pub fn new() -> Self {
        Self::with_conditioner(PassThrough)
    }

    /// Create a filter with a device-specific conditioner
    pub fn with_conditioner(conditioner: impl SampleConditioner + 'static) -> Self {
        Self {
            state: EcgFilterState::default(),
            conditioner: Box::new(conditioner),
        }
    }

    pub fn state(&self) -> EcgFilterState {
        self.state
    }

    /// Zero the counter and history, and reset the conditioner
    pub fn reset(&mut self) {
        self.state = EcgFilterState::default();
        self.conditioner.reset();
    }

    /// Filter one report's samples, preserving order.
    ///
    /// Output is in millivolts and deliberately unclamped.
    pub fn process(&mut self, raw: &[i32]) -> Vec<f32> {
        let start = self.state.sample_count;
        let mut millivolts = Vec::with_capacity(raw.len() / DECIMATION as usize + 1);

        for &sample in raw {
            let ecg_value = self.conditioner.condition(sample);

            if self.state.sample_count % DECIMATION == 0 {
                let average =
                    (ecg_value + self.state.previous + self.state.previous_previous) / 3.0;
                millivolts.push(average / ECG_GAIN / MICROVOLT_PER_MILLIVOLT);
            }

            self.state.previous_previous = self.state.previous;
            self.state.previous = ecg_value;
            self.state.sample_count = self.state.sample_count.wrapping_add(1);
        }

        debug_assert_eq!(
            self.state.sample_count.wrapping_sub(start),
            raw.len() as u64,
            "ECG sample counter out of step with input"
        );

        millivolts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len(), "length mismatch: {:?}", actual);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "expected {} got {}", e, a);
        }
    }

    #[test]
    fn test_hand_computed_trace() {
        let mut filter = EcgFilter::new();
        let out = filter.process(&[3, 6, 9, 12, 15, 18, 21, 24, 27]);

        // Counter 0: (3 + 0 + 0) / 3 = 1
        // Counter 3: (12 + 9 + 6) / 3 = 9
        // Counter 6: (21 + 18 + 15) / 3 = 18
        assert_close(&out, &[1.0 / 40_000.0, 9.0 / 40_000.0, 18.0 / 40_000.0]);

        let state = filter.state();
        assert_eq!(state.sample_count, 9);
        assert_eq!(state.previous, 27.0);
        assert_eq!(state.previous_previous, 24.0);
    }

    #[test]
    fn test_phase_carries_across_calls() {
        let mut filter = EcgFilter::new();

        let first = filter.process(&[3, 6]);
        assert_close(&first, &[1.0 / 40_000.0]);

        // Counters 2..=7: outputs at counters 3 and 6 only
        let second = filter.process(&[9, 12, 15, 18, 21, 24]);
        assert_close(&second, &[9.0 / 40_000.0, 18.0 / 40_000.0]);
    }

    #[test]
    fn test_fresh_filter_emits_ceiling_of_n_over_three() {
        // Counter 0 emits, so a fresh filter yields outputs at 0, 3 and 6
        let mut filter = EcgFilter::new();
        let out = filter.process(&[3, 6, 9, 12, 15, 18, 21]);
        assert_close(&out, &[1.0 / 40_000.0, 9.0 / 40_000.0, 18.0 / 40_000.0]);
    }

    #[test]
    fn test_single_sample_reports() {
        let mut filter = EcgFilter::new();
        let lengths: Vec<usize> = (0..6).map(|i| filter.process(&[i]).len()).collect();
        assert_eq!(lengths, vec![1, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_empty_input_leaves_state_untouched() {
        let mut filter = EcgFilter::new();
        filter.process(&[10, 20]);
        let before = filter.state();
        assert!(filter.process(&[]).is_empty());
        assert_eq!(filter.state(), before);
    }

    #[test]
    fn test_reset_realigns_phase() {
        let mut filter = EcgFilter::new();
        filter.process(&[1, 2]);
        filter.reset();
        assert_eq!(filter.state(), EcgFilterState::default());

        let out = filter.process(&[30, 0, 0]);
        assert_close(&out, &[10.0 / 40_000.0]);
    }

    #[test]
    fn test_output_is_unclamped() {
        let mut filter = EcgFilter::new();
        let out = filter.process(&[i32::MAX]);
        assert!(out[0] > 500.0);
        assert!((out[0] - (i32::MAX as f32 / 3.0 / 40_000.0)).abs() < 1.0);
    }

    struct Doubler;

    impl SampleConditioner for Doubler {
        fn condition(&mut self, raw: i32) -> f32 {
            raw as f32 * 2.0
        }
    }

    #[test]
    fn test_custom_conditioner_applies_before_averaging() {
        let mut filter = EcgFilter::with_conditioner(Doubler);
        let out = filter.process(&[3, 6, 9, 12]);
        assert_close(&out, &[2.0 / 40_000.0, 18.0 / 40_000.0]);
        assert_eq!(filter.state().previous, 24.0);
    }
}
