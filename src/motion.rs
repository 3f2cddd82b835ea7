//! Accelerometer triplet decoding
//!
//! The motion sensor delivers a flat `i32` stream that is reinterpreted as
//! consecutive `(x, y, z)` samples. Only the three-axis layout is active;
//! six- and nine-axis layouts are device modes this relay does not decode.

use serde::{Deserialize, Serialize};

/// One accelerometer sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Axis layout of a motion stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxisLayout {
    ThreeAxis,
}

impl AxisLayout {
    /// Layout code as carried on the outbound record (0 = three-axis)
    pub fn code(&self) -> u8 {
        match self {
            AxisLayout::ThreeAxis => 0,
        }
    }

    /// Values per sample
    pub fn axes(&self) -> usize {
        match self {
            AxisLayout::ThreeAxis => 3,
        }
    }
}

/// Group a flat stream into `(x, y, z)` triplets.
///
/// A trailing group with fewer than three values is discarded.
pub fn decode_triplets(values: &[i32]) -> Vec<AxisSample> {
    values
        .chunks_exact(AxisLayout::ThreeAxis.axes())
        .map(|c| AxisSample {
            x: c[0] as f32,
            y: c[1] as f32,
            z: c[2] as f32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trailing_partial_triplet_is_discarded() {
        let samples = decode_triplets(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(
            samples,
            vec![
                AxisSample { x: 1.0, y: 2.0, z: 3.0 },
                AxisSample { x: 4.0, y: 5.0, z: 6.0 },
            ]
        );
    }

    #[test]
    fn test_output_length_is_floor_of_thirds() {
        for n in 0..10 {
            let input: Vec<i32> = (0..n).collect();
            assert_eq!(decode_triplets(&input).len(), n as usize / 3);
        }
    }

    #[test]
    fn test_negative_values_keep_sign() {
        let samples = decode_triplets(&[-1024, 0, 2048]);
        assert_eq!(samples, vec![AxisSample { x: -1024.0, y: 0.0, z: 2048.0 }]);
    }

    #[test]
    fn test_layout_code() {
        assert_eq!(AxisLayout::ThreeAxis.code(), 0);
        assert_eq!(
            serde_json::to_value(AxisLayout::ThreeAxis).unwrap(),
            serde_json::json!("three-axis")
        );
    }
}
