//! Waveform decoders: raw PPG, ECG, motion and multi-channel PPG.

use crate::ecg::EcgFilter;
use crate::motion::{decode_triplets, AxisLayout};
use crate::schema::MultiChannelPpgPayload;
use crate::types::{DecodedMetric, MotionReading, MultiChannelPpgReading};

pub fn raw_ppg(samples: &[i32]) -> Option<DecodedMetric> {
    Some(DecodedMetric::RawPpg(samples.to_vec()))
}

/// Raw ECG codes plus the filtered millivolt stream for this report
pub fn ecg(samples: &[i32], filter: &mut EcgFilter) -> Option<DecodedMetric> {
    let filtered = filter.process(samples);
    Some(DecodedMetric::Ecg {
        raw: samples.to_vec(),
        filtered,
    })
}

pub fn motion(samples: &[i32]) -> Option<DecodedMetric> {
    Some(DecodedMetric::Motion(MotionReading {
        samples: decode_triplets(samples),
        layout: AxisLayout::ThreeAxis,
    }))
}

pub fn multi_channel_ppg(payload: &MultiChannelPpgPayload) -> Option<DecodedMetric> {
    Some(DecodedMetric::MultiChannelPpg(MultiChannelPpgReading {
        composite: payload.composite_data.clone(),
        green: payload.green_data.clone(),
        ir: payload.ir_data.clone(),
        red: payload.red_data.clone(),
        sample_type: payload.composite_type,
    }))
}
