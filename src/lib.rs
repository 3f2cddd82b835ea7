//! Healthwear Relay - telemetry demultiplexing for a smart-ring companion app
//!
//! The relay takes raw telemetry events pushed by the ring's SDK, picks one
//! report per event by fixed priority, validates and decodes it, and forwards
//! the result to a sink: raw event → report selection → decoding (ECG
//! moving average, ACC triplets, sentinel checks) → outbound record.
//!
//! ## Modules
//!
//! - **Schema**: Raw event envelope and typed report payloads
//! - **Decoders**: Per-kind validation and conversion into metrics
//! - **Dispatcher**: Priority selection, session state, throttling and delivery

pub mod audio;
pub mod config;
pub mod decoders;
pub mod dispatcher;
pub mod ecg;
pub mod error;
pub mod motion;
pub mod schema;
pub mod sink;
pub mod throttle;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::RelayConfig;
pub use dispatcher::{DispatchOutcome, DispatchStats, DropReason, TelemetryDispatcher};
pub use ecg::{EcgFilter, EcgFilterState, SampleConditioner};
pub use error::RelayError;
pub use motion::{AxisLayout, AxisSample};
pub use sink::{CollectingSink, MetricSink, NdjsonSink};
pub use throttle::Throttle;
pub use types::{DecodedMetric, EventKey, SinkRecord};

// Schema exports
pub use schema::{RawTelemetryEvent, ReportPayload, ReportTag};

/// Relay version
pub const RELAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "healthwear-relay";
