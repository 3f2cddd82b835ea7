//! Outbound sinks
//!
//! A sink receives decoded metrics for delivery to the UI layer. Delivery is
//! fire-and-forget: the dispatcher never learns whether a record arrived.

use std::io::Write;

use serde_json::Value;

use crate::types::DecodedMetric;

/// Consumer of decoded metrics
pub trait MetricSink {
    fn deliver(&mut self, metric: DecodedMetric);
}

impl<F> MetricSink for F
where
    F: FnMut(DecodedMetric),
{
    fn deliver(&mut self, metric: DecodedMetric) {
        self(metric)
    }
}

/// In-memory sink, used by tests and the FFI layer
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    metrics: Vec<DecodedMetric>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &[DecodedMetric] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Take everything collected so far
    pub fn drain(&mut self) -> Vec<DecodedMetric> {
        std::mem::take(&mut self.metrics)
    }
}

impl MetricSink for CollectingSink {
    fn deliver(&mut self, metric: DecodedMetric) {
        self.metrics.push(metric);
    }
}

/// Writes one outbound record per line as JSON
pub struct NdjsonSink<W: Write> {
    writer: W,
    flush: bool,
    written: usize,
    failed: usize,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            flush: false,
            written: 0,
            failed: 0,
        }
    }

    /// Flush the writer after every record
    pub fn with_flush(mut self, flush: bool) -> Self {
        self.flush = flush;
        self
    }

    /// Number of records successfully written
    pub fn written(&self) -> usize {
        self.written
    }

    /// Number of records lost to write errors
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, metric: &DecodedMetric) -> std::io::Result<()> {
        let line = serde_json::to_string(&Value::Object(metric.to_record()))?;
        writeln!(self.writer, "{}", line)?;
        if self.flush {
            self.writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> MetricSink for NdjsonSink<W> {
    fn deliver(&mut self, metric: DecodedMetric) {
        match self.write_record(&metric) {
            Ok(()) => self.written += 1,
            Err(e) => {
                self.failed += 1;
                tracing::warn!(
                    key = metric.event_key().as_str(),
                    error = %e,
                    "failed to write record"
                );
            }
        }
    }
}
