/*!
# Record sinks for sampler output

Every `start`/`step` of the sampler can append one record to a sink: the
log-posterior at the accepted point, the accepted point itself, whether the
step moved the chain, and (optionally) the trial step that was proposed.
Records are appended in exactly the order the steps were taken.

Available sinks:

- [`MemorySink`] — keeps owned rows in memory; handy for tests and small
  runs. Always available.
- [`CsvSink`] — streams one CSV row per record (`csv` feature, on by
  default).
- [`ArrowSink`] — buffers rows and writes a single Arrow IPC file on
  `finish` (`arrow` feature).
- [`ParquetSink`] — same rows encoded as Parquet (`parquet` feature).

A sampler without a sink treats the `save` flag as a no-op.
*/

use std::error::Error;
use std::sync::{Arc, Mutex};

#[cfg(any(feature = "arrow", feature = "parquet"))]
pub mod arrow;

#[cfg(feature = "csv")]
pub mod csv;

#[cfg(feature = "arrow")]
pub use self::arrow::ArrowSink;
#[cfg(feature = "parquet")]
pub use self::arrow::ParquetSink;
#[cfg(feature = "csv")]
pub use self::csv::CsvSink;

/// Boxed error type shared by all sinks.
pub type SinkError = Box<dyn Error + Send + Sync>;

/// One row of sampler output, borrowing the driver's buffers.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Log-posterior at the accepted point.
    pub log_likelihood: f64,
    /// The chain's current (accepted) point after the step.
    pub point: &'a [f64],
    /// Whether this step moved the chain.
    pub accepted: bool,
    /// The trial step (proposed minus previous accepted), present only
    /// when the driver records trial steps.
    pub step: Option<&'a [f64]>,
}

/// An append-only channel for sampler records.
pub trait RecordSink {
    /// Append one record. Records arrive in step order.
    fn append(&mut self, record: &Record) -> Result<(), SinkError>;

    /// Flush or finalize the underlying storage. The default does nothing;
    /// buffered sinks write their file here.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Owned copy of a [`Record`], as stored by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRecord {
    pub log_likelihood: f64,
    pub point: Vec<f64>,
    pub accepted: bool,
    pub step: Option<Vec<f64>>,
}

/// An in-memory sink backed by a shared row buffer.
///
/// Cloning the sink clones the *handle*: hand one clone to the sampler and
/// keep another to read the rows back afterwards.
///
/// # Examples
///
/// ```rust
/// use adaptive_mcmc::io::{MemorySink, Record, RecordSink};
///
/// let sink = MemorySink::new();
/// let mut writer = sink.clone();
/// writer
///     .append(&Record {
///         log_likelihood: -1.5,
///         point: &[0.5, 0.5],
///         accepted: true,
///         step: None,
///     })
///     .unwrap();
/// assert_eq!(sink.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<OwnedRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of all rows appended so far.
    pub fn rows(&self) -> Vec<OwnedRecord> {
        self.rows.lock().unwrap().clone()
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        self.rows.lock().unwrap().push(OwnedRecord {
            log_likelihood: record.log_likelihood,
            point: record.point.to_vec(),
            accepted: record.accepted,
            step: record.step.map(|s| s.to_vec()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_rows_in_order() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        for i in 0..5 {
            writer
                .append(&Record {
                    log_likelihood: -(i as f64),
                    point: &[i as f64],
                    accepted: i % 2 == 0,
                    step: None,
                })
                .unwrap();
        }
        let rows = sink.rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[3].log_likelihood, -3.0);
        assert!(!rows[3].accepted);
        assert_eq!(rows[4].point, vec![4.0]);
    }

    #[test]
    fn records_carry_optional_steps() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer
            .append(&Record {
                log_likelihood: 0.0,
                point: &[1.0, 2.0],
                accepted: true,
                step: Some(&[0.1, -0.1]),
            })
            .unwrap();
        assert_eq!(sink.rows()[0].step, Some(vec![0.1, -0.1]));
    }
}
