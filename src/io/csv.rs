/*!
CSV output for sampler records. Enable via the `csv` feature (on by
default).
*/

use std::fs::File;
use std::path::Path;

use csv::Writer;

use super::{Record, RecordSink, SinkError};

/// Streams one CSV row per record.
///
/// The header is written lazily from the first record: `LogLikelihood`,
/// `Accepted?`, one `Accepted_i` column per dimension and, when the driver
/// records trial steps, one `Step_i` column per dimension.
///
/// # Examples
///
/// ```rust,no_run
/// use adaptive_mcmc::io::{CsvSink, Record, RecordSink};
///
/// let mut sink = CsvSink::create("/tmp/chain.csv")?;
/// sink.append(&Record {
///     log_likelihood: -0.5,
///     point: &[1.0, -1.0],
///     accepted: true,
///     step: None,
/// })?;
/// sink.finish()?;
/// # Ok::<(), adaptive_mcmc::io::SinkError>(())
/// ```
pub struct CsvSink {
    writer: Writer<File>,
    wrote_header: bool,
}

impl CsvSink {
    /// Create (or truncate) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        Ok(Self {
            writer: Writer::from_writer(File::create(path)?),
            wrote_header: false,
        })
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        if !self.wrote_header {
            let mut header = vec!["LogLikelihood".to_string(), "Accepted?".to_string()];
            header.extend((0..record.point.len()).map(|i| format!("Accepted_{}", i)));
            if let Some(step) = record.step {
                header.extend((0..step.len()).map(|i| format!("Step_{}", i)));
            }
            self.writer.write_record(&header)?;
            self.wrote_header = true;
        }

        let mut row = vec![
            record.log_likelihood.to_string(),
            (record.accepted as u8).to_string(),
        ];
        row.extend(record.point.iter().map(|v| v.to_string()));
        if let Some(step) = record.step {
            row.extend(step.iter().map(|v| v.to_string()));
        }
        self.writer.write_record(&row)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
