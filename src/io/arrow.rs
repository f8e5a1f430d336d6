/*!
Columnar output for sampler records: Arrow IPC (`arrow` feature) and
Parquet (`parquet` feature).

Both sinks buffer rows in memory and write a single record batch when
`finish` is called; nothing touches the filesystem before that.
*/

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

#[cfg(feature = "arrow")]
use arrow::ipc::writer::FileWriter;

#[cfg(feature = "parquet")]
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use super::{Record, RecordSink, SinkError};

/// Row buffer shared by the columnar sinks. Dimensions and the presence of
/// step columns are fixed by the first record.
#[derive(Debug, Default)]
struct RecordBuffer {
    log_likelihood: Vec<f64>,
    accepted: Vec<bool>,
    points: Vec<f64>,
    steps: Vec<f64>,
    dim: usize,
    with_steps: bool,
}

impl RecordBuffer {
    fn push(&mut self, record: &Record) -> Result<(), SinkError> {
        if self.log_likelihood.is_empty() {
            self.dim = record.point.len();
            self.with_steps = record.step.is_some();
        }
        if record.point.len() != self.dim {
            return Err(format!(
                "record has {} dimensions, sink expects {}",
                record.point.len(),
                self.dim
            )
            .into());
        }
        self.log_likelihood.push(record.log_likelihood);
        self.accepted.push(record.accepted);
        self.points.extend_from_slice(record.point);
        if self.with_steps {
            let step = record
                .step
                .ok_or("record is missing the trial step this sink was opened with")?;
            self.steps.extend_from_slice(step);
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.log_likelihood.is_empty()
    }

    /// One column per dimension, the way downstream tools expect MCMC
    /// output.
    fn to_batch(&self) -> Result<RecordBatch, SinkError> {
        let mut fields = vec![
            Field::new("LogLikelihood", DataType::Float64, false),
            Field::new("Accepted?", DataType::Boolean, false),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Float64Array::from(self.log_likelihood.clone())),
            Arc::new(BooleanArray::from(self.accepted.clone())),
        ];
        for i in 0..self.dim {
            fields.push(Field::new(format!("Accepted_{}", i), DataType::Float64, false));
            let column = Float64Array::from_iter_values(
                self.points.iter().skip(i).step_by(self.dim).copied(),
            );
            columns.push(Arc::new(column));
        }
        if self.with_steps {
            for i in 0..self.dim {
                fields.push(Field::new(format!("Step_{}", i), DataType::Float64, false));
                let column = Float64Array::from_iter_values(
                    self.steps.iter().skip(i).step_by(self.dim).copied(),
                );
                columns.push(Arc::new(column));
            }
        }
        let schema = Arc::new(Schema::new(fields));
        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

/// Buffers records and writes one Arrow IPC file on `finish`.
#[cfg(feature = "arrow")]
pub struct ArrowSink {
    path: PathBuf,
    buffer: RecordBuffer,
}

#[cfg(feature = "arrow")]
impl ArrowSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            buffer: RecordBuffer::default(),
        }
    }
}

#[cfg(feature = "arrow")]
impl RecordSink for ArrowSink {
    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        self.buffer.push(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = self.buffer.to_batch()?;
        let file = File::create(&self.path)?;
        let mut writer = FileWriter::try_new(file, &batch.schema())?;
        writer.write(&batch)?;
        writer.finish()?;
        Ok(())
    }
}

/// Buffers records and writes one Parquet file on `finish`.
#[cfg(feature = "parquet")]
pub struct ParquetSink {
    path: PathBuf,
    buffer: RecordBuffer,
}

#[cfg(feature = "parquet")]
impl ParquetSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            buffer: RecordBuffer::default(),
        }
    }
}

#[cfg(feature = "parquet")]
impl RecordSink for ParquetSink {
    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        self.buffer.push(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = self.buffer.to_batch()?;
        let file = File::create(&self.path)?;
        let props = WriterProperties::builder().build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }
}
