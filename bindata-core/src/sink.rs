//! Sinks for binned output and persisted label rows

use crate::binning::Bin;
use crate::chunk::Row;
use crate::error::Result;
use crate::schema::Schema;

/// A sink that consumes each label's bins, in the order labels complete
pub trait BinSink {
    /// Consume one label's bins
    fn consume(&mut self, bins: Vec<Bin>) -> Result<()>;

    /// Flush any buffered bins and finalize
    fn flush(&mut self) -> Result<()>;
}

/// Side-effect writer for a label's raw, range-sorted rows
pub trait RowPersister {
    /// Persist `rows` for `label`. Failures are reported as
    /// [`Error::Persistence`](crate::error::Error::Persistence).
    fn persist(&mut self, schema: &Schema, label: &str, rows: &[Row]) -> Result<()>;
}

impl<K: BinSink + ?Sized> BinSink for Box<K> {
    fn consume(&mut self, bins: Vec<Bin>) -> Result<()> {
        (**self).consume(bins)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<P: RowPersister + ?Sized> RowPersister for Box<P> {
    fn persist(&mut self, schema: &Schema, label: &str, rows: &[Row]) -> Result<()> {
        (**self).persist(schema, label, rows)
    }
}

/// A sink that collects bins in memory, in output order
#[derive(Debug, Default)]
pub struct CollectingBinSink {
    bins: Vec<Bin>,
    flushed: bool,
}

impl CollectingBinSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected bins
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Take ownership of the collected bins
    pub fn into_bins(self) -> Vec<Bin> {
        self.bins
    }

    /// Whether `flush` has been called
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }
}

impl BinSink for CollectingBinSink {
    fn consume(&mut self, bins: Vec<Bin>) -> Result<()> {
        self.bins.extend(bins);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushed = true;
        Ok(())
    }
}

/// Persister that keeps nothing, for runs without chunk files
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPersister;

impl RowPersister for NullPersister {
    fn persist(&mut self, _schema: &Schema, _label: &str, _rows: &[Row]) -> Result<()> {
        Ok(())
    }
}

/// Persister that records what it was given, keyed by label in call order
#[derive(Debug, Default)]
pub struct CollectingPersister {
    persisted: Vec<(String, Vec<Row>)>,
}

impl CollectingPersister {
    /// Create an empty persister
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(label, rows)` pair persisted so far
    pub fn persisted(&self) -> &[(String, Vec<Row>)] {
        &self.persisted
    }
}

impl RowPersister for CollectingPersister {
    fn persist(&mut self, _schema: &Schema, label: &str, rows: &[Row]) -> Result<()> {
        self.persisted.push((label.to_string(), rows.to_vec()));
        Ok(())
    }
}
