//! Single-threaded pull pipeline: source → accumulator → {persister, engine} → sink

use tracing::{debug, error, info, warn};

use crate::accumulator::{LabelAccumulator, LabelGroup};
use crate::binning::BinningEngine;
use crate::error::Result;
use crate::report::{LabelFailure, RunSummary};
use crate::schema::Schema;
use crate::sink::{BinSink, NullPersister, RowPersister};
use crate::source::ChunkSource;

/// A binning run over one chunk source.
///
/// Chunks are pulled in order and folded into a [`LabelAccumulator`]; every
/// completed label group is range-sorted, optionally persisted, binned and
/// handed to the sink before the next chunk is read. Per-label aggregation
/// and persistence failures are logged and recorded; schema, input and
/// output errors end the run.
pub struct Pipeline<S, K, P = NullPersister>
where
    S: ChunkSource,
    K: BinSink,
    P: RowPersister,
{
    source: S,
    engine: BinningEngine,
    sink: K,
    persister: Option<P>,
    allow_list: Option<Vec<String>>,
}

impl<S, K> Pipeline<S, K, NullPersister>
where
    S: ChunkSource,
    K: BinSink,
{
    /// Create a pipeline that persists nothing
    pub fn new(source: S, engine: BinningEngine, sink: K) -> Self {
        Self {
            source,
            engine,
            sink,
            persister: None,
            allow_list: None,
        }
    }
}

impl<S, K, P> Pipeline<S, K, P>
where
    S: ChunkSource,
    K: BinSink,
    P: RowPersister,
{
    /// Persist every label group's sorted rows through `persister`
    pub fn with_persister<Q: RowPersister>(self, persister: Q) -> Pipeline<S, K, Q> {
        Pipeline {
            source: self.source,
            engine: self.engine,
            sink: self.sink,
            persister: Some(persister),
            allow_list: self.allow_list,
        }
    }

    /// Only process these labels
    pub fn with_allow_list(mut self, labels: Vec<String>) -> Self {
        self.allow_list = Some(labels);
        self
    }

    /// The sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Take the sink back after a run
    pub fn into_sink(self) -> K {
        self.sink
    }

    /// The persister, if one is attached
    pub fn persister(&self) -> Option<&P> {
        self.persister.as_ref()
    }

    /// Drive the source to exhaustion
    pub fn run(&mut self) -> Result<RunSummary> {
        let schema = self.source.schema().clone();
        let mut summary = RunSummary::default();

        if self.source.is_replay() && self.persister.is_some() {
            debug!("replaying persisted chunks, chunk persistence disabled");
            self.persister = None;
        }

        let mut accumulator = LabelAccumulator::new(schema.label_index());
        if let Some(labels) = &self.allow_list {
            accumulator = accumulator.with_allow_list(labels.iter().cloned());
        }

        while let Some(chunk) = self.source.next_chunk()? {
            summary.chunks_read += 1;
            info!(chunk_id = chunk.id(), rows = chunk.len(), "loading chunk");
            for group in accumulator.push_chunk(chunk) {
                self.process_group(&schema, group, &mut summary)?;
            }
        }

        if let Some(group) = accumulator.finish() {
            self.process_group(&schema, group, &mut summary)?;
        }

        self.sink.flush()?;
        summary.diagnostics = accumulator.into_diagnostics();

        info!(
            chunks = summary.chunks_read,
            groups = summary.groups_flushed,
            bins = summary.bins_emitted,
            failed = summary.failures.len(),
            "binning run finished"
        );
        Ok(summary)
    }

    fn process_group(
        &mut self,
        schema: &Schema,
        mut group: LabelGroup,
        summary: &mut RunSummary,
    ) -> Result<()> {
        summary.groups_flushed += 1;

        if let Err(e) = group.sort_by_range(schema.range_index()) {
            warn!(label = group.label(), error = %e, "range column missing, keeping input order");
        }

        if let Some(persister) = self.persister.as_mut() {
            if let Err(e) = persister.persist(schema, group.label(), group.rows()) {
                warn!(label = group.label(), error = %e, "label rows could not be saved");
                summary.persistence_failures += 1;
            }
        }

        match self.engine.bin(schema, group.label(), group.rows()) {
            Ok(bins) => {
                summary.bins_emitted += bins.len();
                self.sink.consume(bins)
            }
            Err(e) if !e.is_fatal() => {
                error!(label = group.label(), error = %e, "aggregating data over slices has failed");
                summary.failures.push(LabelFailure {
                    label: group.label().to_string(),
                    rows: group.len(),
                    reason: e.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
