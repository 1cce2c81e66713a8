//! Chunk source trait and an in-memory implementation

use std::collections::VecDeque;

use crate::chunk::{Chunk, Row};
use crate::error::Result;
use crate::schema::Schema;

/// A lazy, finite, single-pass sequence of chunks
pub trait ChunkSource {
    /// Schema of the rows this source produces
    fn schema(&self) -> &Schema;

    /// Retrieve the next chunk. Returns `None` when exhausted.
    fn next_chunk(&mut self) -> Result<Option<Chunk>>;

    /// Whether chunks from this source are complete per-label row sets
    fn is_replay(&self) -> bool {
        false
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn schema(&self) -> &Schema {
        (**self).schema()
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        (**self).next_chunk()
    }

    fn is_replay(&self) -> bool {
        (**self).is_replay()
    }
}

/// A chunk source over rows already in memory
pub struct MemoryChunkSource {
    schema: Schema,
    chunks: VecDeque<Chunk>,
    replay: bool,
}

impl MemoryChunkSource {
    /// Split `rows` into streaming chunks of `chunk_size` rows, ids from 1
    pub fn new(schema: Schema, rows: Vec<Row>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let mut chunks = VecDeque::new();
        let mut rows = rows.into_iter().peekable();
        let mut id = 1;

        while rows.peek().is_some() {
            let block: Vec<Row> = rows.by_ref().take(chunk_size).collect();
            chunks.push_back(Chunk::new(id, block));
            id += 1;
        }

        Self {
            schema,
            chunks,
            replay: false,
        }
    }

    /// One complete chunk per row set, as a directory replay would produce
    pub fn replay(schema: Schema, row_sets: Vec<Vec<Row>>) -> Self {
        let chunks = row_sets
            .into_iter()
            .enumerate()
            .map(|(i, rows)| Chunk::complete(i + 1, None, rows))
            .collect();

        Self {
            schema,
            chunks,
            replay: true,
        }
    }
}

impl ChunkSource for MemoryChunkSource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        Ok(self.chunks.pop_front())
    }

    fn is_replay(&self) -> bool {
        self.replay
    }
}
