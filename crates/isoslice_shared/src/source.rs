use std::io;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::chunk::ChunkColumn;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("chunk ({x}, {z}) does not exist")]
    NotFound { x: i32, z: i32 },
    #[error("chunk ({x}, {z}) is corrupt: {reason}")]
    Corrupt { x: i32, z: i32, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Supplies chunk columns by absolute chunk coordinate.
///
/// Implementations are shared between render workers, so lookups take `&self`.
pub trait VoxelSource: Send + Sync {
    fn get_chunk(&self, chunk_x: i32, chunk_z: i32) -> Result<ChunkColumn, SourceError>;
}

/// In-memory chunk store, handy for tools that synthesize terrain and for tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    chunks: FxHashMap<(i32, i32), ChunkColumn>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chunk_x: i32, chunk_z: i32, column: ChunkColumn) {
        self.chunks.insert((chunk_x, chunk_z), column);
    }

    pub fn with_chunk(mut self, chunk_x: i32, chunk_z: i32, column: ChunkColumn) -> Self {
        self.insert(chunk_x, chunk_z, column);
        self
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl VoxelSource for MemorySource {
    fn get_chunk(&self, chunk_x: i32, chunk_z: i32) -> Result<ChunkColumn, SourceError> {
        self.chunks
            .get(&(chunk_x, chunk_z))
            .cloned()
            .ok_or(SourceError::NotFound {
                x: chunk_x,
                z: chunk_z,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{MemorySource, SourceError, VoxelSource};
    use crate::block::BlockId;
    use crate::chunk::{ChunkColumn, ChunkSection};

    #[test]
    fn memory_source_returns_inserted_chunks_and_reports_missing_ones() {
        let column = ChunkColumn::default().with_section(0, ChunkSection::new_filled(BlockId(1), 0));
        let source = MemorySource::new().with_chunk(3, -2, column.clone());

        assert_eq!(source.len(), 1);
        assert_eq!(source.get_chunk(3, -2).expect("present chunk"), column);
        assert!(matches!(
            source.get_chunk(0, 0),
            Err(SourceError::NotFound { x: 0, z: 0 })
        ));
    }
}
