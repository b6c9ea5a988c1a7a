use isoslice_shared::block::BlockId;
use isoslice_shared::chunk::{ChunkColumn, ChunkSection};
use isoslice_shared::coords::{split_section_coord, ChunkPos, SECTIONS_PER_CHUNK};
use isoslice_shared::source::{SourceError, VoxelSource};
use tracing::{debug, trace};

use crate::error::RenderError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataKind {
    Blocks,
    Data,
    SkyLight,
    BlockLight,
}

impl DataKind {
    fn sentinel(self) -> u16 {
        match self {
            Self::Blocks => BlockId::AIR.0,
            Self::Data | Self::SkyLight | Self::BlockLight => 0,
        }
    }
}

/// Result of asking the grid to make a cell available.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The source had nothing for an optional cell; it now reads as empty.
    Missing,
}

#[derive(Debug, Default)]
struct GridCell {
    loaded: bool,
    sections: [Option<Box<ChunkSection>>; SECTIONS_PER_CHUNK],
}

impl GridCell {
    fn store(&mut self, column: ChunkColumn) {
        for record in column.sections {
            let Ok(index) = usize::try_from(record.y) else {
                continue;
            };
            if let Some(slot) = self.sections.get_mut(index) {
                *slot = Some(Box::new(record.section));
            }
        }
    }
}

/// The 3x3 neighbourhood of chunk columns around the chunk being rendered.
///
/// Cells are loaded at most once and released together by [`unload_all`],
/// which also runs when the grid is dropped.
///
/// [`unload_all`]: ChunkGrid::unload_all
#[derive(Debug)]
pub struct ChunkGrid {
    origin: ChunkPos,
    cells: [[GridCell; 3]; 3],
}

impl ChunkGrid {
    pub fn new(origin: ChunkPos) -> Self {
        Self {
            origin,
            cells: Default::default(),
        }
    }

    pub fn origin(&self) -> ChunkPos {
        self.origin
    }

    pub fn is_loaded(&self, dx: i32, dz: i32) -> bool {
        self.cell(dx, dz).is_some_and(|cell| cell.loaded)
    }

    pub fn loaded_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.loaded)
            .count()
    }

    pub fn ensure_loaded(
        &mut self,
        source: &dyn VoxelSource,
        dx: i32,
        dz: i32,
        required: bool,
    ) -> Result<LoadOutcome, RenderError> {
        match self.load_cell(source, dx, dz) {
            Ok(outcome) => Ok(outcome),
            Err(source_err) if required => Err(RenderError::RequiredChunk {
                x: self.origin.x.wrapping_add(dx),
                z: self.origin.z.wrapping_add(dz),
                source: source_err,
            }),
            Err(source_err) => {
                debug!(
                    "Optional chunk ({}, {}) unavailable: {}",
                    self.origin.x.wrapping_add(dx),
                    self.origin.z.wrapping_add(dz),
                    source_err
                );
                Ok(LoadOutcome::Missing)
            }
        }
    }

    fn load_optional(&mut self, source: &dyn VoxelSource, dx: i32, dz: i32) {
        if let Err(err) = self.load_cell(source, dx, dz) {
            debug!(
                "Optional chunk ({}, {}) unavailable: {}",
                self.origin.x.wrapping_add(dx),
                self.origin.z.wrapping_add(dz),
                err
            );
        }
    }

    fn load_cell(
        &mut self,
        source: &dyn VoxelSource,
        dx: i32,
        dz: i32,
    ) -> Result<LoadOutcome, SourceError> {
        let chunk_x = self.origin.x.wrapping_add(dx);
        let chunk_z = self.origin.z.wrapping_add(dz);
        let Some(cell) = self.cell_mut(dx, dz) else {
            return Ok(LoadOutcome::Missing);
        };
        if cell.loaded {
            return Ok(LoadOutcome::Loaded);
        }

        // Marked before fetching so a failed load is never retried this call.
        cell.loaded = true;
        let column = source.get_chunk(chunk_x, chunk_z)?;
        debug!(
            "Loaded chunk ({}, {}) with {} sections",
            chunk_x,
            chunk_z,
            column.sections.len()
        );
        cell.store(column);
        Ok(LoadOutcome::Loaded)
    }

    /// Reads one value at a coordinate relative to the home chunk's origin.
    ///
    /// `x` and `z` may reach one chunk width past either edge; `y` is relative
    /// to the home section and carries into the sections above and below.
    pub fn get(&self, kind: DataKind, x: i32, y: i32, z: i32) -> u16 {
        let Some((section, lx, ly, lz)) = self.resolve(x, y, z) else {
            return kind.sentinel();
        };
        match kind {
            DataKind::Blocks => section.block(lx, ly, lz).0,
            DataKind::Data => u16::from(section.data(lx, ly, lz)),
            DataKind::SkyLight => u16::from(section.skylight(lx, ly, lz)),
            DataKind::BlockLight => u16::from(section.blocklight(lx, ly, lz)),
        }
    }

    /// Like [`get`](Self::get), but loads the addressed cell (as optional)
    /// on first access.
    pub fn sample(
        &mut self,
        source: &dyn VoxelSource,
        kind: DataKind,
        x: i32,
        y: i32,
        z: i32,
    ) -> u16 {
        let (dx, _) = split_section_coord(x);
        let (dz, _) = split_section_coord(z);
        if (-1..=1).contains(&dx) && (-1..=1).contains(&dz) {
            self.load_optional(source, dx, dz);
        }
        self.get(kind, x, y, z)
    }

    pub fn block(&self, x: i32, y: i32, z: i32) -> BlockId {
        BlockId(self.get(DataKind::Blocks, x, y, z))
    }

    /// The section currently being rendered, if the home cell has it.
    pub fn home_section(&self) -> Option<&ChunkSection> {
        let index = self.origin.section_index()?;
        self.cell(0, 0)?.sections[index].as_deref()
    }

    pub fn unload_all(&mut self) {
        let mut released = 0;
        for cell in self.cells.iter_mut().flatten() {
            if cell.loaded {
                *cell = GridCell::default();
                released += 1;
            }
        }
        if released > 0 {
            trace!(
                "Released {} chunk cells around ({}, {})",
                released,
                self.origin.x,
                self.origin.z
            );
        }
    }

    fn resolve(&self, x: i32, y: i32, z: i32) -> Option<(&ChunkSection, usize, usize, usize)> {
        let (dx, lx) = split_section_coord(x);
        let (dz, lz) = split_section_coord(z);
        let (dy, ly) = split_section_coord(y);
        let cell = self.cell(dx, dz)?;
        if !cell.loaded {
            return None;
        }
        let index = usize::try_from(self.origin.y.checked_add(dy)?).ok()?;
        let section = cell.sections.get(index)?.as_deref()?;
        Some((section, lx, ly, lz))
    }

    fn cell(&self, dx: i32, dz: i32) -> Option<&GridCell> {
        let (ix, iz) = cell_index(dx, dz)?;
        Some(&self.cells[ix][iz])
    }

    fn cell_mut(&mut self, dx: i32, dz: i32) -> Option<&mut GridCell> {
        let (ix, iz) = cell_index(dx, dz)?;
        Some(&mut self.cells[ix][iz])
    }
}

impl Drop for ChunkGrid {
    fn drop(&mut self) {
        self.unload_all();
    }
}

fn cell_index(dx: i32, dz: i32) -> Option<(usize, usize)> {
    let ix = usize::try_from(dx + 1).ok().filter(|&i| i < 3)?;
    let iz = usize::try_from(dz + 1).ok().filter(|&i| i < 3)?;
    Some((ix, iz))
}

#[cfg(test)]
mod tests {
    use isoslice_shared::block::BlockId;
    use isoslice_shared::chunk::{ChunkColumn, ChunkSection};
    use isoslice_shared::coords::ChunkPos;
    use isoslice_shared::source::{MemorySource, SourceError, VoxelSource};

    use super::{ChunkGrid, DataKind, LoadOutcome};
    use crate::error::RenderError;

    fn column_with(block: BlockId, data: u8) -> ChunkColumn {
        let mut section = ChunkSection::new_filled(block, data);
        section.set_light(0, 0, 0, 15, 7);
        ChunkColumn::default().with_section(2, section)
    }

    #[test]
    fn unloaded_cells_read_as_air_and_zero_light() {
        let grid = ChunkGrid::new(ChunkPos::new(0, 2, 0));
        for kind in [
            DataKind::Blocks,
            DataKind::Data,
            DataKind::SkyLight,
            DataKind::BlockLight,
        ] {
            assert_eq!(grid.get(kind, 0, 0, 0), 0);
            assert_eq!(grid.get(kind, -1, 5, 20), 0);
        }
        assert_eq!(grid.loaded_count(), 0);
    }

    #[test]
    fn reads_cross_into_neighbour_cells_with_floor_division() {
        let source = MemorySource::new()
            .with_chunk(5, 5, column_with(BlockId(1), 0))
            .with_chunk(4, 5, column_with(BlockId(2), 3))
            .with_chunk(6, 4, column_with(BlockId(3), 0));
        let mut grid = ChunkGrid::new(ChunkPos::new(5, 2, 5));
        grid.ensure_loaded(&source, 0, 0, true).expect("centre");
        grid.ensure_loaded(&source, -1, 0, false).expect("west");
        grid.ensure_loaded(&source, 1, -1, false).expect("north east");

        assert_eq!(grid.block(0, 0, 0), BlockId(1));
        assert_eq!(grid.block(-1, 0, 0), BlockId(2));
        assert_eq!(grid.get(DataKind::Data, -16, 4, 15), 3);
        assert_eq!(grid.block(16, 0, -1), BlockId(3));
        assert_eq!(grid.block(31, 15, -16), BlockId(3));
        assert_eq!(grid.block(-17, 0, 0), BlockId::AIR);
        assert_eq!(grid.block(0, 0, 16), BlockId::AIR);
        assert_eq!(grid.get(DataKind::SkyLight, 0, 0, 0), 15);
        assert_eq!(grid.get(DataKind::BlockLight, 0, 0, 0), 7);
    }

    #[test]
    fn vertical_offsets_carry_into_adjacent_sections() {
        let column = ChunkColumn::default()
            .with_section(1, ChunkSection::new_filled(BlockId(4), 0))
            .with_section(2, ChunkSection::new_filled(BlockId(1), 0))
            .with_section(3, ChunkSection::new_filled(BlockId(9), 0));
        let source = MemorySource::new().with_chunk(0, 0, column);
        let mut grid = ChunkGrid::new(ChunkPos::new(0, 2, 0));
        grid.ensure_loaded(&source, 0, 0, true).expect("centre");

        assert_eq!(grid.block(0, 15, 0), BlockId(1));
        assert_eq!(grid.block(0, 16, 0), BlockId(9));
        assert_eq!(grid.block(0, -1, 0), BlockId(4));
        // Section 0 is absent and section 4 was never stored.
        assert_eq!(grid.block(0, -17, 0), BlockId::AIR);
        assert_eq!(grid.block(0, 32, 0), BlockId::AIR);
    }

    #[test]
    fn optional_misses_leave_an_empty_loaded_cell() {
        let source = MemorySource::new().with_chunk(0, 0, column_with(BlockId(1), 0));
        let mut grid = ChunkGrid::new(ChunkPos::new(0, 2, 0));

        let outcome = grid.ensure_loaded(&source, 1, 1, false).expect("optional miss");
        assert_eq!(outcome, LoadOutcome::Missing);
        assert!(grid.is_loaded(1, 1));
        assert_eq!(grid.block(20, 0, 20), BlockId::AIR);
    }

    #[test]
    fn required_misses_are_fatal() {
        let source = MemorySource::new();
        let mut grid = ChunkGrid::new(ChunkPos::new(7, 0, -3));
        let err = grid
            .ensure_loaded(&source, 0, 0, true)
            .expect_err("required chunk is absent");
        assert!(matches!(
            err,
            RenderError::RequiredChunk {
                x: 7,
                z: -3,
                source: SourceError::NotFound { .. }
            }
        ));
    }

    struct CountingSource {
        inner: MemorySource,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl VoxelSource for CountingSource {
        fn get_chunk(&self, x: i32, z: i32) -> Result<ChunkColumn, SourceError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.get_chunk(x, z)
        }
    }

    #[test]
    fn cells_are_fetched_at_most_once() {
        let source = CountingSource {
            inner: MemorySource::new().with_chunk(0, 0, column_with(BlockId(1), 0)),
            calls: Default::default(),
        };
        let mut grid = ChunkGrid::new(ChunkPos::new(0, 2, 0));
        grid.ensure_loaded(&source, 0, 0, true).expect("centre");
        grid.ensure_loaded(&source, 0, 0, true).expect("centre again");
        grid.sample(&source, DataKind::Blocks, 3, 3, 3);
        grid.sample(&source, DataKind::Blocks, -1, 3, 3);
        grid.sample(&source, DataKind::Blocks, -2, 3, 3);
        grid.sample(&source, DataKind::Blocks, 40, 3, 3);

        assert_eq!(source.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn unload_all_releases_every_cell() {
        let source = MemorySource::new().with_chunk(0, 0, column_with(BlockId(1), 0));
        let mut grid = ChunkGrid::new(ChunkPos::new(0, 2, 0));
        grid.ensure_loaded(&source, 0, 0, true).expect("centre");
        grid.ensure_loaded(&source, 1, 0, false).expect("east");
        assert_eq!(grid.loaded_count(), 2);
        assert!(grid.home_section().is_some());

        grid.unload_all();
        assert_eq!(grid.loaded_count(), 0);
        assert_eq!(grid.block(0, 0, 0), BlockId::AIR);
        assert!(grid.home_section().is_none());
    }

    #[test]
    fn reads_near_the_ends_of_the_section_range_do_not_overflow() {
        let source = MemorySource::new().with_chunk(0, 0, column_with(BlockId(1), 0));
        let mut grid = ChunkGrid::new(ChunkPos::new(0, i32::MAX, 0));
        grid.ensure_loaded(&source, 0, 0, true).expect("centre");
        assert_eq!(grid.block(0, 16, 0), BlockId::AIR);
        assert_eq!(grid.get(DataKind::SkyLight, 0, 40, 0), 0);
        assert!(grid.home_section().is_none());
    }
}
