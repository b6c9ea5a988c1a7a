//! Synthesized texture variants for block kinds that carry no persisted data
//! describing how they join their neighbours.

use isoslice_shared::block::BlockId;
use isoslice_shared::coords::{section_to_world, ChunkPos};
use isoslice_shared::source::VoxelSource;

use crate::grid::{ChunkGrid, DataKind};

const PANE_FRAME_BLOCKS: [BlockId; 2] = [BlockId::GLASS, BlockId::STAINED_GLASS];

/// Read access to voxels around the one being rendered, by coordinate
/// relative to the home section.
pub trait NeighborLookup {
    fn block(&mut self, x: i32, y: i32, z: i32) -> BlockId;
    fn data(&mut self, x: i32, y: i32, z: i32) -> u8;
}

impl NeighborLookup for ChunkGrid {
    fn block(&mut self, x: i32, y: i32, z: i32) -> BlockId {
        ChunkGrid::block(self, x, y, z)
    }

    fn data(&mut self, x: i32, y: i32, z: i32) -> u8 {
        self.get(DataKind::Data, x, y, z) as u8
    }
}

/// Grid view that loads neighbouring cells on first touch.
pub struct LazyGrid<'a> {
    pub grid: &'a mut ChunkGrid,
    pub source: &'a dyn VoxelSource,
}

impl NeighborLookup for LazyGrid<'_> {
    fn block(&mut self, x: i32, y: i32, z: i32) -> BlockId {
        BlockId(self.grid.sample(self.source, DataKind::Blocks, x, y, z))
    }

    fn data(&mut self, x: i32, y: i32, z: i32) -> u8 {
        self.grid.sample(self.source, DataKind::Data, x, y, z) as u8
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PseudoKind {
    Liquid,
    Pane,
    Portal,
    LilyPad,
    DoublePlant,
}

impl PseudoKind {
    pub fn of(block: BlockId) -> Option<Self> {
        match block {
            BlockId::FLOWING_WATER | BlockId::WATER => Some(Self::Liquid),
            BlockId::GLASS | BlockId::ICE | BlockId::STAINED_GLASS => Some(Self::Pane),
            BlockId::PORTAL => Some(Self::Portal),
            BlockId::LILY_PAD => Some(Self::LilyPad),
            BlockId::DOUBLE_PLANT => Some(Self::DoublePlant),
            _ => None,
        }
    }
}

/// Sides of `(x, y, z)` whose horizontal neighbour is also `block`.
///
/// Bit 3 is +x, bit 2 is +z, bit 1 is -x and bit 0 is -z.
pub fn check_adjacent(lookup: &mut impl NeighborLookup, block: BlockId, x: i32, y: i32, z: i32) -> u16 {
    let mut sides = 0;
    if lookup.block(x + 1, y, z) == block {
        sides |= 1 << 3;
    }
    if lookup.block(x, y, z + 1) == block {
        sides |= 1 << 2;
    }
    if lookup.block(x - 1, y, z) == block {
        sides |= 1 << 1;
    }
    if lookup.block(x, y, z - 1) == block {
        sides |= 1;
    }
    sides
}

pub fn synthesize(
    lookup: &mut impl NeighborLookup,
    block: BlockId,
    data: u16,
    x: i32,
    y: i32,
    z: i32,
    origin: ChunkPos,
) -> u16 {
    let Some(kind) = PseudoKind::of(block) else {
        return 0;
    };

    match kind {
        PseudoKind::Liquid => {
            let mut pseudo = check_adjacent(lookup, block, x, y, z) ^ 0x0f;
            if lookup.block(x, y + 1, z) != block {
                pseudo |= 0x10;
            }
            pseudo
        }
        PseudoKind::Pane => {
            let top = if PANE_FRAME_BLOCKS.contains(&lookup.block(x, y + 1, z)) {
                0
            } else {
                16
            };
            let edges = (check_adjacent(lookup, block, x, y, z) ^ 0x0f) | top;
            (edges << 4) | (data & 0x0f)
        }
        PseudoKind::Portal => check_adjacent(lookup, block, x, y, z),
        PseudoKind::LilyPad => {
            let world = section_to_world(origin, x, y, z);
            lily_pad_rotation(world.x, world.y, world.z)
        }
        PseudoKind::DoublePlant => {
            if lookup.block(x, y - 1, z) == block {
                u16::from(lookup.data(x, y - 1, z)) | 0x8
            } else {
                data
            }
        }
    }
}

/// Rotation (0..=3) of a lily pad at a world position.
pub fn lily_pad_rotation(wx: i32, wy: i32, wz: i32) -> u16 {
    // Coordinate products wrap at 32 bits before widening.
    let mut pr = i64::from(wx.wrapping_mul(3_129_871) ^ wz.wrapping_mul(116_129_781) ^ wy);
    pr = pr
        .wrapping_mul(pr)
        .wrapping_mul(42_317_861)
        .wrapping_add(pr.wrapping_mul(11));
    (3 & (pr >> 16)) as u16
}
