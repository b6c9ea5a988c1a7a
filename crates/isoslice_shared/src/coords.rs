use glam::IVec3;
use serde::{Deserialize, Serialize};

pub const SECTION_SIZE: usize = 16;
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;
/// Number of vertical sections a chunk column can hold; valid section
/// indices are `0..SECTIONS_PER_CHUNK`.
pub const SECTIONS_PER_CHUNK: usize = 16;

const SECTION_SIZE_I32: i32 = SECTION_SIZE as i32;

/// Chunk column coordinate (`x`, `z`) plus the vertical section index `y`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn section_index(self) -> Option<usize> {
        usize::try_from(self.y)
            .ok()
            .filter(|&index| index < SECTIONS_PER_CHUNK)
    }
}

/// Splits a coordinate relative to a chunk origin into the chunk offset and
/// the local coordinate inside that chunk.
pub fn split_section_coord(value: i32) -> (i32, usize) {
    (
        value.div_euclid(SECTION_SIZE_I32),
        value.rem_euclid(SECTION_SIZE_I32) as usize,
    )
}

pub fn section_to_world(chunk: ChunkPos, x: i32, y: i32, z: i32) -> IVec3 {
    IVec3::new(
        chunk.x.wrapping_mul(SECTION_SIZE_I32).wrapping_add(x),
        chunk.y.wrapping_mul(SECTION_SIZE_I32).wrapping_add(y),
        chunk.z.wrapping_mul(SECTION_SIZE_I32).wrapping_add(z),
    )
}

pub fn xyz_to_index(x: usize, y: usize, z: usize) -> usize {
    x + z * SECTION_SIZE + y * SECTION_SIZE * SECTION_SIZE
}
