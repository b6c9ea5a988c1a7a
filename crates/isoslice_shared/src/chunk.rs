use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::block::BlockId;
use crate::coords::{xyz_to_index, SECTION_VOLUME};

/// One 16x16x16 voxel cube stored as four parallel arrays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkSection {
    pub blocks: Box<[u16; SECTION_VOLUME]>,
    pub data: Box<[u8; SECTION_VOLUME]>,
    pub skylight: Box<[u8; SECTION_VOLUME]>,
    pub blocklight: Box<[u8; SECTION_VOLUME]>,
}

impl ChunkSection {
    pub fn new_empty() -> Self {
        Self {
            blocks: Box::new([BlockId::AIR.0; SECTION_VOLUME]),
            data: Box::new([0; SECTION_VOLUME]),
            skylight: Box::new([0; SECTION_VOLUME]),
            blocklight: Box::new([0; SECTION_VOLUME]),
        }
    }

    pub fn new_filled(block: BlockId, data: u8) -> Self {
        Self {
            blocks: Box::new([block.0; SECTION_VOLUME]),
            data: Box::new([data; SECTION_VOLUME]),
            skylight: Box::new([0; SECTION_VOLUME]),
            blocklight: Box::new([0; SECTION_VOLUME]),
        }
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> BlockId {
        BlockId(self.blocks[xyz_to_index(x, y, z)])
    }

    pub fn data(&self, x: usize, y: usize, z: usize) -> u8 {
        self.data[xyz_to_index(x, y, z)]
    }

    pub fn skylight(&self, x: usize, y: usize, z: usize) -> u8 {
        self.skylight[xyz_to_index(x, y, z)]
    }

    pub fn blocklight(&self, x: usize, y: usize, z: usize) -> u8 {
        self.blocklight[xyz_to_index(x, y, z)]
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId, data: u8) {
        let index = xyz_to_index(x, y, z);
        self.blocks[index] = block.0;
        self.data[index] = data;
    }

    pub fn set_light(&mut self, x: usize, y: usize, z: usize, skylight: u8, blocklight: u8) {
        let index = xyz_to_index(x, y, z);
        self.skylight[index] = skylight;
        self.blocklight[index] = blocklight;
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|&block| block == BlockId::AIR.0)
    }
}

impl Default for ChunkSection {
    fn default() -> Self {
        Self::new_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct SectionArrays {
    blocks: Vec<u16>,
    data: Vec<u8>,
    skylight: Vec<u8>,
    blocklight: Vec<u8>,
}

fn boxed_array<T, E>(values: Vec<T>, name: &str) -> Result<Box<[T; SECTION_VOLUME]>, E>
where
    E: de::Error,
{
    let len = values.len();
    values
        .into_boxed_slice()
        .try_into()
        .map_err(|_| E::custom(format!("expected {SECTION_VOLUME} {name} entries, got {len}")))
}

impl Serialize for ChunkSection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SectionArrays {
            blocks: self.blocks.to_vec(),
            data: self.data.to_vec(),
            skylight: self.skylight.to_vec(),
            blocklight: self.blocklight.to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChunkSection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let arrays = SectionArrays::deserialize(deserializer)?;
        Ok(Self {
            blocks: boxed_array::<_, D::Error>(arrays.blocks, "block")?,
            data: boxed_array::<_, D::Error>(arrays.data, "data")?,
            skylight: boxed_array::<_, D::Error>(arrays.skylight, "skylight")?,
            blocklight: boxed_array::<_, D::Error>(arrays.blocklight, "blocklight")?,
        })
    }
}

/// A section together with the vertical index it was stored under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub y: i32,
    pub section: ChunkSection,
}

/// Everything a voxel source hands back for one chunk column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkColumn {
    pub sections: Vec<SectionRecord>,
    pub biomes: Vec<u32>,
    #[serde(default)]
    pub new_biomes: bool,
}

impl ChunkColumn {
    pub fn with_section(mut self, y: i32, section: ChunkSection) -> Self {
        self.insert_section(y, section);
        self
    }

    pub fn insert_section(&mut self, y: i32, section: ChunkSection) {
        if let Some(existing) = self.sections.iter_mut().find(|record| record.y == y) {
            existing.section = section;
        } else {
            self.sections.push(SectionRecord { y, section });
        }
    }

    pub fn section(&self, y: i32) -> Option<&ChunkSection> {
        self.sections
            .iter()
            .find(|record| record.y == y)
            .map(|record| &record.section)
    }
}
