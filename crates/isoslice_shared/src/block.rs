use std::collections::HashSet;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[repr(transparent)]
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: Self = Self(0);
    pub const STONE: Self = Self(1);
    pub const GRASS: Self = Self(2);
    pub const DIRT: Self = Self(3);
    pub const FLOWING_WATER: Self = Self(8);
    pub const WATER: Self = Self(9);
    pub const FLOWING_LAVA: Self = Self(10);
    pub const LAVA: Self = Self(11);
    pub const SAND: Self = Self(12);
    pub const LEAVES: Self = Self(18);
    pub const GLASS: Self = Self(20);
    pub const TALL_GRASS: Self = Self(31);
    pub const WOOL: Self = Self(35);
    pub const ICE: Self = Self(79);
    pub const PORTAL: Self = Self(90);
    pub const STAINED_GLASS: Self = Self(95);
    pub const LILY_PAD: Self = Self(111);
    pub const DOUBLE_PLANT: Self = Self(175);

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Block kinds whose texture variant is synthesized from neighbours or world
/// position instead of persisted data.
pub const PSEUDO_DATA_BLOCKS: [BlockId; 8] = [
    BlockId::FLOWING_WATER,
    BlockId::WATER,
    BlockId::GLASS,
    BlockId::ICE,
    BlockId::STAINED_GLASS,
    BlockId::PORTAL,
    BlockId::LILY_PAD,
    BlockId::DOUBLE_PLANT,
];

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BlockProperties: u8 {
        const KNOWN       = 0b0000_0001;
        const TRANSPARENT = 0b0000_0010;
        const SOLID       = 0b0000_0100;
        const FLUID       = 0b0000_1000;
        const NOSPAWN     = 0b0001_0000;
        const NODATA      = 0b0010_0000;
        const PSEUDO_DATA = 0b0100_0000;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("block catalog is missing required attribute '{0}'")]
    MissingAttribute(&'static str),
    #[error("block catalog attribute '{name}' must be greater than zero")]
    InvalidBound { name: &'static str },
}

/// Static classification of block kinds, usually read from a TOML file.
///
/// Every field is optional at the serde level so that an incomplete catalog
/// surfaces as a [`CatalogError`] at table construction instead of a parse
/// error with no attribute name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockCatalog {
    pub max_blockid: Option<u32>,
    pub max_data: Option<u32>,
    pub known: Option<Vec<u16>>,
    pub transparent: Option<Vec<u16>>,
    pub solid: Option<Vec<u16>>,
    pub fluid: Option<Vec<u16>>,
    pub nospawn: Option<Vec<u16>>,
    pub nodata: Option<Vec<u16>>,
}

impl BlockCatalog {
    pub fn builtin() -> Self {
        let known: Vec<u16> = (0..=255).collect();
        Self {
            max_blockid: Some(256),
            max_data: Some(512),
            known: Some(known),
            transparent: Some(vec![
                BlockId::AIR.0,
                BlockId::FLOWING_WATER.0,
                BlockId::WATER.0,
                BlockId::LEAVES.0,
                BlockId::GLASS.0,
                BlockId::TALL_GRASS.0,
                BlockId::ICE.0,
                BlockId::PORTAL.0,
                BlockId::STAINED_GLASS.0,
                BlockId::LILY_PAD.0,
                BlockId::DOUBLE_PLANT.0,
            ]),
            solid: Some(vec![
                BlockId::STONE.0,
                BlockId::GRASS.0,
                BlockId::DIRT.0,
                BlockId::SAND.0,
                BlockId::LEAVES.0,
                BlockId::GLASS.0,
                BlockId::WOOL.0,
                BlockId::ICE.0,
                BlockId::STAINED_GLASS.0,
            ]),
            fluid: Some(vec![
                BlockId::FLOWING_WATER.0,
                BlockId::WATER.0,
                BlockId::FLOWING_LAVA.0,
                BlockId::LAVA.0,
            ]),
            nospawn: Some(vec![
                BlockId::GLASS.0,
                BlockId::ICE.0,
                BlockId::STAINED_GLASS.0,
                BlockId::LEAVES.0,
            ]),
            nodata: Some(vec![
                BlockId::AIR.0,
                BlockId::STONE.0,
                BlockId::GRASS.0,
                BlockId::DIRT.0,
                BlockId::SAND.0,
                BlockId::TALL_GRASS.0,
            ]),
        }
    }
}

/// Dense per-block-kind bitmask built once from a [`BlockCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPropertyTable {
    max_blockid: u32,
    max_data: u32,
    properties: Vec<BlockProperties>,
}

impl BlockPropertyTable {
    pub fn build(catalog: &BlockCatalog) -> Result<Self, CatalogError> {
        let max_blockid = require(catalog.max_blockid, "max_blockid")?;
        let max_data = require(catalog.max_data, "max_data")?;
        let known = id_set(catalog.known.as_deref(), "known_blocks")?;
        let transparent = id_set(catalog.transparent.as_deref(), "transparent_blocks")?;
        let solid = id_set(catalog.solid.as_deref(), "solid_blocks")?;
        let fluid = id_set(catalog.fluid.as_deref(), "fluid_blocks")?;
        let nospawn = id_set(catalog.nospawn.as_deref(), "nospawn_blocks")?;
        let nodata = id_set(catalog.nodata.as_deref(), "nodata_blocks")?;

        if max_blockid == 0 {
            return Err(CatalogError::InvalidBound { name: "max_blockid" });
        }
        if max_data == 0 {
            return Err(CatalogError::InvalidBound { name: "max_data" });
        }

        let pseudo: HashSet<u16> = PSEUDO_DATA_BLOCKS.iter().map(|block| block.0).collect();
        let members = [
            (&known, BlockProperties::KNOWN),
            (&transparent, BlockProperties::TRANSPARENT),
            (&solid, BlockProperties::SOLID),
            (&fluid, BlockProperties::FLUID),
            (&nospawn, BlockProperties::NOSPAWN),
            (&nodata, BlockProperties::NODATA),
            (&pseudo, BlockProperties::PSEUDO_DATA),
        ];

        let mut properties = vec![BlockProperties::empty(); max_blockid as usize];
        for (raw_id, entry) in properties.iter_mut().enumerate() {
            let Ok(id) = u16::try_from(raw_id) else {
                break;
            };
            for (set, flag) in &members {
                if set.contains(&id) {
                    entry.insert(*flag);
                }
            }
        }

        debug!(
            "Built block property table: {} kinds, data stride {}",
            max_blockid, max_data
        );

        Ok(Self {
            max_blockid,
            max_data,
            properties,
        })
    }

    pub fn max_blockid(&self) -> u32 {
        self.max_blockid
    }

    pub fn max_data(&self) -> u32 {
        self.max_data
    }

    pub fn properties(&self, block: BlockId) -> BlockProperties {
        self.properties
            .get(block.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn has(&self, block: BlockId, property: BlockProperties) -> bool {
        self.properties(block).contains(property)
    }

    pub fn is_transparent(&self, block: BlockId) -> bool {
        self.has(block, BlockProperties::TRANSPARENT)
    }

    pub fn is_solid(&self, block: BlockId) -> bool {
        self.has(block, BlockProperties::SOLID)
    }

    pub fn needs_pseudo_data(&self, block: BlockId) -> bool {
        self.has(block, BlockProperties::PSEUDO_DATA)
    }

    pub fn contains(&self, block: BlockId) -> bool {
        u32::from(block.0) < self.max_blockid
    }
}

fn require(value: Option<u32>, name: &'static str) -> Result<u32, CatalogError> {
    value.ok_or(CatalogError::MissingAttribute(name))
}

fn id_set(ids: Option<&[u16]>, name: &'static str) -> Result<HashSet<u16>, CatalogError> {
    ids.map(|ids| ids.iter().copied().collect())
        .ok_or(CatalogError::MissingAttribute(name))
}
