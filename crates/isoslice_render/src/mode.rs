use image::RgbaImage;
use isoslice_shared::block::BlockPropertyTable;
use isoslice_shared::coords::{ChunkPos, SECTION_SIZE};
use serde::{Deserialize, Serialize};

use crate::atlas::TextureView;
use crate::composite::{alpha_over, fill_over};
use crate::error::RenderError;
use crate::grid::{ChunkGrid, DataKind};
use crate::pipeline::RenderCursor;

const TOP: usize = SECTION_SIZE - 1;
const MAX_LIGHT: u16 = 15;

/// Read-only state a render mode may consult while deciding or drawing.
#[derive(Clone, Copy)]
pub struct ModeContext<'a> {
    pub grid: &'a ChunkGrid,
    pub properties: &'a BlockPropertyTable,
}

/// Visibility rules and compositing for one render pass over a section.
pub trait RenderMode: Send {
    fn hidden(&self, ctx: &ModeContext<'_>, x: usize, y: usize, z: usize) -> bool;

    fn occluded(&self, ctx: &ModeContext<'_>, x: usize, y: usize, z: usize) -> bool {
        nearer_neighbours_opaque(self, ctx, x, y, z)
    }

    fn draw(
        &mut self,
        ctx: &ModeContext<'_>,
        target: &mut RgbaImage,
        cursor: &RenderCursor,
        texture: TextureView<'_>,
    );
}

/// A voxel is occluded when its -x, +z and +y neighbours inside the section
/// are all drawn and opaque. Voxels on those faces of the section never are.
pub fn nearer_neighbours_opaque<M: RenderMode + ?Sized>(
    mode: &M,
    ctx: &ModeContext<'_>,
    x: usize,
    y: usize,
    z: usize,
) -> bool {
    if x == 0 || y == TOP || z == TOP {
        return false;
    }
    let neighbours = [(x - 1, y, z), (x, y, z + 1), (x, y + 1, z)];
    neighbours.iter().all(|&(nx, ny, nz)| {
        !mode.hidden(ctx, nx, ny, nz)
            && !ctx
                .properties
                .is_transparent(ctx.grid.block(nx as i32, ny as i32, nz as i32))
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderModeKind {
    #[default]
    Normal,
    Lighting {
        strength: f32,
    },
    Height {
        min_y: i32,
        max_y: i32,
    },
}

impl RenderModeKind {
    pub fn create(&self, chunk: ChunkPos) -> Result<Box<dyn RenderMode>, RenderError> {
        match *self {
            Self::Normal => Ok(Box::new(NormalMode)),
            Self::Lighting { strength } => {
                if !(0.0..=1.0).contains(&strength) {
                    return Err(RenderError::ModeConstruction(format!(
                        "lighting strength {strength} must lie in 0.0..=1.0"
                    )));
                }
                Ok(Box::new(LightingMode {
                    strength: (strength * 255.0).round() as u8,
                }))
            }
            Self::Height { min_y, max_y } => {
                if min_y > max_y {
                    return Err(RenderError::ModeConstruction(format!(
                        "height range {min_y}..={max_y} is empty"
                    )));
                }
                Ok(Box::new(HeightMode {
                    base_y: i64::from(chunk.y) * SECTION_SIZE as i64,
                    min_y,
                    max_y,
                }))
            }
        }
    }
}

pub struct NormalMode;

impl RenderMode for NormalMode {
    fn hidden(&self, _ctx: &ModeContext<'_>, _x: usize, _y: usize, _z: usize) -> bool {
        false
    }

    fn draw(
        &mut self,
        _ctx: &ModeContext<'_>,
        target: &mut RgbaImage,
        cursor: &RenderCursor,
        texture: TextureView<'_>,
    ) {
        alpha_over(target, texture.source, texture.mask, cursor.imgx, cursor.imgy);
    }
}

/// Darkens each block through its light mask by the light reaching its top face.
pub struct LightingMode {
    strength: u8,
}

impl LightingMode {
    fn darkness(&self, ctx: &ModeContext<'_>, cursor: &RenderCursor) -> u8 {
        let (x, y, z) = (cursor.x as i32, cursor.y as i32 + 1, cursor.z as i32);
        let sky = ctx.grid.get(DataKind::SkyLight, x, y, z);
        let block = ctx.grid.get(DataKind::BlockLight, x, y, z);
        let level = sky.max(block).min(MAX_LIGHT);
        let shade = u32::from(MAX_LIGHT - level) * u32::from(self.strength) / u32::from(MAX_LIGHT);
        shade as u8
    }
}

impl RenderMode for LightingMode {
    fn hidden(&self, _ctx: &ModeContext<'_>, _x: usize, _y: usize, _z: usize) -> bool {
        false
    }

    fn draw(
        &mut self,
        ctx: &ModeContext<'_>,
        target: &mut RgbaImage,
        cursor: &RenderCursor,
        texture: TextureView<'_>,
    ) {
        alpha_over(target, texture.source, texture.mask, cursor.imgx, cursor.imgy);
        if let Some(light) = texture.light {
            let darkness = self.darkness(ctx, cursor);
            fill_over(target, light, [0, 0, 0], darkness, cursor.imgx, cursor.imgy);
        }
    }
}

/// Hides every voxel whose world height falls outside `min_y..=max_y`.
pub struct HeightMode {
    /// World y of the section's bottom layer; wide enough for any section index.
    base_y: i64,
    min_y: i32,
    max_y: i32,
}

impl RenderMode for HeightMode {
    fn hidden(&self, _ctx: &ModeContext<'_>, _x: usize, y: usize, _z: usize) -> bool {
        let world_y = self.base_y + y as i64;
        world_y < i64::from(self.min_y) || world_y > i64::from(self.max_y)
    }

    fn draw(
        &mut self,
        _ctx: &ModeContext<'_>,
        target: &mut RgbaImage,
        cursor: &RenderCursor,
        texture: TextureView<'_>,
    ) {
        alpha_over(target, texture.source, texture.mask, cursor.imgx, cursor.imgy);
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use isoslice_shared::block::{BlockCatalog, BlockId, BlockPropertyTable};
    use isoslice_shared::chunk::{ChunkColumn, ChunkSection};
    use isoslice_shared::coords::ChunkPos;
    use isoslice_shared::source::MemorySource;

    use super::{ModeContext, RenderModeKind};
    use crate::atlas::TextureEntry;
    use crate::error::RenderError;
    use crate::grid::ChunkGrid;
    use crate::pipeline::RenderCursor;

    fn grid_with(section: ChunkSection) -> ChunkGrid {
        let source = MemorySource::new().with_chunk(0, 0, ChunkColumn::default().with_section(1, section));
        let mut grid = ChunkGrid::new(ChunkPos::new(0, 1, 0));
        grid.ensure_loaded(&source, 0, 0, true).expect("centre");
        grid
    }

    #[test]
    fn normal_mode_occludes_only_fully_covered_voxels() {
        let properties = BlockPropertyTable::build(&BlockCatalog::builtin()).expect("table");
        let mut section = ChunkSection::new_empty();
        for (x, y, z) in [(5, 5, 5), (4, 5, 5), (5, 5, 6), (5, 6, 5)] {
            section.set_block(x, y, z, BlockId::STONE, 0);
        }
        let grid = grid_with(section);
        let ctx = ModeContext {
            grid: &grid,
            properties: &properties,
        };
        let mode = RenderModeKind::Normal.create(ChunkPos::new(0, 1, 0)).expect("mode");

        assert!(mode.occluded(&ctx, 5, 5, 5));
        assert!(!mode.occluded(&ctx, 4, 5, 5));
        assert!(!mode.occluded(&ctx, 0, 5, 5));
        assert!(!mode.hidden(&ctx, 5, 5, 5));
    }

    #[test]
    fn transparent_neighbours_do_not_occlude() {
        let properties = BlockPropertyTable::build(&BlockCatalog::builtin()).expect("table");
        let mut section = ChunkSection::new_empty();
        section.set_block(5, 5, 5, BlockId::STONE, 0);
        section.set_block(4, 5, 5, BlockId::STONE, 0);
        section.set_block(5, 5, 6, BlockId::STONE, 0);
        section.set_block(5, 6, 5, BlockId::GLASS, 0);
        let grid = grid_with(section);
        let ctx = ModeContext {
            grid: &grid,
            properties: &properties,
        };
        let mode = RenderModeKind::Normal.create(ChunkPos::new(0, 1, 0)).expect("mode");
        assert!(!mode.occluded(&ctx, 5, 5, 5));
    }

    #[test]
    fn height_mode_hides_by_world_y() {
        let properties = BlockPropertyTable::build(&BlockCatalog::builtin()).expect("table");
        let grid = grid_with(ChunkSection::new_empty());
        let ctx = ModeContext {
            grid: &grid,
            properties: &properties,
        };
        let mode = RenderModeKind::Height { min_y: 18, max_y: 20 }
            .create(ChunkPos::new(0, 1, 0))
            .expect("mode");
        assert!(mode.hidden(&ctx, 0, 1, 0));
        assert!(!mode.hidden(&ctx, 0, 2, 0));
        assert!(!mode.hidden(&ctx, 0, 4, 0));
        assert!(mode.hidden(&ctx, 0, 5, 0));
    }

    #[test]
    fn height_mode_accepts_extreme_section_indices() {
        let properties = BlockPropertyTable::build(&BlockCatalog::builtin()).expect("table");
        let grid = grid_with(ChunkSection::new_empty());
        let ctx = ModeContext {
            grid: &grid,
            properties: &properties,
        };
        let range = RenderModeKind::Height { min_y: 0, max_y: 10 };

        let high = range.create(ChunkPos::new(0, i32::MAX, 0)).expect("high section");
        assert!(high.hidden(&ctx, 0, 15, 0));
        let low = range.create(ChunkPos::new(0, i32::MIN, 0)).expect("low section");
        assert!(low.hidden(&ctx, 0, 0, 0));

        let everything = RenderModeKind::Height {
            min_y: i32::MIN,
            max_y: i32::MAX,
        }
        .create(ChunkPos::new(0, i32::MAX / 32, 0))
        .expect("wide range");
        assert!(!everything.hidden(&ctx, 0, 0, 0));
    }

    #[test]
    fn invalid_parameters_fail_construction() {
        let chunk = ChunkPos::new(0, 0, 0);
        assert!(matches!(
            RenderModeKind::Height { min_y: 5, max_y: 4 }.create(chunk),
            Err(RenderError::ModeConstruction(_))
        ));
        assert!(matches!(
            RenderModeKind::Lighting { strength: 1.5 }.create(chunk),
            Err(RenderError::ModeConstruction(_))
        ));
        assert!(matches!(
            RenderModeKind::Lighting { strength: f32::NAN }.create(chunk),
            Err(RenderError::ModeConstruction(_))
        ));
    }

    #[test]
    fn lighting_mode_darkens_unlit_blocks_through_the_light_mask() {
        let properties = BlockPropertyTable::build(&BlockCatalog::builtin()).expect("table");
        let mut section = ChunkSection::new_empty();
        section.set_block(2, 2, 2, BlockId::STONE, 0);
        section.set_block(3, 2, 2, BlockId::STONE, 0);
        section.set_light(3, 3, 2, 15, 0);
        let grid = grid_with(section);
        let ctx = ModeContext {
            grid: &grid,
            properties: &properties,
        };
        let mut mode = RenderModeKind::Lighting { strength: 1.0 }
            .create(ChunkPos::new(0, 1, 0))
            .expect("mode");

        let entry = TextureEntry::new(RgbaImage::from_pixel(2, 2, Rgba([200, 200, 200, 255])))
            .with_light(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));

        let mut dark = RgbaImage::new(2, 2);
        let cursor = RenderCursor {
            x: 2,
            y: 2,
            z: 2,
            ..RenderCursor::default()
        };
        mode.draw(&ctx, &mut dark, &cursor, entry.view());
        assert_eq!(dark.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));

        let mut lit = RgbaImage::new(2, 2);
        let cursor = RenderCursor {
            x: 3,
            y: 2,
            z: 2,
            ..RenderCursor::default()
        };
        mode.draw(&ctx, &mut lit, &cursor, entry.view());
        assert_eq!(lit.get_pixel(0, 0), &Rgba([200, 200, 200, 255]));
    }
}
