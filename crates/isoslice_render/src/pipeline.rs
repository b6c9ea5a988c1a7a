//! Isometric rendering of one chunk section into a target image.
//!
//! Voxels are visited far to near (`x` descending, then `z` and `y`
//! ascending) so that nearer textures are composited over farther ones
//! without any depth test.

use image::RgbaImage;
use isoslice_shared::block::{BlockId, BlockProperties};
use isoslice_shared::coords::{ChunkPos, SECTION_SIZE};
use isoslice_shared::source::VoxelSource;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{trace, warn};

use crate::atlas::TextureAtlas;
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::grid::{ChunkGrid, DataKind};
use crate::mode::{ModeContext, RenderMode, RenderModeKind};
use crate::pseudo::{self, LazyGrid};

const TILE_STEP_X: i32 = 12;
const TILE_STEP_Y: i32 = 6;
const LAYER_STEP: i32 = 12;
/// Vertical bias placing the bottom layer of the section inside the tile.
const SECTION_BIAS_Y: i32 = 16 * 12 + 15 * 6;
/// Anchors this far outside the image are still drawn.
const EDGE_MARGIN: i64 = 24;
const JITTER_SEED: u64 = 1;

/// Per-voxel state handed to [`RenderMode::draw`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderCursor {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub block: BlockId,
    pub data: u8,
    pub pseudo_data: u16,
    pub imgx: i32,
    pub imgy: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionRequest {
    /// Chunk column `x`/`z` and the vertical section index `y`.
    pub chunk: ChunkPos,
    pub offset: (i32, i32),
    pub mode: RenderModeKind,
}

impl SectionRequest {
    pub fn new(chunk: ChunkPos, offset: (i32, i32), mode: RenderModeKind) -> Self {
        Self {
            chunk,
            offset,
            mode,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionStats {
    /// Non-air voxels considered.
    pub visited: u32,
    pub drawn: u32,
    pub skipped_out_of_range: u32,
    pub skipped_no_texture: u32,
}

/// Renders one section into `target`, building the render mode from the request.
pub fn render_section(
    ctx: &RenderContext,
    source: &dyn VoxelSource,
    request: &SectionRequest,
    target: &mut RgbaImage,
    atlas: &TextureAtlas,
) -> Result<SectionStats, RenderError> {
    let mut mode = request.mode.create(request.chunk)?;
    let result = render_with_mode(
        ctx,
        source,
        request.chunk,
        request.offset,
        target,
        mode.as_mut(),
        atlas,
    );
    drop(mode);
    trace!(
        "Released {:?} render mode for section ({}, {}, {})",
        request.mode,
        request.chunk.x,
        request.chunk.y,
        request.chunk.z
    );
    result
}

/// Renders one section with a caller-supplied render mode.
pub fn render_with_mode(
    ctx: &RenderContext,
    source: &dyn VoxelSource,
    chunk: ChunkPos,
    offset: (i32, i32),
    target: &mut RgbaImage,
    mode: &mut dyn RenderMode,
    atlas: &TextureAtlas,
) -> Result<SectionStats, RenderError> {
    let properties = ctx.properties()?;
    if atlas.max_data() != properties.max_data() {
        return Err(RenderError::AtlasMismatch {
            atlas: atlas.max_data(),
            catalog: properties.max_data(),
        });
    }

    let mut stats = SectionStats::default();
    let mut grid = ChunkGrid::new(chunk);
    grid.ensure_loaded(source, 0, 0, true)?;

    if chunk.section_index().is_none() {
        warn!(
            "Section index {} of chunk ({}, {}) is out of range",
            chunk.y, chunk.x, chunk.z
        );
        return Ok(stats);
    }
    if grid.home_section().is_none() {
        trace!(
            "Chunk ({}, {}) has no section {}",
            chunk.x,
            chunk.z,
            chunk.y
        );
        return Ok(stats);
    }

    let mut rng = StdRng::seed_from_u64(JITTER_SEED);
    let width = i64::from(target.width());
    let height = i64::from(target.height());

    for x in (0..SECTION_SIZE).rev() {
        for z in 0..SECTION_SIZE {
            let (xi, zi) = (x as i32, z as i32);
            let imgx = offset.0 + xi * TILE_STEP_X + zi * TILE_STEP_X;
            let mut imgy = offset.1 - xi * TILE_STEP_Y + zi * TILE_STEP_Y + SECTION_BIAS_Y;

            for y in 0..SECTION_SIZE {
                let yi = y as i32;
                imgy -= LAYER_STEP;

                let block = grid.block(xi, yi, zi);
                if block == BlockId::AIR {
                    continue;
                }
                stats.visited += 1;

                let view = ModeContext {
                    grid: &grid,
                    properties,
                };
                if mode.hidden(&view, x, y, z) {
                    continue;
                }
                if !within_margin(imgx, width) || !within_margin(imgy, height) {
                    continue;
                }
                if mode.occluded(&view, x, y, z) {
                    continue;
                }

                let (data, pseudo_data, resolved) =
                    if properties.has(block, BlockProperties::NODATA) {
                        (0, 0, 0)
                    } else {
                        let data = grid.get(DataKind::Data, xi, yi, zi) as u8;
                        if properties.needs_pseudo_data(block) {
                            let mut lazy = LazyGrid {
                                grid: &mut grid,
                                source,
                            };
                            let synthesized = pseudo::synthesize(
                                &mut lazy,
                                block,
                                u16::from(data),
                                xi,
                                yi,
                                zi,
                                chunk,
                            );
                            (data, synthesized, synthesized)
                        } else {
                            (data, 0, u16::from(data))
                        }
                    };

                if !properties.contains(block) || u32::from(resolved) >= properties.max_data() {
                    stats.skipped_out_of_range += 1;
                    continue;
                }
                let Some(entry) = atlas.lookup(block, u32::from(resolved)) else {
                    stats.skipped_no_texture += 1;
                    continue;
                };

                let mut cursor = RenderCursor {
                    x,
                    y,
                    z,
                    block,
                    data,
                    pseudo_data,
                    imgx,
                    imgy,
                };
                if block == BlockId::TALL_GRASS {
                    cursor.imgx += jitter(&mut rng);
                    cursor.imgy += jitter(&mut rng);
                }

                let view = ModeContext {
                    grid: &grid,
                    properties,
                };
                mode.draw(&view, target, &cursor, entry.view());
                stats.drawn += 1;
            }
        }
    }

    trace!(
        "Rendered section ({}, {}, {}): {} drawn of {} visited, {} out of range, {} without texture",
        chunk.x,
        chunk.y,
        chunk.z,
        stats.drawn,
        stats.visited,
        stats.skipped_out_of_range,
        stats.skipped_no_texture
    );
    Ok(stats)
}

fn within_margin(anchor: i32, extent: i64) -> bool {
    let anchor = i64::from(anchor);
    anchor < extent + EDGE_MARGIN && anchor > -EDGE_MARGIN
}

/// Offset in `-2..=3`.
fn jitter(rng: &mut StdRng) -> i32 {
    (rng.next_u32() % 6) as i32 + 1 - 3
}
