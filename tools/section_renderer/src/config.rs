use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use isoslice_render::mode::RenderModeKind;
use isoslice_shared::coords::ChunkPos;
use serde::{Deserialize, Serialize};

const MIN_IMAGE_SIZE: u32 = 1;
const MAX_IMAGE_SIZE: u32 = 8192;
const MAX_THREADS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl From<SectionCoord> for ChunkPos {
    fn from(coord: SectionCoord) -> Self {
        ChunkPos::new(coord.x, coord.y, coord.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_region")]
    pub region: PathBuf,
    /// Block catalog TOML; the builtin catalog is used when unset.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default = "default_atlas")]
    pub atlas: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub mode: RenderModeKind,
    #[serde(default = "default_image_size")]
    pub image_size: [u32; 2],
    #[serde(default)]
    pub offset: [i32; 2],
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub sections: Vec<SectionCoord>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            catalog: None,
            atlas: default_atlas(),
            output_dir: default_output_dir(),
            mode: RenderModeKind::default(),
            image_size: default_image_size(),
            offset: [0, 0],
            threads: None,
            sections: Vec::new(),
        }
    }
}

impl RendererConfig {
    pub fn sanitize(mut self) -> Self {
        for extent in &mut self.image_size {
            *extent = (*extent).clamp(MIN_IMAGE_SIZE, MAX_IMAGE_SIZE);
        }
        self.threads = self
            .threads
            .filter(|&threads| threads > 0)
            .map(|threads| threads.min(MAX_THREADS));
        let mut seen = Vec::with_capacity(self.sections.len());
        self.sections.retain(|coord| {
            if seen.contains(coord) {
                false
            } else {
                seen.push(*coord);
                true
            }
        });
        self
    }

    pub fn parse(contents: &str) -> io::Result<Self> {
        let parsed = toml::from_str::<Self>(contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to deserialize renderer config: {e}"),
            )
        })?;
        Ok(parsed.sanitize())
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }
}

fn default_region() -> PathBuf {
    PathBuf::from("world.isrg")
}

fn default_atlas() -> PathBuf {
    PathBuf::from("textures/atlas.toml")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("tiles")
}

/// Fits a whole section: 16 steps of 24 px across, 16 layers of 12 px plus the tilt.
fn default_image_size() -> [u32; 2] {
    [384, 384]
}
