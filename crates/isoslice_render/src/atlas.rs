use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use isoslice_shared::block::BlockId;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TextureEntry {
    pub source: RgbaImage,
    /// Alpha mask; the source image doubles as its own mask when absent.
    pub mask: Option<RgbaImage>,
    pub light: Option<RgbaImage>,
}

impl TextureEntry {
    pub fn new(source: RgbaImage) -> Self {
        Self {
            source,
            mask: None,
            light: None,
        }
    }

    pub fn with_mask(mut self, mask: RgbaImage) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_light(mut self, light: RgbaImage) -> Self {
        self.light = Some(light);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.source.width() == 0 || self.source.height() == 0
    }

    pub fn view(&self) -> TextureView<'_> {
        TextureView {
            source: &self.source,
            mask: self.mask.as_ref().unwrap_or(&self.source),
            light: self.light.as_ref(),
        }
    }
}

/// Borrowed texture triple handed to a render mode's draw routine.
#[derive(Debug, Clone, Copy)]
pub struct TextureView<'a> {
    pub source: &'a RgbaImage,
    pub mask: &'a RgbaImage,
    pub light: Option<&'a RgbaImage>,
}

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("failed to read atlas manifest {}: {source}", path.display())]
    ReadManifest {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse atlas manifest {}: {source}", path.display())]
    ParseManifest {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to decode texture {}: {source}", path.display())]
    DecodeImage {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("texture ({block}, {data}) lies outside the atlas bounds ({max_blockid} x {max_data})")]
    OutOfRange {
        block: u16,
        data: u32,
        max_blockid: u32,
        max_data: u32,
    },
    #[error("atlas bounds must be non-zero (max_blockid {max_blockid}, max_data {max_data})")]
    EmptyBounds { max_blockid: u32, max_data: u32 },
}

/// Dense `(block, data)` texture table with a row stride of `max_data`.
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    max_blockid: u32,
    max_data: u32,
    entries: Vec<Option<Box<TextureEntry>>>,
}

impl TextureAtlas {
    pub fn new(max_blockid: u32, max_data: u32) -> Result<Self, AtlasError> {
        if max_blockid == 0 || max_data == 0 {
            return Err(AtlasError::EmptyBounds {
                max_blockid,
                max_data,
            });
        }
        let len = max_blockid as usize * max_data as usize;
        Ok(Self {
            max_blockid,
            max_data,
            entries: vec![None; len],
        })
    }

    pub fn max_blockid(&self) -> u32 {
        self.max_blockid
    }

    pub fn max_data(&self) -> u32 {
        self.max_data
    }

    pub fn insert(&mut self, block: BlockId, data: u32, entry: TextureEntry) -> Result<(), AtlasError> {
        let index = self.index(block, data).ok_or(AtlasError::OutOfRange {
            block: block.0,
            data,
            max_blockid: self.max_blockid,
            max_data: self.max_data,
        })?;
        self.entries[index] = Some(Box::new(entry));
        Ok(())
    }

    pub fn get(&self, block: BlockId, data: u32) -> Option<&TextureEntry> {
        self.index(block, data)
            .and_then(|index| self.entries[index].as_deref())
            .filter(|entry| !entry.is_empty())
    }

    /// Looks up `(block, data)`, falling back to `(block, 0)` for variants
    /// without a texture of their own.
    pub fn lookup(&self, block: BlockId, data: u32) -> Option<&TextureEntry> {
        match self.get(block, data) {
            Some(entry) => Some(entry),
            None if data != 0 => self.get(block, 0),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn index(&self, block: BlockId, data: u32) -> Option<usize> {
        if u32::from(block.0) >= self.max_blockid || data >= self.max_data {
            return None;
        }
        Some(block.index() * self.max_data as usize + data as usize)
    }

    pub fn from_manifest_file(path: impl AsRef<Path>) -> Result<Self, AtlasError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| AtlasError::ReadManifest {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: AtlasManifest =
            toml::from_str(&src).map_err(|source| AtlasError::ParseManifest {
                path: path.to_path_buf(),
                source,
            })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest(&manifest, base_dir)
    }

    pub fn from_manifest(manifest: &AtlasManifest, base_dir: &Path) -> Result<Self, AtlasError> {
        let mut atlas = Self::new(manifest.max_blockid, manifest.max_data)?;
        for texture in &manifest.textures {
            let mut entry = TextureEntry::new(load_png(base_dir, &texture.source)?);
            if let Some(mask) = &texture.mask {
                entry = entry.with_mask(load_png(base_dir, mask)?);
            }
            if let Some(light) = &texture.light {
                entry = entry.with_light(load_png(base_dir, light)?);
            }
            atlas.insert(BlockId(texture.block), texture.data, entry)?;
        }
        debug!(
            "Loaded texture atlas with {} entries ({} x {})",
            atlas.len(),
            atlas.max_blockid,
            atlas.max_data
        );
        Ok(atlas)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtlasManifest {
    pub max_blockid: u32,
    pub max_data: u32,
    #[serde(default, rename = "texture")]
    pub textures: Vec<ManifestTexture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestTexture {
    pub block: u16,
    #[serde(default)]
    pub data: u32,
    pub source: PathBuf,
    #[serde(default)]
    pub mask: Option<PathBuf>,
    #[serde(default)]
    pub light: Option<PathBuf>,
}

fn load_png(base_dir: &Path, relative: &Path) -> Result<RgbaImage, AtlasError> {
    let path = base_dir.join(relative);
    image::open(&path)
        .map(|img| img.to_rgba8())
        .map_err(|source| AtlasError::DecodeImage { path, source })
}
