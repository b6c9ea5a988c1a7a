use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use isoslice_shared::chunk::ChunkColumn;
use isoslice_shared::source::{SourceError, VoxelSource};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compression::{compress_zstd, decompress_zstd, DEFAULT_ZSTD_LEVEL};

const FORMAT_VERSION: u32 = 1;
const OLD_BIOME_LEN: usize = 16 * 16;
const NEW_BIOME_LEN: usize = 64 * 16;

#[derive(Serialize, Deserialize)]
struct RegionDisk {
    format_version: u32,
    chunks: Vec<((i32, i32), ChunkColumn)>,
}

/// A set of chunk columns stored in one zstd-compressed file.
pub struct RegionFile {
    path: PathBuf,
    chunks: FxHashMap<(i32, i32), ChunkColumn>,
}

impl RegionFile {
    pub const MAGIC: [u8; 4] = *b"ISRG";
    const WIRE_VERSION_ZSTD: u8 = 1;

    fn decode_region_disk(payload: &[u8]) -> io::Result<RegionDisk> {
        let disk: RegionDisk = bincode::deserialize(payload).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to decode region payload: {err}"),
            )
        })?;
        if disk.format_version != FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "unsupported region format v{}; expected v{FORMAT_VERSION}",
                    disk.format_version
                ),
            ));
        }
        Ok(disk)
    }

    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Ok(Self {
                path,
                chunks: FxHashMap::default(),
            });
        }

        let bytes = fs::read(&path)?;
        if bytes.is_empty() {
            return Ok(Self {
                path,
                chunks: FxHashMap::default(),
            });
        }

        if bytes.len() < Self::MAGIC.len() || bytes[..4] != Self::MAGIC[..] {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid region file magic; expected ISRG",
            ));
        }

        let payload = &bytes[Self::MAGIC.len()..];
        let (wire_version, wire_payload) = payload.split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "missing region wire format version")
        })?;

        let disk = match *wire_version {
            Self::WIRE_VERSION_ZSTD => {
                let decompressed = decompress_zstd(wire_payload).map_err(|err| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("failed to decompress region payload: {err}"),
                    )
                })?;
                Self::decode_region_disk(&decompressed)?
            }
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unsupported region wire format version {other}; expected 1"),
                ))
            }
        };

        debug!(
            "Loaded region {:?} with {} chunks (format v{})",
            path,
            disk.chunks.len(),
            disk.format_version
        );

        Ok(Self {
            path,
            chunks: disk.chunks.into_iter().collect(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save_chunk(&mut self, chunk_x: i32, chunk_z: i32, column: &ChunkColumn) {
        self.chunks.insert((chunk_x, chunk_z), column.clone());
    }

    pub fn load_chunk(&self, chunk_x: i32, chunk_z: i32) -> Option<&ChunkColumn> {
        self.chunks.get(&(chunk_x, chunk_z))
    }

    pub fn flush(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut chunks: Vec<_> = self
            .chunks
            .iter()
            .map(|(pos, column)| (*pos, column.clone()))
            .collect();
        chunks.sort_by_key(|(pos, _)| *pos);
        let disk = RegionDisk {
            format_version: FORMAT_VERSION,
            chunks,
        };

        let encoded = bincode::serialize(&disk).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to encode region payload: {err}"),
            )
        })?;
        let compressed = compress_zstd(&encoded, DEFAULT_ZSTD_LEVEL)?;
        let mut bytes = Vec::with_capacity(Self::MAGIC.len() + 1 + compressed.len());
        bytes.extend_from_slice(&Self::MAGIC);
        bytes.push(Self::WIRE_VERSION_ZSTD);
        bytes.extend_from_slice(&compressed);

        fs::write(&self.path, bytes)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk_positions(&self) -> Vec<(i32, i32)> {
        let mut positions: Vec<_> = self.chunks.keys().copied().collect();
        positions.sort_unstable();
        positions
    }
}

impl VoxelSource for RegionFile {
    fn get_chunk(&self, chunk_x: i32, chunk_z: i32) -> Result<ChunkColumn, SourceError> {
        let column = self
            .load_chunk(chunk_x, chunk_z)
            .ok_or(SourceError::NotFound {
                x: chunk_x,
                z: chunk_z,
            })?;
        let expected = if column.new_biomes {
            NEW_BIOME_LEN
        } else {
            OLD_BIOME_LEN
        };
        if !column.biomes.is_empty() && column.biomes.len() != expected {
            return Err(SourceError::Corrupt {
                x: chunk_x,
                z: chunk_z,
                reason: format!(
                    "biome array holds {} entries, expected {expected}",
                    column.biomes.len()
                ),
            });
        }
        Ok(column.clone())
    }
}
