mod config;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use isoslice_persist::region::RegionFile;
use isoslice_render::atlas::TextureAtlas;
use isoslice_render::batch::RenderWorker;
use isoslice_render::{RenderContext, SectionRequest};
use isoslice_shared::block::BlockCatalog;
use isoslice_shared::coords::ChunkPos;
use tracing::{info, warn};

use config::RendererConfig;

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut config_path = PathBuf::from("section_renderer.toml");

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(value) = args.next() else {
                    eprintln!("--config expects a path argument");
                    std::process::exit(2);
                };
                config_path = PathBuf::from(value);
            }
            "--help" | "-h" => {
                println!("Usage: section_renderer [--config <path>]");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    let config = match RendererConfig::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load {}: {err}", config_path.display());
            std::process::exit(2);
        }
    };

    match run(&config) {
        Ok(0) => {}
        Ok(failed) => {
            eprintln!("{failed} section(s) failed to render");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("section_renderer failed: {err}");
            std::process::exit(1);
        }
    }
}

fn load_catalog(path: Option<&Path>) -> Result<BlockCatalog, String> {
    let Some(path) = path else {
        return Ok(BlockCatalog::builtin());
    };
    let src = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    toml::from_str(&src).map_err(|err| format!("failed to parse {}: {err}", path.display()))
}

/// Renders every configured section and returns how many failed.
fn run(config: &RendererConfig) -> Result<usize, String> {
    let catalog = load_catalog(config.catalog.as_deref())?;
    let ctx = RenderContext::new();
    ctx.init(&catalog).map_err(|err| err.to_string())?;

    let atlas = TextureAtlas::from_manifest_file(&config.atlas).map_err(|err| err.to_string())?;
    let region = RegionFile::open(&config.region)
        .map_err(|err| format!("failed to open {}: {err}", config.region.display()))?;
    info!(
        "Loaded region {} with {} chunks and an atlas of {} textures",
        config.region.display(),
        region.chunk_count(),
        atlas.len()
    );

    fs::create_dir_all(&config.output_dir)
        .map_err(|err| format!("failed to create {}: {err}", config.output_dir.display()))?;

    let [width, height] = config.image_size;
    let mut worker = RenderWorker::new(
        config.threads,
        Arc::new(ctx),
        Arc::new(region),
        Arc::new(atlas),
    );
    for coord in &config.sections {
        let request = SectionRequest::new(
            ChunkPos::from(*coord),
            (config.offset[0], config.offset[1]),
            config.mode,
        );
        worker.submit(request, width, height);
    }

    let mut failed = 0;
    for result in worker.wait_all() {
        let chunk = result.request.chunk;
        let stats = match result.outcome {
            Ok(stats) => stats,
            Err(err) => {
                warn!(
                    "Section ({}, {}, {}) failed: {}",
                    chunk.x, chunk.y, chunk.z, err
                );
                failed += 1;
                continue;
            }
        };

        let path = config
            .output_dir
            .join(format!("section_{}_{}_{}.png", chunk.x, chunk.y, chunk.z));
        if let Err(err) = result.image.save(&path) {
            warn!("Failed to write {}: {}", path.display(), err);
            failed += 1;
            continue;
        }
        info!(
            "Wrote {} ({} of {} voxels drawn)",
            path.display(),
            stats.drawn,
            stats.visited
        );
    }

    Ok(failed)
}
