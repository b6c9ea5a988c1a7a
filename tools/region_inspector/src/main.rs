use std::env;
use std::path::Path;

use isoslice_persist::region::RegionFile;
use isoslice_shared::block::BlockId;

fn main() {
    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: region_inspector <path/to/file.isrg>");
        std::process::exit(2);
    };

    if let Err(err) = run(Path::new(&path)) {
        eprintln!("region_inspector error: {err}");
        std::process::exit(1);
    }
}

fn run(path: &Path) -> Result<(), String> {
    let region = RegionFile::open(path)
        .map_err(|err| format!("failed to open {}: {err}", path.display()))?;

    println!("Region: {}", path.display());
    println!("Magic: {:?}", RegionFile::MAGIC);
    println!("Chunk count: {}", region.chunk_count());

    for (x, z) in region.chunk_positions() {
        let Some(column) = region.load_chunk(x, z) else {
            continue;
        };
        let biome_format = if column.new_biomes { "new" } else { "old" };
        println!(
            "  chunk @ ({x}, {z}): {} sections, {} biomes ({biome_format} layout)",
            column.sections.len(),
            column.biomes.len()
        );

        let mut sections: Vec<_> = column.sections.iter().collect();
        sections.sort_by_key(|record| record.y);
        for record in sections {
            let solid = record
                .section
                .blocks
                .iter()
                .filter(|&&block| block != BlockId::AIR.0)
                .count();
            println!("    section y={:>3}: {solid} non-air voxels", record.y);
        }
    }

    Ok(())
}
