use isoslice_shared::block::CatalogError;
use isoslice_shared::source::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("block property table has not been initialised; call RenderContext::init first")]
    NotInitialized,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("texture atlas has data stride {atlas} but the block catalog uses {catalog}")]
    AtlasMismatch { atlas: u32, catalog: u32 },
    #[error("required chunk ({x}, {z}) could not be loaded")]
    RequiredChunk {
        x: i32,
        z: i32,
        #[source]
        source: SourceError,
    },
    #[error("failed to create render mode: {0}")]
    ModeConstruction(String),
}
