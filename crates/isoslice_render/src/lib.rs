pub mod atlas;
pub mod batch;
pub mod composite;
pub mod context;
pub mod error;
pub mod grid;
pub mod mode;
pub mod pipeline;
pub mod pseudo;

pub use context::RenderContext;
pub use error::RenderError;
pub use pipeline::{render_section, SectionRequest, SectionStats};
