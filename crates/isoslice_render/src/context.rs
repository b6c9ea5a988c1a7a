use std::sync::OnceLock;

use isoslice_shared::block::{BlockCatalog, BlockPropertyTable};

use crate::error::RenderError;

/// Process-wide render state. The property table is built from the catalog
/// on the first `init` and never changes afterwards.
#[derive(Debug, Default)]
pub struct RenderContext {
    table: OnceLock<BlockPropertyTable>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the property table. Calls after the first successful one are
    /// no-ops and return the table already in place.
    pub fn init(&self, catalog: &BlockCatalog) -> Result<&BlockPropertyTable, RenderError> {
        if let Some(table) = self.table.get() {
            return Ok(table);
        }
        let table = BlockPropertyTable::build(catalog)?;
        Ok(self.table.get_or_init(|| table))
    }

    pub fn is_initialized(&self) -> bool {
        self.table.get().is_some()
    }

    pub fn properties(&self) -> Result<&BlockPropertyTable, RenderError> {
        self.table.get().ok_or(RenderError::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use isoslice_shared::block::{BlockCatalog, BlockId};

    use super::RenderContext;
    use crate::error::RenderError;

    #[test]
    fn properties_require_init() {
        let ctx = RenderContext::new();
        assert!(matches!(ctx.properties(), Err(RenderError::NotInitialized)));
        assert!(!ctx.is_initialized());
    }

    #[test]
    fn second_init_keeps_the_first_table() {
        let ctx = RenderContext::new();
        let first = ctx.init(&BlockCatalog::builtin()).expect("first init");
        assert!(first.is_transparent(BlockId::AIR));

        let mut other = BlockCatalog::builtin();
        other.max_blockid = Some(4);
        let second = ctx.init(&other).expect("second init");
        assert_eq!(second.max_blockid(), first.max_blockid());
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn failed_init_leaves_the_context_empty() {
        let ctx = RenderContext::new();
        let mut broken = BlockCatalog::builtin();
        broken.transparent = None;
        assert!(matches!(ctx.init(&broken), Err(RenderError::Catalog(_))));
        assert!(!ctx.is_initialized());
    }
}
