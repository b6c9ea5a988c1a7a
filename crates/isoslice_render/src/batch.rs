use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use image::RgbaImage;
use isoslice_shared::source::VoxelSource;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::atlas::TextureAtlas;
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::pipeline::{render_section, SectionRequest, SectionStats};

pub struct TileResult {
    pub request: SectionRequest,
    pub image: RgbaImage,
    pub outcome: Result<SectionStats, RenderError>,
}

/// Renders sections on a thread pool, each into its own image.
pub struct RenderWorker {
    pool: ThreadPool,
    ctx: Arc<RenderContext>,
    source: Arc<dyn VoxelSource>,
    atlas: Arc<TextureAtlas>,
    completed_rx: Receiver<TileResult>,
    completed_tx: Sender<TileResult>,
    pending: usize,
}

impl RenderWorker {
    pub fn new(
        threads: Option<usize>,
        ctx: Arc<RenderContext>,
        source: Arc<dyn VoxelSource>,
        atlas: Arc<TextureAtlas>,
    ) -> Self {
        let worker_threads = threads.filter(|&count| count > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|parallelism| parallelism.get())
                .unwrap_or(4)
                .min(8)
        });
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|index| format!("render-worker-{index}"))
            .build()
            .expect("failed to create render worker thread pool");
        let (completed_tx, completed_rx) = mpsc::channel();
        debug!("Started render worker with {} threads", worker_threads);

        Self {
            pool,
            ctx,
            source,
            atlas,
            completed_rx,
            completed_tx,
            pending: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn submit(&mut self, request: SectionRequest, width: u32, height: u32) {
        let completed_tx = self.completed_tx.clone();
        let ctx = Arc::clone(&self.ctx);
        let source = Arc::clone(&self.source);
        let atlas = Arc::clone(&self.atlas);
        self.pending += 1;
        self.pool.spawn(move || {
            let mut image = RgbaImage::new(width, height);
            let outcome = render_section(&ctx, source.as_ref(), &request, &mut image, &atlas);
            let _ = completed_tx.send(TileResult {
                request,
                image,
                outcome,
            });
        });
    }

    /// Results finished so far, without blocking.
    pub fn poll(&mut self) -> Vec<TileResult> {
        let mut completed = Vec::new();
        while let Ok(result) = self.completed_rx.try_recv() {
            completed.push(result);
        }
        self.pending = self.pending.saturating_sub(completed.len());
        completed
    }

    /// Blocks until every submitted job has reported back.
    pub fn wait_all(&mut self) -> Vec<TileResult> {
        let mut completed = self.poll();
        while self.pending > 0 {
            match self.completed_rx.recv() {
                Ok(result) => {
                    completed.push(result);
                    self.pending -= 1;
                }
                Err(_) => break,
            }
        }
        completed
    }
}
