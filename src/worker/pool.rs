use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::error::FetchError;
use crate::io::ByteFetcher;
use crate::source::{
    Dispatcher, ResourceTiming, TileCompletion, TileData, TileResult, TileUid, WorkerId,
    WorkerMessage, WorkerTileParams,
};

/// Default number of workers.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default number of tile payloads each worker keeps for reloads.
pub const DEFAULT_RETAINED_TILES: usize = 512;

/// A pool of tokio tasks answering tile requests.
pub struct WorkerPool {
    workers: Vec<mpsc::UnboundedSender<WorkerMessage>>,
    next: AtomicUsize,
}

impl WorkerPool {
    /// Spawn `size` workers on the current tokio runtime.
    ///
    /// Returns the pool and the receiver on which every worker reports
    /// finished requests.
    pub fn spawn(
        size: usize,
        fetcher: Arc<dyn ByteFetcher>,
    ) -> (Self, mpsc::UnboundedReceiver<TileCompletion>) {
        Self::with_retained_tiles(size, DEFAULT_RETAINED_TILES, fetcher)
    }

    /// Like [`spawn`](Self::spawn) with a custom per-worker payload cache size.
    pub fn with_retained_tiles(
        size: usize,
        retained_tiles: usize,
        fetcher: Arc<dyn ByteFetcher>,
    ) -> (Self, mpsc::UnboundedReceiver<TileCompletion>) {
        let size = size.max(1);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let workers = (0..size)
            .map(|index| {
                let (tx, rx) = mpsc::unbounded_channel();
                let worker = Worker::new(
                    WorkerId(index),
                    Arc::clone(&fetcher),
                    completions_tx.clone(),
                    retained_tiles,
                );
                tokio::spawn(worker.run(rx));
                tx
            })
            .collect();

        debug!(workers = size, "worker pool started");
        (
            Self {
                workers,
                next: AtomicUsize::new(0),
            },
            completions_rx,
        )
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Dispatcher for WorkerPool {
    fn send(&self, message: WorkerMessage, affinity: Option<WorkerId>) -> WorkerId {
        let count = self.workers.len();
        let worker = match affinity {
            Some(id) => WorkerId(id.0 % count),
            None => WorkerId(self.next.fetch_add(1, Ordering::Relaxed) % count),
        };

        trace!(%worker, kind = message.kind(), uid = %message.uid(), "dispatch");
        if self.workers[worker.0].send(message).is_err() {
            warn!(%worker, "worker has shut down, message dropped");
        }
        worker
    }
}

type Finished = (TileUid, u64, TileResult);

struct Worker {
    id: WorkerId,
    fetcher: Arc<dyn ByteFetcher>,
    completions: mpsc::UnboundedSender<TileCompletion>,

    /// In-flight requests with the generation that started them
    loading: HashMap<TileUid, (u64, JoinHandle<()>)>,

    /// Last payload produced for each tile
    retained: LruCache<TileUid, Bytes>,

    generation: u64,
}

impl Worker {
    fn new(
        id: WorkerId,
        fetcher: Arc<dyn ByteFetcher>,
        completions: mpsc::UnboundedSender<TileCompletion>,
        retained_tiles: usize,
    ) -> Self {
        Self {
            id,
            fetcher,
            completions,
            loading: HashMap::new(),
            retained: LruCache::new(NonZeroUsize::new(retained_tiles).unwrap_or(NonZeroUsize::MIN)),
            generation: 0,
        }
    }

    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<WorkerMessage>) {
        let (finished_tx, mut finished_rx) = mpsc::unbounded_channel::<Finished>();

        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(message) => self.handle(message, &finished_tx),
                    None => break,
                },
                Some((uid, generation, result)) = finished_rx.recv() => {
                    self.finish(uid, generation, result);
                }
            }
        }

        for (_, (_, handle)) in self.loading.drain() {
            handle.abort();
        }
        debug!(worker = %self.id, "worker stopped");
    }

    fn handle(&mut self, message: WorkerMessage, finished_tx: &mpsc::UnboundedSender<Finished>) {
        match message {
            WorkerMessage::LoadTile(params) => self.start(params, finished_tx),
            WorkerMessage::ReloadTile(params) => {
                let reuse = params.tile_data.is_none() && !params.archive_backed;
                if reuse {
                    if let Some(payload) = self.retained.get(&params.uid).cloned() {
                        trace!(worker = %self.id, uid = %params.uid, "reload served from retained payload");
                        // No caching headers: the tile keeps the expiry of the original fetch
                        self.complete(params.uid, Ok(Some(TileData::new(payload))));
                        return;
                    }
                }
                self.start(params, finished_tx);
            }
            WorkerMessage::AbortTile(tile) => self.cancel(tile.uid),
            WorkerMessage::RemoveTile(tile) => {
                self.cancel(tile.uid);
                self.retained.pop(&tile.uid);
            }
        }
    }

    fn start(&mut self, params: WorkerTileParams, finished_tx: &mpsc::UnboundedSender<Finished>) {
        let uid = params.uid;
        if let Some((_, previous)) = self.loading.remove(&uid) {
            previous.abort();
        }

        self.generation += 1;
        let generation = self.generation;
        let fetcher = Arc::clone(&self.fetcher);
        let finished = finished_tx.clone();
        let handle = tokio::spawn(async move {
            let result = fetch_tile(fetcher.as_ref(), &params).await;
            let _ = finished.send((uid, generation, result));
        });
        self.loading.insert(uid, (generation, handle));
    }

    fn cancel(&mut self, uid: TileUid) {
        if let Some((_, handle)) = self.loading.remove(&uid) {
            handle.abort();
            debug!(worker = %self.id, %uid, "aborted tile request");
            self.complete(uid, Err(FetchError::Aborted));
        }
    }

    fn finish(&mut self, uid: TileUid, generation: u64, result: TileResult) {
        match self.loading.get(&uid) {
            Some((current, _)) if *current == generation => {
                self.loading.remove(&uid);
            }
            // Superseded or cancelled after the fetch already finished
            _ => return,
        }

        if let Ok(Some(data)) = &result {
            self.retained.put(uid, data.payload.clone());
        }
        self.complete(uid, result);
    }

    fn complete(&self, uid: TileUid, result: TileResult) {
        let completion = TileCompletion {
            uid,
            worker: self.id,
            result,
        };
        if self.completions.send(completion).is_err() {
            trace!(worker = %self.id, %uid, "completion receiver dropped");
        }
    }
}

/// Produce the payload for one tile request.
async fn fetch_tile(fetcher: &dyn ByteFetcher, params: &WorkerTileParams) -> TileResult {
    if params.archive_backed {
        return match &params.tile_data {
            Some(data) => Ok(Some(TileData::new(data.clone()))),
            None => Err(FetchError::NotFound(params.request.url.clone())),
        };
    }

    let started = Instant::now();
    let response = fetcher.fetch(&params.request).await?;
    let resource_timing = params
        .request
        .collect_resource_timing
        .then(|| ResourceTiming {
            url: params.request.url.clone(),
            duration: started.elapsed(),
        });

    Ok(Some(TileData {
        payload: codec::decode_if_compressed(response.data).into_bytes(),
        resource_timing,
        cache_control: response.cache_control,
        expires: response.expires,
    }))
}
