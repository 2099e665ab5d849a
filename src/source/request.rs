//! Per-tile request state machine.
//!
//! ```text
//!                 load                    done
//!  Unrequested ─────────▶ Loading ─────────────────▶ Loaded
//!                            ▲                        │  ▲
//!                 load       │                  load  │  │ done
//!  Expired ──────────────────┘                        ▼  │
//!                                                  Reloading
//!
//!  any ──abort──▶ Aborted          Loading/Reloading/Loaded ──expire──▶ Expired
//! ```
//!
//! At most one request per tile is in flight. A `load` that arrives while a
//! request is outstanding is parked in a single reload slot and dispatched
//! when the outstanding request completes. An expiry recorded while a
//! request is in flight outlives that request, so the parked load refetches.

use super::dispatcher::WorkerId;
use crate::error::SourceError;

/// Completion callback handed to [`load_tile`](super::VectorTileSource::load_tile).
pub type TileCallback = Box<dyn FnOnce(Result<(), SourceError>) + Send>;

/// Fetch status of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    Unrequested,
    Loading,
    Loaded,
    Reloading,
    Expired,
    Aborted,
}

/// What the source must do after [`TileRequest::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Send `loadTile` and let the dispatcher pick a worker
    Load,
    /// Send `reloadTile` to the given worker
    Reload(WorkerId),
    /// A request is already in flight; the callback was parked
    Queued,
    /// The tile is aborted or unloaded; the callback already ran
    Skipped,
}

/// Outcome of [`TileRequest::finish`].
pub(crate) enum Finished {
    /// The tile was aborted or unloaded while the request was running
    Discarded(TileCallback),
    Active {
        callback: TileCallback,
        prior: TileState,
    },
}

struct InFlight {
    callback: TileCallback,
    prior: TileState,
}

/// Request bookkeeping for one tile: state, worker affinity and callbacks.
pub struct TileRequest {
    state: TileState,
    worker: Option<WorkerId>,
    in_flight: Option<InFlight>,
    reload_callback: Option<TileCallback>,
    unloaded: bool,
}

impl Default for TileRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl TileRequest {
    pub fn new() -> Self {
        Self {
            state: TileState::Unrequested,
            worker: None,
            in_flight: None,
            reload_callback: None,
            unloaded: false,
        }
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    /// Worker holding this tile's parsed state, unset until the first load.
    pub fn worker(&self) -> Option<WorkerId> {
        self.worker
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_queued_reload(&self) -> bool {
        self.reload_callback.is_some()
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded
    }

    /// Register a load request and decide how to dispatch it.
    pub(crate) fn begin(&mut self, callback: TileCallback) -> Dispatch {
        if self.unloaded || self.state == TileState::Aborted {
            callback(Ok(()));
            return Dispatch::Skipped;
        }

        if self.in_flight.is_some() {
            // Only the latest queued request matters; release the older one
            if let Some(superseded) = self.reload_callback.replace(callback) {
                superseded(Ok(()));
            }
            return Dispatch::Queued;
        }

        let prior = self.state;
        self.in_flight = Some(InFlight { callback, prior });
        match self.worker {
            Some(worker) if prior != TileState::Expired => {
                self.state = TileState::Reloading;
                Dispatch::Reload(worker)
            }
            _ => {
                self.state = TileState::Loading;
                Dispatch::Load
            }
        }
    }

    pub(crate) fn assign_worker(&mut self, worker: WorkerId) {
        self.worker = Some(worker);
    }

    /// Take the in-flight request. `None` when nothing is outstanding, which
    /// happens for duplicate or late completions.
    pub(crate) fn finish(&mut self) -> Option<Finished> {
        let InFlight { callback, prior } = self.in_flight.take()?;
        if self.unloaded || self.state == TileState::Aborted {
            Some(Finished::Discarded(callback))
        } else {
            Some(Finished::Active { callback, prior })
        }
    }

    /// Record a finished request. A tile expired while the request was in
    /// flight stays `Expired`, so its next load refetches.
    pub(crate) fn mark_loaded(&mut self) {
        if self.state != TileState::Expired {
            self.state = TileState::Loaded;
        }
    }

    /// Put the state back to where it was before a failed request, keeping
    /// an expiry recorded in the meantime.
    pub(crate) fn restore(&mut self, prior: TileState) {
        if self.state != TileState::Expired {
            self.state = prior;
        }
    }

    pub(crate) fn take_reload(&mut self) -> Option<TileCallback> {
        self.reload_callback.take()
    }

    /// Flag the tile's data as stale so the next load goes out fresh.
    ///
    /// Returns `false` if the tile has no data to expire.
    pub fn mark_expired(&mut self) -> bool {
        match self.state {
            TileState::Loading | TileState::Reloading | TileState::Loaded => {
                self.state = TileState::Expired;
                true
            }
            _ => false,
        }
    }

    /// Mark the tile aborted and return the worker to notify. A tile that was
    /// never dispatched has nothing to abort.
    pub(crate) fn abort(&mut self) -> Option<WorkerId> {
        let worker = self.worker?;
        self.state = TileState::Aborted;
        Some(worker)
    }

    /// Mark the tile unloaded. Returns `false` if it already was.
    ///
    /// A parked reload is released without being dispatched.
    pub(crate) fn unload(&mut self) -> bool {
        if self.unloaded {
            return false;
        }
        self.unloaded = true;
        if let Some(reload) = self.reload_callback.take() {
            reload(Ok(()));
        }
        true
    }
}
