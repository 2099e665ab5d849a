//! Background tile workers.
//!
//! [`WorkerPool`] is a [`Dispatcher`](crate::source::Dispatcher) backed by
//! tokio tasks. Each worker owns the tiles routed to it: in-flight fetches that
//! can be aborted and the last payload of every tile it produced, so a
//! `reloadTile` can be answered without going back to the network.
//!
//! ```text
//!            send(msg, affinity)
//! source ─────────────────────────▶ WorkerPool ──┬──▶ worker-0 ──┐
//!                                                ├──▶ worker-1 ──┤ TileCompletion
//!                                                └──▶ worker-n ──┤
//! owner ◀────────────── mpsc::UnboundedReceiver ◀────────────────┘
//! ```

mod pool;

pub use pool::{WorkerPool, DEFAULT_RETAINED_TILES, DEFAULT_WORKER_COUNT};
