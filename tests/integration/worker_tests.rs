//! End-to-end tests: a source driving the tokio worker pool.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::test_utils::*;
use tile_courier::archive::MemoryTileStore;
use tile_courier::error::FetchError;
use tile_courier::io::FetchResponse;
use tile_courier::source::{
    SourceContext, SourceOptions, Tile, TileCompletion, TileState, VectorTileSource,
};
use tile_courier::worker::WorkerPool;

async fn next_completion(rx: &mut mpsc::UnboundedReceiver<TileCompletion>) -> TileCompletion {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no completion within 5s")
        .expect("worker pool closed")
}

async fn pump(
    source: &VectorTileSource,
    tile: &mut Tile,
    rx: &mut mpsc::UnboundedReceiver<TileCompletion>,
) {
    let completion = next_completion(rx).await;
    assert_eq!(completion.uid, tile.uid());
    source.complete_tile(tile, completion.result);
}

#[tokio::test]
async fn test_pool_fetches_and_decodes_remote_tile() {
    let fetcher = Arc::new(MockFetcher::new().with_response(
        "http://tiles.test/2/1/1.pbf",
        FetchResponse {
            data: Bytes::from(gzip(b"layer data")),
            cache_control: Some("max-age=300".into()),
            expires: None,
        },
    ));
    let (pool, mut completions) = WorkerPool::spawn(2, fetcher.clone());
    let context =
        SourceContext::new(Arc::new(pool), fetcher.clone()).with_refresh_expired_tiles(true);
    let mut source =
        VectorTileSource::new("remote", SourceOptions::from_tiles([TILE_TEMPLATE]), context)
            .unwrap();
    source.load().await.unwrap();

    let (mut tile, sink) = make_tile(1, 2, 1, 1);
    let log = CallbackLog::default();
    source.load_tile(&mut tile, log.callback("load"));
    pump(&source, &mut tile, &mut completions).await;

    assert_eq!(tile.state(), TileState::Loaded);
    assert_eq!(
        sink.events(),
        vec![SinkEvent::Loaded(Some(Bytes::from_static(b"layer data")))]
    );
    assert_eq!(
        tile.expiry().and_then(|e| e.cache_control.as_deref()),
        Some("max-age=300")
    );
    assert_eq!(log.results(), vec![("load", Ok(()))]);
    assert_eq!(fetcher.request_count(), 1);
}

#[tokio::test]
async fn test_pool_reports_missing_tile_as_empty() {
    let fetcher = Arc::new(MockFetcher::new());
    let (pool, mut completions) = WorkerPool::spawn(1, fetcher.clone());
    let mut source = VectorTileSource::new(
        "remote",
        SourceOptions::from_tiles([TILE_TEMPLATE]),
        SourceContext::new(Arc::new(pool), fetcher),
    )
    .unwrap();
    source.load().await.unwrap();

    let (mut tile, sink) = make_tile(1, 6, 10, 20);
    source.load_tile(&mut tile, Box::new(|_| {}));
    pump(&source, &mut tile, &mut completions).await;

    assert_eq!(tile.state(), TileState::Loaded);
    assert_eq!(sink.events(), vec![SinkEvent::Loaded(None)]);
}

#[tokio::test]
async fn test_pool_reload_reuses_worker_payload() {
    let fetcher = Arc::new(MockFetcher::new().with_body("http://tiles.test/1/0/0.pbf", "tile"));
    let (pool, mut completions) = WorkerPool::spawn(3, fetcher.clone());
    let mut source = VectorTileSource::new(
        "remote",
        SourceOptions::from_tiles([TILE_TEMPLATE]),
        SourceContext::new(Arc::new(pool), fetcher.clone()),
    )
    .unwrap();
    source.load().await.unwrap();

    let (mut tile, sink) = make_tile(1, 1, 0, 0);
    source.load_tile(&mut tile, Box::new(|_| {}));
    pump(&source, &mut tile, &mut completions).await;

    source.load_tile(&mut tile, Box::new(|_| {}));
    assert_eq!(tile.state(), TileState::Reloading);
    pump(&source, &mut tile, &mut completions).await;

    assert_eq!(tile.state(), TileState::Loaded);
    assert_eq!(sink.events().len(), 2);
    assert_eq!(fetcher.request_count(), 1);
}

#[tokio::test]
async fn test_pool_reload_keeps_original_expiry() {
    let fetcher = Arc::new(MockFetcher::new().with_response(
        "http://tiles.test/1/1/0.pbf",
        FetchResponse {
            data: Bytes::from_static(b"tile"),
            cache_control: Some("max-age=300".into()),
            expires: None,
        },
    ));
    let (pool, mut completions) = WorkerPool::spawn(1, fetcher.clone());
    let context =
        SourceContext::new(Arc::new(pool), fetcher.clone()).with_refresh_expired_tiles(true);
    let mut source =
        VectorTileSource::new("remote", SourceOptions::from_tiles([TILE_TEMPLATE]), context)
            .unwrap();
    source.load().await.unwrap();

    let (mut tile, _sink) = make_tile(1, 1, 1, 0);
    source.load_tile(&mut tile, Box::new(|_| {}));
    pump(&source, &mut tile, &mut completions).await;
    let first = tile.expiry().cloned().unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    source.load_tile(&mut tile, Box::new(|_| {}));
    pump(&source, &mut tile, &mut completions).await;

    // Served from the worker's retained bytes: no refetch, no fresh expiry window
    assert_eq!(fetcher.request_count(), 1);
    assert_eq!(tile.expiry(), Some(&first));
}

#[tokio::test]
async fn test_pool_error_reaches_callback() {
    let fetcher = Arc::new(MockFetcher::new().with_error(
        "http://tiles.test/0/0/0.pbf",
        FetchError::Http {
            status: 502,
            url: "http://tiles.test/0/0/0.pbf".into(),
        },
    ));
    let (pool, mut completions) = WorkerPool::spawn(1, fetcher.clone());
    let mut source = VectorTileSource::new(
        "remote",
        SourceOptions::from_tiles([TILE_TEMPLATE]),
        SourceContext::new(Arc::new(pool), fetcher),
    )
    .unwrap();
    source.load().await.unwrap();

    let (mut tile, sink) = make_tile(1, 0, 0, 0);
    let log = CallbackLog::default();
    source.load_tile(&mut tile, log.callback("load"));
    pump(&source, &mut tile, &mut completions).await;

    assert_eq!(tile.state(), TileState::Unrequested);
    assert!(sink.events().is_empty());
    assert!(log.results()[0].1.is_err());
}

#[tokio::test]
async fn test_pool_serves_archive_tiles_without_fetching() {
    let store = MemoryTileStore::new().with_tile(2, 3, 0, Bytes::from(gzip(b"archived")));
    let fetcher = Arc::new(MockFetcher::new().with_body(ARCHIVE_LOCATION, "blob"));
    let (pool, mut completions) = WorkerPool::spawn(2, fetcher.clone());
    let context = SourceContext::new(Arc::new(pool), fetcher.clone())
        .with_archive_opener(MemoryOpener::new(store));
    let mut source =
        VectorTileSource::new("archive", SourceOptions::from_tiles([ARCHIVE_TEMPLATE]), context)
            .unwrap();
    source.load().await.unwrap();

    // XYZ (2, 3, 3) is stored at TMS row 0
    let (mut tile, sink) = make_tile(1, 2, 3, 3);
    source.load_tile(&mut tile, Box::new(|_| {}));
    pump(&source, &mut tile, &mut completions).await;

    let (mut missing, missing_sink) = make_tile(2, 2, 0, 0);
    source.load_tile(&mut missing, Box::new(|_| {}));
    pump(&source, &mut missing, &mut completions).await;

    assert_eq!(
        sink.events(),
        vec![SinkEvent::Loaded(Some(Bytes::from_static(b"archived")))]
    );
    assert_eq!(missing_sink.events(), vec![SinkEvent::Loaded(None)]);
    assert_eq!(fetcher.requested_urls(), vec![ARCHIVE_LOCATION.to_string()]);
}
