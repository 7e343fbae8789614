//! Pans a view across the map and logs what the tile layer does.
//!
//! Tiles are "downloaded" from a fake server with random latency, so completions arrive out of
//! order and some loads are still running when their tiles leave the view.
//!
//! Run with `RUST_LOG=debug cargo run --example simulated_pan` to see scheduling details.

use std::time::Duration;

use bytes::Bytes;
use tessera::source::TileElement;
use tessera::tessera_types::cartesian::Rect;
use tessera::{
    EvictionPolicy, TileCoord, TileEventListener, TileLayerBuilder, TileLoadError, TileRecord,
};

struct LoggingListener;

impl TileEventListener<TileElement> for LoggingListener {
    fn loading(&self) {
        log::info!("Loading started");
    }

    fn load_complete(&self) {
        log::info!("All tiles loaded");
    }

    fn tile_error(&self, record: &TileRecord<TileElement>, error: &TileLoadError) {
        log::warn!(
            "Tile {} failed: {error}, showing {:?}",
            record.coord(),
            record.element().src()
        );
    }

    fn tile_unloaded(&self, coord: TileCoord, _record: &TileRecord<TileElement>) {
        log::debug!("Tile {coord} left the view");
    }
}

async fn fake_server(url: String) -> Result<Bytes, TileLoadError> {
    // Pseudo random latency derived from the url.
    let hash = url.bytes().fold(7u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    tokio::time::sleep(Duration::from_millis(hash % 40)).await;

    if hash % 17 == 0 {
        return Err(TileLoadError::Status(503));
    }

    Ok(Bytes::from(url))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut layer = TileLayerBuilder::new_osm(fake_server)
        .with_eviction_policy(EvictionPolicy::Recycle)
        .with_error_tile_url("https://example.com/error.png")
        .with_listener(LoggingListener)
        .build()?;

    let (width, height) = (1024.0, 768.0);
    let zoom = 6;
    for step in 0..10 {
        let x = 4096.0 + step as f64 * 200.0;
        let y = 4096.0 + step as f64 * 50.0;
        let started = layer.update_view(Rect::new(x, y, x + width - 1.0, y + height - 1.0), zoom);
        log::info!("Step {step}: {started} new tiles, {} in flight", layer.in_flight());

        // Let some loads finish before the view moves again.
        for _ in 0..started / 2 {
            if layer.next_completion().await.is_none() {
                break;
            }
        }
    }

    let applied = layer.load_pending().await;
    log::info!(
        "Finished with {} tiles in view, {applied} results applied after the last move, pool holds {}",
        layer.manager().cache().len(),
        layer.manager().cache().pool().len()
    );

    Ok(())
}
