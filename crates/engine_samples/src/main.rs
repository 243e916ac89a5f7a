//! # engine_samples
//!
//! Walks the exchange core end to end:
//!
//! 1. Builds a scene whose entities link to each other, saves it through
//!    reflected dictionaries with UUIDs standing in for handles, and loads it
//!    back under fresh handles.
//! 2. Fans a stream of masked events out to several filtered readers.
//!
//! Sizes come from [`config::SampleConfig`], overridable through
//! `ENGINE_SAMPLE_*` environment variables.

mod config;
mod driver;
mod error;
mod events;
mod scene;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::SampleConfig;

/// Frames simulated by the event sample.
const FRAMES: u64 = 4;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("engine_samples=info".parse()?),
        )
        .init();

    let config = SampleConfig::from_env()?;
    info!(?config, "samples starting");

    let original = scene::build_chain(config.entities)?;
    let saved = scene::save(&original)?;
    let bytes: usize = saved.links.iter().map(|(_, b)| b.len()).sum();
    info!(entities = saved.ids.len(), bytes, "scene encoded");

    let loaded = scene::load(&saved, 1000)?;
    let links: usize = loaded.values().map(|l| l.len()).sum();
    info!(entities = loaded.len(), links, "scene decoded");

    let stats = events::run(&config, FRAMES);
    info!(delivered = ?stats.delivered, "events delivered per reader");

    Ok(())
}
