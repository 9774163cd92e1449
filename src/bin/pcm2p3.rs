//! Encode raw PCM into a `.p3` container
//!
//! Input is signed 16-bit little-endian PCM at the configured sample rate
//! and channel count.
//!
//! Usage: `pcm2p3 <input.pcm> <output.p3> [--config <path>]`

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opus_frame_streamer::{
    codec::OpusEncoder,
    config::AppConfig,
    source::{samples_from_s16le, FrameSource},
};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut positional = Vec::new();
    let mut config_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config_path = Some(PathBuf::from(args.next().context("--config needs a path")?));
        } else {
            positional.push(PathBuf::from(arg));
        }
    }

    let [input, output] = positional.as_slice() else {
        bail!("usage: pcm2p3 <input.pcm> <output.p3> [--config <path>]");
    };

    let config = AppConfig::load_or_default(config_path.as_deref())?;
    let stream = &config.stream;

    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let samples = samples_from_s16le(&data);
    let mut encoder = OpusEncoder::new(stream, &config.opus)?;

    let source = FrameSource::from_pcm(
        &mut encoder,
        &samples,
        stream.frame_size(),
        stream.frame_duration_ms,
    )?;
    source.save(output)?;

    let stats = encoder.stats();
    tracing::info!(
        "Wrote {} frames ({:.2}s, avg {:.0} bytes/frame) to {}",
        source.len(),
        source.duration().as_secs_f64(),
        stats.average_frame_size,
        output.display()
    );

    Ok(())
}
