//! Frame Receiver Application
//!
//! Listens for encoded frames over UDP, decodes them and plays them on an
//! output device as they arrive.
//!
//! Usage: `receiver [local_addr] [--config <path>]`

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opus_frame_streamer::{
    audio::{list_output_devices, AudioPlayback},
    codec::OpusDecoder,
    config::AppConfig,
    constants::DEFAULT_UDP_PORT,
    network::{DuplexChannel, ReceiverPipeline},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting frame receiver");

    let mut local: Option<SocketAddr> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config_path = Some(PathBuf::from(args.next().context("--config needs a path")?));
        } else {
            local = Some(arg.parse().with_context(|| format!("invalid local address {:?}", arg))?);
        }
    }

    let config = AppConfig::load_or_default(config_path.as_deref())?;
    let local_addr = local
        .or(config.network.local_addr)
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_UDP_PORT)));

    // List available output devices
    println!("\n=== Available Output Devices ===");
    for device in list_output_devices() {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {}{}:", device.name, default_marker);
        println!("    Sample rates: {:?}", device.sample_rates);
        println!("    Channels: {:?}", device.channels);
    }
    println!();

    let stream = &config.stream;
    let decoder = OpusDecoder::new(stream.sample_rate, stream.channels, stream.frame_size())?;

    let mut playback = AudioPlayback::new(
        config.audio.output_device.as_deref(),
        stream.sample_rate,
        stream.channels,
        config.audio.buffer_capacity,
    );
    playback.start()?;

    let channel = DuplexChannel::open(Some(local_addr), None)?;
    let mut pipeline = ReceiverPipeline::new(decoder, playback, stream.frame_size());

    tracing::info!("Waiting for audio frames on {}...", channel.local_addr());

    let outcome = tokio::select! {
        result = pipeline.run(&channel) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(())
        }
    };

    let stats = pipeline.stats();
    tracing::info!(
        "Received {} frames, {:.1} KB, {} samples played",
        stats.datagrams_received,
        stats.bytes_received as f64 / 1024.0,
        stats.samples_played
    );

    Ok(outcome?)
}
