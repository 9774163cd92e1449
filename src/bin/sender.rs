//! Frame Sender Application
//!
//! Streams a `.p3` container (or raw s16le PCM, encoded on the fly) to a
//! receiver at real-time playback speed. With `--raw`, PCM input is sent
//! unencoded, one frame's worth of s16le bytes per datagram.
//!
//! Usage: `sender <input.p3|input.pcm> [remote_addr] [--raw] [--config <path>]`

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opus_frame_streamer::{
    codec::OpusEncoder,
    config::AppConfig,
    network::{DuplexChannel, StreamSession},
    source::{samples_from_s16le, FrameSource},
};

struct Args {
    input: PathBuf,
    remote: Option<SocketAddr>,
    raw: bool,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut raw = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = Some(PathBuf::from(args.next().context("--config needs a path")?));
        } else if arg == "--raw" {
            raw = true;
        } else {
            positional.push(arg);
        }
    }

    let mut positional = positional.into_iter();
    let Some(input) = positional.next() else {
        bail!("usage: sender <input.p3|input.pcm> [remote_addr] [--raw] [--config <path>]");
    };
    let remote = positional
        .next()
        .map(|a| a.parse().with_context(|| format!("invalid remote address {:?}", a)))
        .transpose()?;

    Ok(Args {
        input: PathBuf::from(input),
        remote,
        raw,
        config,
    })
}

fn load_source(path: &Path, raw: bool, config: &AppConfig) -> Result<FrameSource> {
    let stream = &config.stream;
    let is_container = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("p3"));

    if is_container {
        return Ok(FrameSource::from_file(path, stream.frame_duration_ms)?);
    }

    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    if raw {
        // s16le: two bytes per interleaved sample
        let frame_bytes = stream.samples_per_frame() * 2;
        tracing::info!(
            "Sending {} bytes of unencoded PCM in {} byte frames",
            data.len(),
            frame_bytes
        );
        return Ok(FrameSource::from_raw_pcm(&data, frame_bytes, stream.frame_duration_ms)?);
    }

    let samples = samples_from_s16le(&data);
    let mut encoder = OpusEncoder::new(stream, &config.opus)?;

    tracing::info!(
        "Encoding {} PCM samples ({}Hz, {} channels, {}ms frames)",
        samples.len(),
        stream.sample_rate,
        stream.channels,
        stream.frame_duration_ms
    );

    Ok(FrameSource::from_pcm(
        &mut encoder,
        &samples,
        stream.frame_size(),
        stream.frame_duration_ms,
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting frame sender");

    let args = parse_args()?;
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    if let Some(remote) = args.remote {
        config.network.remote_addr = Some(remote);
    }

    let Some(remote) = config.network.remote_addr else {
        bail!("no remote address configured");
    };

    let source = load_source(&args.input, args.raw, &config)?;
    if source.is_empty() {
        tracing::warn!("{} contains no frames", args.input.display());
        return Ok(());
    }

    let channel = DuplexChannel::open(config.network.local_addr, Some(remote))?;
    let mut session = StreamSession::new(channel, config.stream.prebuffer_frames);

    // Ctrl+C stops the send loop at the next frame
    let abort = session.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping stream");
            abort.abort();
        }
    });

    let report = session.send(&source).await?;
    let stats = session.channel().stats();

    tracing::info!(
        "Done: {} of {} frames sent ({} pre-buffered, {} late, worst {:?}), {:.1} KB{}",
        report.frames_sent,
        source.len(),
        report.prebuffered,
        report.late_frames,
        report.max_lateness,
        stats.bytes_sent as f64 / 1024.0,
        if report.aborted { ", aborted" } else { "" }
    );

    Ok(())
}
