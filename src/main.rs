//! ITCH depth replay
//!
//! Replays a recorded binary ITCH feed and writes Level-2 depth snapshots.

use std::fs::File;
use std::io::BufWriter;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use itch_depth::{
    Config, CsvSink, Decoder, FrameReader, JsonLinesSink, LayoutTable, MsgPackSink, OutputFormat,
    ReplayEngine, ReplayOptions, SnapshotSink,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting ITCH depth replay");

    // Load configuration
    let config = Config::load()?;
    info!(
        input = %config.input_path.display(),
        output = %config.output_path.display(),
        format = ?config.output_format,
        "Configuration loaded"
    );

    let table = match &config.layout_path {
        Some(path) => {
            let table = LayoutTable::from_file(path)?;
            info!(path = %path.display(), layouts = table.len(), "Layout table loaded");
            table
        }
        None => LayoutTable::default(),
    };

    let input = tokio::fs::File::open(&config.input_path).await?;
    let reader = FrameReader::new(input);
    let sink = open_sink(&config)?;

    let mut engine = ReplayEngine::new(Decoder::new(table), ReplayOptions::from(&config))?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    let summary = engine.run(reader, sink, shutdown).await?;
    info!(
        frames = summary.frames,
        events_applied = summary.events_applied,
        census = ?summary.frame_census,
        anomalies = ?summary.anomalies,
        "Replay summary"
    );

    if let Some(path) = &config.metrics_path {
        std::fs::write(path, engine.metrics().render()?)?;
        info!(path = %path.display(), "Metrics written");
    }

    Ok(())
}

fn open_sink(config: &Config) -> anyhow::Result<Box<dyn SnapshotSink>> {
    let writer = BufWriter::new(File::create(&config.output_path)?);
    let sink: Box<dyn SnapshotSink> = match config.output_format {
        OutputFormat::Csv => Box::new(CsvSink::new(writer, config.depth_levels)?),
        OutputFormat::Jsonl => Box::new(JsonLinesSink::new(writer)),
        OutputFormat::Msgpack => Box::new(MsgPackSink::new(writer)),
    };
    Ok(sink)
}
