use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use membw::MemoryMetricStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod bandwidth_poller;
mod parquet_writer;
mod parquet_writer_task;
mod rate_batch;
mod rate_sample;
mod snapshot_source;
mod task_completion_handler;

use bandwidth_poller::BandwidthPoller;
use parquet_writer::ParquetWriter;
use parquet_writer_task::ParquetWriterTask;
use rate_batch::create_rate_schema;
use snapshot_source::SnapshotSource;
use task_completion_handler::task_completion_handler;

/// Container memory bandwidth collector
#[derive(Debug, Parser)]
struct Command {
    /// Snapshot document refreshed by the cgroup counter scraper
    #[arg(short, long)]
    input: PathBuf,

    /// Parquet file receiving the bandwidth series
    #[arg(short, long, default_value = "membw.parquet")]
    output: PathBuf,

    /// Collection interval in seconds
    #[arg(long, default_value = "5")]
    interval: u64,

    /// Track duration in seconds (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    duration: u64,

    /// Verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Command::parse();

    let default_level = if opts.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if opts.interval == 0 {
        bail!("--interval must be at least one second");
    }

    let shutdown = CancellationToken::new();
    let (batch_sender, batch_receiver) = mpsc::channel(64);

    let writer = ParquetWriter::create(&opts.output, create_rate_schema())?;
    let writer_task = ParquetWriterTask::new(batch_receiver, writer, shutdown.clone());

    let poller = BandwidthPoller::new(
        SnapshotSource::new(opts.input.clone()),
        Arc::new(MemoryMetricStore::new()),
        Duration::from_secs(opts.interval),
        batch_sender,
    );

    let writer_handle = tokio::spawn(task_completion_handler(
        writer_task.run(),
        shutdown.clone(),
        "parquet writer",
    ));
    let poller_handle = tokio::spawn(task_completion_handler(
        poller.run(shutdown.clone()),
        shutdown.clone(),
        "bandwidth poller",
    ));

    info!(
        "Collecting memory bandwidth from {} every {}s into {}",
        opts.input.display(),
        opts.interval,
        opts.output.display()
    );

    let deadline = async {
        if opts.duration == 0 {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(Duration::from_secs(opts.duration)).await
        }
    };

    tokio::select! {
        _ = deadline => info!("Duration elapsed, shutting down"),
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();

    let poller_ok = poller_handle.await?;
    let writer_ok = writer_handle.await?;
    if !(poller_ok && writer_ok) {
        bail!("collector stopped with errors");
    }

    Ok(())
}
