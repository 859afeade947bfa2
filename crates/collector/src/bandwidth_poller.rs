use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use log::{debug, warn};
use membw::{BandwidthFetcher, ContainerKey, MemoryMetricStore};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::rate_batch::{create_rate_schema, samples_to_batch};
use crate::rate_sample::ExportingStore;
use crate::snapshot_source::{SnapshotDocument, SnapshotSource};

/// Periodically feeds the latest snapshot document through the bandwidth fetcher
/// and forwards the committed rates as record batches.
pub struct BandwidthPoller {
    source: SnapshotSource,
    fetcher: BandwidthFetcher<ExportingStore>,
    interval: Duration,
    batch_sender: mpsc::Sender<RecordBatch>,
    schema: SchemaRef,
    // Containers seen in the previous document
    known: HashSet<ContainerKey>,
}

impl BandwidthPoller {
    pub fn new(
        source: SnapshotSource,
        store: Arc<MemoryMetricStore>,
        interval: Duration,
        batch_sender: mpsc::Sender<RecordBatch>,
    ) -> Self {
        Self {
            source,
            fetcher: BandwidthFetcher::new(ExportingStore::new(store)),
            interval,
            batch_sender,
            schema: create_rate_schema(),
            known: HashSet::new(),
        }
    }

    /// Poll until shutdown is requested or the batch receiver goes away
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Shutdown requested, stopping bandwidth poller");
                    break;
                }
                _ = ticker.tick() => {
                    let Some(batch) = self.poll_once().await? else {
                        continue;
                    };
                    if batch.num_rows() == 0 {
                        continue;
                    }
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        sent = self.batch_sender.send(batch) => {
                            if sent.is_err() {
                                debug!("Batch receiver dropped, stopping bandwidth poller");
                                break;
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Runs one collection cycle. An unreadable document skips the cycle.
    pub async fn poll_once(&mut self) -> Result<Option<RecordBatch>> {
        match self.source.load().await {
            Ok(doc) => self.process_document(&doc).map(Some),
            Err(e) => {
                warn!("Skipping collection cycle: {:#}", e);
                Ok(None)
            }
        }
    }

    /// Processes every container in the document and returns the rates committed
    pub fn process_document(&mut self, doc: &SnapshotDocument) -> Result<RecordBatch> {
        let mut seen = HashSet::with_capacity(doc.containers.len());

        for container in &doc.containers {
            let key = container.key();
            let update = self.fetcher.process_container(&key, &container.cgroup);
            if update.is_empty() {
                debug!("No bandwidth update for {}", key);
            }
            seen.insert(key);
        }

        // Drop the counter history of containers that left the document
        let store = self.fetcher.store();
        for gone in self.known.difference(&seen) {
            debug!("Forgetting counters of {}", gone);
            store.backing_store().remove_container(gone);
        }
        self.known = seen;

        samples_to_batch(&store.drain(), self.schema.clone())
    }
}
