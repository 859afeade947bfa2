use std::io::Write;

use anyhow::Result;
use arrow_array::RecordBatch;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::parquet_writer::ParquetWriter;

/// Worker task that appends incoming record batches to a Parquet file
pub struct ParquetWriterTask<W: Write + Send> {
    receiver: mpsc::Receiver<RecordBatch>,
    writer: ParquetWriter<W>,
    shutdown: CancellationToken,
}

impl<W: Write + Send> ParquetWriterTask<W> {
    pub fn new(
        receiver: mpsc::Receiver<RecordBatch>,
        writer: ParquetWriter<W>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            writer,
            shutdown,
        }
    }

    /// Run until the batch channel closes or shutdown is requested, then close the file
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                batch = self.receiver.recv() => match batch {
                    Some(batch) => self.writer.write(&batch)?,
                    None => {
                        log::debug!("Batch channel closed, closing parquet file");
                        break;
                    }
                },
                _ = self.shutdown.cancelled() => {
                    log::debug!("Shutdown requested, closing parquet file");
                    break;
                }
            }
        }

        // Batches already queued still belong in the file
        while let Ok(batch) = self.receiver.try_recv() {
            self.writer.write(&batch)?;
        }

        log::info!("Wrote {} bandwidth rows", self.writer.rows_written());
        self.writer.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_batch::{create_rate_schema, samples_to_batch};
    use crate::rate_sample::RateSample;
    use chrono::DateTime;
    use membw::metric_names::MEM_BANDWIDTH_WRITE_CONTAINER;
    use membw::ContainerKey;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn batch(value: f64) -> RecordBatch {
        let samples = vec![RateSample {
            time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            key: ContainerKey::new("uid-1", "app"),
            metric: MEM_BANDWIDTH_WRITE_CONTAINER,
            value,
        }];
        samples_to_batch(&samples, create_rate_schema()).unwrap()
    }

    #[tokio::test]
    async fn test_closes_file_when_channel_closes() {
        let buffer = SharedBuffer::default();
        let writer = ParquetWriter::new(buffer.clone(), create_rate_schema()).unwrap();
        let (sender, receiver) = mpsc::channel(4);

        let task = ParquetWriterTask::new(receiver, writer, CancellationToken::new());
        let handle = tokio::spawn(task.run());

        sender.send(batch(1.0)).await.unwrap();
        sender.send(batch(2.0)).await.unwrap();
        drop(sender);

        handle.await.unwrap().unwrap();

        let bytes = buffer.0.lock().unwrap();
        assert!(bytes.starts_with(b"PAR1"));
        assert!(bytes.ends_with(b"PAR1"));
    }

    #[tokio::test]
    async fn test_closes_file_on_shutdown() {
        let buffer = SharedBuffer::default();
        let writer = ParquetWriter::new(buffer.clone(), create_rate_schema()).unwrap();
        let (sender, receiver) = mpsc::channel(4);
        let token = CancellationToken::new();

        sender.send(batch(1.0)).await.unwrap();
        token.cancel();

        // The sender stays open; cancellation alone must end the task
        ParquetWriterTask::new(receiver, writer, token)
            .run()
            .await
            .unwrap();

        assert!(buffer.0.lock().unwrap().ends_with(b"PAR1"));
        drop(sender);
    }
}
