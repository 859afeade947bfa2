use std::future::Future;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Runs a pipeline task to completion and then cancels `token`.
///
/// The poller and the writer share one token, so either of them ending (cleanly,
/// with an error, or by panicking) stops the other. Returns true when the task
/// finished without error.
pub async fn task_completion_handler<F>(future: F, token: CancellationToken, task_name: &str) -> bool
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let succeeded = match tokio::spawn(future).await {
        Ok(Ok(())) => {
            log::debug!("{} completed successfully", task_name);
            true
        }
        Ok(Err(error)) => {
            log::error!("{} failed: {:#}", task_name, error);
            false
        }
        Err(join_error) => {
            log::error!("{} panicked or was cancelled: {:?}", task_name, join_error);
            false
        }
    };

    token.cancel();
    succeeded
}
