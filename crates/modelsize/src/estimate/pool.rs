use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use super::error::EstimateError;

/// Run `task` for every URL with at most `concurrency` in flight.
///
/// Results come back in input order regardless of completion order.
pub(crate) async fn fan_out<T, F, Fut>(
    urls: &[String],
    concurrency: usize,
    task: F,
) -> Vec<Result<T, EstimateError>>
where
    T: Send + 'static,
    F: Fn(usize, String) -> Fut,
    Fut: Future<Output = Result<T, EstimateError>> + Send + 'static,
{
    let concurrency = concurrency.clamp(1, urls.len().max(1));
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(urls.len());

    for (index, url) in urls.iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let work = task(index, url.clone());

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|_| EstimateError::Worker("Semaphore closed unexpectedly".to_string()))?;
            work.await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(match handle.await {
            Ok(result) => result,
            Err(e) => Err(EstimateError::Worker(e.to_string())),
        });
    }
    results
}

/// Fold per-shard results into one outcome.
///
/// Cancellation wins over every other failure. A single failure is returned
/// as-is; several are wrapped in [`EstimateError::Shards`].
pub(crate) fn collect<T>(results: Vec<Result<T, EstimateError>>) -> Result<Vec<T>, EstimateError> {
    let total = results.len();
    let mut values = Vec::with_capacity(total);
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(e) => errors.push(e),
        }
    }

    if errors.iter().any(|e| matches!(e, EstimateError::Cancelled)) {
        return Err(EstimateError::Cancelled);
    }

    match errors.len() {
        0 => Ok(values),
        1 => Err(errors.remove(0)),
        _ => Err(EstimateError::Shards { total, errors }),
    }
}
