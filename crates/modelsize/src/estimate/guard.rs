use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::Instant;

use super::error::EstimateError;
use super::options::EstimateOptions;
use crate::http::{HttpResponse, HttpTransport};
use crate::range::{ByteRange, fetch_range};

/// Shutdown flag and deadline shared by every request of one call.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallGuard {
    deadline: Option<Instant>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl CallGuard {
    /// Start the clock for a call.
    pub(crate) fn start(options: &EstimateOptions) -> Self {
        Self {
            deadline: options.deadline.map(|d| Instant::now() + d),
            shutdown_flag: options.shutdown_flag.clone(),
        }
    }

    #[inline]
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Fail with [`EstimateError::Cancelled`] if shutdown was requested.
    pub(crate) fn check(&self) -> Result<(), EstimateError> {
        if self.is_shutdown_requested() {
            return Err(EstimateError::Cancelled);
        }
        Ok(())
    }

    /// Issue a range request bounded by the call's deadline.
    pub(crate) async fn fetch(
        &self,
        transport: &dyn HttpTransport,
        url: &str,
        range: ByteRange,
    ) -> Result<HttpResponse, EstimateError> {
        self.check()?;

        let request = fetch_range(transport, url, range);
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, request)
                .await
                .map_err(|_| EstimateError::DeadlineExceeded {
                    url: url.to_string(),
                })?,
            None => request.await,
        };

        result.map_err(|source| EstimateError::fetch(url, source))
    }
}
