// Bounded fetch - One request with a hard time bound
use crate::application::error::FetchError;
use crate::application::transport::{ApiRequest, ApiResponse, Transport};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Leaf primitive under every poll and command.
///
/// The bound is chosen per call. Dropping the returned future cancels the
/// request and its timer.
#[derive(Clone)]
pub struct BoundedFetch {
    transport: Arc<dyn Transport>,
}

impl BoundedFetch {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn fetch(&self, request: ApiRequest, bound: Duration) -> Result<ApiResponse, FetchError> {
        let path = request.path.clone();
        let response = match tokio::time::timeout(bound, self.transport.send(request)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::debug!(path = %path, ?bound, "request exceeded its bound");
                return Err(FetchError::Timeout(bound));
            }
        };

        if !response.is_success() {
            return Err(FetchError::Http {
                status: response.status,
                message: response.message(),
            });
        }

        Ok(response)
    }

    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        bound: Duration,
    ) -> Result<T, FetchError> {
        self.fetch(request, bound).await?.json()
    }
}
