//! Client for the dog image catalog service (thedogapi.com).

mod catalog;
mod filter;

pub use catalog::{Breed, BreedCatalog};
pub use filter::ImageFilter;

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::{
    errors::Error,
    request::{RequestExecutor, RequestSpec},
    Result,
};

pub const DEFAULT_BASE_URL: &str = "https://api.thedogapi.com/v1";

/// Attempt budget for one image search.
pub const SEARCH_MAX_ATTEMPTS: u32 = 5;

/// Attempt budget for the startup breed listing.
pub const BREEDS_MAX_ATTEMPTS: u32 = 1;

#[derive(Debug, Deserialize)]
struct SearchHit {
    url: String,
}

#[derive(Clone)]
pub struct DogApiClient {
    executor: RequestExecutor,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl DogApiClient {
    pub fn new(
        executor: RequestExecutor,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, spec: RequestSpec) -> RequestSpec {
        spec.with_header("Content-Type", "application/json")
            .with_header("x-api-key", self.api_key.clone())
            .with_timeout(self.timeout)
    }

    pub fn breeds_request(&self) -> RequestSpec {
        self.authorized(RequestSpec::get(self.endpoint("breeds")))
            .with_max_attempts(BREEDS_MAX_ATTEMPTS)
    }

    pub fn search_request(&self, filter: &ImageFilter) -> RequestSpec {
        self.authorized(RequestSpec::get(self.endpoint("images/search")))
            .with_params(filter.query_params())
            .with_max_attempts(SEARCH_MAX_ATTEMPTS)
    }

    pub async fn fetch_breeds(&self) -> Result<BreedCatalog> {
        let breeds: Vec<Breed> = self.executor.execute_as(&self.breeds_request()).await?;
        info!(count = breeds.len(), "loaded breed catalog");
        Ok(BreedCatalog::new(breeds))
    }

    /// URL of the first image matching `filter`.
    pub async fn search_image(&self, filter: &ImageFilter) -> Result<String> {
        let spec = self.search_request(filter);
        let hits: Vec<SearchHit> = self.executor.execute_as(&spec).await?;
        hits.into_iter()
            .next()
            .map(|hit| hit.url)
            .filter(|url| !url.trim().is_empty())
            .ok_or(Error::NoImageFound)
    }
}
