//! Product sources: where the raw, unfiltered catalog comes from

mod generate;
pub mod loader;

pub use generate::{generate_products, GeneratedSource};

use crate::types::{Product, ProductPage, ProductRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const BUNDLED_PRODUCTS: &str = include_str!("../../data/products.json");

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed dataset: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid product data: {0}")]
    InvalidData(String),
    #[error("request superseded")]
    Cancelled,
}

impl FetchError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout(_) => true,
            FetchError::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

/// Asynchronous provider of the raw product collection
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Short label for logs and the status bar
    fn describe(&self) -> String;

    async fn fetch_products(&self) -> Result<ProductPage, FetchError>;

    /// Distinct categories, sorted ascending
    async fn fetch_categories(&self) -> Result<Vec<String>, FetchError> {
        let page = self.fetch_products().await?;
        Ok(distinct_categories(&page.items))
    }
}

pub fn distinct_categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .map(|p| p.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Immutable copy of the catalog at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    products: Vec<Product>,
    categories: Vec<String>,
    total: usize,
    source: String,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        page: ProductPage,
        categories: Vec<String>,
        source: impl Into<String>,
    ) -> Result<Self, FetchError> {
        Self::restore(page.items, categories, page.total, source, Utc::now())
    }

    /// Rebuild a snapshot with a known timestamp (e.g. from the local cache).
    ///
    /// Ids must be unique and prices finite and non-negative. Categories used
    /// by products but absent from `categories` are merged in.
    pub fn restore(
        products: Vec<Product>,
        categories: Vec<String>,
        total: usize,
        source: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        let mut seen = HashSet::with_capacity(products.len());
        for p in &products {
            if !seen.insert(p.id.as_str()) {
                return Err(FetchError::InvalidData(format!("duplicate product id {}", p.id)));
            }
            if !p.price.is_finite() || p.price < 0.0 {
                return Err(FetchError::InvalidData(format!(
                    "product {} has invalid price {}",
                    p.id, p.price
                )));
            }
        }

        let mut category_set: BTreeSet<String> = categories.into_iter().collect();
        let reported = category_set.len();
        category_set.extend(products.iter().map(|p| p.category.clone()));
        if category_set.len() != reported {
            warn!(
                missing = category_set.len() - reported,
                "Source omitted categories used by products, merging them in"
            );
        }

        let source = source.into();
        if total != products.len() {
            debug!(total, received = products.len(), source = %source, "Reported total differs from item count");
        }

        Ok(Self {
            products,
            categories: category_set.into_iter().collect(),
            total,
            source,
            fetched_at,
        })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Either a `{data, total}` page or a bare array of id-less records
#[derive(Deserialize)]
#[serde(untagged)]
enum Dataset {
    Page(ProductPage),
    Records(Vec<ProductRecord>),
}

impl Dataset {
    fn into_page(self) -> ProductPage {
        match self {
            Dataset::Page(page) => page,
            Dataset::Records(records) => {
                let items: Vec<Product> = records
                    .into_iter()
                    .enumerate()
                    .map(|(i, r)| r.into_product(i))
                    .collect();
                ProductPage {
                    total: items.len(),
                    items,
                }
            }
        }
    }
}

pub fn parse_dataset(bytes: &[u8]) -> Result<ProductPage, FetchError> {
    let dataset: Dataset = serde_json::from_slice(bytes)?;
    Ok(dataset.into_page())
}

/// The dataset compiled into the binary
pub struct StaticSource {
    json: &'static str,
}

impl StaticSource {
    pub fn bundled() -> Self {
        Self {
            json: BUNDLED_PRODUCTS,
        }
    }
}

#[async_trait]
impl ProductSource for StaticSource {
    fn describe(&self) -> String {
        "bundled dataset".to_string()
    }

    async fn fetch_products(&self) -> Result<ProductPage, FetchError> {
        parse_dataset(self.json.as_bytes())
    }
}

/// JSON dataset on disk
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProductSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn fetch_products(&self) -> Result<ProductPage, FetchError> {
        let bytes = tokio::fs::read(&self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Dataset file read");
        parse_dataset(&bytes)
    }
}

/// HTTP endpoint returning the page shape
pub struct RemoteSource {
    client: reqwest::Client,
    url: String,
    categories_url: Option<String>,
}

impl RemoteSource {
    pub fn new(url: impl Into<String>, categories_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            categories_url,
        }
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url, "Fetching");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ProductSource for RemoteSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch_products(&self) -> Result<ProductPage, FetchError> {
        let bytes = self.get_bytes(&self.url).await?;
        parse_dataset(&bytes)
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, FetchError> {
        match &self.categories_url {
            Some(url) => {
                let bytes = self.get_bytes(url).await?;
                let categories: Vec<String> = serde_json::from_slice(&bytes)?;
                Ok(categories
                    .into_iter()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect())
            }
            None => Ok(distinct_categories(&self.fetch_products().await?.items)),
        }
    }
}

/// Which source to load from, as stored in settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    #[default]
    Bundled,
    Generated {
        count: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
    File {
        path: PathBuf,
    },
    Remote {
        url: String,
        #[serde(default)]
        categories_url: Option<String>,
    },
}

impl SourceConfig {
    pub fn build(&self) -> Arc<dyn ProductSource> {
        match self {
            SourceConfig::Bundled => Arc::new(StaticSource::bundled()),
            SourceConfig::Generated { count, seed } => Arc::new(GeneratedSource::new(*count, *seed)),
            SourceConfig::File { path } => Arc::new(FileSource::new(path.clone())),
            SourceConfig::Remote {
                url,
                categories_url,
            } => Arc::new(RemoteSource::new(url.clone(), categories_url.clone())),
        }
    }
}
