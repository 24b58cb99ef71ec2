use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::{FetchError, ReportError};
use crate::model::{parse_records, HistoryPoint, Order};

pub struct OrderPage {
    /// Total page count, when the response advertises one.
    pub pages: Option<u32>,
    pub records: Vec<Value>,
}

#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn order_page(&self, page: u32) -> Result<OrderPage, FetchError>;
    async fn history(&self, type_id: i32) -> Result<Vec<Value>, FetchError>;
}

#[derive(Clone)]
pub struct EsiClient {
    client: Client,
    base_url: String,
    datasource: String,
    region: u32,
}

impl EsiClient {
    pub fn new(base_url: &str, datasource: &str, region: u32) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("eve_flipper/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            datasource: datasource.to_string(),
            region,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/markets/{}/{}/", self.base_url, self.region, path)
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response, FetchError> {
        let resp = self
            .client
            .get(url)
            .query(&[("datasource", self.datasource.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        Ok(resp)
    }
}

#[async_trait]
impl MarketSource for EsiClient {
    async fn order_page(&self, page: u32) -> Result<OrderPage, FetchError> {
        let url = self.url("orders");
        let resp = self.get(&url, &[("page", page.to_string())]).await?;

        let pages = resp
            .headers()
            .get("x-pages")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());

        let records = resp
            .json::<Vec<Value>>()
            .await
            .map_err(|source| FetchError::Decode { url, source })?;

        Ok(OrderPage { pages, records })
    }

    async fn history(&self, type_id: i32) -> Result<Vec<Value>, FetchError> {
        let url = self.url("history");
        let resp = self.get(&url, &[("type_id", type_id.to_string())]).await?;

        resp.json::<Vec<Value>>()
            .await
            .map_err(|source| FetchError::Decode { url, source })
    }
}

#[derive(Debug, Default)]
pub struct OrderBatch {
    pub orders: Vec<Order>,
    pub pages: u32,
    pub failed_pages: Vec<u32>,
    pub skipped: usize,
}

/// Fetches every order page for the region. Only a failure on the first
/// page is fatal, since that is where the page count comes from.
pub async fn fetch_orders<S: MarketSource + ?Sized>(source: &S) -> Result<OrderBatch, FetchError> {
    let first = source.order_page(1).await?;
    let pages = first.pages.ok_or(FetchError::PageCount)?.max(1);

    let rest = join_all((2..=pages).map(|page| async move { (page, source.order_page(page).await) })).await;

    let mut records = first.records;
    let mut failed_pages = Vec::new();

    for (page, result) in rest {
        match result {
            Ok(p) => records.extend(p.records),
            Err(e) => {
                warn!(page, error = %e, "order page unavailable");
                failed_pages.push(page);
            }
        }
    }

    let (orders, skipped) = parse_records::<Order>(records);

    Ok(OrderBatch {
        orders,
        pages,
        failed_pages,
        skipped,
    })
}

#[derive(Debug, Default)]
pub struct HistoryBatch {
    pub histories: HashMap<i32, Option<Vec<HistoryPoint>>>,
    pub failed: usize,
    pub skipped: usize,
}

/// One request per item, all in flight at once. A failed item maps to `None`.
pub async fn fetch_histories<S: MarketSource + ?Sized>(source: &S, type_ids: &[i32]) -> HistoryBatch {
    let results = join_all(
        type_ids
            .iter()
            .map(|&type_id| async move { (type_id, source.history(type_id).await) }),
    )
    .await;

    let mut batch = HistoryBatch::default();

    for (type_id, result) in results {
        let history = match result {
            Ok(records) => {
                let (points, skipped) = parse_records::<HistoryPoint>(records);
                batch.skipped += skipped;
                Some(points)
            }
            Err(e) => {
                warn!(type_id, error = %e, "history unavailable");
                batch.failed += 1;
                None
            }
        };
        batch.histories.insert(type_id, history);
    }

    batch
}

/// Type id (as a string) to display name.
pub fn load_names(path: &Path) -> Result<HashMap<String, String>, ReportError> {
    let data = std::fs::read_to_string(path).map_err(ReportError::ReadNames)?;
    serde_json::from_str(&data).map_err(ReportError::ParseNames)
}
