use crate::config::Config;
use crate::error::Error;
use crate::rate::RateGovernor;
use chrono::DateTime;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const STORE_API: &str = "store";

/// Record kinds exposed by the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Product,
    Collection,
    Page,
}

impl ResourceKind {
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Product => "products",
            ResourceKind::Collection => "custom_collections",
            ResourceKind::Page => "pages",
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            ResourceKind::Product => "product",
            ResourceKind::Collection => "custom_collection",
            ResourceKind::Page => "page",
        }
    }
}

/// One store record, viewed through the translatable fields.
///
/// Fields the translator never touches survive the fetch/update round-trip
/// in the flattened `extra` map, so a PUT sends the full record body back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Client for the store admin API: paginated list, single fetch, full-body
/// replace. Calls are strictly sequential; the governor owns pacing against
/// the store's rate domain.
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    page_size: u32,
    governor: RateGovernor,
}

impl StoreClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.store_base_url.trim_end_matches('/').to_string(),
            access_token: config.store_access_token.clone(),
            page_size: config.store_page_size,
            governor: RateGovernor::new(),
        }
    }

    /// Fetch every record of one kind, following the `page_info` cursor in
    /// the `Link` response header until the store stops offering a next page.
    pub async fn list(&mut self, kind: ResourceKind) -> Result<Vec<ContentRecord>, Error> {
        let mut records = Vec::new();
        let mut page_info: Option<String> = None;
        let url = format!("{}/{}.json", self.base_url, kind.plural());

        loop {
            self.governor.before_call().await;

            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[("limit", self.page_size.to_string())]);
            if let Some(info) = &page_info {
                request = request.query(&[("page_info", info.as_str())]);
            }

            let response = request.send().await.map_err(|e| Error::UpstreamTransport {
                api: STORE_API,
                source: e,
            })?;

            let next_page = response
                .headers()
                .get("link")
                .and_then(|v| v.to_str().ok())
                .and_then(page_info_from_link_header);
            self.observe_rate_limit(response.headers());

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let message = response.text().await.unwrap_or_default();
                return Err(Error::UpstreamStatus {
                    api: STORE_API,
                    status,
                    message,
                });
            }

            let body: serde_json::Value =
                response.json().await.map_err(|e| Error::UpstreamTransport {
                    api: STORE_API,
                    source: e,
                })?;

            if let Some(items) = body.get(kind.plural()).and_then(|v| v.as_array()) {
                for item in items {
                    match serde_json::from_value::<ContentRecord>(item.clone()) {
                        Ok(record) => records.push(record),
                        Err(e) => warn!("Skipping malformed {} record: {}", kind.singular(), e),
                    }
                }
            }

            page_info = next_page;
            if page_info.is_none() {
                break;
            }
        }

        info!("Fetched {} {} from the store", records.len(), kind.plural());
        Ok(records)
    }

    /// Fetch one record by id.
    pub async fn fetch(&mut self, kind: ResourceKind, id: u64) -> Result<ContentRecord, Error> {
        let url = format!("{}/{}/{}.json", self.base_url, kind.plural(), id);

        self.governor.before_call().await;
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| Error::UpstreamTransport {
                api: STORE_API,
                source: e,
            })?;
        self.observe_rate_limit(response.headers());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamStatus {
                api: STORE_API,
                status,
                message,
            });
        }

        let body: serde_json::Value =
            response.json().await.map_err(|e| Error::UpstreamTransport {
                api: STORE_API,
                source: e,
            })?;

        let record = body
            .get(kind.singular())
            .cloned()
            .ok_or_else(|| Error::UpstreamPayload {
                api: STORE_API,
                message: format!("response missing '{}' object", kind.singular()),
            })?;

        serde_json::from_value(record).map_err(|e| Error::UpstreamPayload {
            api: STORE_API,
            message: e.to_string(),
        })
    }

    /// Replace one record with a PUT of its full body. Best-effort: there is
    /// no optimistic concurrency here.
    pub async fn update(&mut self, kind: ResourceKind, record: &ContentRecord) -> Result<(), Error> {
        let url = format!("{}/{}/{}.json", self.base_url, kind.plural(), record.id);

        let value = serde_json::to_value(record).map_err(|e| Error::UpstreamPayload {
            api: STORE_API,
            message: format!("failed to serialize record body: {}", e),
        })?;
        let mut envelope = serde_json::Map::new();
        envelope.insert(kind.singular().to_string(), value);
        let body = serde_json::Value::Object(envelope);

        self.governor.before_call().await;
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::UpstreamTransport {
                api: STORE_API,
                source: e,
            })?;
        self.observe_rate_limit(response.headers());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamStatus {
                api: STORE_API,
                status,
                message,
            });
        }

        Ok(())
    }

    /// Feed rate-limit metadata from the response headers to the governor,
    /// logging the state the way the store reports it.
    fn observe_rate_limit(&mut self, headers: &HeaderMap) {
        let remaining = headers
            .get("x-api-call-limit")
            .and_then(|v| v.to_str().ok())
            .and_then(remaining_from_limit_header);

        if let Some(remaining) = remaining {
            let reset = headers
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|ts| ts.parse::<i64>().ok())
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.format("%H:%M:%S UTC").to_string());

            match reset {
                Some(reset) => info!(
                    "Store API rate limit: {} calls remaining (resets at {})",
                    remaining, reset
                ),
                None => info!("Store API rate limit: {} calls remaining", remaining),
            }
        }

        self.governor.after_call(remaining);
    }
}

/// Extract the `page_info` cursor for the next page from a `Link` header.
///
/// The header carries one or more `<url>; rel="..."` entries; only the
/// `rel="next"` entry's `page_info` query parameter matters here.
pub fn page_info_from_link_header(value: &str) -> Option<String> {
    for entry in value.split(',') {
        if !entry.contains("rel=\"next\"") {
            continue;
        }
        let start = entry.find('<')? + 1;
        let end = entry.find('>')?;
        let url = entry.get(start..end)?;

        for param in url.split('?').nth(1)?.split('&') {
            if let Some(info) = param.strip_prefix("page_info=") {
                if !info.is_empty() {
                    return Some(info.to_string());
                }
            }
        }
    }
    None
}

/// Parse the store's `used/limit` call allowance header into the number of
/// calls still available.
pub fn remaining_from_limit_header(value: &str) -> Option<u32> {
    let (used, limit) = value.split_once('/')?;
    let used: u32 = used.trim().parse().ok()?;
    let limit: u32 = limit.trim().parse().ok()?;
    Some(limit.saturating_sub(used))
}
