//! Azure Storage queue source using the Queue service REST API.
//!
//! Queues are listed with `GET ?comp=list` (following `NextMarker` pages) and
//! each queue's approximate count is read from the
//! `x-ms-approximate-messages-count` header of `HEAD <queue>?comp=metadata`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azqmon::source::{collect, AzureQueueSource, StorageAccount};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let account = StorageAccount::parse("UseDevelopmentStorage=true")?;
//!     let mut source = AzureQueueSource::builder().account(account).build()?;
//!
//!     let snapshot = collect(&mut source).await?;
//!     for sample in &snapshot.samples {
//!         println!("{}: {}", sample.name, sample.count);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;
use url::Url;

use super::{QueueHandle, QueueSource};
use crate::error::{ConfigError, SourceError};

const API_VERSION: &str = "2019-02-02";
const COUNT_HEADER: &str = "x-ms-approximate-messages-count";

const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_QUEUE_ENDPOINT: &str = "http://127.0.0.1:10001/devstoreaccount1";

/// How requests are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Decoded account key used for Shared Key signing.
    SharedKey(Vec<u8>),
    /// Shared access signature query string, without the leading `?`.
    Sas(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::SharedKey(_) => f.write_str("SharedKey(..)"),
            Credentials::Sas(_) => f.write_str("Sas(..)"),
        }
    }
}

/// The parts of a storage connection string the queue source needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccount {
    pub name: String,
    pub queue_endpoint: Url,
    pub credentials: Credentials,
}

impl StorageAccount {
    /// Parse an Azure Storage connection string.
    ///
    /// Recognised keys are `AccountName`, `AccountKey`,
    /// `DefaultEndpointsProtocol`, `EndpointSuffix`, `QueueEndpoint`,
    /// `SharedAccessSignature` and `UseDevelopmentStorage`. Unknown keys
    /// (such as `BlobEndpoint`) are ignored.
    pub fn parse(connection_string: &str) -> Result<Self, ConfigError> {
        let invalid = |msg: &str| ConfigError::ConnectionString(msg.to_string());

        let mut account_name = None;
        let mut account_key = None;
        let mut protocol = None;
        let mut suffix = None;
        let mut queue_endpoint = None;
        let mut sas = None;
        let mut development = false;

        for segment in connection_string.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| invalid(&format!("segment '{}' has no value", segment)))?;
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "accountname" => account_name = Some(value.to_string()),
                "accountkey" => account_key = Some(value.to_string()),
                "defaultendpointsprotocol" => protocol = Some(value.to_string()),
                "endpointsuffix" => suffix = Some(value.to_string()),
                "queueendpoint" => queue_endpoint = Some(value.to_string()),
                "sharedaccesssignature" => sas = Some(value.trim_start_matches('?').to_string()),
                "usedevelopmentstorage" => development = value.eq_ignore_ascii_case("true"),
                other => debug!("Ignoring connection string key {}", other),
            }
        }

        if development {
            account_name.get_or_insert_with(|| DEV_ACCOUNT_NAME.to_string());
            account_key.get_or_insert_with(|| DEV_ACCOUNT_KEY.to_string());
            queue_endpoint.get_or_insert_with(|| DEV_QUEUE_ENDPOINT.to_string());
        }

        let endpoint = match (queue_endpoint, &account_name) {
            (Some(endpoint), _) => endpoint,
            (None, Some(name)) => format!(
                "{}://{}.queue.{}",
                protocol.as_deref().unwrap_or("https"),
                name,
                suffix.as_deref().unwrap_or("core.windows.net")
            ),
            (None, None) => return Err(invalid("AccountName or QueueEndpoint is required")),
        };
        let queue_endpoint = Url::parse(&endpoint)
            .map_err(|e| invalid(&format!("invalid queue endpoint '{}': {}", endpoint, e)))?;

        let credentials = match (account_key, sas) {
            (Some(key), _) => Credentials::SharedKey(
                BASE64
                    .decode(key)
                    .map_err(|e| invalid(&format!("AccountKey is not valid base64: {}", e)))?,
            ),
            (None, Some(sas)) => Credentials::Sas(sas),
            (None, None) => {
                return Err(invalid("AccountKey or SharedAccessSignature is required"))
            }
        };

        let name = match (account_name, &credentials) {
            (Some(name), _) => name,
            (None, Credentials::Sas(_)) => {
                queue_endpoint.host_str().unwrap_or_default().to_string()
            }
            (None, Credentials::SharedKey(_)) => {
                return Err(invalid("AccountName is required with AccountKey"))
            }
        };

        Ok(Self {
            name,
            queue_endpoint,
            credentials,
        })
    }
}

/// Queue source for an Azure Storage account.
#[derive(Debug, Clone)]
pub struct AzureQueueSource {
    client: Client,
    account: StorageAccount,
    description: String,
}

impl AzureQueueSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> AzureQueueSourceBuilder {
        AzureQueueSourceBuilder::default()
    }

    fn url(&self, queue: Option<&str>, query: &[(&str, &str)]) -> Url {
        let mut url = self.account.queue_endpoint.clone();
        if let Some(queue) = queue {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push(queue);
            }
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        if let Credentials::Sas(sas) = &self.account.credentials {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in url::form_urlencoded::parse(sas.as_bytes()) {
                pairs.append_pair(&k, &v);
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, SourceError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION);

        if let Credentials::SharedKey(key) = &self.account.credentials {
            let to_sign = string_to_sign(method.as_str(), &url, &date, &self.account.name);
            let signature = sign(key, &to_sign)?;
            request = request.header(
                "Authorization",
                format!("SharedKey {}:{}", self.account.name, signature),
            );
        }

        Ok(request)
    }

    async fn list_page(
        &self,
        marker: Option<&str>,
    ) -> Result<(Vec<QueueHandle>, Option<String>), SourceError> {
        let mut query = vec![("comp", "list")];
        if let Some(marker) = marker {
            query.push(("marker", marker));
        }
        let url = self.url(None, &query);

        let response = self.request(Method::GET, url)?.send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::Transient(format!(
                "authentication failed ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Transient(format!(
                "listing returned status {}",
                status
            )));
        }

        let body = response.text().await?;
        parse_list_response(&body)
    }
}

#[async_trait]
impl QueueSource for AzureQueueSource {
    async fn list_queues(&mut self) -> Result<Vec<QueueHandle>, SourceError> {
        let mut queues = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let (page, next) = self.list_page(marker.as_deref()).await?;
            debug!("Listed {} queues (marker {:?})", page.len(), marker);
            queues.extend(page);

            match next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(queues)
    }

    async fn fetch_count(&mut self, queue: &QueueHandle) -> Result<u64, SourceError> {
        let url = self.url(Some(&queue.name), &[("comp", "metadata")]);
        let response = self.request(Method::HEAD, url)?.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(queue.name.clone()));
        }
        if !status.is_success() {
            return Err(SourceError::Transient(format!(
                "metadata for '{}' returned status {}",
                queue.name, status
            )));
        }

        response
            .headers()
            .get(COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| {
                SourceError::Transient(format!("missing {} for '{}'", COUNT_HEADER, queue.name))
            })
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`AzureQueueSource`].
#[derive(Debug, Default)]
pub struct AzureQueueSourceBuilder {
    account: Option<StorageAccount>,
    timeout: Option<Duration>,
}

impl AzureQueueSourceBuilder {
    /// Set the storage account to query.
    pub fn account(mut self, account: StorageAccount) -> Self {
        self.account = Some(account);
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<AzureQueueSource, ConfigError> {
        let account = self.account.ok_or(ConfigError::MissingConnectionString)?;
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;

        let description = format!("azure: {} ({})", account.name, account.queue_endpoint);

        Ok(AzureQueueSource {
            client,
            account,
            description,
        })
    }
}

/// Build the Shared Key string-to-sign for a request without a body.
fn string_to_sign(verb: &str, url: &Url, date: &str, account: &str) -> String {
    // VERB, then eleven empty standard headers (Content-Encoding .. Range).
    let mut out = format!("{}\n{}", verb, "\n".repeat(11));
    out.push_str(&format!("x-ms-date:{}\nx-ms-version:{}\n", date, API_VERSION));
    out.push_str(&format!("/{}{}", account, url.path()));

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.into_owned()))
        .collect();
    params.sort();
    for (k, v) in params {
        out.push_str(&format!("\n{}:{}", k, v));
    }

    out
}

fn sign(key: &[u8], to_sign: &str) -> Result<String, SourceError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| SourceError::Transient(format!("cannot sign request: {}", e)))?;
    mac.update(to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// `List Queues` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    queues: QueueList,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QueueList {
    #[serde(rename = "Queue", default)]
    queue: Vec<QueueEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueueEntry {
    name: String,
}

fn parse_list_response(body: &str) -> Result<(Vec<QueueHandle>, Option<String>), SourceError> {
    let results: EnumerationResults = quick_xml::de::from_str(body)
        .map_err(|e| SourceError::Transient(format!("malformed queue listing: {}", e)))?;

    let queues = results
        .queues
        .queue
        .into_iter()
        .map(|q| QueueHandle::new(q.name))
        .collect();
    let next = results.next_marker.filter(|m| !m.is_empty());
    Ok((queues, next))
}
