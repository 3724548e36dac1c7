mod auth;
mod bank;
mod tendermint;
mod tx;

pub use auth::Account;
pub use tendermint::{BlockInfo, NodeInfo};
pub use tx::{BroadcastMode, BroadcastResult, GasInfo};

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{error::LcdError, key::Key, AddressHrp, GasPrices, LcdClientBuilder, Wallet};

/// Connection to one Cosmos SDK chain through its LCD (REST) endpoints.
///
/// Cheap to clone, clones share the HTTP connection pool.
#[derive(Clone)]
pub struct LcdClient {
    inner: Arc<LcdInner>,
}

struct LcdInner {
    client: reqwest::Client,
    builder: LcdClientBuilder,
    urls: Vec<String>,
    next_index: parking_lot::Mutex<usize>,
}

/// Anything which can give us an [LcdClient].
pub trait HasLcdClient {
    fn get_lcd_client(&self) -> &LcdClient;
}

impl HasLcdClient for LcdClient {
    fn get_lcd_client(&self) -> &LcdClient {
        self
    }
}

impl<T: HasLcdClient> HasLcdClient for &T {
    fn get_lcd_client(&self) -> &LcdClient {
        HasLcdClient::get_lcd_client(*self)
    }
}

/// Error body returned by the gRPC gateway.
#[derive(Deserialize)]
struct GatewayError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// A single call against the LCD, independent of which node serves it.
struct LcdRequest<'a> {
    path: &'a str,
    query: &'a [(&'a str, String)],
    body: Option<&'a serde_json::Value>,
    height: Option<u64>,
}

impl LcdClientBuilder {
    /// Create an [LcdClient] and check that the node serves the expected chain.
    pub async fn build(self) -> Result<LcdClient> {
        let lcd = self.build_lazy()?;
        lcd.sanity_check().await?;
        Ok(lcd)
    }

    /// Create an [LcdClient] without talking to the node.
    pub fn build_lazy(self) -> Result<LcdClient> {
        let client = reqwest::Client::builder()
            .build()
            .context("Unable to construct HTTP client")?;
        let urls = std::iter::once(self.lcd_url().to_owned())
            .chain(self.fallback_urls().iter().cloned())
            .map(|url| url.trim_end_matches('/').to_owned())
            .collect();
        Ok(LcdClient {
            inner: Arc::new(LcdInner {
                client,
                builder: self,
                urls,
                next_index: parking_lot::Mutex::new(0),
            }),
        })
    }
}

impl LcdClient {
    pub fn get_builder(&self) -> &LcdClientBuilder {
        &self.inner.builder
    }

    pub fn chain_id(&self) -> &str {
        self.inner.builder.chain_id()
    }

    pub fn hrp(&self) -> AddressHrp {
        self.inner.builder.hrp()
    }

    pub fn gas_prices(&self) -> &GasPrices {
        self.inner.builder.gas_prices()
    }

    /// Pair a signing key with this client.
    pub fn wallet(&self, key: Key) -> Wallet {
        Wallet::new(self.clone(), key)
    }

    /// Sanity check the connection, ensuring that the chain ID we found matches what we expected.
    ///
    /// Called automatically by [LcdClientBuilder::build], but not by [LcdClientBuilder::build_lazy].
    pub async fn sanity_check(&self) -> Result<()> {
        let actual = &self.latest_block_info().await?.chain_id;
        let expected = self.chain_id();
        if actual == expected {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Mismatched chain IDs. Actual: {actual}. Expected: {expected}."
            ))
        }
    }

    fn get_next_url(&self) -> &str {
        let mut guard = self.inner.next_index.lock();
        let index = *guard;
        *guard += 1;
        if *guard >= self.inner.urls.len() {
            *guard = 0;
        }
        &self.inner.urls[index]
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LcdError> {
        self.perform(LcdRequest {
            path,
            query,
            body: None,
            height: None,
        })
        .await
    }

    /// Like [Self::get], but reads state as of the given block height.
    pub(crate) async fn get_at_height<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        height: Option<u64>,
    ) -> Result<T, LcdError> {
        self.perform(LcdRequest {
            path,
            query,
            body: None,
            height,
        })
        .await
    }

    pub(crate) async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, LcdError> {
        let body = serde_json::to_value(body).map_err(|source| LcdError::InvalidJson {
            url: path.to_owned(),
            body: String::new(),
            source,
        })?;
        self.perform(LcdRequest {
            path,
            query: &[],
            body: Some(&body),
            height: None,
        })
        .await
    }

    async fn perform<T: DeserializeOwned>(&self, req: LcdRequest<'_>) -> Result<T, LcdError> {
        let builder = &self.inner.builder;
        let seconds = builder.query_timeout_seconds();
        let duration = tokio::time::Duration::from_secs(seconds.into());
        let mut attempt = 0;
        loop {
            let url = format!("{}{}", self.get_next_url(), req.path);
            let res = tokio::time::timeout(duration, self.perform_once(&url, &req)).await;
            let e = match res {
                Ok(Ok(x)) => return Ok(x),
                Ok(Err(e)) => e,
                Err(_) => LcdError::Timeout { url, seconds },
            };
            if !e.is_retryable() || attempt >= builder.query_retries() {
                return Err(e);
            } else {
                attempt += 1;
                tracing::debug!(
                    "Error performing a query, retrying. Attempt {attempt} of {}. {e:?}",
                    builder.query_retries()
                );
            }
        }
    }

    async fn perform_once<T: DeserializeOwned>(
        &self,
        url: &str,
        req: &LcdRequest<'_>,
    ) -> Result<T, LcdError> {
        let mut request = match req.body {
            None => self.inner.client.get(url).query(req.query),
            Some(body) => self.inner.client.post(url).json(body),
        };
        if let Some(referer) = self.inner.builder.referer_header() {
            request = request.header(reqwest::header::REFERER, referer);
        }
        if let Some(height) = req.height {
            // https://docs.cosmos.network/v0.47/run-node/interact-node#query-for-historical-state-using-rest
            request = request.header("x-cosmos-block-height", height);
        }

        let network = |source| LcdError::Network {
            url: url.to_owned(),
            source,
        };
        let res = request.send().await.map_err(network)?;
        let status = res.status();
        let body = res.text().await.map_err(network)?;
        tracing::trace!("{url} returned {status}: {body}");

        if !status.is_success() {
            let (code, message) = match serde_json::from_str::<GatewayError>(&body) {
                Ok(GatewayError { code, message }) if !message.is_empty() => (code, message),
                _ => (0, body),
            };
            return Err(LcdError::Endpoint {
                url: url.to_owned(),
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_str(&body).map_err(|source| LcdError::InvalidJson {
            url: url.to_owned(),
            body,
            source,
        })
    }
}
