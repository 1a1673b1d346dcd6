//! HTTP existence-check client.

use crate::error::VerifyError;
use crate::types::*;
use async_trait::async_trait;
use proxy_pool::ProxyEntry;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Cached per-proxy clients are dropped wholesale past this size.
const MAX_CACHED_CLIENTS: usize = 1024;

/// One verification attempt for one phone number through one proxy.
#[async_trait]
pub trait PhoneLookup: Send + Sync {
    async fn lookup(&self, phone: &str, proxy: &ProxyEntry) -> Result<Presence, VerifyError>;
}

/// Existence checker that sends every request through the given proxy.
///
/// A `reqwest::Client` is bound to one proxy, so clients are built lazily
/// and cached by proxy URI.
pub struct HttpVerifier {
    endpoint: String,
    query_param: String,
    timeout: Duration,
    headers: HeaderMap,
    clients: Mutex<HashMap<String, Client>>,
}

impl HttpVerifier {
    /// Create a new verifier.
    pub fn new(settings: VerifierSettings) -> Result<Self, VerifyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|_| VerifyError::InvalidHeader("User-Agent"))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(origin) = &settings.origin {
            let value =
                HeaderValue::from_str(origin).map_err(|_| VerifyError::InvalidHeader("Origin"))?;
            headers.insert(ORIGIN, value.clone());
            headers.insert(REFERER, value);
        }

        Ok(Self {
            endpoint: settings.endpoint,
            query_param: settings.query_param,
            timeout: settings.timeout,
            headers,
            clients: Mutex::new(HashMap::new()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) async fn cached_clients(&self) -> usize {
        self.clients.lock().await.len()
    }

    async fn client_for(&self, proxy: &ProxyEntry) -> Result<Client, VerifyError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(proxy.expose_uri()) {
            return Ok(client.clone());
        }

        let route = reqwest::Proxy::all(proxy.expose_uri())
            .map_err(|_| VerifyError::InvalidProxy(proxy.to_string()))?;
        let client = Client::builder()
            .proxy(route)
            .timeout(self.timeout)
            .default_headers(self.headers.clone())
            .build()?;

        if clients.len() >= MAX_CACHED_CLIENTS {
            debug!("Client cache full, clearing {} entries", clients.len());
            clients.clear();
        }
        clients.insert(proxy.expose_uri().to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl PhoneLookup for HttpVerifier {
    #[instrument(skip(self), fields(proxy = %proxy))]
    async fn lookup(&self, phone: &str, proxy: &ProxyEntry) -> Result<Presence, VerifyError> {
        let client = self.client_for(proxy).await?;

        let response = client
            .get(&self.endpoint)
            .query(&[(self.query_param.as_str(), phone)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!("Existence check returned {}", status);
            return Err(VerifyError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: ExistsResponse = serde_json::from_str(&body)?;
        Ok(Presence::from_exists(parsed.exists))
    }
}
