//! HTTPS purchase order client with OAuth2 client credentials.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ApiConfig;

use super::{ApiResult, ClientError, OrderResponse, PurchaseOrderClient};

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

const XML_CONTENT_TYPE: &str = "application/xml";

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Queue item as returned by `GET orderresponses/next`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponseEnvelope {
    order_number: String,
    #[serde(default)]
    acknowledgement_uri: Option<String>,
    xml: String,
}

impl From<OrderResponseEnvelope> for OrderResponse {
    fn from(envelope: OrderResponseEnvelope) -> Self {
        Self {
            order_number: envelope.order_number,
            xml: envelope.xml.into_bytes(),
            ack_handle: envelope.acknowledgement_uri.filter(|uri| !uri.trim().is_empty()),
        }
    }
}

/// Purchase order client over HTTPS.
pub struct HttpPurchaseOrderClient {
    client: Client,
    config: ApiConfig,
    /// Cached bearer token (refreshed on expiry or HTTP 401).
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl HttpPurchaseOrderClient {
    /// Create a new client.
    pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            token: Arc::new(RwLock::new(None)),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        endpoint_url(&self.config.base_url, path)
    }

    /// Request a new token with the client credentials grant.
    async fn fetch_token(&self) -> Result<AccessToken, ClientError> {
        let url = self.config.token_endpoint();
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", self.config.api_scope.as_str()),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::AuthenticationFailed(format!(
                "HTTP {}: {}",
                status,
                truncate(&body)
            )));
        }

        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "Obtained access token");
        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    /// Return a fresh bearer token, fetching one if needed.
    async fn access_token(&self) -> Result<String, ClientError> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.value.clone());
            }
        }

        let mut slot = self.token.write().await;
        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }
        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    /// Send an authenticated request, re-authenticating once on HTTP 401.
    async fn send<F>(&self, build: F) -> Result<Response, ClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.access_token().await?;
        let response = build(&self.client).bearer_auth(&token).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("Access token rejected, re-authenticating");
        self.invalidate_token().await;
        let token = self.access_token().await?;
        Ok(build(&self.client).bearer_auth(&token).send().await?)
    }
}

#[async_trait]
impl PurchaseOrderClient for HttpPurchaseOrderClient {
    fn name(&self) -> &str {
        "https"
    }

    async fn send_order(&self, body: Vec<u8>) -> ApiResult<()> {
        let url = self.endpoint("purchaseorders");
        let request = self
            .send(|c| {
                c.post(&url)
                    .header(header::CONTENT_TYPE, XML_CONTENT_TYPE)
                    .body(body.clone())
            })
            .await;
        outcome(request).await
    }

    async fn update_order(&self, order_id: &str, body: Vec<u8>) -> ApiResult<()> {
        let url = self.endpoint(&format!(
            "purchaseorders/{}",
            urlencoding::encode(order_id)
        ));
        let request = self
            .send(|c| {
                c.put(&url)
                    .header(header::CONTENT_TYPE, XML_CONTENT_TYPE)
                    .body(body.clone())
            })
            .await;
        outcome(request).await
    }

    async fn send_status_message(&self, order_id: &str, body: Vec<u8>) -> ApiResult<()> {
        let url = self.endpoint(&format!(
            "purchaseorders/{}/status",
            urlencoding::encode(order_id)
        ));
        let request = self
            .send(|c| {
                c.post(&url)
                    .header(header::CONTENT_TYPE, XML_CONTENT_TYPE)
                    .body(body.clone())
            })
            .await;
        outcome(request).await
    }

    async fn get_order_response(&self) -> ApiResult<OrderResponse> {
        let url = self.endpoint("orderresponses/next");
        let response = match self
            .send(|c| c.get(&url).header(header::ACCEPT, "application/json"))
            .await
        {
            Ok(response) => response,
            Err(e) => return e.into(),
        };

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            return ApiResult::NotFound;
        }
        if !status.is_success() {
            return failure(status, response).await;
        }

        match response.json::<OrderResponseEnvelope>().await {
            Ok(envelope) => ApiResult::Ok(envelope.into()),
            Err(e) => ClientError::InvalidResponse(e.to_string()).into(),
        }
    }

    async fn remove_order_response_from_queue(&self, ack_handle: &str) -> ApiResult<()> {
        let url = ack_url(&self.config.base_url, ack_handle);
        let request = self.send(|c| c.delete(&url)).await;
        outcome(request).await
    }
}

async fn outcome(request: Result<Response, ClientError>) -> ApiResult<()> {
    let response = match request {
        Ok(response) => response,
        Err(e) => return e.into(),
    };

    let status = response.status();
    if status.is_success() {
        ApiResult::Ok(())
    } else if status == StatusCode::NOT_FOUND {
        ApiResult::NotFound
    } else {
        failure(status, response).await
    }
}

async fn failure<T>(status: StatusCode, response: Response) -> ApiResult<T> {
    let body = response.text().await.unwrap_or_default();
    ApiResult::failed(format!("HTTP {}: {}", status, truncate(&body)))
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Join a path onto the API base URL.
fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Acknowledgement handles are absolute URIs or paths relative to the API base.
fn ack_url(base_url: &str, ack_handle: &str) -> String {
    if ack_handle.starts_with("https://") || ack_handle.starts_with("http://") {
        ack_handle.to_string()
    } else {
        endpoint_url(base_url, ack_handle)
    }
}
