//! Webhook transport.

use std::future::Future;
use std::sync::Arc;

use dockwatch_common::constants::{APP_NAME, WEBHOOK_CONTENT_TYPE};
use dockwatch_common::error::{Result, WatchError};

/// Posts serialized payloads to webhook URLs.
pub trait WebhookTransport: Send + Sync + 'static {
    /// Delivers `body` to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Delivery`] if the request fails or the
    /// receiver does not accept it.
    fn post(&self, sink: &str, url: &str, body: Arc<[u8]>)
    -> impl Future<Output = Result<()>> + Send;
}

/// HTTP implementation of [`WebhookTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WatchError::config(format!("cannot build webhook client: {e}")))?;
        Ok(Self { http })
    }
}

impl WebhookTransport for HttpTransport {
    async fn post(&self, sink: &str, url: &str, body: Arc<[u8]>) -> Result<()> {
        let failed = |message: String| WatchError::Delivery {
            sink: sink.to_owned(),
            message,
        };

        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, WEBHOOK_CONTENT_TYPE)
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("receiver answered {status}")));
        }
        Ok(())
    }
}
