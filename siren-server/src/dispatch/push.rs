//! Push delivery to subscribed center endpoints.
//!
//! Delivery failures never fail the request that triggered them; the
//! dispatcher only uses the error class to decide whether to prune the
//! subscription (endpoint gone) or keep it (transient failure).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use siren_core::analysis::http::is_gone_status;
use siren_core::IncidentReport;

use crate::store::Subscription;

/// Timeout for one push delivery attempt.
const DELIVERY_TIMEOUT_SECS: u64 = 10;

/// Why one delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The endpoint no longer exists; the subscription should be pruned.
    #[error("subscription endpoint gone: {0}")]
    Gone(String),

    /// A recoverable failure; the subscription stays registered.
    #[error("transient delivery failure: {0}")]
    Transient(String),
}

/// Delivery of one incident report to one subscription endpoint.
#[async_trait]
pub trait PushDelivery: Send + Sync {
    async fn deliver(
        &self,
        subscription: &Subscription,
        report: &IncidentReport,
    ) -> Result<(), DeliveryError>;
}

/// HTTP push client posting the report as JSON to the subscription endpoint.
pub struct HttpPushClient {
    client: reqwest::Client,
}

impl HttpPushClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DELIVERY_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PushDelivery for HttpPushClient {
    async fn deliver(
        &self,
        subscription: &Subscription,
        report: &IncidentReport,
    ) -> Result<(), DeliveryError> {
        let mut request = self.client.post(&subscription.endpoint).json(report);

        // Endpoints registered with an auth token get it back as a bearer.
        if let Some(token) = subscription
            .credentials
            .get("auth")
            .and_then(|v| v.as_str())
        {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(endpoint = %subscription.endpoint, "Alert delivered");
            Ok(())
        } else if is_gone_status(status) {
            Err(DeliveryError::Gone(subscription.endpoint.clone()))
        } else {
            Err(DeliveryError::Transient(format!(
                "endpoint returned {status}"
            )))
        }
    }
}

/// Scripted delivery for tests: records every delivered report and fails on
/// endpoints listed as gone or transient.
#[derive(Default)]
pub struct MockPushDelivery {
    delivered: std::sync::Mutex<Vec<(String, IncidentReport)>>,
    gone_endpoints: Vec<String>,
    transient_endpoints: Vec<String>,
}

impl MockPushDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an endpoint as permanently gone (delivery answers 410).
    pub fn with_gone(mut self, endpoint: impl Into<String>) -> Self {
        self.gone_endpoints.push(endpoint.into());
        self
    }

    /// Mark an endpoint as transiently failing.
    pub fn with_transient(mut self, endpoint: impl Into<String>) -> Self {
        self.transient_endpoints.push(endpoint.into());
        self
    }

    /// Endpoints that received a report, in delivery order.
    pub fn delivered_endpoints(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|d| d.iter().map(|(e, _)| e.clone()).collect())
            .unwrap_or_default()
    }

    pub fn delivery_count(&self) -> usize {
        self.delivered.lock().map(|d| d.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PushDelivery for MockPushDelivery {
    async fn deliver(
        &self,
        subscription: &Subscription,
        report: &IncidentReport,
    ) -> Result<(), DeliveryError> {
        if self.gone_endpoints.contains(&subscription.endpoint) {
            return Err(DeliveryError::Gone(subscription.endpoint.clone()));
        }
        if self.transient_endpoints.contains(&subscription.endpoint) {
            return Err(DeliveryError::Transient("scripted failure".to_string()));
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push((subscription.endpoint.clone(), report.clone()));
        }
        Ok(())
    }
}
