//! Alert dispatch: route an incident report to matching response centers.
//!
//! The dispatcher is the only writer of the alert history and the only
//! caller of push delivery. Storage failures abort the dispatch; delivery
//! failures never do.

pub mod push;

pub use push::{DeliveryError, HttpPushClient, MockPushDelivery, PushDelivery};

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use siren_core::{location_matches, IncidentReport};

use crate::store::{AlertHistory, CenterRegistry, StoreError};

/// Outcome of one dispatch pass, reported back to the submitter.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DispatchOutcome {
    /// Whether the dispatch pass completed; routing details are in the
    /// other fields
    pub success: bool,
    /// Whether an alert was raised (a location matched at least one center)
    pub alert_sent: bool,
    /// Whether the report carried a location a center could match
    pub location_matched: bool,
    /// Names of every matched center, in registration order
    pub matched_centers: Vec<String>,
    /// Successful push deliveries across all matched centers
    pub notifications_sent: usize,
    /// Human-readable summary of the outcome
    pub message: String,
}

impl DispatchOutcome {
    fn no_location() -> Self {
        Self {
            success: true,
            alert_sent: false,
            location_matched: false,
            matched_centers: vec![],
            notifications_sent: 0,
            message: "No location extracted from call; alert not routed".to_string(),
        }
    }

    fn no_match(location: &str) -> Self {
        Self {
            success: true,
            alert_sent: false,
            location_matched: false,
            matched_centers: vec![],
            notifications_sent: 0,
            message: format!("No response center matched location '{location}'"),
        }
    }
}

/// Routes incident reports to matching centers and logs them.
pub struct AlertDispatcher {
    registry: Arc<CenterRegistry>,
    history: Arc<AlertHistory>,
    /// Absent when push is not configured; matched alerts are then logged
    /// without any delivery.
    push: Option<Arc<dyn PushDelivery>>,
}

impl AlertDispatcher {
    pub fn new(
        registry: Arc<CenterRegistry>,
        history: Arc<AlertHistory>,
        push: Option<Arc<dyn PushDelivery>>,
    ) -> Self {
        Self {
            registry,
            history,
            push,
        }
    }

    /// Match the report's location against every registered center, log the
    /// alert, and push it to each matched center's subscriptions.
    ///
    /// A center counts as matched (and is logged as notified) even when it
    /// has no subscriptions; `notifications_sent` counts successful
    /// deliveries only. Dead endpoints (404/410) are pruned from the
    /// registry, transient failures leave the subscription in place.
    pub async fn dispatch(&self, report: &IncidentReport) -> Result<DispatchOutcome, StoreError> {
        let location = match report.location.as_deref() {
            Some(loc) if !loc.trim().is_empty() => loc,
            _ => {
                // Still logged, just undeliverable.
                self.history.append(report, &[]).await?;
                tracing::info!(filename = %report.filename, "Dispatch skipped, no location");
                return Ok(DispatchOutcome::no_location());
            }
        };

        let matched: Vec<_> = self
            .registry
            .list()
            .await?
            .into_iter()
            .filter(|c| location_matches(location, &c.location, &c.state))
            .collect();

        if matched.is_empty() {
            self.history.append(report, &[]).await?;
            tracing::info!(location = %location, "Dispatch found no matching center");
            return Ok(DispatchOutcome::no_match(location));
        }

        let matched_names: Vec<String> = matched.iter().map(|c| c.name.clone()).collect();
        self.history.append(report, &matched_names).await?;

        let mut notifications_sent = 0usize;
        for center in &matched {
            let subscriptions = self.registry.subscriptions_for(&center.name).await?;
            for subscription in subscriptions {
                let Some(push) = &self.push else {
                    continue;
                };
                match push.deliver(&subscription, report).await {
                    Ok(()) => notifications_sent += 1,
                    Err(DeliveryError::Gone(endpoint)) => {
                        tracing::warn!(
                            center = %center.name,
                            endpoint = %endpoint,
                            "Subscription endpoint gone, pruning"
                        );
                        self.registry.remove_subscription(&endpoint).await?;
                    }
                    Err(DeliveryError::Transient(reason)) => {
                        tracing::warn!(
                            center = %center.name,
                            endpoint = %subscription.endpoint,
                            reason = %reason,
                            "Alert delivery failed, keeping subscription"
                        );
                    }
                }
            }
        }

        tracing::info!(
            location = %location,
            matched = matched_names.len(),
            notifications = notifications_sent,
            "Alert dispatched"
        );

        Ok(DispatchOutcome {
            success: true,
            alert_sent: true,
            location_matched: true,
            matched_centers: matched_names,
            notifications_sent,
            message: format!(
                "Alert sent to {} center(s), {} notification(s) delivered",
                matched.len(),
                notifications_sent
            ),
        })
    }
}
