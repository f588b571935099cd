//! Forwards payment status changes to the purchase workflow.
//!
//! Every `PaymentStatusChanged` event is POSTed, as JSON, to the configured webhook URL. Delivery is best effort:
//! failures are logged and the event is not retried.
use std::sync::Arc;

use futures::future::BoxFuture;
use log::*;
use mpe_engine::events::{EventHandlers, EventHooks, MarketStateChangedEvent, PaymentStatusChangedEvent};
use reqwest::Client;
use serde::Serialize;

use crate::errors::ConfigError;

pub const EVENT_BUFFER_SIZE: usize = 25;

/// The body of a webhook call.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseNotification {
    pub event: &'static str,
    #[serde(flatten)]
    pub payment: PaymentStatusChangedEvent,
}

impl From<PaymentStatusChangedEvent> for PurchaseNotification {
    fn from(payment: PaymentStatusChangedEvent) -> Self {
        Self { event: "payment_status_changed", payment }
    }
}

#[derive(Clone)]
pub struct PurchaseWebhook {
    url: String,
    client: Arc<Client>,
}

impl PurchaseWebhook {
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ConfigError::WebhookClient(e.to_string()))?;
        Ok(Self { url: url.to_string(), client: Arc::new(client) })
    }

    pub async fn notify(&self, event: PaymentStatusChangedEvent) {
        let payment_id = event.payment_id;
        let body = PurchaseNotification::from(event);
        match self.client.post(&self.url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("🛒️ Purchase workflow notified of payment #{payment_id} ({})", body.payment.new_status);
            },
            Ok(response) => {
                let status = response.status().as_u16();
                let message = response.text().await.unwrap_or_default();
                error!("🛒️ Purchase webhook rejected the update for payment #{payment_id}. HTTP {status}: {message}");
            },
            Err(e) => error!("🛒️ Could not deliver the update for payment #{payment_id} to the purchase webhook. {e}"),
        }
    }
}

/// Builds the daemon's event handlers. Status changes are always logged, and also POSTed when `webhook_url` is set.
pub fn create_event_handlers(webhook_url: Option<&str>) -> Result<EventHandlers, ConfigError> {
    let webhook = webhook_url.map(PurchaseWebhook::new).transpose()?;
    let mut hooks = EventHooks::default();
    hooks.on_payment_status_changed(move |ev| {
        info!(
            "📬️ Payment #{} for purchase {} moved from {} to {} ({} received)",
            ev.payment_id, ev.purchase_id, ev.old_status, ev.new_status, ev.paid_amount
        );
        match webhook.clone() {
            Some(webhook) => Box::pin(async move { webhook.notify(ev).await }),
            None => no_op(),
        }
    });
    hooks.on_market_state_changed(|ev: MarketStateChangedEvent| {
        if ev.is_frozen() {
            warn!("📬️ The {} market is now {}. Quotes in {} are suspended.", ev.currency, ev.new_state.label(), ev.currency);
        } else {
            info!("📬️ The {} market is {} again.", ev.currency, ev.new_state.label());
        }
        no_op()
    });
    Ok(EventHandlers::new(EVENT_BUFFER_SIZE, hooks))
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
