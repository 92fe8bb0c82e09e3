//! Notification hooks.
//!
//! Assigns event handlers to the notification gateways. Two events matter here:
//!
//! 1. OrderDispatchedEvent - the guest gets an SMS with the booking confirmation, and the operations mailbox gets a
//!    copy of the order.
//! 2. DispatchFailedEvent - the operations mailbox is alerted so a human can arrange the ride manually.
//!
//! Every hook is best-effort: a gateway failure is logged and swallowed, it never affects the dispatch outcome.

use std::time::Duration;

use dispatch_engine::events::{EventHandlers, EventHooks};
use htg_common::Secret;
use log::*;
use reqwest::Client;

use crate::config::NotificationConfig;

pub const NOTIFY_EVENT_BUFFER_SIZE: usize = 25;
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends plain-text emails through an HTTP mail gateway.
#[derive(Clone, Debug)]
pub struct OrderMailer {
    client: Client,
    gateway_url: String,
    recipient: String,
    api_key: Secret<String>,
}

impl OrderMailer {
    pub fn new(gateway_url: String, recipient: String, api_key: Secret<String>) -> Self {
        let client = Client::builder().timeout(NOTIFY_TIMEOUT).build().unwrap_or_default();
        Self { client, gateway_url, recipient, api_key }
    }

    pub async fn send(&self, subject: &str, body: &str) {
        let payload = serde_json::json!({ "to": self.recipient, "subject": subject, "body": body });
        let result = self
            .client
            .post(&self.gateway_url)
            .bearer_auth(self.api_key.reveal())
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match result {
            Ok(_) => debug!("📨️ Sent '{subject}' to {}", self.recipient),
            Err(e) => error!("📨️ Could not send '{subject}' to {}. {e}", self.recipient),
        }
    }
}

/// Sends SMSes through an HTTP gateway.
#[derive(Clone, Debug)]
pub struct SmsNotifier {
    client: Client,
    gateway_url: String,
    api_key: Secret<String>,
}

impl SmsNotifier {
    pub fn new(gateway_url: String, api_key: Secret<String>) -> Self {
        let client = Client::builder().timeout(NOTIFY_TIMEOUT).build().unwrap_or_default();
        Self { client, gateway_url, api_key }
    }

    pub async fn send(&self, phone: &str, text: &str) {
        let payload = serde_json::json!({ "phone": phone, "text": text });
        let result = self
            .client
            .post(&self.gateway_url)
            .bearer_auth(self.api_key.reveal())
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match result {
            Ok(_) => debug!("📱️ SMS sent to {phone}"),
            Err(e) => error!("📱️ Could not send SMS to {phone}. {e}"),
        }
    }
}

/// Builds the event handlers for whichever notification channels are configured. Unset gateway URLs simply leave
/// their hooks unregistered.
pub fn create_notification_handlers(config: NotificationConfig) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let mailer = config
        .email_gateway_url
        .map(|url| OrderMailer::new(url, config.email_recipient.clone(), config.gateway_api_key.clone()));
    let sms = config.sms_gateway_url.map(|url| SmsNotifier::new(url, config.gateway_api_key.clone()));
    // --- On OrderDispatched handler ---
    if mailer.is_some() || sms.is_some() {
        let mailer_clone = mailer.clone();
        let sms_clone = sms.clone();
        hooks.on_order_dispatched(move |ev| {
            let mailer = mailer_clone.clone();
            let sms = sms_clone.clone();
            Box::pin(async move {
                let order = &ev.order;
                if let Some(mailer) = &mailer {
                    let subject = format!("Taxi booked for {}", order.client_id);
                    let body = format!(
                        "Order {} ({}) is confirmed.\nPickup: {} at {}\nDropoff: {}",
                        ev.result.order_id, ev.result.status, order.pickup_address, order.scheduled_time, order.dropoff_address
                    );
                    mailer.send(&subject, &body).await;
                }
                if let Some(sms) = &sms {
                    if order.phone.is_empty() {
                        warn!("📱️ Order {} has no phone on record. Skipping the confirmation SMS.", ev.result.order_id);
                    } else {
                        let text = format!(
                            "Your taxi is booked. Pickup {} at {}. Booking ref {}.",
                            order.pickup_address, order.scheduled_time, ev.result.order_id
                        );
                        sms.send(&order.phone, &text).await;
                    }
                }
            })
        });
    }
    // --- On DispatchFailed handler ---
    if let Some(mailer) = mailer {
        hooks.on_dispatch_failed(move |ev| {
            let mailer = mailer.clone();
            Box::pin(async move {
                let order = &ev.order;
                let subject = format!("Taxi dispatch FAILED for {}", order.client_id);
                let body = format!(
                    "Dispatch failed: {}\nPickup: {} at {}\nDropoff: {}\nPhone: {}\nPlease arrange this ride manually.",
                    ev.reason, order.pickup_address, order.scheduled_time, order.dropoff_address, order.phone
                );
                mailer.send(&subject, &body).await;
            })
        });
    }
    EventHandlers::new(NOTIFY_EVENT_BUFFER_SIZE, hooks)
}
