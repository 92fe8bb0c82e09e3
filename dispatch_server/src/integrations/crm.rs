//! Hotel CRM client.
//!
//! Implements [`TransferCrm`] over the CRM's REST API. The gateway uses it in two directions: pulling the transfer
//! sheet for a day (so an operator can dispatch a CRM transfer by id), and writing dispatch outcomes back onto the
//! transfer record.

use std::time::Duration;

use chrono::NaiveDate;
use dispatch_engine::traits::{CrmError, CrmTransfer, TransferCrm, TransferStatusUpdate};
use htg_common::Secret;
use log::*;
use reqwest::Client;
use serde::Deserialize;

use crate::config::CrmConfig;

const CRM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct OperaCrm {
    client: Client,
    base_url: String,
    token: Secret<String>,
}

impl OperaCrm {
    pub fn new(config: CrmConfig) -> Self {
        let client = Client::builder().timeout(CRM_TIMEOUT).build().unwrap_or_default();
        Self { client, base_url: config.base_url, token: config.token }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct TransferSheet {
    #[serde(default)]
    transfers: Vec<CrmTransfer>,
}

impl TransferCrm for OperaCrm {
    async fn get_transfers_for_date(&self, date: NaiveDate) -> Result<Vec<CrmTransfer>, CrmError> {
        let day = date.format("%Y-%m-%d").to_string();
        debug!("🏨️ Fetching the CRM transfer sheet for {day}");
        let response = self
            .client
            .get(self.url("/transfers"))
            .bearer_auth(self.token.reveal())
            .query(&[("dateFrom", day.as_str()), ("dateTo", day.as_str()), ("includeTransfers", "true")])
            .send()
            .await
            .map_err(|e| CrmError::RequestFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrmError::RequestFailed(format!("CRM returned {status} for the transfer sheet")));
        }
        let sheet: TransferSheet = response.json().await.map_err(|e| CrmError::InvalidResponse(e.to_string()))?;
        trace!("🏨️ {} transfer(s) on the sheet for {day}", sheet.transfers.len());
        Ok(sheet.transfers)
    }

    async fn create_booking_transfer(&self, booking_id: &str, transfer: CrmTransfer) -> Result<CrmTransfer, CrmError> {
        debug!("🏨️ Creating a transfer on booking {booking_id} for guest '{}'", transfer.guest_name);
        let response = self
            .client
            .post(self.url(&format!("/bookings/{booking_id}/transfers")))
            .bearer_auth(self.token.reveal())
            .json(&transfer)
            .send()
            .await
            .map_err(|e| CrmError::RequestFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrmError::RequestFailed(format!("CRM returned {status} creating a transfer")));
        }
        response.json().await.map_err(|e| CrmError::InvalidResponse(e.to_string()))
    }

    async fn update_transfer_status(&self, transfer_id: &str, update: TransferStatusUpdate) -> Result<(), CrmError> {
        let body = match &update {
            TransferStatusUpdate::Dispatched { provider_order_id } => serde_json::json!({
                "status": "dispatched",
                "provider_order_id": provider_order_id,
            }),
            TransferStatusUpdate::Failed { reason } => serde_json::json!({
                "status": "failed",
                "reason": reason,
            }),
        };
        debug!("🏨️ Updating CRM transfer {transfer_id}: {body}");
        let response = self
            .client
            .post(self.url(&format!("/transfers/{transfer_id}/status")))
            .bearer_auth(self.token.reveal())
            .json(&body)
            .send()
            .await
            .map_err(|e| CrmError::RequestFailed(e.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CrmError::TransferNotFound(transfer_id.to_string()));
        }
        if !status.is_success() {
            return Err(CrmError::RequestFailed(format!("CRM returned {status} updating transfer {transfer_id}")));
        }
        Ok(())
    }
}
