use std::time::Duration;

use chrono::Local;
use gootax_tools::{GootaxConfig, NewTaxiOrder, TaxiOrderResult};
use log::*;
use tokio::try_join;

use crate::{
    db_types::{CanonicalOrder, SourceChannel, VehicleClass},
    dispatch_api::DispatchError,
    events::{DispatchFailedEvent, EventProducers, OrderDispatchedEvent},
    geocoder::{CachedGeocoder, GeocodeUpstream},
    helpers::order_from_transfer,
    queue::DispatchQueue,
    traits::{CrmError, CrmTransfer, DispatchQueueDatabase, GeocodeCache, TransferCrm, TransferStatusUpdate},
    validator::validate_order,
};

/// How long a caller waits for a job to settle before getting a timeout verdict. The job itself keeps running;
/// only the wait is bounded.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Vehicle class → provider tariff id.
#[derive(Debug, Clone)]
pub struct TariffTable {
    sedan: String,
    minivan: String,
}

impl TariffTable {
    pub fn new(sedan: impl Into<String>, minivan: impl Into<String>) -> Self {
        Self { sedan: sedan.into(), minivan: minivan.into() }
    }

    pub fn from_config(config: &GootaxConfig) -> Self {
        Self::new(config.sedan_tariff.clone(), config.minivan_tariff.clone())
    }

    pub fn tariff_for(&self, class: VehicleClass) -> &str {
        match class {
            VehicleClass::Sedan => &self.sedan,
            VehicleClass::Minivan => &self.minivan,
        }
    }
}

/// The order orchestrator.
///
/// One explicit instance is constructed at startup and passed around by handle; every intake route funnels into
/// [`OrderFlowApi::process_order`]. The pipeline is: resolve both addresses, validate, pick a tariff, enqueue one
/// durable job, await it, then run the best-effort tail (CRM write-back, event hooks) that can never change the
/// verdict.
pub struct OrderFlowApi<B, U, C> {
    queue: DispatchQueue<B>,
    geocoder: CachedGeocoder<B, U>,
    crm: C,
    tariffs: TariffTable,
    producers: EventProducers,
    dispatch_timeout: Duration,
}

impl<B, U, C> OrderFlowApi<B, U, C>
where
    B: DispatchQueueDatabase + GeocodeCache,
    U: GeocodeUpstream,
    C: TransferCrm,
{
    pub fn new(
        queue: DispatchQueue<B>,
        geocoder: CachedGeocoder<B, U>,
        crm: C,
        tariffs: TariffTable,
        producers: EventProducers,
        dispatch_timeout: Duration,
    ) -> Self {
        Self { queue, geocoder, crm, tariffs, producers, dispatch_timeout }
    }

    pub fn queue(&self) -> &DispatchQueue<B> {
        &self.queue
    }

    /// Takes a canonical order all the way to a provider order id.
    pub async fn process_order(&self, order: CanonicalOrder) -> Result<TaxiOrderResult, DispatchError> {
        debug!("🔄️ Processing order for {} ({})", order.client_id, order.source);
        let (pickup, dropoff) = try_join!(
            self.geocoder.resolve(&order.pickup_address),
            self.geocoder.resolve(&order.dropoff_address)
        )?;
        let phone = validate_order(&pickup, &dropoff, order.scheduled_time, &order.phone)
            .map_err(DispatchError::Validation)?;
        let taxi_order = NewTaxiOrder {
            pickup: pickup.into(),
            dropoff: dropoff.into(),
            client_id: order.client_id.clone(),
            phone,
            tariff_id: self.tariffs.tariff_for(order.vehicle_class).to_string(),
            time: order.scheduled_time,
            options: order.options.clone(),
            comment: order.comment.clone(),
        };
        let handle = self.queue.enqueue(&taxi_order, order.source).await?;
        let job_id = handle.job_id();
        let seconds = self.dispatch_timeout.as_secs();
        let outcome = match tokio::time::timeout(self.dispatch_timeout, handle.await_result()).await {
            Err(_elapsed) => {
                warn!("🔄️ Job {job_id} did not settle within {seconds} s; caller gets a timeout");
                return Err(DispatchError::Timeout { seconds });
            },
            Ok(outcome) => outcome,
        };
        match outcome {
            Ok(result) => {
                info!("🔄️ Order for {} dispatched as provider order {}", order.client_id, result.order_id);
                self.after_success(&order, &result).await;
                Ok(result)
            },
            Err(e) => {
                self.after_failure(&order, &e.to_string()).await;
                Err(e.into())
            },
        }
    }

    /// Dispatches a CRM transfer by id: today's transfer list is fetched, the matching transfer is mapped onto a
    /// canonical order, and the normal pipeline takes over.
    pub async fn process_transfer(&self, transfer_id: &str) -> Result<TaxiOrderResult, DispatchError> {
        let today = Local::now().date_naive();
        let transfers = self.crm.get_transfers_for_date(today).await?;
        let transfer = transfers
            .into_iter()
            .find(|t| t.id == transfer_id)
            .ok_or_else(|| CrmError::TransferNotFound(transfer_id.to_string()))?;
        debug!("🔄️ Dispatching CRM transfer {transfer_id} for {}", transfer.guest_name);
        self.process_order(order_from_transfer(&transfer)).await
    }

    /// The best-effort tail after a successful dispatch. Nothing in here can change the verdict.
    ///
    /// A PMS booking has no transfer record in the CRM yet, so the write-back creates one carrying the provider
    /// order id. Every other source with a booking id refers to an existing transfer, which gets a status update.
    async fn after_success(&self, order: &CanonicalOrder, result: &TaxiOrderResult) {
        match (order.source, &order.booking_id) {
            (SourceChannel::Pms, Some(booking_id)) => {
                let transfer = CrmTransfer {
                    id: String::new(),
                    guest_name: order.client_id.clone(),
                    phone: (!order.phone.is_empty()).then(|| order.phone.clone()),
                    notes: Some(format!("Taxi order {} created by the gateway", result.order_id)),
                    pickup_address: order.pickup_address.clone(),
                    dropoff_address: order.dropoff_address.clone(),
                    scheduled_time: order.scheduled_time,
                    vehicle_type: order.vehicle_class.to_string(),
                };
                if let Err(e) = self.crm.create_booking_transfer(booking_id, transfer).await {
                    warn!("🔄️ Could not record a transfer on booking {booking_id}: {e}. Order is unaffected.");
                }
            },
            (_, Some(booking_id)) => {
                let update = TransferStatusUpdate::Dispatched { provider_order_id: result.order_id.clone() };
                if let Err(e) = self.crm.update_transfer_status(booking_id, update).await {
                    warn!("🔄️ CRM status update for booking {booking_id} failed: {e}. Order is unaffected.");
                }
            },
            (_, None) => {},
        }
        let event = OrderDispatchedEvent::new(order.clone(), result.clone());
        for producer in &self.producers.order_dispatched_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    async fn after_failure(&self, order: &CanonicalOrder, reason: &str) {
        // A PMS booking has no transfer record to mark; the failure event covers it.
        if order.source != SourceChannel::Pms {
            if let Some(booking_id) = &order.booking_id {
                let update = TransferStatusUpdate::Failed { reason: reason.to_string() };
                if let Err(e) = self.crm.update_transfer_status(booking_id, update).await {
                    warn!("🔄️ CRM failure write-back for booking {booking_id} failed: {e}");
                }
            }
        }
        let event = DispatchFailedEvent::new(order.clone(), reason.to_string());
        for producer in &self.producers.dispatch_failed_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}
