//! Request handlers.
//!
//! Every intake route converts its payload into a [`CanonicalOrder`] and hands it to
//! [`OrderFlowApi::process_order`]; the handlers own nothing but the HTTP translation. The handlers are generic over
//! the same backend traits as the api object, so the endpoint tests can swap in fakes for the geocoder and CRM.

use actix_web::{get, web, HttpResponse, Responder};
use dispatch_engine::{
    db_types::CanonicalOrder,
    geocoder::GeocodeUpstream,
    traits::{DispatchQueueDatabase, GeocodeCache, TransferCrm},
    OrderFlowApi,
};
use log::*;

use crate::{
    data_objects::{JobStatusResponse, OrderRequest, OrderResponse, PmsWebhookEvent},
    errors::ServerError,
};

/// Route handler for the health endpoint
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Route handler for the operator console's order intake.
pub async fn create_order<B, U, C>(
    api: web::Data<OrderFlowApi<B, U, C>>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: DispatchQueueDatabase + GeocodeCache,
    U: GeocodeUpstream,
    C: TransferCrm,
{
    let order =
        CanonicalOrder::try_from(body.into_inner()).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    debug!("💻️ Operator order received for {}", order.client_id);
    let result = api.process_order(order).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(result)))
}

/// Route handler for PMS booking webhooks. The HMAC middleware has already verified the delivery signature by the
/// time this runs.
pub async fn pms_webhook<B, U, C>(
    api: web::Data<OrderFlowApi<B, U, C>>,
    body: web::Json<PmsWebhookEvent>,
) -> Result<HttpResponse, ServerError>
where
    B: DispatchQueueDatabase + GeocodeCache,
    U: GeocodeUpstream,
    C: TransferCrm,
{
    let event = body.into_inner();
    debug!("💻️ PMS webhook received for booking {}", event.booking_id);
    let order = CanonicalOrder::try_from(event).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let result = api.process_order(order).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(result)))
}

/// Route handler for dispatching a CRM transfer by id.
pub async fn dispatch_transfer<B, U, C>(
    api: web::Data<OrderFlowApi<B, U, C>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: DispatchQueueDatabase + GeocodeCache,
    U: GeocodeUpstream,
    C: TransferCrm,
{
    let transfer_id = path.into_inner();
    debug!("💻️ Dispatch requested for CRM transfer {transfer_id}");
    let result = api.process_transfer(&transfer_id).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(result)))
}

/// Route handler for job diagnostics. The job table doubles as the dispatch log, so this is how an operator answers
/// "what happened to that order?".
pub async fn job_status<B, U, C>(
    api: web::Data<OrderFlowApi<B, U, C>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError>
where
    B: DispatchQueueDatabase + GeocodeCache,
    U: GeocodeUpstream,
    C: TransferCrm,
{
    let id = path.into_inner();
    let job = api
        .queue()
        .job_status(id)
        .await
        .map_err(|e| ServerError::BackendError(e.to_string()))?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No dispatch job with id {id}")))?;
    Ok(HttpResponse::Ok().json(JobStatusResponse::from(job)))
}
