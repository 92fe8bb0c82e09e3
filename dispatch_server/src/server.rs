use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use dispatch_engine::{
    geocoder::CachedGeocoder,
    queue::{start_dispatch_worker, DispatchQueue, RateLimiter, RATE_LIMIT_MAX_STARTS, RATE_LIMIT_WINDOW},
    OrderFlowApi,
    SqliteDatabase,
    TariffTable,
};
use gootax_tools::GootaxApi;
use log::*;

use crate::{
    config::{ServerConfig, PMS_HMAC_HEADER},
    errors::ServerError,
    integrations::{OperaCrm, YandexGeocoder},
    middleware::HmacMiddlewareFactory,
    notifiers::create_notification_handlers,
    routes::{create_order, dispatch_transfer, health, job_status, pms_webhook},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    sqlx::migrate!("../dispatch_engine/src/sqlite/migrations")
        .run(db.pool())
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not run database migrations. {e}")))?;
    let srv = create_server_instance(config, db).await?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires the whole pipeline together and returns the actix server, ready to be awaited.
///
/// Everything long-lived is built exactly once, outside the `HttpServer` factory closure: the queue and its worker,
/// the notification handlers, and the api object the routes share.
pub async fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let provider =
        GootaxApi::new(config.gootax.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let limiter = RateLimiter::new(RATE_LIMIT_MAX_STARTS, RATE_LIMIT_WINDOW);
    let queue = DispatchQueue::new(db.clone(), limiter);
    let _worker = start_dispatch_worker(queue.clone(), provider);
    info!("📋️ Dispatch worker started. Any jobs left over from a previous run will be picked up shortly.");
    let handlers = create_notification_handlers(config.notifications.clone());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let geocoder = CachedGeocoder::new(db.clone(), YandexGeocoder::new(config.geocoder.clone()));
    let crm = OperaCrm::new(config.crm.clone());
    let tariffs = TariffTable::from_config(&config.gootax);
    let api =
        OrderFlowApi::new(queue, geocoder, crm, tariffs, producers, config.dispatch_timeout);
    let api = web::Data::new(api);
    let hmac_secret = config.pms_hmac_secret.clone();
    let hmac_checks = config.pms_hmac_checks;
    let srv = HttpServer::new(move || {
        let webhook_scope = web::scope("/webhook")
            .wrap(HmacMiddlewareFactory::new(PMS_HMAC_HEADER, hmac_secret.clone(), hmac_checks))
            .route("/pms", web::post().to(pms_webhook::<SqliteDatabase, YandexGeocoder, OperaCrm>));
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("htg::access_log"))
            .app_data(api.clone())
            .service(health)
            .route("/order", web::post().to(create_order::<SqliteDatabase, YandexGeocoder, OperaCrm>))
            .route("/transfer/{id}", web::post().to(dispatch_transfer::<SqliteDatabase, YandexGeocoder, OperaCrm>))
            .route("/job/{id}", web::get().to(job_status::<SqliteDatabase, YandexGeocoder, OperaCrm>))
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
