use std::{env, time::Duration};

use htg_common::Secret;
use log::*;

const DEFAULT_BASE_URL: &str = "https://ca2.gootax.pro:8089";
const DEFAULT_CITY_ID: &str = "210861";
const DEFAULT_COMPANY_ID: &str = "12601";
const DEFAULT_DEVICE_TOKEN: &str = "hotel_gateway_auto";
const DEFAULT_PAY_TYPE: &str = "CORP_BALANCE";
const DEFAULT_SEDAN_TARIFF: &str = "39741";
const DEFAULT_MINIVAN_TARIFF: &str = "39742";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GootaxConfig {
    pub base_url: String,
    pub app_id: String,
    pub tenant_id: String,
    pub dispatcher_id: String,
    /// Corporate account the orders are billed against.
    pub company_id: String,
    /// Gootax city id. Both pickup and dropoff are always within the same city for hotel transfers.
    pub city_id: String,
    pub device_token: String,
    pub pay_type: String,
    /// Shared secret for HMAC-signing every payload.
    pub secret: Secret<String>,
    pub sedan_tariff: String,
    pub minivan_tariff: String,
    /// Per-request timeout for the provider HTTP call.
    pub timeout: Duration,
}

impl Default for GootaxConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_id: String::default(),
            tenant_id: String::default(),
            dispatcher_id: String::default(),
            company_id: DEFAULT_COMPANY_ID.to_string(),
            city_id: DEFAULT_CITY_ID.to_string(),
            device_token: DEFAULT_DEVICE_TOKEN.to_string(),
            pay_type: DEFAULT_PAY_TYPE.to_string(),
            secret: Secret::default(),
            sedan_tariff: DEFAULT_SEDAN_TARIFF.to_string(),
            minivan_tariff: DEFAULT_MINIVAN_TARIFF.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GootaxConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let base_url = env::var("HTG_GOOTAX_BASE_URL").unwrap_or(defaults.base_url);
        let app_id = env::var("HTG_GOOTAX_APP_ID").unwrap_or_else(|_| {
            warn!("🚕️ HTG_GOOTAX_APP_ID is not set. Provider calls will be rejected.");
            String::default()
        });
        let tenant_id = env::var("HTG_GOOTAX_TENANT_ID").unwrap_or_else(|_| {
            warn!("🚕️ HTG_GOOTAX_TENANT_ID is not set. Provider calls will be rejected.");
            String::default()
        });
        let dispatcher_id = env::var("HTG_GOOTAX_DISPATCHER_ID").unwrap_or_else(|_| {
            warn!("🚕️ HTG_GOOTAX_DISPATCHER_ID is not set, sending an empty dispatcher id.");
            String::default()
        });
        let secret = Secret::new(env::var("HTG_GOOTAX_SECRET").unwrap_or_else(|_| {
            warn!("🚕️ HTG_GOOTAX_SECRET is not set. Request signatures will not validate.");
            String::default()
        }));
        let company_id = env::var("HTG_GOOTAX_COMPANY_ID").unwrap_or(defaults.company_id);
        let city_id = env::var("HTG_GOOTAX_CITY_ID").unwrap_or(defaults.city_id);
        let sedan_tariff = env::var("HTG_GOOTAX_SEDAN_TARIFF").unwrap_or(defaults.sedan_tariff);
        let minivan_tariff = env::var("HTG_GOOTAX_MINIVAN_TARIFF").unwrap_or(defaults.minivan_tariff);
        Self {
            base_url,
            app_id,
            tenant_id,
            dispatcher_id,
            company_id,
            city_id,
            secret,
            sedan_tariff,
            minivan_tariff,
            ..defaults
        }
    }

    pub fn create_order_url(&self) -> String {
        format!("{}/create_order", self.base_url)
    }
}
