use std::{env, time::Duration};

use gootax_tools::GootaxConfig;
use htg_common::{parse_boolean_flag, Secret};
use log::*;

const DEFAULT_HTG_HOST: &str = "127.0.0.1";
const DEFAULT_HTG_PORT: u16 = 8360;
/// How long a caller waits for a dispatch job to settle before receiving a timeout verdict.
const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 120;
/// Header carrying the PMS webhook signature.
pub const PMS_HMAC_HEADER: &str = "X-Pms-Hmac-Sha256";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Upper bound on how long an HTTP caller waits for its dispatch job. The job keeps running after a timeout;
    /// only the wait is bounded.
    pub dispatch_timeout: Duration,
    /// Shared secret for the PMS webhook signature.
    pub pms_hmac_secret: Secret<String>,
    /// If false, webhook signature checks are skipped entirely. Local development only.
    pub pms_hmac_checks: bool,
    pub gootax: GootaxConfig,
    pub geocoder: GeocoderConfig,
    pub crm: CrmConfig,
    pub notifications: NotificationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTG_HOST.to_string(),
            port: DEFAULT_HTG_PORT,
            database_url: String::default(),
            dispatch_timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
            pms_hmac_secret: Secret::default(),
            pms_hmac_checks: true,
            gootax: GootaxConfig::default(),
            geocoder: GeocoderConfig::default(),
            crm: CrmConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("HTG_HOST").ok().unwrap_or_else(|| DEFAULT_HTG_HOST.into());
        let port = env::var("HTG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for HTG_PORT. {e} Using the default, {DEFAULT_HTG_PORT}, instead."
                    );
                    DEFAULT_HTG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_HTG_PORT);
        let database_url = env::var("HTG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ HTG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let dispatch_timeout = env::var("HTG_DISPATCH_TIMEOUT_SECS")
            .map_err(|_| {
                info!(
                    "🪛️ HTG_DISPATCH_TIMEOUT_SECS is not set. Using the default of {DEFAULT_DISPATCH_TIMEOUT_SECS} s."
                )
            })
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for HTG_DISPATCH_TIMEOUT_SECS. {e}"))
            })
            .ok()
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS));
        let pms_hmac_secret = env::var("HTG_PMS_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ HTG_PMS_HMAC_SECRET is not set. PMS webhook signatures cannot be verified.");
            String::default()
        });
        let pms_hmac_checks = parse_boolean_flag(env::var("HTG_PMS_HMAC_CHECKS").ok(), true);
        if !pms_hmac_checks {
            warn!("🚨️ PMS webhook HMAC checks are DISABLED. Do not run production like this.");
        }
        Self {
            host,
            port,
            database_url,
            dispatch_timeout,
            pms_hmac_secret: Secret::new(pms_hmac_secret),
            pms_hmac_checks,
            gootax: GootaxConfig::new_from_env_or_default(),
            geocoder: GeocoderConfig::from_env_or_default(),
            crm: CrmConfig::from_env_or_default(),
            notifications: NotificationConfig::from_env(),
        }
    }
}

//-------------------------------------------------  GeocoderConfig  ---------------------------------------------------

#[derive(Clone, Debug)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self { base_url: "https://geocode-maps.yandex.ru/1.x".to_string(), api_key: Secret::default() }
    }
}

impl GeocoderConfig {
    pub fn from_env_or_default() -> Self {
        let default = Self::default();
        let base_url = env::var("HTG_GEOCODER_BASE_URL").ok().unwrap_or(default.base_url);
        let api_key = env::var("HTG_GEOCODER_API_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ HTG_GEOCODER_API_KEY is not set. Address resolution will fail.");
            String::default()
        });
        Self { base_url, api_key: Secret::new(api_key) }
    }
}

//-------------------------------------------------  CrmConfig  --------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct CrmConfig {
    pub base_url: String,
    pub token: Secret<String>,
}

impl CrmConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("HTG_CRM_BASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ HTG_CRM_BASE_URL is not set. CRM transfer dispatch and write-backs will fail.");
            String::default()
        });
        let token = env::var("HTG_CRM_TOKEN").ok().unwrap_or_else(|| {
            warn!("🪛️ HTG_CRM_TOKEN is not set.");
            String::default()
        });
        Self { base_url, token: Secret::new(token) }
    }
}

//-------------------------------------------------  NotificationConfig  -----------------------------------------------

/// Notification gateways are optional: an unset URL disables that channel, and the corresponding hook is simply
/// never registered.
#[derive(Clone, Debug, Default)]
pub struct NotificationConfig {
    pub email_gateway_url: Option<String>,
    /// The operations mailbox that receives a copy of every dispatched order.
    pub email_recipient: String,
    pub sms_gateway_url: Option<String>,
    pub gateway_api_key: Secret<String>,
}

impl NotificationConfig {
    pub fn from_env() -> Self {
        let email_gateway_url = env::var("HTG_EMAIL_GATEWAY_URL").ok();
        if email_gateway_url.is_none() {
            info!("🪛️ HTG_EMAIL_GATEWAY_URL is not set. Email notifications are disabled.");
        }
        let email_recipient =
            env::var("HTG_EMAIL_RECIPIENT").ok().unwrap_or_else(|| "transfers@hotel.example".to_string());
        let sms_gateway_url = env::var("HTG_SMS_GATEWAY_URL").ok();
        if sms_gateway_url.is_none() {
            info!("🪛️ HTG_SMS_GATEWAY_URL is not set. SMS notifications are disabled.");
        }
        let gateway_api_key = Secret::new(env::var("HTG_NOTIFY_API_KEY").ok().unwrap_or_default());
        Self { email_gateway_url, email_recipient, sms_gateway_url, gateway_api_key }
    }
}
