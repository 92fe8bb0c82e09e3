use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use thiserror::Error;

use crate::{
    config::GootaxConfig,
    helpers::curl_reproduction,
    GootaxApiError,
    GootaxOrderPayload,
    NewTaxiOrder,
    TaxiOrderResult,
};

/// Total attempts per dispatch, including the first one.
pub const MAX_DISPATCH_ATTEMPTS: u32 = 3;
/// Backoff between attempts is linear: `attempt * BACKOFF_STEP`. Deliberately not exponential and not jittered;
/// the global queue rate limit keeps overall pressure on the provider bounded.
const BACKOFF_STEP: Duration = Duration::from_millis(1000);

/// What came back over the wire, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// No response was received at all (connection failure, timeout). Always retryable.
#[derive(Debug, Error)]
#[error("no response from provider: {0}")]
pub struct TransportError(pub String);

/// The wire-level seam of the client. Production uses [`HttpTransport`]; tests script responses through a fake.
#[allow(async_fn_in_trait)]
pub trait OrderTransport: Clone {
    fn post_form(
        &self,
        url: &str,
        form: &[(&'static str, String)],
    ) -> impl std::future::Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// reqwest-backed transport with the provider's identity headers baked in at construction.
#[derive(Clone)]
pub struct HttpTransport {
    client: Arc<Client>,
}

impl HttpTransport {
    pub fn new(config: &GootaxConfig) -> Result<Self, GootaxApiError> {
        let mut headers = HeaderMap::with_capacity(5);
        for (name, value) in identity_headers(config) {
            let value =
                HeaderValue::from_str(&value).map_err(|e| GootaxApiError::Initialization(e.to_string()))?;
            headers.insert(name, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GootaxApiError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }
}

impl OrderTransport for HttpTransport {
    async fn post_form(&self, url: &str, form: &[(&'static str, String)]) -> Result<RawResponse, TransportError> {
        let response = self.client.post(url).form(form).send().await.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError(e.to_string()))?;
        Ok(RawResponse { status, body })
    }
}

fn identity_headers(config: &GootaxConfig) -> Vec<(&'static str, String)> {
    vec![
        ("appid", config.app_id.clone()),
        ("lang", "ru".to_string()),
        ("tenantid", config.tenant_id.clone()),
        ("typeclient", "dispatcher".to_string()),
        ("dispatcherid", config.dispatcher_id.clone()),
    ]
}

/// The resilient provider client.
///
/// One call to [`GootaxApi::create_order`] makes up to [`MAX_DISPATCH_ATTEMPTS`] wire attempts. Each attempt builds
/// and signs a fresh payload (the signed `current_time` differs per attempt), so a retry is a new request from the
/// provider's point of view.
#[derive(Clone)]
pub struct GootaxApi<T = HttpTransport> {
    config: GootaxConfig,
    transport: T,
}

impl GootaxApi<HttpTransport> {
    pub fn new(config: GootaxConfig) -> Result<Self, GootaxApiError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self { config, transport })
    }
}

impl<T: OrderTransport> GootaxApi<T> {
    pub fn with_transport(config: GootaxConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &GootaxConfig {
        &self.config
    }

    /// Sends the order to the provider, retrying transient failures with linear backoff.
    ///
    /// Retryable: no response received, HTTP 429, or any 5xx. Any other 4xx fails immediately. The returned error
    /// always carries a cURL reproduction of the last request that was actually sent.
    pub async fn create_order(&self, order: &NewTaxiOrder) -> Result<TaxiOrderResult, GootaxApiError> {
        let mut attempt = 1u32;
        loop {
            match self.try_create_order(order).await {
                Ok(result) => {
                    info!("🚕️ Provider accepted order {} (attempt {attempt})", result.order_id);
                    return Ok(result);
                },
                Err(e) if e.is_retryable() && attempt < MAX_DISPATCH_ATTEMPTS => {
                    warn!("🚕️ Dispatch attempt {attempt}/{MAX_DISPATCH_ATTEMPTS} failed: {e}. Retrying.");
                    tokio::time::sleep(BACKOFF_STEP * attempt).await;
                    attempt += 1;
                },
                Err(e) => {
                    error!("🚕️ Dispatch failed after {attempt} attempt(s): {e}");
                    if let Some(curl) = e.curl_reproduction() {
                        error!("🚕️ Reproduce with: {curl}");
                    }
                    return Err(e);
                },
            }
        }
    }

    async fn try_create_order(&self, order: &NewTaxiOrder) -> Result<TaxiOrderResult, GootaxApiError> {
        let secret = self.config.secret.reveal();
        let payload = GootaxOrderPayload::build(&self.config, order, Utc::now().timestamp()).sign(secret);
        let form = payload.to_form();
        let url = self.config.create_order_url();
        trace!("🚕️ POST {url} for client {}", order.client_id);
        let curl = || {
            let mut headers = identity_headers(&self.config);
            headers.push(("Content-Type", "application/x-www-form-urlencoded".to_string()));
            curl_reproduction(&url, &headers, &form)
        };
        match self.transport.post_form(&url, &form).await {
            Err(TransportError(message)) => {
                Err(GootaxApiError::Unavailable { status: None, message, curl: curl() })
            },
            Ok(response) if (200..300).contains(&response.status) => {
                TaxiOrderResult::from_response_body(&response.body)
            },
            Ok(response) if response.status == 429 || response.status >= 500 => Err(GootaxApiError::Unavailable {
                status: Some(response.status),
                message: response.body,
                curl: curl(),
            }),
            Ok(response) => {
                Err(GootaxApiError::OrderRejected { status: response.status, body: response.body, curl: curl() })
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
            Mutex,
        },
    };

    use chrono::NaiveDate;
    use htg_common::Phone;
    use tokio::time::Instant;

    use super::*;
    use crate::RidePoint;

    #[derive(Clone, Default)]
    struct ScriptedTransport {
        responses: Arc<Mutex<VecDeque<Result<RawResponse, TransportError>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn with_responses(responses: Vec<Result<RawResponse, TransportError>>) -> Self {
            Self { responses: Arc::new(Mutex::new(responses.into())), calls: Arc::new(AtomicUsize::new(0)) }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OrderTransport for ScriptedTransport {
        async fn post_form(
            &self,
            _url: &str,
            _form: &[(&'static str, String)],
        ) -> Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().unwrap().pop_front().expect("scripted transport ran out of responses")
        }
    }

    fn ok_response(body: &str) -> Result<RawResponse, TransportError> {
        Ok(RawResponse { status: 200, body: body.to_string() })
    }

    fn status_response(status: u16, body: &str) -> Result<RawResponse, TransportError> {
        Ok(RawResponse { status, body: body.to_string() })
    }

    fn test_order() -> NewTaxiOrder {
        NewTaxiOrder {
            pickup: RidePoint { lat: 61.78, lon: 34.35, label: "Hotel".to_string() },
            dropoff: RidePoint { lat: 61.88, lon: 34.15, label: "Airport".to_string() },
            client_id: "client-1".to_string(),
            phone: Phone::normalize("79211234567").unwrap(),
            tariff_id: "39741".to_string(),
            time: NaiveDate::from_ymd_opt(2031, 1, 2).unwrap().and_hms_opt(10, 0, 0).unwrap(),
            options: vec![],
            comment: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_with_linear_backoff() {
        let transport = ScriptedTransport::with_responses(vec![
            status_response(503, "overloaded"),
            status_response(503, "overloaded"),
            ok_response(r#"{"order_id": "o-9", "status": "created"}"#),
        ]);
        let api = GootaxApi::with_transport(GootaxConfig::default(), transport.clone());
        let started = Instant::now();
        let result = api.create_order(&test_order()).await.unwrap();
        assert_eq!(result.order_id, "o-9");
        assert_eq!(transport.call_count(), 3);
        // 1000ms after attempt 1 plus 2000ms after attempt 2
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn client_errors_fail_immediately() {
        let transport = ScriptedTransport::with_responses(vec![status_response(400, "bad tariff")]);
        let api = GootaxApi::with_transport(GootaxConfig::default(), transport.clone());
        let err = api.create_order(&test_order()).await.unwrap_err();
        assert_eq!(transport.call_count(), 1);
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), Some(400));
        let curl = err.curl_reproduction().unwrap();
        assert!(curl.contains("create_order"));
        assert!(curl.contains("--data-urlencode 'client_id=client-1'"));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_responses_are_retryable() {
        let transport = ScriptedTransport::with_responses(vec![
            status_response(429, "slow down"),
            ok_response(r#"{"id": 11}"#),
        ]);
        let api = GootaxApi::with_transport(GootaxConfig::default(), transport.clone());
        let result = api.create_order(&test_order()).await.unwrap();
        assert_eq!(result.order_id, "11");
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_the_last_error() {
        let transport = ScriptedTransport::with_responses(vec![
            Err(TransportError("connect timeout".to_string())),
            Err(TransportError("connect timeout".to_string())),
            Err(TransportError("connect timeout".to_string())),
        ]);
        let api = GootaxApi::with_transport(GootaxConfig::default(), transport.clone());
        let err = api.create_order(&test_order()).await.unwrap_err();
        assert_eq!(transport.call_count(), MAX_DISPATCH_ATTEMPTS as usize);
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), None);
        assert!(err.curl_reproduction().is_some());
    }

    #[tokio::test]
    async fn success_with_malformed_body_is_a_parse_error() {
        let transport = ScriptedTransport::with_responses(vec![ok_response(r#"{"result": "fine"}"#)]);
        let api = GootaxApi::with_transport(GootaxConfig::default(), transport);
        let err = api.create_order(&test_order()).await.unwrap_err();
        assert!(matches!(err, GootaxApiError::InvalidResponse(_)));
    }
}
