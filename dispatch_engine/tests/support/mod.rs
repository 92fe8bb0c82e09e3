//! Shared fakes and setup for the engine integration tests.
#![allow(dead_code)]
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
    Mutex,
};

use chrono::NaiveDate;
use dispatch_engine::{
    db_types::{CanonicalOrder, SourceChannel, VehicleClass},
    geocoder::{GeocodeError, GeocodeUpstream, ResolvedLocation},
    test_utils::{prepare_test_env, random_db_path},
    traits::{CrmError, CrmTransfer, TransferCrm, TransferStatusUpdate},
    SqliteDatabase,
};
use gootax_tools::{OrderTransport, RawResponse, TransportError};

pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to test database")
}

//--------------------------------------  provider transport  ---------------------------------------------------------

/// Accepts every order, handing out sequential provider ids.
#[derive(Clone, Default)]
pub struct AcceptingTransport {
    pub calls: Arc<AtomicUsize>,
}

impl OrderTransport for AcceptingTransport {
    async fn post_form(&self, _url: &str, _form: &[(&'static str, String)]) -> Result<RawResponse, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RawResponse { status: 200, body: format!(r#"{{"order_id": "prov-{n}"}}"#) })
    }
}

/// Rejects every order with a client error.
#[derive(Clone, Default)]
pub struct RejectingTransport;

impl OrderTransport for RejectingTransport {
    async fn post_form(&self, _url: &str, _form: &[(&'static str, String)]) -> Result<RawResponse, TransportError> {
        Ok(RawResponse { status: 400, body: "unknown tariff".to_string() })
    }
}

//--------------------------------------   geocode upstream   ---------------------------------------------------------

#[derive(Clone, Default)]
pub struct FakeUpstream {
    pub calls: Arc<AtomicUsize>,
}

impl GeocodeUpstream for FakeUpstream {
    async fn geocode(&self, address: &str) -> Result<ResolvedLocation, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Deterministic coordinates derived from the address so distinct addresses resolve far apart.
        match address {
            a if a.contains("Hotel") => {
                Ok(ResolvedLocation { lat: 61.785512, lon: 34.346878, label: a.to_string() })
            },
            a if a.contains("Airport") => {
                Ok(ResolvedLocation { lat: 61.885139, lon: 34.154317, label: a.to_string() })
            },
            a if a.contains("Station") => {
                Ok(ResolvedLocation { lat: 61.784512, lon: 34.374878, label: a.to_string() })
            },
            a => Err(GeocodeError::NoMatch(a.to_string())),
        }
    }
}

//--------------------------------------          CRM          --------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingCrm {
    pub transfers: Arc<Mutex<Vec<CrmTransfer>>>,
    pub updates: Arc<Mutex<Vec<(String, String)>>>,
    pub creations: Arc<Mutex<Vec<(String, CrmTransfer)>>>,
    pub fail_updates: bool,
}

impl RecordingCrm {
    pub fn with_transfers(transfers: Vec<CrmTransfer>) -> Self {
        Self { transfers: Arc::new(Mutex::new(transfers)), ..Self::default() }
    }
}

impl TransferCrm for RecordingCrm {
    async fn get_transfers_for_date(&self, _date: NaiveDate) -> Result<Vec<CrmTransfer>, CrmError> {
        Ok(self.transfers.lock().unwrap().clone())
    }

    async fn create_booking_transfer(&self, booking_id: &str, transfer: CrmTransfer) -> Result<CrmTransfer, CrmError> {
        if self.fail_updates {
            return Err(CrmError::RequestFailed("CRM is down".to_string()));
        }
        self.creations.lock().unwrap().push((booking_id.to_string(), transfer.clone()));
        self.transfers.lock().unwrap().push(transfer.clone());
        Ok(transfer)
    }

    async fn update_transfer_status(&self, transfer_id: &str, update: TransferStatusUpdate) -> Result<(), CrmError> {
        if self.fail_updates {
            return Err(CrmError::RequestFailed("CRM is down".to_string()));
        }
        let summary = match update {
            TransferStatusUpdate::Dispatched { provider_order_id } => format!("dispatched:{provider_order_id}"),
            TransferStatusUpdate::Failed { reason } => format!("failed:{reason}"),
        };
        self.updates.lock().unwrap().push((transfer_id.to_string(), summary));
        Ok(())
    }
}

//--------------------------------------       test data       --------------------------------------------------------

pub fn canonical_order() -> CanonicalOrder {
    CanonicalOrder {
        client_id: "guest-214".to_string(),
        phone: "8 (921) 123-45-67".to_string(),
        pickup_address: "Hotel Severnaya".to_string(),
        dropoff_address: "Airport PES".to_string(),
        scheduled_time: NaiveDate::from_ymd_opt(2031, 6, 15).unwrap().and_hms_opt(14, 30, 0).unwrap(),
        vehicle_class: VehicleClass::Sedan,
        options: vec![],
        comment: Some("terminal 2".to_string()),
        source: SourceChannel::Operator,
        booking_id: None,
    }
}

pub fn crm_transfer(id: &str) -> CrmTransfer {
    CrmTransfer {
        id: id.to_string(),
        guest_name: "Petrov".to_string(),
        phone: Some("79211234567".to_string()),
        notes: None,
        pickup_address: "Hotel Severnaya".to_string(),
        dropoff_address: "Airport PES".to_string(),
        scheduled_time: NaiveDate::from_ymd_opt(2031, 6, 15).unwrap().and_hms_opt(9, 0, 0).unwrap(),
        vehicle_type: "SEDAN".to_string(),
    }
}
