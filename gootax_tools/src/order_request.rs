use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{data_objects::RidePoint, helpers::calculate_hmac, GootaxConfig, NewTaxiOrder};

/// The exact wire payload for `create_order`.
///
/// Field declaration order is part of the protocol: the signature is an HMAC over the JSON serialization of every
/// field except `signature`, and serde serializes struct fields in declaration order. Do not reorder fields.
#[derive(Debug, Clone, Serialize)]
pub struct GootaxOrderPayload {
    pub address: String,
    pub device_token: String,
    pub city_id: String,
    pub client_id: String,
    pub company_id: String,
    pub client_phone: String,
    pub tariff_id: String,
    pub order_time: String,
    pub pay_type: String,
    pub comment: String,
    pub current_time: String,
    pub type_request: String,
    pub additional_options: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signature: String,
}

impl GootaxOrderPayload {
    /// Builds the unsigned payload. `epoch_seconds` is the wall clock at call time; it carries no business meaning
    /// but is part of the signed bytes, so every call (including retries of the same order) signs differently.
    /// That is the provider's anti-replay scheme, not an accident.
    pub fn build(config: &GootaxConfig, order: &NewTaxiOrder, epoch_seconds: i64) -> Self {
        Self {
            address: format_address_block(&order.pickup, &order.dropoff, &config.city_id),
            device_token: config.device_token.clone(),
            city_id: config.city_id.clone(),
            client_id: order.client_id.clone(),
            company_id: config.company_id.clone(),
            client_phone: order.phone.to_string(),
            tariff_id: order.tariff_id.clone(),
            order_time: format_order_time(order.time),
            pay_type: config.pay_type.clone(),
            comment: order.comment.clone().unwrap_or_default(),
            current_time: epoch_seconds.to_string(),
            type_request: "1".to_string(),
            additional_options: serde_json::to_string(&order.options).unwrap_or_else(|_| "[]".to_string()),
            signature: String::new(),
        }
    }

    /// Computes and attaches the HMAC signature over the payload as it stands (signature field excluded).
    pub fn sign(mut self, secret: &str) -> Self {
        self.signature = String::new();
        let unsigned = serde_json::to_string(&self).unwrap_or_default();
        self.signature = calculate_hmac(secret, unsigned.as_bytes());
        self
    }

    /// The payload as form fields, in wire order.
    pub fn to_form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("address", self.address.clone()),
            ("device_token", self.device_token.clone()),
            ("city_id", self.city_id.clone()),
            ("client_id", self.client_id.clone()),
            ("company_id", self.company_id.clone()),
            ("client_phone", self.client_phone.clone()),
            ("tariff_id", self.tariff_id.clone()),
            ("order_time", self.order_time.clone()),
            ("pay_type", self.pay_type.clone()),
            ("comment", self.comment.clone()),
            ("current_time", self.current_time.clone()),
            ("type_request", self.type_request.clone()),
            ("additional_options", self.additional_options.clone()),
            ("signature", self.signature.clone()),
        ]
    }
}

/// One entry in the address block. Most fields are always empty for geocoded free-text addresses, but the provider
/// requires them to be present.
#[derive(Debug, Serialize)]
struct AddressEntry {
    city_id: String,
    city: String,
    label: String,
    street: String,
    house: String,
    housing: String,
    porch: String,
    apt: String,
    lat: String,
    lon: String,
    intercom: String,
}

impl AddressEntry {
    fn new(point: &RidePoint, city_id: &str) -> Self {
        Self {
            city_id: city_id.to_string(),
            city: String::new(),
            label: point.label.clone(),
            street: String::new(),
            house: String::new(),
            housing: String::new(),
            porch: String::new(),
            apt: String::new(),
            lat: format!("{:.6}", point.lat),
            lon: format!("{:.6}", point.lon),
            intercom: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AddressBlock {
    address: [AddressEntry; 2],
}

/// The address block is a JSON document embedded as a single *string* field of the outer payload, so its internal
/// quotes are escaped rather than nested.
pub fn format_address_block(pickup: &RidePoint, dropoff: &RidePoint, city_id: &str) -> String {
    let block =
        AddressBlock { address: [AddressEntry::new(pickup, city_id), AddressEntry::new(dropoff, city_id)] };
    serde_json::to_string(&block).unwrap_or_default().replace('"', "\\\"")
}

/// Gootax's own date-time format: `DD.MM.YYYY HH:MM:00`, in the provider's local time. Seconds are always zero.
pub fn format_order_time(time: NaiveDateTime) -> String {
    time.format("%d.%m.%Y %H:%M:00").to_string()
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use htg_common::Phone;

    use super::*;

    fn test_order() -> NewTaxiOrder {
        NewTaxiOrder {
            pickup: RidePoint { lat: 61.785512, lon: 34.346878, label: "Hotel Severnaya".to_string() },
            dropoff: RidePoint { lat: 61.885139, lon: 34.154317, label: "Airport PES".to_string() },
            client_id: "client-77".to_string(),
            phone: Phone::normalize("8 921 123 45 67").unwrap(),
            tariff_id: "39741".to_string(),
            time: NaiveDate::from_ymd_opt(2031, 3, 9).unwrap().and_hms_opt(14, 30, 0).unwrap(),
            options: vec!["child_seat".to_string()],
            comment: Some("terminal 2".to_string()),
        }
    }

    #[test]
    fn order_time_uses_provider_format() {
        let time = NaiveDate::from_ymd_opt(2031, 3, 9).unwrap().and_hms_opt(8, 5, 33).unwrap();
        assert_eq!(format_order_time(time), "09.03.2031 08:05:00");
    }

    #[test]
    fn address_block_is_escaped_with_six_decimal_coordinates() {
        let order = test_order();
        let block = format_address_block(&order.pickup, &order.dropoff, "210861");
        assert!(!block.contains('"'), "internal quotes must be escaped");
        assert!(block.contains(r#"\"lat\":\"61.785512\""#));
        assert!(block.contains(r#"\"lon\":\"34.154317\""#));
        assert!(block.contains(r#"\"city_id\":\"210861\""#));
    }

    #[test]
    fn coordinates_are_padded_to_six_decimals() {
        let point = RidePoint { lat: 61.5, lon: 34.25, label: "x".to_string() };
        let entry = AddressEntry::new(&point, "1");
        assert_eq!(entry.lat, "61.500000");
        assert_eq!(entry.lon, "34.250000");
    }

    #[test]
    fn identical_payloads_sign_identically() {
        let config = GootaxConfig::default();
        let order = test_order();
        let a = GootaxOrderPayload::build(&config, &order, 1_900_000_000).sign("secret");
        let b = GootaxOrderPayload::build(&config, &order, 1_900_000_000).sign("secret");
        assert_eq!(a.signature, b.signature);
        assert_eq!(a.signature.len(), 64);
    }

    #[test]
    fn current_time_changes_the_signature() {
        let config = GootaxConfig::default();
        let order = test_order();
        let a = GootaxOrderPayload::build(&config, &order, 1_900_000_000).sign("secret");
        let b = GootaxOrderPayload::build(&config, &order, 1_900_000_001).sign("secret");
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn signature_is_excluded_from_its_own_input() {
        // Signing twice must be idempotent: the second pass strips the existing signature before hashing.
        let config = GootaxConfig::default();
        let order = test_order();
        let once = GootaxOrderPayload::build(&config, &order, 42).sign("secret");
        let twice = once.clone().sign("secret");
        assert_eq!(once.signature, twice.signature);
    }

    #[test]
    fn form_fields_follow_wire_order() {
        let config = GootaxConfig::default();
        let order = test_order();
        let form = GootaxOrderPayload::build(&config, &order, 42).sign("secret").to_form();
        let names: Vec<&str> = form.iter().map(|(n, _)| *n).collect();
        assert_eq!(names[0], "address");
        assert_eq!(*names.last().unwrap(), "signature");
        assert_eq!(names.len(), 14);
    }
}
