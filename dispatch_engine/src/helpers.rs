//! Odds and ends for turning messy intake data into canonical orders.
use std::sync::OnceLock;

use htg_common::Phone;
use regex::Regex;

use crate::{
    db_types::{CanonicalOrder, SourceChannel, VehicleClass},
    traits::CrmTransfer,
};

static PHONE_RE: OnceLock<Regex> = OnceLock::new();

/// Pulls the first plausible Russian mobile number out of free text. Reception staff write phones into CRM notes
/// in every imaginable format ("+7 (921) 123-45-67", "8921 1234567, call after 6"), so we match loosely and let
/// [`Phone::normalize`] be the judge.
pub fn extract_phone(text: &str) -> Option<Phone> {
    let re = PHONE_RE
        .get_or_init(|| Regex::new(r"(?:\+?7|8)[\s\-()]*(?:\d[\s\-()]*){10}").expect("phone regex is valid"));
    re.find_iter(text).find_map(|m| Phone::normalize(m.as_str()).ok())
}

/// Maps a CRM transfer onto a canonical order.
///
/// Vehicle mapping follows reception conventions: `MINIVAN` is a minivan, `BUSINESS` is a sedan with the
/// business-class option, anything else is a plain sedan. A note mentioning a child adds a child seat. A missing
/// phone becomes an empty string and is rejected by the validator, not here.
pub fn order_from_transfer(transfer: &CrmTransfer) -> CanonicalOrder {
    let mut options = Vec::new();
    let vehicle_class = match transfer.vehicle_type.to_uppercase().as_str() {
        "MINIVAN" => VehicleClass::Minivan,
        "BUSINESS" => {
            options.push("business_class".to_string());
            VehicleClass::Sedan
        },
        _ => VehicleClass::Sedan,
    };
    let notes = transfer.notes.as_deref().unwrap_or_default();
    let lowered = notes.to_lowercase();
    if lowered.contains("child") || lowered.contains("дет") {
        options.push("child_seat".to_string());
    }
    let phone = transfer
        .phone
        .clone()
        .or_else(|| extract_phone(notes).map(|p| p.to_string()))
        .unwrap_or_default();
    CanonicalOrder {
        client_id: transfer.guest_name.clone(),
        phone,
        pickup_address: transfer.pickup_address.clone(),
        dropoff_address: transfer.dropoff_address.clone(),
        scheduled_time: transfer.scheduled_time,
        vehicle_class,
        options,
        comment: transfer.notes.clone(),
        source: SourceChannel::Crm,
        booking_id: Some(transfer.id.clone()),
    }
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn phones_are_extracted_from_noise() {
        let phone = extract_phone("guest arrives late, +7 (921) 123-45-67, needs receipt").unwrap();
        assert_eq!(phone.as_str(), "79211234567");
        let phone = extract_phone("8 911 000 11 22").unwrap();
        assert_eq!(phone.as_str(), "79110001122");
        assert!(extract_phone("room 214, no contact").is_none());
    }

    fn transfer() -> CrmTransfer {
        CrmTransfer {
            id: "tr-501".to_string(),
            guest_name: "Petrov".to_string(),
            phone: None,
            notes: Some("Child seat needed. 8 921 123 45 67".to_string()),
            pickup_address: "Hotel Severnaya".to_string(),
            dropoff_address: "Airport PES".to_string(),
            scheduled_time: NaiveDate::from_ymd_opt(2031, 3, 9).unwrap().and_hms_opt(14, 30, 0).unwrap(),
            vehicle_type: "BUSINESS".to_string(),
        }
    }

    #[test]
    fn business_transfers_become_sedans_with_the_business_option() {
        let order = order_from_transfer(&transfer());
        assert_eq!(order.vehicle_class, VehicleClass::Sedan);
        assert!(order.options.contains(&"business_class".to_string()));
    }

    #[test]
    fn child_notes_add_a_child_seat() {
        let order = order_from_transfer(&transfer());
        assert!(order.options.contains(&"child_seat".to_string()));
    }

    #[test]
    fn the_phone_comes_from_the_notes_when_the_crm_field_is_empty() {
        let order = order_from_transfer(&transfer());
        assert_eq!(order.phone, "79211234567");
        assert_eq!(order.booking_id.as_deref(), Some("tr-501"));
        assert_eq!(order.source, SourceChannel::Crm);
    }

    #[test]
    fn minivans_map_directly() {
        let t = CrmTransfer { vehicle_type: "minivan".to_string(), notes: None, ..transfer() };
        let order = order_from_transfer(&t);
        assert_eq!(order.vehicle_class, VehicleClass::Minivan);
        assert!(order.options.is_empty());
        assert!(order.phone.is_empty());
    }
}
