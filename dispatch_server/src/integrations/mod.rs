mod crm;
mod geocoder;

pub use crm::OperaCrm;
pub use geocoder::YandexGeocoder;
