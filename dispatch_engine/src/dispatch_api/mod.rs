//! The public orchestration API of the dispatch engine.
mod errors;
mod order_flow_api;

pub use errors::DispatchError;
pub use order_flow_api::{OrderFlowApi, TariffTable, DEFAULT_DISPATCH_TIMEOUT};
