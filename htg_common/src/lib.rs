mod helpers;
mod phone;
mod secret;

pub use helpers::parse_boolean_flag;
pub use phone::{Phone, PhoneError};
pub use secret::Secret;
