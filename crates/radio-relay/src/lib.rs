//! Same-origin relay in front of the radio directory API.

pub mod error;
pub mod proxy;

pub use error::RelayError;
pub use proxy::{router, spawn, RelayState};
