//! Error type and tracing setup shared by the VRRP data crates.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
