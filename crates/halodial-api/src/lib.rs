pub mod client;
pub mod error;
pub mod migrate;
pub mod secret;

pub use error::{ApiError, Result};
