pub mod domain;
pub mod dto;
pub mod envelope;
pub mod error;

pub use domain::*;
pub use dto::*;
pub use envelope::{ResponseShape, UsersEnvelope};
pub use error::CoreError;
