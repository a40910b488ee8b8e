pub mod endpoint;
pub mod ids;
pub mod phone;
pub mod update;
pub mod user;

pub use endpoint::UpdateEndpoint;
pub use ids::UserId;
pub use phone::{normalize_phone_fields, normalize_uk_phone, PhoneField, PhoneUpdates};
pub use update::{plan_update, plan_updates, UpdatePayload};
pub use user::UserRecord;
