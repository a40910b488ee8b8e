use crate::domain::ids::UserId;
use crate::domain::phone::{normalize_phone_fields, PhoneUpdates};
use crate::domain::user::UserRecord;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Body of a single user update: the id plus every corrected phone field.
///
/// Serializes flat, `{"id": 17, "phonenumber": "+44..."}`, which is the shape
/// the Halo users endpoint accepts inside a JSON array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePayload {
    pub id: UserId,
    pub updates: PhoneUpdates,
}

impl UpdatePayload {
    pub fn field_names(&self) -> Vec<&'static str> {
        self.updates.keys().map(|field| field.as_str()).collect()
    }
}

impl Serialize for UpdatePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.updates.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (field, value) in &self.updates {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

pub fn plan_update(user: &UserRecord) -> Option<UpdatePayload> {
    let updates = normalize_phone_fields(user.phones());
    if updates.is_empty() {
        return None;
    }
    Some(UpdatePayload {
        id: user.id.clone(),
        updates,
    })
}

pub fn plan_updates(users: &[UserRecord]) -> Vec<UpdatePayload> {
    users.iter().filter_map(plan_update).collect()
}
