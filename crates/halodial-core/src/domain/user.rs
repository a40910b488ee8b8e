use crate::domain::ids::UserId;
use crate::domain::phone::PhoneField;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const UNKNOWN_USER_NAME: &str = "Unknown User";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    #[serde(
        alias = "Name",
        default = "unknown_user_name",
        deserialize_with = "name_or_unknown"
    )]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_phone")]
    pub phonenumber: Option<String>,
    #[serde(default, deserialize_with = "lenient_phone")]
    pub mobilenumber: Option<String>,
    #[serde(default, deserialize_with = "lenient_phone")]
    pub mobilenumber2: Option<String>,
}

impl UserRecord {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            site_name: None,
            phonenumber: None,
            mobilenumber: None,
            mobilenumber2: None,
        }
    }

    pub fn with_phone(mut self, field: PhoneField, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match field {
            PhoneField::PhoneNumber => self.phonenumber = value,
            PhoneField::MobileNumber => self.mobilenumber = value,
            PhoneField::MobileNumber2 => self.mobilenumber2 = value,
        }
        self
    }

    pub fn phone(&self, field: PhoneField) -> Option<&str> {
        match field {
            PhoneField::PhoneNumber => self.phonenumber.as_deref(),
            PhoneField::MobileNumber => self.mobilenumber.as_deref(),
            PhoneField::MobileNumber2 => self.mobilenumber2.as_deref(),
        }
    }

    pub fn phones(&self) -> impl Iterator<Item = (PhoneField, Option<&str>)> + '_ {
        PhoneField::ALL
            .into_iter()
            .map(move |field| (field, self.phone(field)))
    }
}

fn unknown_user_name() -> String {
    UNKNOWN_USER_NAME.to_string()
}

// One odd record must not fail the whole users page.
fn name_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(name)) => Ok(name),
        _ => Ok(unknown_user_name()),
    }
}

/// Numbers keep their digits as text; any other non-string is no value.
fn lenient_phone<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(value)) => Some(value),
        Some(Value::Number(value)) => Some(value.to_string()),
        _ => None,
    })
}
