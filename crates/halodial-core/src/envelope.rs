use crate::domain::UserRecord;
use crate::error::CoreError;
use serde::Deserialize;
use serde_json::Value;

/// Which users response body to expect from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    /// Accept either shape, decided by the top-level JSON type.
    #[default]
    Auto,
    /// A top-level JSON array of users.
    Bare,
    /// A JSON object with a `users` array.
    Wrapped,
}

impl ResponseShape {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseShape::Auto => "auto",
            ResponseShape::Bare => "bare",
            ResponseShape::Wrapped => "wrapped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsersEnvelope {
    BareList(Vec<UserRecord>),
    Wrapped { users: Vec<UserRecord> },
}

impl UsersEnvelope {
    pub fn parse(body: &str, shape: ResponseShape) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|err| CoreError::InvalidEnvelope(err.to_string()))?;
        Self::from_value(value, shape)
    }

    pub fn from_value(value: Value, shape: ResponseShape) -> Result<Self, CoreError> {
        match value {
            Value::Array(items) if shape != ResponseShape::Wrapped => {
                let users = serde_json::from_value(Value::Array(items))
                    .map_err(|err| CoreError::InvalidUserRecord(err.to_string()))?;
                Ok(UsersEnvelope::BareList(users))
            }
            Value::Object(mut map) if shape != ResponseShape::Bare => {
                let users = map.remove("users").ok_or_else(|| {
                    CoreError::InvalidEnvelope(
                        "object response is missing the users array".to_string(),
                    )
                })?;
                let users = serde_json::from_value(users)
                    .map_err(|err| CoreError::InvalidUserRecord(err.to_string()))?;
                Ok(UsersEnvelope::Wrapped { users })
            }
            other => match shape {
                ResponseShape::Auto => Err(CoreError::InvalidEnvelope(format!(
                    "expected an array or an object with users, found {}",
                    json_kind(&other)
                ))),
                expected => Err(CoreError::ShapeMismatch {
                    expected: expected.as_str(),
                    found: json_kind(&other),
                }),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.users().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users().is_empty()
    }

    pub fn users(&self) -> &[UserRecord] {
        match self {
            UsersEnvelope::BareList(users) => users,
            UsersEnvelope::Wrapped { users } => users,
        }
    }

    pub fn into_users(self) -> Vec<UserRecord> {
        match self {
            UsersEnvelope::BareList(users) => users,
            UsersEnvelope::Wrapped { users } => users,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
