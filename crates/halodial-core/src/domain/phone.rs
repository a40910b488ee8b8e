use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const LOCAL_TRUNK_PREFIX: &str = "07";
pub const UK_COUNTRY_PREFIX: &str = "+44";

/// The phone-number fields a Halo user record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PhoneField {
    #[serde(rename = "phonenumber")]
    PhoneNumber,
    #[serde(rename = "mobilenumber")]
    MobileNumber,
    #[serde(rename = "mobilenumber2")]
    MobileNumber2,
}

impl PhoneField {
    pub const ALL: [PhoneField; 3] = [
        PhoneField::PhoneNumber,
        PhoneField::MobileNumber,
        PhoneField::MobileNumber2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PhoneField::PhoneNumber => "phonenumber",
            PhoneField::MobileNumber => "mobilenumber",
            PhoneField::MobileNumber2 => "mobilenumber2",
        }
    }
}

impl fmt::Display for PhoneField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sparse field -> corrected value mapping. Empty means nothing to update.
pub type PhoneUpdates = BTreeMap<PhoneField, String>;

/// Rewrites a UK number stored in local `07...` form to `+44...`.
///
/// Only the two-character trunk prefix is checked and replaced; the remaining
/// characters are kept as-is. Anything else, including numbers that already
/// carry `+44`, returns `None`.
pub fn normalize_uk_phone(value: &str) -> Option<String> {
    let rest = value.strip_prefix(LOCAL_TRUNK_PREFIX)?;
    let mut out = String::with_capacity(UK_COUNTRY_PREFIX.len() + rest.len());
    out.push_str(UK_COUNTRY_PREFIX);
    out.push_str(rest);
    Some(out)
}

pub fn normalize_phone_fields<'a, I>(fields: I) -> PhoneUpdates
where
    I: IntoIterator<Item = (PhoneField, Option<&'a str>)>,
{
    fields
        .into_iter()
        .filter_map(|(field, value)| {
            let value = value?;
            normalize_uk_phone(value).map(|normalized| (field, normalized))
        })
        .collect()
}
