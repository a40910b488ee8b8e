use serde::Deserialize;

/// Where user updates are posted. Tenants differ on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateEndpoint {
    /// `POST /api/Users/{id}`
    #[default]
    PerUser,
    /// `POST /api/Users`
    Collection,
}

impl UpdateEndpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateEndpoint::PerUser => "per-user",
            UpdateEndpoint::Collection => "collection",
        }
    }
}
