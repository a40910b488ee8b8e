use crate::{ApiError, Result};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Bearer token for the Halo API. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ApiError::Secret("access token is empty".to_string()));
        }
        Ok(Self(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

pub trait SecretResolver {
    fn source_name(&self) -> &'static str;
    fn resolve(&self) -> Result<Credential>;
}

/// Resolves once, logging the outcome. Errors are returned as-is; there is no
/// retry.
pub fn resolve_credential(resolver: &dyn SecretResolver) -> Result<Credential> {
    let source = resolver.source_name();
    info!(source, "retrieving access token");
    match resolver.resolve() {
        Ok(credential) => {
            info!(source, "retrieved access token");
            Ok(credential)
        }
        Err(err) => {
            error!(source, error = %err, "failed to retrieve access token");
            Err(err)
        }
    }
}

/// Extracts `access_token` from a JSON secret payload.
pub fn parse_secret_payload(raw: &str) -> Result<Credential> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| ApiError::Secret(format!("secret payload is not valid JSON: {err}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| ApiError::Secret("secret payload must be a JSON object".to_string()))?;
    match object.get(ACCESS_TOKEN_KEY) {
        Some(Value::String(token)) => Credential::new(token.as_str()),
        Some(_) => Err(ApiError::Secret(format!(
            "{ACCESS_TOKEN_KEY} in secret payload must be a string"
        ))),
        None => Err(ApiError::Secret(format!(
            "{ACCESS_TOKEN_KEY} not found in secret payload"
        ))),
    }
}

/// Raw bearer token taken from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSecret {
    var: String,
}

impl EnvSecret {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SecretResolver for EnvSecret {
    fn source_name(&self) -> &'static str {
        "env"
    }

    fn resolve(&self) -> Result<Credential> {
        let token = std::env::var(&self.var)
            .map_err(|_| ApiError::Secret(format!("environment variable {} is not set", self.var)))?;
        Credential::new(token)
            .map_err(|_| ApiError::Secret(format!("environment variable {} is empty", self.var)))
    }
}

/// JSON secret payload stored on disk, in the same format as the managed
/// secret.
#[derive(Debug, Clone)]
pub struct FileSecret {
    path: PathBuf,
}

impl FileSecret {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretResolver for FileSecret {
    fn source_name(&self) -> &'static str {
        "file"
    }

    fn resolve(&self) -> Result<Credential> {
        ensure_permissions(&self.path)?;
        debug!(path = %self.path.display(), "reading secret file");
        let raw = fs::read_to_string(&self.path).map_err(|err| {
            ApiError::Secret(format!(
                "failed to read secret file {}: {err}",
                self.path.display()
            ))
        })?;
        parse_secret_payload(&raw)
    }
}

#[cfg(unix)]
fn ensure_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|err| {
        ApiError::Secret(format!("failed to read secret file {}: {err}", path.display()))
    })?;
    let mode = metadata.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(ApiError::Secret(format!(
            "secret file permissions too permissive: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(feature = "aws-secrets")]
mod imp {
    use super::{parse_secret_payload, Credential, SecretResolver};
    use crate::{ApiError, Result};
    use aws_config::{BehaviorVersion, Region};
    use aws_sdk_secretsmanager::error::DisplayErrorContext;
    use tokio::runtime::Runtime;

    #[derive(Debug, Clone)]
    pub struct AwsSecretsManager {
        secret_name: String,
        region: String,
    }

    impl AwsSecretsManager {
        pub fn new(secret_name: String, region: String) -> Self {
            Self {
                secret_name,
                region,
            }
        }
    }

    impl SecretResolver for AwsSecretsManager {
        fn source_name(&self) -> &'static str {
            "aws-secrets-manager"
        }

        fn resolve(&self) -> Result<Credential> {
            let runtime = Runtime::new().map_err(|err| ApiError::Runtime(err.to_string()))?;
            let output = runtime
                .block_on(async {
                    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                        .region(Region::new(self.region.clone()))
                        .load()
                        .await;
                    let client = aws_sdk_secretsmanager::Client::new(&sdk_config);
                    client
                        .get_secret_value()
                        .secret_id(self.secret_name.as_str())
                        .send()
                        .await
                })
                .map_err(|err| {
                    ApiError::Secret(format!(
                        "failed to read secret {} in {}: {}",
                        self.secret_name,
                        self.region,
                        DisplayErrorContext(&err)
                    ))
                })?;

            let raw = output.secret_string().ok_or_else(|| {
                ApiError::Secret(format!(
                    "secret {} has no string value",
                    self.secret_name
                ))
            })?;
            parse_secret_payload(raw)
        }
    }
}

#[cfg(not(feature = "aws-secrets"))]
mod imp {
    use super::{Credential, SecretResolver};
    use crate::{ApiError, Result};

    #[derive(Debug, Clone)]
    pub struct AwsSecretsManager {
        secret_name: String,
        region: String,
    }

    impl AwsSecretsManager {
        pub fn new(secret_name: String, region: String) -> Self {
            Self {
                secret_name,
                region,
            }
        }
    }

    impl SecretResolver for AwsSecretsManager {
        fn source_name(&self) -> &'static str {
            "aws-secrets-manager"
        }

        fn resolve(&self) -> Result<Credential> {
            Err(ApiError::Unavailable(format!(
                "AWS Secrets Manager secret {} in {} requires the aws-secrets feature",
                self.secret_name, self.region
            )))
        }
    }
}

pub use imp::AwsSecretsManager;
