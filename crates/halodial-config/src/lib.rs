use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use halodial_core::{ResponseShape, UpdateEndpoint};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

const APP_DIR: &str = "halodial";
const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_PAGE_SIZE: u32 = 500;
pub const MAX_PAGE_SIZE: u32 = 10_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "halodial";
pub const DEFAULT_SECRET_NAME: &str = "halo_oauth_token";
pub const DEFAULT_SECRET_REGION: &str = "us-west-1";
pub const DEFAULT_TOKEN_ENV: &str = "HALODIAL_TOKEN";

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub halo: HaloConfig,
    pub secret: SecretConfig,
}

#[derive(Debug, Clone)]
pub struct HaloConfig {
    pub base_url: Option<Url>,
    pub site_id: Option<u64>,
    pub page_size: u32,
    pub response_shape: ResponseShape,
    pub update_endpoint: UpdateEndpoint,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct SecretConfig {
    pub backend: SecretBackend,
    pub name: String,
    pub region: String,
    pub env: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackend {
    Aws,
    Env,
    File,
}

impl Default for HaloConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            site_id: None,
            page_size: DEFAULT_PAGE_SIZE,
            response_shape: ResponseShape::default(),
            update_endpoint: UpdateEndpoint::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackend::Aws,
            name: DEFAULT_SECRET_NAME.to_string(),
            region: DEFAULT_SECRET_REGION.to_string(),
            env: DEFAULT_TOKEN_ENV.to_string(),
            path: None,
        }
    }
}

impl HaloConfig {
    pub fn require_base_url(&self) -> Result<&Url> {
        self.base_url
            .as_ref()
            .ok_or(ConfigError::MissingField("halo.base_url"))
    }

    /// Resolves the site to work on; a command-line value wins over the file.
    pub fn resolve_site_id(&self, cli_override: Option<u64>) -> Result<u64> {
        match cli_override.or(self.site_id) {
            Some(0) => Err(ConfigError::InvalidSiteId(0)),
            Some(site_id) => Ok(site_id),
            None => Err(ConfigError::MissingField("halo.site_id")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid config path: {0}")]
    InvalidConfigPath(PathBuf),
    #[error("config file not found: {0}")]
    MissingConfigFile(PathBuf),
    #[error("missing required config value: {0}")]
    MissingField(&'static str),
    #[error("invalid halo.base_url value: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid halo.site_id value: {0}")]
    InvalidSiteId(u64),
    #[error("invalid halo.page_size value: {0} (expected 1..={max})", max = MAX_PAGE_SIZE)]
    InvalidPageSize(u32),
    #[error("invalid halo.timeout_secs value: {0}")]
    InvalidTimeout(u64),
    #[error("invalid secret.{field} value: {message}")]
    InvalidSecretField {
        field: &'static str,
        message: String,
    },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    halo: Option<HaloFile>,
    secret: Option<SecretFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HaloFile {
    base_url: Option<String>,
    site_id: Option<u64>,
    page_size: Option<u32>,
    response_shape: Option<ResponseShape>,
    update_endpoint: Option<UpdateEndpoint>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SecretFile {
    backend: Option<SecretBackend>,
    name: Option<String>,
    region: Option<String>,
    env: Option<String>,
    path: Option<PathBuf>,
}

pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let required = config_path.is_some();
    let path = match resolve_config_path(config_path) {
        Ok(path) => path,
        Err(ConfigError::MissingHomeDir) if !required => return Ok(AppConfig::default()),
        Err(ConfigError::InvalidConfigPath(_)) if !required => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    match load_at_path(&path, required)? {
        Some(config) => Ok(config),
        None => Ok(AppConfig::default()),
    }
}

pub fn resolve_config_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfigPath(path));
            }
            Ok(path)
        }
        None => {
            let base = if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
                let path = PathBuf::from(dir);
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidConfigPath(path));
                }
                path
            } else {
                let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDir)?;
                home.join(".config")
            };
            Ok(base.join(APP_DIR).join(CONFIG_FILENAME))
        }
    }
}

fn load_at_path(path: &Path, required: bool) -> Result<Option<AppConfig>> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(merge_config(parsed)?))
}

fn merge_config(parsed: ConfigFile) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(halo) = parsed.halo {
        merge_halo(&mut config.halo, halo)?;
    }
    if let Some(secret) = parsed.secret {
        merge_secret(&mut config.secret, secret)?;
    }

    if config.secret.backend == SecretBackend::File && config.secret.path.is_none() {
        return Err(ConfigError::InvalidSecretField {
            field: "path",
            message: "required when backend = \"file\"".to_string(),
        });
    }

    Ok(config)
}

fn merge_halo(config: &mut HaloConfig, parsed: HaloFile) -> Result<()> {
    if let Some(raw) = parsed.base_url {
        config.base_url = Some(parse_base_url(&raw)?);
    }

    if let Some(site_id) = parsed.site_id {
        if site_id == 0 {
            return Err(ConfigError::InvalidSiteId(site_id));
        }
        config.site_id = Some(site_id);
    }

    if let Some(page_size) = parsed.page_size {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize(page_size));
        }
        config.page_size = page_size;
    }

    if let Some(shape) = parsed.response_shape {
        config.response_shape = shape;
    }
    if let Some(endpoint) = parsed.update_endpoint {
        config.update_endpoint = endpoint;
    }

    if let Some(timeout) = parsed.timeout_secs {
        if timeout == 0 {
            return Err(ConfigError::InvalidTimeout(timeout));
        }
        config.timeout_secs = timeout;
    }

    if let Some(user_agent) = parsed.user_agent {
        let trimmed = user_agent.trim();
        if !trimmed.is_empty() {
            config.user_agent = trimmed.to_string();
        }
    }

    Ok(())
}

fn merge_secret(config: &mut SecretConfig, parsed: SecretFile) -> Result<()> {
    if let Some(backend) = parsed.backend {
        config.backend = backend;
    }
    if let Some(name) = parsed.name {
        config.name = non_empty("name", name)?;
    }
    if let Some(region) = parsed.region {
        config.region = non_empty("region", region)?;
    }
    if let Some(var) = parsed.env {
        config.env = non_empty("env", var)?;
    }
    if let Some(path) = parsed.path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidSecretField {
                field: "path",
                message: "must not be empty".to_string(),
            });
        }
        config.path = Some(path);
    }
    Ok(())
}

fn non_empty(field: &'static str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidSecretField {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Parses the API base URL, keeping a trailing slash so relative endpoint
/// paths join under it instead of replacing the last segment.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let mut url =
        Url::parse(trimmed).map_err(|err| ConfigError::InvalidBaseUrl(format!("{raw}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl(format!(
            "{raw}: scheme must be http or https"
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidBaseUrl(format!(
            "{raw}: must not carry a query or fragment"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::{
        load_at_path, merge_config, parse_base_url, ConfigError, ConfigFile, HaloFile,
        SecretBackend, SecretFile, DEFAULT_PAGE_SIZE, DEFAULT_SECRET_NAME, DEFAULT_SECRET_REGION,
    };
    use halodial_core::{ResponseShape, UpdateEndpoint};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn merge_config_applies_values() {
        let parsed = ConfigFile {
            halo: Some(HaloFile {
                base_url: Some("https://example.halopsa.com".to_string()),
                site_id: Some(12345),
                page_size: Some(250),
                response_shape: Some(ResponseShape::Wrapped),
                update_endpoint: Some(UpdateEndpoint::Collection),
                timeout_secs: Some(5),
                user_agent: Some("ops-bot".to_string()),
            }),
            secret: Some(SecretFile {
                backend: Some(SecretBackend::Env),
                name: None,
                region: None,
                env: Some("HALO_TOKEN".to_string()),
                path: None,
            }),
        };
        let merged = merge_config(parsed).expect("merge");
        assert_eq!(
            merged.halo.base_url.as_ref().map(|url| url.as_str()),
            Some("https://example.halopsa.com/")
        );
        assert_eq!(merged.halo.site_id, Some(12345));
        assert_eq!(merged.halo.page_size, 250);
        assert_eq!(merged.halo.response_shape, ResponseShape::Wrapped);
        assert_eq!(merged.halo.update_endpoint, UpdateEndpoint::Collection);
        assert_eq!(merged.halo.timeout_secs, 5);
        assert_eq!(merged.halo.user_agent, "ops-bot");
        assert_eq!(merged.secret.backend, SecretBackend::Env);
        assert_eq!(merged.secret.env, "HALO_TOKEN");
        assert_eq!(merged.secret.name, DEFAULT_SECRET_NAME);
    }

    #[test]
    fn defaults_match_the_halo_deployment() {
        let merged = merge_config(ConfigFile::default()).expect("merge");
        assert_eq!(merged.halo.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(merged.halo.response_shape, ResponseShape::Auto);
        assert_eq!(merged.halo.update_endpoint, UpdateEndpoint::PerUser);
        assert_eq!(merged.secret.backend, SecretBackend::Aws);
        assert_eq!(merged.secret.name, DEFAULT_SECRET_NAME);
        assert_eq!(merged.secret.region, DEFAULT_SECRET_REGION);
        assert!(merged.halo.require_base_url().is_err());
    }

    #[test]
    fn site_id_override_wins() {
        let mut merged = merge_config(ConfigFile::default()).expect("merge");
        assert!(matches!(
            merged.halo.resolve_site_id(None),
            Err(ConfigError::MissingField("halo.site_id"))
        ));
        merged.halo.site_id = Some(10);
        assert_eq!(merged.halo.resolve_site_id(None).unwrap(), 10);
        assert_eq!(merged.halo.resolve_site_id(Some(20)).unwrap(), 20);
        assert!(merged.halo.resolve_site_id(Some(0)).is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let parsed = ConfigFile {
            halo: Some(HaloFile {
                page_size: Some(0),
                ..HaloFile::default()
            }),
            secret: None,
        };
        assert!(matches!(
            merge_config(parsed),
            Err(ConfigError::InvalidPageSize(0))
        ));

        let parsed = ConfigFile {
            halo: Some(HaloFile {
                site_id: Some(0),
                ..HaloFile::default()
            }),
            secret: None,
        };
        assert!(matches!(
            merge_config(parsed),
            Err(ConfigError::InvalidSiteId(0))
        ));
    }

    #[test]
    fn file_backend_requires_path() {
        let parsed = ConfigFile {
            halo: None,
            secret: Some(SecretFile {
                backend: Some(SecretBackend::File),
                ..SecretFile::default()
            }),
        };
        let err = merge_config(parsed).unwrap_err();
        assert!(err.to_string().contains("secret.path"));

        let parsed = ConfigFile {
            halo: None,
            secret: Some(SecretFile {
                backend: Some(SecretBackend::File),
                path: Some(PathBuf::from("/run/secrets/halo.json")),
                ..SecretFile::default()
            }),
        };
        let merged = merge_config(parsed).expect("merge");
        assert_eq!(
            merged.secret.path,
            Some(PathBuf::from("/run/secrets/halo.json"))
        );
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(parse_base_url("ftp://example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("https://example.com/?x=1").is_err());
        let url = parse_base_url("https://example.com/halo").expect("url");
        assert_eq!(url.as_str(), "https://example.com/halo/");
        assert_eq!(
            url.join("api/Users").expect("join").as_str(),
            "https://example.com/halo/api/Users"
        );
    }

    #[test]
    fn load_at_path_requires_file_when_requested() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("config.toml");
        let err = load_at_path(&missing, true).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("config file not found"));

        assert!(load_at_path(&missing, false).expect("optional").is_none());
    }

    #[test]
    fn load_at_path_parses_toml() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[halo]\nbase_url = \"https://example.halopsa.com\"\nsite_id = 42\nresponse_shape = \"bare\"\nupdate_endpoint = \"per-user\"\n\n[secret]\nbackend = \"aws\"\nregion = \"eu-west-2\"\n",
        )
        .expect("write config");

        let config = load_at_path(&path, true).expect("load").expect("config");
        assert_eq!(config.halo.site_id, Some(42));
        assert_eq!(config.halo.response_shape, ResponseShape::Bare);
        assert_eq!(config.secret.region, "eu-west-2");
    }

    #[test]
    fn load_at_path_rejects_unknown_keys() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[halo]\nsite = 42\n").expect("write config");

        let err = load_at_path(&path, true).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
