use crate::secret::Credential;
use crate::{ApiError, Result};
use halodial_core::{ResponseShape, UpdateEndpoint, UpdatePayload, UserRecord, UsersEnvelope};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USERS_PATH: &str = "api/Users";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY_CHARS: usize = 512;

/// The two calls the phone migration needs from the remote user directory.
pub trait UserApi {
    fn fetch_users(&self, site_id: u64) -> Result<Vec<UserRecord>>;
    fn update_user(&self, payload: &UpdatePayload) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct HaloClientOptions {
    pub base_url: Url,
    pub page_size: u32,
    pub response_shape: ResponseShape,
    pub update_endpoint: UpdateEndpoint,
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug)]
pub struct HaloClient {
    http: Client,
    options: HaloClientOptions,
    credential: Credential,
}

impl HaloClient {
    pub fn new(options: HaloClientOptions, credential: Credential) -> Result<Self> {
        let http = Client::builder()
            .user_agent(options.user_agent.as_str())
            .timeout(options.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            options,
            credential,
        })
    }

    pub fn users_url(&self) -> Result<Url> {
        Ok(self.options.base_url.join(USERS_PATH)?)
    }

    pub fn update_url(&self, payload: &UpdatePayload) -> Result<Url> {
        let mut url = self.users_url()?;
        if self.options.update_endpoint == UpdateEndpoint::PerUser {
            url.path_segments_mut()
                .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
                .push(&payload.id.to_string());
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.credential.expose())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
    }
}

impl UserApi for HaloClient {
    fn fetch_users(&self, site_id: u64) -> Result<Vec<UserRecord>> {
        let url = self.users_url()?;
        debug!(url = %url, site_id, count = self.options.page_size, "requesting users");

        let response = self
            .authorized(self.http.get(url))
            .query(&[
                ("site_id", site_id.to_string()),
                ("count", self.options.page_size.to_string()),
            ])
            .send()?;
        let body = success_body(response)?;

        let envelope = UsersEnvelope::parse(&body, self.options.response_shape)?;
        let users = envelope.into_users();
        if users.len() >= self.options.page_size as usize {
            warn!(
                site_id,
                count = users.len(),
                page_size = self.options.page_size,
                "received a full page of users; any beyond the page size were not fetched"
            );
        }
        Ok(users)
    }

    fn update_user(&self, payload: &UpdatePayload) -> Result<()> {
        let url = self.update_url(payload)?;
        let body = [payload];
        debug!(url = %url, "posting user update");
        if let Ok(pretty) = serde_json::to_string_pretty(&body) {
            debug!(payload = %pretty, "update payload");
        }

        let response = self.authorized(self.http.post(url)).json(&body).send()?;
        let body = success_body(response)?;
        debug!(response = %body, "update accepted");
        Ok(())
    }
}

/// Any 2xx is success; everything else becomes `ApiError::Status` carrying a
/// bounded copy of the response body.
fn success_body(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text()?;
    debug!(status = status.as_u16(), "response received");
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }
    Ok(body)
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::{truncate_body, HaloClient, HaloClientOptions, UserApi};
    use crate::secret::Credential;
    use crate::ApiError;
    use halodial_core::{
        plan_update, PhoneField, ResponseShape, UpdateEndpoint, UserId, UserRecord,
    };
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;
    use url::Url;

    fn client(server: &MockServer, shape: ResponseShape, endpoint: UpdateEndpoint) -> HaloClient {
        let base_url = Url::parse(&format!("{}/", server.base_url())).expect("base url");
        HaloClient::new(
            HaloClientOptions {
                base_url,
                page_size: 500,
                response_shape: shape,
                update_endpoint: endpoint,
                timeout: Duration::from_secs(5),
                user_agent: "halodial-test".to_string(),
            },
            Credential::new("test-token").expect("credential"),
        )
        .expect("client")
    }

    fn local_user() -> UserRecord {
        UserRecord::new(UserId::Number(17), "Ada Lovelace")
            .with_phone(PhoneField::PhoneNumber, "07123456789")
    }

    #[test]
    fn fetch_users_sends_site_and_count() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/Users")
                .query_param("site_id", "12345")
                .query_param("count", "500")
                .header("authorization", "Bearer test-token")
                .header("content-type", "application/json");
            then.status(200).json_body(json!([
                {"id": 1, "name": "Ada", "phonenumber": "07123456789"},
                {"id": 2, "name": "Grace"}
            ]));
        });

        let users = client(&server, ResponseShape::Auto, UpdateEndpoint::PerUser)
            .fetch_users(12345)
            .expect("users");
        mock.assert();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Ada");
    }

    #[test]
    fn fetch_users_unwraps_users_envelope() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/Users");
            then.status(200).json_body(json!({
                "record_count": 1,
                "users": [{"id": 1, "name": "Ada", "site_name": "HQ"}]
            }));
        });

        let users = client(&server, ResponseShape::Wrapped, UpdateEndpoint::PerUser)
            .fetch_users(1)
            .expect("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].site_name.as_deref(), Some("HQ"));
    }

    #[test]
    fn fetch_users_fails_on_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/Users");
            then.status(401).body("invalid token");
        });

        let err = client(&server, ResponseShape::Auto, UpdateEndpoint::PerUser)
            .fetch_users(1)
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid token");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fetch_users_rejects_unexpected_shape() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/Users");
            then.status(200).json_body(json!({"users": []}));
        });

        let err = client(&server, ResponseShape::Bare, UpdateEndpoint::PerUser)
            .fetch_users(1)
            .unwrap_err();
        assert!(matches!(err, ApiError::Core(_)));
    }

    #[test]
    fn update_user_posts_array_to_user_path() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/Users/17")
                .header("authorization", "Bearer test-token")
                .json_body(json!([{"id": 17, "phonenumber": "+44123456789"}]));
            then.status(200).json_body(json!({"id": 17}));
        });

        let payload = plan_update(&local_user()).expect("payload");
        client(&server, ResponseShape::Auto, UpdateEndpoint::PerUser)
            .update_user(&payload)
            .expect("update");
        mock.assert();
    }

    #[test]
    fn update_user_posts_to_collection_and_accepts_created() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/Users")
                .json_body(json!([{"id": 17, "phonenumber": "+44123456789"}]));
            then.status(201);
        });

        let payload = plan_update(&local_user()).expect("payload");
        client(&server, ResponseShape::Auto, UpdateEndpoint::Collection)
            .update_user(&payload)
            .expect("update");
        mock.assert();
    }

    #[test]
    fn update_user_accepts_no_content() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/Users/17");
            then.status(204);
        });

        let payload = plan_update(&local_user()).expect("payload");
        client(&server, ResponseShape::Auto, UpdateEndpoint::PerUser)
            .update_user(&payload)
            .expect("update");
        mock.assert();
    }

    #[test]
    fn update_user_reports_server_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/Users/17");
            then.status(500).body("boom");
        });

        let payload = plan_update(&local_user()).expect("payload");
        let err = client(&server, ResponseShape::Auto, UpdateEndpoint::PerUser)
            .update_user(&payload)
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }

    #[test]
    fn update_url_escapes_text_ids() {
        let server = MockServer::start();
        let client = client(&server, ResponseShape::Auto, UpdateEndpoint::PerUser);
        let payload = plan_update(
            &UserRecord::new(UserId::from("a/b"), "Odd")
                .with_phone(PhoneField::MobileNumber, "07000"),
        )
        .expect("payload");
        let url = client.update_url(&payload).expect("url");
        assert!(url.path().ends_with("/api/Users/a%2Fb"));
    }

    #[test]
    fn truncate_body_bounds_long_bodies() {
        let long = "x".repeat(2_000);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.len(), 515);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_body("  short  "), "short");
    }
}
