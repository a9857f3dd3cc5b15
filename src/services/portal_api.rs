use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    schemas::{decode_tenancies, LoginInput, Tenancy, TenancyStatus},
    services::registration::RegistrationDraft,
    session::Session,
};

const USER_AGENT: &str = "dormitory-portal-rs/0.1";
const PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Client for the institute's portal API. Every call fetches fresh data;
/// nothing is cached between requests.
#[derive(Debug, Clone)]
pub struct PortalApi {
    http_client: Client,
    base_url: Url,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: Value,
}

impl PortalApi {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let base_url = Url::parse(&config.portal_api_base_url).map_err(|error| {
            AppError::Internal(format!(
                "PORTAL_API_BASE_URL is not a valid URL ({}): {error}",
                config.portal_api_base_url
            ))
        })?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.portal_api_timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| AppError::Internal(format!("HTTP client setup failed: {error}")))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|error| AppError::Internal(format!("Invalid portal API path {path}: {error}")))
    }

    fn request(&self, method: Method, path: &str, session: &Session) -> AppResult<RequestBuilder> {
        let mut builder = self
            .http_client
            .request(method, self.endpoint(path)?)
            .header("Accept", "application/json");
        if let Some(token) = session.bearer() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> AppResult<Value> {
        let response = builder.send().await.map_err(|error| {
            tracing::error!(error = %error, path, "Portal API request failed");
            AppError::Dependency("Portal API request failed.".to_string())
        })?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(error = %error, path, "Portal API response body unreadable");
                String::new()
            }
        };
        let payload = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body))
        };

        if status.is_success() {
            return Ok(payload);
        }

        tracing::warn!(status = status.as_u16(), path, "Portal API returned an error");
        Err(error_from_status(status, &payload))
    }

    pub async fn login(&self, input: &LoginInput) -> AppResult<LoginOutcome> {
        let builder = self
            .request(Method::POST, "login", &Session::anonymous())?
            .json(&json!({
                "email": input.email.trim(),
                "password": input.password,
                "remember": input.remember,
            }));
        let payload = self.send(builder, "login").await?;

        let token = extract_token(&payload).ok_or_else(|| {
            AppError::Dependency("Portal API login response did not include a token.".to_string())
        })?;
        let user = payload
            .get("user")
            .or_else(|| payload.get("data").and_then(|data| data.get("user")))
            .cloned()
            .unwrap_or(Value::Null);

        Ok(LoginOutcome { token, user })
    }

    pub async fn logout(&self, session: &Session) -> AppResult<()> {
        session.require()?;
        let builder = self.request(Method::POST, "logout", session)?;
        self.send(builder, "logout").await.map(|_| ())
    }

    pub async fn current_user(&self, session: &Session) -> AppResult<Value> {
        session.require()?;
        let builder = self.request(Method::GET, "user", session)?;
        let payload = self.send(builder, "user").await?;
        Ok(match payload {
            Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        })
    }

    pub async fn room_tenancies(&self, session: &Session, room_id: &str) -> AppResult<Vec<Tenancy>> {
        session.require()?;
        let room_id = path_segment(room_id)?;
        let path = format!("rooms/{room_id}/tenants");
        let builder = self.request(Method::GET, &path, session)?;
        let tenancies = decode_tenancies(self.send(builder, &path).await?);
        tracing::debug!(room_id, count = tenancies.len(), "Fetched room tenancies");
        Ok(tenancies)
    }

    pub async fn all_tenancies(
        &self,
        session: &Session,
        status: Option<TenancyStatus>,
    ) -> AppResult<Vec<Tenancy>> {
        session.require()?;
        let mut builder = self.request(Method::GET, "tenants", session)?;
        if let Some(status) = status {
            builder = builder.query(&[("status", status)]);
        }
        let tenancies = decode_tenancies(self.send(builder, "tenants").await?);
        tracing::debug!(count = tenancies.len(), "Fetched tenancies");
        Ok(tenancies)
    }

    pub async fn my_tenancies(&self, session: &Session) -> AppResult<Vec<Tenancy>> {
        session.require()?;
        let builder = self.request(Method::GET, "my/tenants", session)?;
        Ok(decode_tenancies(self.send(builder, "my/tenants").await?))
    }

    pub async fn submit_registration(
        &self,
        session: &Session,
        draft: &RegistrationDraft,
    ) -> AppResult<Value> {
        session.require()?;
        let builder = self
            .request(Method::POST, "trainees/registration", session)?
            .json(draft);
        self.send(builder, "trainees/registration").await
    }

    /// Reachability only: any HTTP answer counts, a transport error does not.
    pub async fn ping(&self) -> bool {
        match self
            .http_client
            .get(self.base_url.clone())
            .timeout(PING_TIMEOUT)
            .send()
            .await
        {
            Ok(_) => true,
            Err(error) => {
                tracing::error!(error = %error, "Portal API health probe failed");
                false
            }
        }
    }
}

fn path_segment(raw: &str) -> AppResult<&str> {
    let segment = raw.trim();
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(segment)
    } else {
        Err(AppError::BadRequest(format!("Invalid identifier: {raw}")))
    }
}

fn remote_message(payload: &Value) -> Option<String> {
    payload
        .get("message")
        .or_else(|| payload.get("error"))
        .or_else(|| payload.get("detail"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}

pub fn error_from_status(status: StatusCode, payload: &Value) -> AppError {
    let message = remote_message(payload);
    match status {
        StatusCode::BAD_REQUEST => {
            AppError::BadRequest(message.unwrap_or_else(|| "Bad request.".to_string()))
        }
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(
            message.unwrap_or_else(|| "Session expired. Please sign in again.".to_string()),
        ),
        StatusCode::FORBIDDEN => {
            AppError::Forbidden(message.unwrap_or_else(|| "Forbidden.".to_string()))
        }
        StatusCode::NOT_FOUND => {
            AppError::NotFound(message.unwrap_or_else(|| "Not found.".to_string()))
        }
        StatusCode::UNPROCESSABLE_ENTITY => AppError::UnprocessableEntity(
            message.unwrap_or_else(|| "The portal API rejected the request.".to_string()),
        ),
        other => AppError::Dependency(format!(
            "Portal API error ({}): {}",
            other.as_u16(),
            message.unwrap_or_else(|| "unexpected response".to_string())
        )),
    }
}

/// Login responses differ by endpoint version: `token`, `access_token`, or
/// either nested under `data`.
pub fn extract_token(payload: &Value) -> Option<String> {
    let direct = |value: &Value| {
        ["token", "access_token"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(ToOwned::to_owned)
    };
    direct(payload).or_else(|| payload.get("data").and_then(direct))
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{error_from_status, extract_token, path_segment, PortalApi};
    use crate::{config::AppConfig, error::AppError};

    fn config(base_url: &str) -> AppConfig {
        let mut config = AppConfig::from_env();
        config.portal_api_base_url = base_url.to_string();
        config
    }

    #[test]
    fn joins_paths_under_base() {
        let api = PortalApi::new(&config("https://portal.example.edu/api/")).expect("client");
        assert_eq!(
            api.endpoint("/rooms/12/tenants").expect("url").as_str(),
            "https://portal.example.edu/api/rooms/12/tenants"
        );
        assert_eq!(
            api.endpoint("login").expect("url").as_str(),
            "https://portal.example.edu/api/login"
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(
            PortalApi::new(&config("not a url")),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn only_plain_identifiers_reach_the_path() {
        assert_eq!(path_segment(" 12 ").expect("ok"), "12");
        assert_eq!(path_segment("room_b-2").expect("ok"), "room_b-2");
        assert!(path_segment("../admin").is_err());
        assert!(path_segment("").is_err());
    }

    #[test]
    fn maps_remote_statuses() {
        let err = error_from_status(StatusCode::UNAUTHORIZED, &json!({ "message": "Unauthenticated." }));
        assert!(matches!(err, AppError::Unauthorized(message) if message == "Unauthenticated."));

        let err = error_from_status(StatusCode::UNPROCESSABLE_ENTITY, &json!(null));
        assert!(matches!(err, AppError::UnprocessableEntity(_)));

        let err = error_from_status(StatusCode::SERVICE_UNAVAILABLE, &json!("down"));
        assert!(matches!(err, AppError::Dependency(message) if message.contains("503")));
    }

    #[test]
    fn finds_token_in_known_shapes() {
        assert_eq!(extract_token(&json!({ "token": "a" })).as_deref(), Some("a"));
        assert_eq!(
            extract_token(&json!({ "access_token": "b", "user": {} })).as_deref(),
            Some("b")
        );
        assert_eq!(
            extract_token(&json!({ "data": { "token": "c" } })).as_deref(),
            Some("c")
        );
        assert_eq!(extract_token(&json!({ "token": "  " })), None);
        assert_eq!(extract_token(&json!({})), None);
    }
}
