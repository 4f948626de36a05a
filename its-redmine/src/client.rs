//! Redmine REST API client using reqwest

use std::time::Duration;

use async_trait::async_trait;
use its_core::TrackerConfig;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use crate::api::{IssueFilter, RedmineApi};
use crate::{CustomField, Error, Issue, IssueChanges, Priority, Project, Result, User, Version};

/// Header carrying the REST API key
const API_KEY_HEADER: &str = "x-redmine-api-key";

/// Page size for list endpoints (Redmine caps `limit` at 100)
const PAGE_SIZE: usize = 100;

/// Connection options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Validate the server's TLS certificate
    pub verify_certificates: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            verify_certificates: false,
        }
    }
}

impl From<&TrackerConfig> for ClientOptions {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            timeout: config.timeout,
            verify_certificates: config.verify_certificates,
        }
    }
}

/// Validation error body returned with HTTP 422
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IssueEnvelope {
    issue: Issue,
}

/// Redmine API client bound to one tracker instance
pub struct RedmineClient {
    client: reqwest::Client,
    base_url: Url,
}

impl RedmineClient {
    /// Create a client for the tracker at `base_url`
    ///
    /// No request is made here, so an unreachable tracker is not an error
    /// until the first call.
    pub fn new(base_url: &str, api_key: &str, options: &ClientOptions) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| Error::Auth("API key contains invalid characters".to_string()))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .user_agent(concat!("its-redmine/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_certificates)
            .build()?;

        info!(
            url = %base_url,
            verify_certificates = options.verify_certificates,
            "Created Redmine client"
        );

        Ok(Self { client, base_url })
    }

    /// Get the tracker base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, ?query, "GET");

        let response = self.client.get(url).query(query).send().await?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Failed to parse {} response: {}", path, e)))
    }

    /// Fetch every page of a list endpoint
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut params = query.to_vec();
            params.push(("offset", offset.to_string()));
            params.push(("limit", PAGE_SIZE.to_string()));

            let mut page: Value = self.get_json(path, &params).await?;
            let batch: Vec<T> = match page.get_mut(key) {
                Some(value) => serde_json::from_value(value.take())
                    .map_err(|e| Error::Parse(format!("Failed to parse {}: {}", key, e)))?,
                None => Vec::new(),
            };
            let total = page.get("total_count").and_then(Value::as_u64);

            let fetched = batch.len();
            items.extend(batch);

            match total {
                Some(total) if fetched > 0 && (items.len() as u64) < total => offset += fetched,
                _ => break,
            }
        }

        debug!(path, count = items.len(), "Fetched all pages");
        Ok(items)
    }
}

#[async_trait]
impl RedmineApi for RedmineClient {
    async fn projects(&self) -> Result<Vec<Project>> {
        self.get_all("projects.json", "projects", &[]).await
    }

    async fn issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let mut query = Vec::new();
        if let Some(ref project) = filter.project {
            query.push(("project_id", project.clone()));
        }
        if filter.all_statuses {
            query.push(("status_id", "*".to_string()));
        }

        // custom_fields are part of the default issue representation
        self.get_all("issues.json", "issues", &query).await
    }

    async fn issue(&self, id: u64) -> Result<Issue> {
        let envelope: IssueEnvelope = self.get_json(&format!("issues/{}.json", id), &[]).await?;
        Ok(envelope.issue)
    }

    async fn users(&self) -> Result<Vec<User>> {
        // An empty status selects active, registered and locked users alike
        self.get_all("users.json", "users", &[("status", String::new())])
            .await
    }

    async fn issue_priorities(&self) -> Result<Vec<Priority>> {
        #[derive(Deserialize)]
        struct Priorities {
            issue_priorities: Vec<Priority>,
        }

        let list: Priorities = self
            .get_json("enumerations/issue_priorities.json", &[])
            .await?;
        Ok(list.issue_priorities)
    }

    async fn versions(&self, project_id: u64) -> Result<Vec<Version>> {
        #[derive(Deserialize)]
        struct Versions {
            versions: Vec<Version>,
        }

        let list: Versions = self
            .get_json(&format!("projects/{}/versions.json", project_id), &[])
            .await?;
        Ok(list.versions)
    }

    async fn custom_fields(&self) -> Result<Vec<CustomField>> {
        #[derive(Deserialize)]
        struct CustomFields {
            custom_fields: Vec<CustomField>,
        }

        let list: CustomFields = self.get_json("custom_fields.json", &[]).await?;
        Ok(list.custom_fields)
    }

    async fn create_issue(&self, changes: &IssueChanges) -> Result<Issue> {
        let url = self.endpoint("issues.json")?;
        debug!(%url, ?changes, "POST");

        let response = self
            .client
            .post(url)
            .json(&json!({ "issue": changes }))
            .send()
            .await?;
        let response = check_status(response).await?;

        let envelope: IssueEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Failed to parse created issue: {}", e)))?;
        Ok(envelope.issue)
    }

    async fn update_issue(&self, id: u64, changes: &IssueChanges) -> Result<()> {
        let url = self.endpoint(&format!("issues/{}.json", id))?;
        debug!(%url, ?changes, "PUT");

        let response = self
            .client
            .put(url)
            .json(&json!({ "issue": changes }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedmineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedmineClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Map non-success statuses onto error variants
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response".to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Auth(format!("{} returned {}", url, status))
        }
        StatusCode::NOT_FOUND => Error::NotFound(url),
        StatusCode::UNPROCESSABLE_ENTITY => match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) if !parsed.errors.is_empty() => Error::Rejected(parsed.errors),
            _ => Error::Status {
                status: status.as_u16(),
                body,
            },
        },
        _ => Error::Status {
            status: status.as_u16(),
            body,
        },
    })
}

/// Parse a tracker base URL so that relative endpoint paths join beneath it
fn parse_base_url(url: &str) -> Result<Url> {
    let mut parsed = Url::parse(url)?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Parse(format!(
            "Unsupported URL scheme '{}': {}",
            parsed.scheme(),
            url
        )));
    }

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("https://redmine.example.com").unwrap();
        assert_eq!(url.as_str(), "https://redmine.example.com/");
    }

    #[test]
    fn test_sub_path_is_kept_for_endpoints() {
        let client = RedmineClient::new(
            "https://example.com/redmine",
            "key",
            &ClientOptions::default(),
        )
        .unwrap();
        let url = client.endpoint("issues/42.json").unwrap();
        assert_eq!(url.as_str(), "https://example.com/redmine/issues/42.json");
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(matches!(parse_base_url("not a url"), Err(Error::Url(_))));
        assert!(matches!(parse_base_url("ftp://example.com"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_invalid_api_key_characters() {
        let result = RedmineClient::new(
            "https://redmine.example.com",
            "bad\nkey",
            &ClientOptions::default(),
        );
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[test]
    fn test_options_from_tracker_config() {
        let config = TrackerConfig {
            timeout: Duration::from_secs(5),
            verify_certificates: true,
            ..Default::default()
        };
        let options = ClientOptions::from(&config);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(options.verify_certificates);
    }

    #[test]
    fn test_debug_hides_key() {
        let client = RedmineClient::new(
            "https://redmine.example.com",
            "secret-key",
            &ClientOptions::default(),
        )
        .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("redmine.example.com"));
    }
}
