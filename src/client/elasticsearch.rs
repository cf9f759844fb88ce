//! Elasticsearch client module
//!
//! Provides `ElasticClient` for making API requests to Elasticsearch, and the
//! [`DocumentStore`] implementation the pagination engine runs against.
//! Authentication headers are baked in at construction, so every request
//! carries them without further plumbing.

use super::Auth;
use crate::elastic::{DocumentStore, ElasticError, SearchResponse};
use base64::Engine;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// First release with the point-in-time API.
const FIRST_PIT_RELEASE: (u64, u64, u64) = (7, 10, 0);

/// Elasticsearch client for making API requests.
///
/// # Example
/// ```no_run
/// use elastic_index_tailer::client::{Auth, ElasticClient};
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("http://localhost:9200")?;
/// let client = ElasticClient::try_new(url, Auth::None)?;
///
/// let info = client.info().await?;
/// println!("{} ({})", info.cluster_name, info.version.number);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ElasticClient {
    client: Client,
    url: Url,
}

impl ElasticClient {
    /// Create a new ElasticClient from a URL and Auth.
    ///
    /// # Errors
    /// Returns a configuration error if the credentials cannot be encoded
    /// into headers or the HTTP client cannot be built.
    pub fn try_new(url: Url, auth: Auth) -> Result<Self, ElasticError> {
        let mut headers = reqwest::header::HeaderMap::new();
        match auth {
            Auth::Basic(username, password) => {
                let credentials = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    format!("Basic {}", credentials)
                        .parse()
                        .map_err(|_| bad_credentials())?,
                );
            }
            Auth::Apikey(apikey) => {
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    format!("ApiKey {}", apikey)
                        .parse()
                        .map_err(|_| bad_credentials())?,
                );
            }
            Auth::None => {}
        }
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ElasticError::Config(format!("could not build HTTP client: {}", e)))?;

        Ok(Self { client, url })
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch cluster name and version from the root endpoint.
    ///
    /// Doubles as the connectivity and credentials check: any auth problem
    /// surfaces here before a longer extraction starts.
    pub async fn info(&self) -> Result<ClusterInfo, ElasticError> {
        let response = self
            .request(Method::GET, "/")?
            .send()
            .await
            .map_err(ElasticError::transport)?;
        let body = read_json(response).await?;

        serde_json::from_value(body).map_err(|e| {
            ElasticError::UnexpectedResponse(format!("malformed cluster info: {}", e))
        })
    }

    /// List index names starting with `prefix`, sorted. An empty prefix
    /// lists everything.
    pub async fn cat_indices(&self, prefix: &str) -> Result<Vec<String>, ElasticError> {
        let response = self
            .request(Method::GET, "/_cat/indices")?
            .query(&[("format", "json"), ("h", "index")])
            .send()
            .await
            .map_err(ElasticError::transport)?;
        let body = read_json(response).await?;

        let rows: Vec<CatIndexRow> = serde_json::from_value(body).map_err(|e| {
            ElasticError::UnexpectedResponse(format!("malformed index listing: {}", e))
        })?;

        let mut indices: Vec<String> = rows
            .into_iter()
            .map(|row| row.index)
            .filter(|name| name.starts_with(prefix))
            .collect();
        indices.sort();
        Ok(indices)
    }

    /// Force a refresh of `index` so recent writes become searchable.
    pub async fn refresh(&self, index: &str) -> Result<(), ElasticError> {
        let path = format!("/{}/_refresh", index);
        let response = self
            .request(Method::POST, &path)?
            .send()
            .await
            .map_err(ElasticError::transport)?;
        read_json(response).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ElasticError> {
        let url = self
            .url
            .join(path)
            .map_err(|e| ElasticError::Config(format!("invalid request path '{}': {}", path, e)))?;
        Ok(self.client.request(method, url))
    }
}

impl DocumentStore for ElasticClient {
    async fn open_point_in_time(
        &self,
        index: &str,
        keep_alive_seconds: u64,
    ) -> Result<String, ElasticError> {
        let path = format!("/{}/_pit", index);
        let response = self
            .request(Method::POST, &path)?
            .query(&[("keep_alive", format!("{}s", keep_alive_seconds))])
            .send()
            .await
            .map_err(ElasticError::transport)?;
        let body = read_json(response).await?;

        body.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ElasticError::UnexpectedResponse("point in time response carries no id".into())
            })
    }

    async fn search(&self, body: &Value) -> Result<SearchResponse, ElasticError> {
        let response = self
            .request(Method::POST, "/_search")?
            .json(body)
            .send()
            .await
            .map_err(ElasticError::transport)?;
        let value = read_json(response).await?;

        serde_json::from_value(value).map_err(|e| {
            ElasticError::UnexpectedResponse(format!("malformed search response: {}", e))
        })
    }

    async fn close_point_in_time(&self, pit_id: &str) -> Result<(), ElasticError> {
        let response = self
            .request(Method::DELETE, "/_pit")?
            .json(&json!({"id": pit_id}))
            .send()
            .await
            .map_err(ElasticError::transport)?;

        // A point in time the cluster no longer knows comes back 404, which
        // is the outcome closing wanted anyway.
        let status = response.status();
        match status.is_success() || status == StatusCode::NOT_FOUND {
            true => Ok(()),
            false => {
                let body = response.text().await.unwrap_or_default();
                Err(classify_error(status.as_u16(), &body))
            }
        }
    }
}

impl std::fmt::Display for ElasticClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Cluster identity from the root endpoint, reduced to what the CLI reports.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub version: ClusterVersion,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterVersion {
    pub number: String,
}

impl ClusterInfo {
    /// Whether this cluster has the point-in-time API. Unparseable version
    /// strings count as unsupported so the warning fires rather than a
    /// confusing 400 later.
    pub fn supports_point_in_time(&self) -> bool {
        let (major, minor, patch) = FIRST_PIT_RELEASE;
        match semver::Version::parse(&self.version.number) {
            Ok(version) => version >= semver::Version::new(major, minor, patch),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatIndexRow {
    index: String,
}

fn bad_credentials() -> ElasticError {
    ElasticError::Config("credentials contain characters not allowed in headers".into())
}

/// Check the status and parse the body, classifying failures into the error
/// taxonomy the engine acts on.
async fn read_json(response: reqwest::Response) -> Result<Value, ElasticError> {
    let status = response.status();
    match status.is_success() {
        true => response.json().await.map_err(|e| {
            ElasticError::UnexpectedResponse(format!("malformed response body: {}", e))
        }),
        false => {
            let body = response.text().await.unwrap_or_default();
            Err(classify_error(status.as_u16(), &body))
        }
    }
}

/// Map an Elasticsearch error response onto the taxonomy. Expired or
/// already-released point-in-time contexts surface as distinct exception
/// types inside the error body; everything else is a plain API error.
fn classify_error(status: u16, body: &str) -> ElasticError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|value| value.get("error"));

    match error {
        Some(error) => {
            let reason = error
                .get("reason")
                .and_then(Value::as_str)
                .or_else(|| error.get("type").and_then(Value::as_str))
                .unwrap_or("no reason given")
                .to_string();
            match error_types(error).iter().any(|t| is_session_error_type(t)) {
                true => ElasticError::SessionExpired { reason },
                false => ElasticError::Api { status, reason },
            }
        }
        None => ElasticError::Api {
            status,
            reason: match body.is_empty() {
                true => "empty response body".to_string(),
                false => body.chars().take(200).collect(),
            },
        },
    }
}

fn is_session_error_type(error_type: &str) -> bool {
    matches!(
        error_type,
        "search_context_missing_exception" | "resource_not_found_exception"
    )
}

/// Collect the exception types of an error body: the top-level type, the
/// root causes, and the nested cause. The session-expiry type can appear at
/// any of these levels depending on which node rejected the request.
fn error_types(error: &Value) -> Vec<&str> {
    let mut types = Vec::new();
    if let Some(t) = error.get("type").and_then(Value::as_str) {
        types.push(t);
    }
    if let Some(causes) = error.get("root_cause").and_then(Value::as_array) {
        types.extend(
            causes
                .iter()
                .filter_map(|cause| cause.get("type").and_then(Value::as_str)),
        );
    }
    if let Some(t) = error
        .get("caused_by")
        .and_then(|cause| cause.get("type"))
        .and_then(Value::as_str)
    {
        types.push(t);
    }
    types
}
