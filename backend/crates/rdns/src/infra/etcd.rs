//! etcd v2 Key-Value Store
//!
//! [`KeyValueStore`] over the etcd v2 keys HTTP API:
//! `GET|PUT|DELETE {endpoint}/v2/keys{path}`.
//!
//! Endpoints are tried in order; a transport failure (connect error,
//! timeout) moves on to the next one. Any HTTP answer, including an etcd
//! error document, is final.

use platform::config::{env_or, env_parse_or, split_list};
use reqwest::{Client, Method};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::repository::{
    DeleteOptions, GetOptions, KeyValueStore, Node, PrevExist, SetOptions, StoreError,
    StoreResult,
};
use crate::error::{RdnsError, RdnsResult};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:2379";
const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// etcd connection configuration
#[derive(Debug, Clone)]
pub struct EtcdConfig {
    /// Client URLs, tried in order
    pub endpoints: Vec<String>,
    /// Per-request timeout, the only timeout the core applies
    pub request_timeout: Duration,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl EtcdConfig {
    /// Read `RDNS_ETCD_ENDPOINTS` (comma separated) and `RDNS_ETCD_TIMEOUT_MS`
    pub fn from_env() -> RdnsResult<Self> {
        let endpoints = split_list(&env_or("RDNS_ETCD_ENDPOINTS", DEFAULT_ENDPOINT));
        if endpoints.is_empty() {
            return Err(RdnsError::InvalidConfig(
                "RDNS_ETCD_ENDPOINTS is empty".to_string(),
            ));
        }
        let timeout_ms = env_parse_or("RDNS_ETCD_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)
            .map_err(|e| RdnsError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            endpoints,
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// etcd v2 client
#[derive(Debug, Clone)]
pub struct EtcdStore {
    client: Client,
    endpoints: Vec<String>,
}

impl EtcdStore {
    pub fn new(config: EtcdConfig) -> RdnsResult<Self> {
        if config.endpoints.is_empty() {
            return Err(RdnsError::InvalidConfig(
                "at least one etcd endpoint is required".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RdnsError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoints: config
                .endpoints
                .into_iter()
                .map(|e| e.trim_end_matches('/').to_string())
                .collect(),
        })
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        form: &[(&str, String)],
    ) -> StoreResult<Node> {
        let mut last_error = String::from("no endpoint configured");

        for endpoint in &self.endpoints {
            let url = keys_url(endpoint, path);
            let mut request = self.client.request(method.clone(), &url).query(query);
            if !form.is_empty() {
                request = request.form(form);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                    return parse_response(status, &body);
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "etcd endpoint unreachable");
                    last_error = e.to_string();
                }
            }
        }

        Err(StoreError::Unavailable(last_error))
    }
}

impl KeyValueStore for EtcdStore {
    async fn get(&self, path: &str, opts: GetOptions) -> StoreResult<Node> {
        self.call(Method::GET, path, &get_query(opts), &[]).await
    }

    async fn set(&self, path: &str, value: &str, opts: SetOptions) -> StoreResult<Node> {
        match self.call(Method::PUT, path, &[], &set_form(value, opts)).await {
            // etcd answers an update of a missing key with "key not found"
            Err(StoreError::KeyNotFound(key)) if opts.prev_exist == PrevExist::Exist => {
                Err(StoreError::PreconditionFailed(key))
            }
            other => other,
        }
    }

    async fn delete(&self, path: &str, opts: DeleteOptions) -> StoreResult<Node> {
        self.call(Method::DELETE, path, &delete_query(opts), &[]).await
    }
}

fn keys_url(endpoint: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{endpoint}/v2/keys{path}")
    } else {
        format!("{endpoint}/v2/keys/{path}")
    }
}

fn get_query(opts: GetOptions) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if opts.recursive {
        query.push(("recursive", "true".to_string()));
    }
    if opts.sorted {
        query.push(("sorted", "true".to_string()));
    }
    query
}

fn set_form(value: &str, opts: SetOptions) -> Vec<(&'static str, String)> {
    let mut form = Vec::new();
    if opts.dir {
        form.push(("dir", "true".to_string()));
    } else {
        form.push(("value", value.to_string()));
    }
    if let Some(ttl) = opts.ttl {
        form.push(("ttl", ttl.as_secs().to_string()));
    }
    if opts.prev_exist == PrevExist::Exist {
        form.push(("prevExist", "true".to_string()));
    }
    form
}

fn delete_query(opts: DeleteOptions) -> Vec<(&'static str, String)> {
    if opts.recursive {
        vec![
            ("dir", "true".to_string()),
            ("recursive", "true".to_string()),
        ]
    } else {
        Vec::new()
    }
}

#[derive(Debug, Deserialize)]
struct NodeResponse {
    node: Node,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "errorCode")]
    error_code: u32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: String,
}

/// Decode an etcd answer into a node or a [`StoreError`]
fn parse_response(status: u16, body: &str) -> StoreResult<Node> {
    if (200..300).contains(&status) {
        return serde_json::from_str::<NodeResponse>(body)
            .map(|r| r.node)
            .map_err(|e| StoreError::Protocol(format!("undecodable node: {e}")));
    }

    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => Err(map_error_code(err)),
        Err(_) if status >= 500 => Err(StoreError::Unavailable(format!("HTTP {status}"))),
        Err(_) => Err(StoreError::Protocol(format!("HTTP {status}: {body}"))),
    }
}

fn map_error_code(err: ErrorResponse) -> StoreError {
    let ErrorResponse {
        error_code,
        message,
        cause,
    } = err;
    match error_code {
        100 => StoreError::KeyNotFound(cause),
        101 => StoreError::PreconditionFailed(cause),
        102 | 107 | 108 => StoreError::NotAFile(cause),
        104 => StoreError::NotADir(cause),
        105 => StoreError::NodeExists(cause),
        300..=302 => StoreError::Unavailable(format!("{message} ({cause})")),
        code => StoreError::Protocol(format!("etcd error {code}: {message} ({cause})")),
    }
}
