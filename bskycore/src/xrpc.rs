use crate::net::{HttpClient, HttpRequest, HttpResponse};
use bskyproto::atproto::XrpcErrorBody;
use log::trace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

pub const ATPROTO_PROXY_HEADER: &str = "Atproto-Proxy";

/// Credentials of an XRPC session. Field names match the session lexicon so
/// the struct persists in the same shape the server returns it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    pub access_jwt: String,
    pub refresh_jwt: String,
    pub handle: String,
    pub did: String,
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("access_jwt", &"<redacted>")
            .field("refresh_jwt", &"<redacted>")
            .field("handle", &self.handle)
            .field("did", &self.did)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum XrpcError {
    #[error("{nsid} request failed: {source}")]
    Transport {
        nsid: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{nsid} failed with HTTP {status}: {error}{}", detail_suffix(.message))]
    Server {
        nsid: String,
        status: u16,
        error: String,
        message: Option<String>,
    },
    #[error("failed to encode {nsid} input: {source}")]
    Encode {
        nsid: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode {nsid} response: {source}")]
    Decode {
        nsid: String,
        #[source]
        source: serde_json::Error,
    },
}

fn detail_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" ({m})"))
        .unwrap_or_default()
}

impl XrpcError {
    pub fn status(&self) -> Option<u16> {
        match self {
            XrpcError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A minimal XRPC client. Clones share host and auth; [`XrpcClient::scoped`]
/// shares only auth, so a proxied client can follow the same session while
/// its host is updated explicitly.
#[derive(Clone)]
pub struct XrpcClient {
    http: Arc<dyn HttpClient>,
    host: Arc<RwLock<String>>,
    auth: Arc<RwLock<Option<AuthInfo>>>,
    user_agent: String,
    headers: HashMap<String, String>,
}

impl fmt::Debug for XrpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XrpcClient")
            .field("host", &self.host())
            .field("user_agent", &self.user_agent)
            .field("headers", &self.headers)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl XrpcClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        host: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            http,
            host: Arc::new(RwLock::new(host.into())),
            auth: Arc::new(RwLock::new(None)),
            user_agent: user_agent.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_auth(self, auth: AuthInfo) -> Self {
        self.set_auth(Some(auth));
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// A client sharing this one's auth but owning its host, with an extra header.
    pub fn scoped(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            host: Arc::new(RwLock::new(self.host())),
            auth: self.auth.clone(),
            user_agent: self.user_agent.clone(),
            headers: self.headers.clone(),
        }
        .with_header(key, value)
    }

    /// A fully detached copy authenticated with `auth`.
    pub fn detached(&self, auth: Option<AuthInfo>) -> Self {
        Self {
            http: self.http.clone(),
            host: Arc::new(RwLock::new(self.host())),
            auth: Arc::new(RwLock::new(auth)),
            user_agent: self.user_agent.clone(),
            headers: self.headers.clone(),
        }
    }

    pub fn http(&self) -> &Arc<dyn HttpClient> {
        &self.http
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn host(&self) -> String {
        self.host
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_host(&self, host: impl Into<String>) {
        *self.host.write().unwrap_or_else(PoisonError::into_inner) = host.into();
    }

    pub fn auth(&self) -> Option<AuthInfo> {
        self.auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_auth(&self, auth: Option<AuthInfo>) {
        *self.auth.write().unwrap_or_else(PoisonError::into_inner) = auth;
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn endpoint(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.host().trim_end_matches('/'), nsid)
    }

    fn prepare(&self, request: HttpRequest) -> HttpRequest {
        let mut request = request
            .with_header("User-Agent", self.user_agent.clone())
            .with_headers(&self.headers);
        if let Some(auth) = self.auth() {
            request = request.with_header("Authorization", format!("Bearer {}", auth.access_jwt));
        }
        request
    }

    async fn send(&self, nsid: &str, request: HttpRequest) -> Result<HttpResponse, XrpcError> {
        trace!(target: "Xrpc", "--> {} {}", request.method, request.url);
        let response = self
            .http
            .execute(self.prepare(request))
            .await
            .map_err(|e| XrpcError::Transport {
                nsid: nsid.to_string(),
                source: e.into(),
            })?;
        trace!(target: "Xrpc", "<-- {} HTTP {}", nsid, response.status_code);

        if !response.is_success() {
            let body: XrpcErrorBody = serde_json::from_slice(&response.body).unwrap_or_else(|_| {
                XrpcErrorBody {
                    error: "Unknown".to_string(),
                    message: Some(response.body_text()).filter(|s| !s.is_empty()),
                }
            });
            return Err(XrpcError::Server {
                nsid: nsid.to_string(),
                status: response.status_code,
                error: body.error,
                message: body.message,
            });
        }
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(nsid: &str, response: &HttpResponse) -> Result<T, XrpcError> {
        serde_json::from_slice(&response.body).map_err(|source| XrpcError::Decode {
            nsid: nsid.to_string(),
            source,
        })
    }

    /// Performs a GET query. Parameters with empty values are omitted.
    pub async fn query<T: DeserializeOwned>(
        &self,
        nsid: &str,
        params: &[(&str, String)],
    ) -> Result<T, XrpcError> {
        let mut url = self.endpoint(nsid);
        let query: Vec<String> = params
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        let response = self.send(nsid, HttpRequest::get(url)).await?;
        Self::decode(nsid, &response)
    }

    async fn post<I: Serialize>(
        &self,
        nsid: &str,
        input: Option<&I>,
    ) -> Result<HttpResponse, XrpcError> {
        let mut request = HttpRequest::post(self.endpoint(nsid));
        if let Some(input) = input {
            let body = serde_json::to_vec(input).map_err(|source| XrpcError::Encode {
                nsid: nsid.to_string(),
                source,
            })?;
            request = request
                .with_header("Content-Type", "application/json")
                .with_body(body);
        }
        self.send(nsid, request).await
    }

    /// Performs a POST procedure and decodes its JSON output.
    pub async fn procedure<I: Serialize, O: DeserializeOwned>(
        &self,
        nsid: &str,
        input: Option<&I>,
    ) -> Result<O, XrpcError> {
        let response = self.post(nsid, input).await?;
        Self::decode(nsid, &response)
    }

    /// Performs a POST procedure whose output is ignored.
    pub async fn procedure_unit<I: Serialize>(
        &self,
        nsid: &str,
        input: Option<&I>,
    ) -> Result<(), XrpcError> {
        self.post(nsid, input).await.map(|_| ())
    }
}
