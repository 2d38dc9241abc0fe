// API client module: a small blocking HTTP client that talks to the
// logserver. Every call is a single request/response exchange; there is no
// retry and no connection reuse across invocations.

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Url;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any non-200 answer. Reason and body are surfaced verbatim.
    #[error("{status} {reason}: {body}")]
    Server {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("server issued a malformed token: {0}")]
    MalformedToken(String),

    #[error("stored token for user '{0}' cannot be sent in an Authorization header")]
    UnusableToken(String),

    #[error("invalid server address '{0}'")]
    InvalidAddress(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The three exchanges the client performs against a logserver.
///
/// `ApiClient` is the real implementation; tests inject fakes.
pub trait LogService {
    /// `GET /adduser?name={user}` without auth. Returns the new token.
    fn enroll(&self, user: &str) -> ApiResult<String>;

    /// `GET /{user}?entries={entries}` with bearer auth. `0` means all.
    fn fetch_logs(&self, user: &str, token: &str, entries: u64) -> ApiResult<Vec<u8>>;

    /// `POST /{user}` with bearer auth and the raw log text as body.
    fn submit_logs(&self, user: &str, token: &str, body: Vec<u8>) -> ApiResult<()>;
}

impl<T: LogService + ?Sized> LogService for &T {
    fn enroll(&self, user: &str) -> ApiResult<String> {
        (**self).enroll(user)
    }

    fn fetch_logs(&self, user: &str, token: &str, entries: u64) -> ApiResult<Vec<u8>> {
        (**self).fetch_logs(user, token, entries)
    }

    fn submit_logs(&self, user: &str, token: &str, body: Vec<u8>) -> ApiResult<()> {
        (**self).submit_logs(user, token, body)
    }
}

/// Where a logserver lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub plain_http: bool,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, plain_http: bool) -> Self {
        Self {
            host: host.into(),
            port,
            plain_http,
        }
    }

    /// Base URL such as `https://10.0.0.1:1234/` or `http://[::1]:80/`.
    pub fn base_url(&self) -> ApiResult<Url> {
        let scheme = if self.plain_http { "http" } else { "https" };
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let raw = format!("{}://{}:{}/", scheme, host, self.port);
        Url::parse(&raw).map_err(|_| ApiError::InvalidAddress(self.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Blocking logserver client holding a reqwest client and the base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client for `endpoint`; `timeout` applies to connecting and
    /// to the whole exchange.
    pub fn new(endpoint: &Endpoint, timeout: Duration) -> ApiResult<Self> {
        let base_url = endpoint.base_url()?;
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                context: "failed to build HTTP client".into(),
                source,
            })?;
        debug!(%base_url, ?timeout, "api client ready");
        Ok(ApiClient { client, base_url })
    }

    /// `{base}/{user}` with the username percent-encoded as one segment.
    fn user_url(&self, user: &str) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidAddress(self.base_url.to_string()))?
            .pop_if_empty()
            .push(user);
        Ok(url)
    }

    fn bearer(user: &str, token: &str) -> ApiResult<HeaderValue> {
        HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::UnusableToken(user.to_string()))
    }

    /// Turn anything but 200 into `ApiError::Server`.
    fn expect_ok(res: Response) -> ApiResult<Response> {
        let status = res.status();
        if status == reqwest::StatusCode::OK {
            return Ok(res);
        }
        let reason = status.canonical_reason().unwrap_or("").to_string();
        let body = res
            .bytes()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        debug!(status = status.as_u16(), "server rejected request");
        Err(ApiError::Server {
            status: status.as_u16(),
            reason,
            body,
        })
    }

    fn transport(context: &str) -> impl FnOnce(reqwest::Error) -> ApiError + '_ {
        move |source| ApiError::Transport {
            context: context.to_string(),
            source,
        }
    }
}

impl LogService for ApiClient {
    fn enroll(&self, user: &str) -> ApiResult<String> {
        let mut url = self.base_url.join("adduser").map_err(|_| {
            ApiError::InvalidAddress(self.base_url.to_string())
        })?;
        url.query_pairs_mut().append_pair("name", user);
        debug!(%url, "enrolling user");

        let res = self
            .client
            .get(url)
            .send()
            .map_err(Self::transport("failed to send enrollment request"))?;
        let res = Self::expect_ok(res)?;
        let body = res
            .bytes()
            .map_err(Self::transport("failed to read enrollment response"))?;
        parse_token(&body)
    }

    fn fetch_logs(&self, user: &str, token: &str, entries: u64) -> ApiResult<Vec<u8>> {
        let mut url = self.user_url(user)?;
        url.query_pairs_mut()
            .append_pair("entries", &entries.to_string());
        debug!(%url, "fetching logs");

        let res = self
            .client
            .get(url)
            .header(AUTHORIZATION, Self::bearer(user, token)?)
            .send()
            .map_err(Self::transport("failed to send log request"))?;
        let res = Self::expect_ok(res)?;
        let body = res
            .bytes()
            .map_err(Self::transport("failed to read log response"))?;
        Ok(body.to_vec())
    }

    fn submit_logs(&self, user: &str, token: &str, body: Vec<u8>) -> ApiResult<()> {
        let url = self.user_url(user)?;
        debug!(%url, bytes = body.len(), "submitting logs");

        let res = self
            .client
            .post(url)
            .header(AUTHORIZATION, Self::bearer(user, token)?)
            .body(body)
            .send()
            .map_err(Self::transport("failed to send logs"))?;
        Self::expect_ok(res)?;
        Ok(())
    }
}

/// The enrollment body is the token itself, ASCII text.
pub fn parse_token(body: &[u8]) -> ApiResult<String> {
    let text = std::str::from_utf8(body)
        .ok()
        .filter(|s| s.is_ascii())
        .ok_or_else(|| ApiError::MalformedToken("response is not ASCII text".into()))?;
    let token = text.trim_end();
    if token.is_empty() {
        return Err(ApiError::MalformedToken("response body is empty".into()));
    }
    Ok(token.to_string())
}
