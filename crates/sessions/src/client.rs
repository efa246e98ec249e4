//! HTTP client for the remote session service: open, ping and delete.

use {
    reqwest::{Client, StatusCode},
    tether_config::SessionConfig,
    tracing::{debug, trace, warn},
    url::Url,
};

use crate::{
    error::{Result, SessionError},
    id::SessionId,
};

/// Client for a session service rooted at a base URL.
///
/// Cloning is cheap and clones share the underlying connection pool, so
/// concurrent calls can be issued from any number of tasks.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: Client,
    base: Url,
}

impl SessionClient {
    /// Create a client with a default `reqwest::Client`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_http_client(Client::new(), base_url)
    }

    /// Create a client on top of an existing `reqwest::Client`.
    pub fn with_http_client(http: Client, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| SessionError::InvalidBaseUrl {
            url: base_url.into(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(SessionError::InvalidBaseUrl {
                url: base_url.into(),
                reason: "URL cannot carry path segments".into(),
            });
        }
        Ok(Self { http, base })
    }

    /// Build a client from config: base URL, request timeout and user agent.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("tether/{}", env!("CARGO_PKG_VERSION")));
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(user_agent)
            .build()?;
        Self::with_http_client(http, &config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Open a new session and return the identifier issued by the server.
    pub async fn open_session(&self) -> Result<SessionId> {
        let body = self.fetch_new_session().await?;
        let id = decode_identifier(body)?.ok_or(SessionError::NotFound)?;
        debug!(session = %id, "opened session");
        Ok(id)
    }

    /// Like [`open_session`](Self::open_session), but a 2xx response that
    /// carries no usable identifier (empty, `null` or malformed body) is
    /// reported as `None` instead of an error. A 404 is still `NotFound`.
    pub async fn open_session_lenient(&self) -> Result<Option<SessionId>> {
        let body = self.fetch_new_session().await?;
        match decode_identifier(body) {
            Ok(Some(id)) => {
                debug!(session = %id, "opened session");
                Ok(Some(id))
            },
            Ok(None) => {
                warn!("session service issued no identifier");
                Ok(None)
            },
            Err(SessionError::MalformedIdentifier { body, source }) => {
                warn!(error = %source, body = %body, "ignoring malformed session identifier");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    async fn fetch_new_session(&self) -> Result<String> {
        let url = self.new_session_url()?;
        trace!(url = %url, "opening session");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SessionError::NotFound);
        }
        if !status.is_success() {
            return Err(SessionError::Status {
                operation: "open session",
                status,
            });
        }
        Ok(response.text().await?)
    }

    /// Signal that the session is still alive. Fails on any non-2xx status.
    pub async fn ping_session(&self, id: SessionId) -> Result<()> {
        let url = self.ping_url(id)?;
        trace!(session = %id, "pinging session");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::UnsuccessfulPing { status });
        }
        debug!(session = %id, "pinged session");
        Ok(())
    }

    /// Delete the session. The response body is never read and a non-success
    /// status is not treated as an error.
    pub async fn delete_session(&self, id: SessionId) -> Result<()> {
        let url = self.delete_url(id)?;
        trace!(session = %id, "deleting session");

        let response = self.http.delete(url).send().await?;
        let status = response.status();
        drop(response);
        if status.is_success() {
            debug!(session = %id, "deleted session");
        } else {
            debug!(session = %id, status = %status, "session delete not acknowledged");
        }
        Ok(())
    }

    pub(crate) fn new_session_url(&self) -> Result<Url> {
        self.with_segment("new")
    }

    pub(crate) fn ping_url(&self, id: SessionId) -> Result<Url> {
        let mut url = self.with_segment("ping")?;
        url.query_pairs_mut().append_pair("uuid", &id.to_string());
        Ok(url)
    }

    pub(crate) fn delete_url(&self, id: SessionId) -> Result<Url> {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("session", &id.to_string());
        Ok(url)
    }

    fn with_segment(&self, segment: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| SessionError::InvalidBaseUrl {
                url: self.base.to_string(),
                reason: "URL cannot carry path segments".into(),
            })?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }
}

/// Decode an open response body. Empty bodies and JSON `null` mean no session
/// was issued.
fn decode_identifier(body: String) -> Result<Option<SessionId>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<SessionId>>(&body)
        .map_err(|source| SessionError::MalformedIdentifier { body, source })
}
