use reqwest::{Method, RequestBuilder, Response, StatusCode};
use scholarstream_core::config::ApiSettings;
use scholarstream_core::ClientError;
use scholarstream_security::SessionStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// HTTP adapter bound to the REST API base address.
///
/// The public variant never attaches credentials. The authenticated variant
/// waits for the session to resolve, then attaches the identity token as a
/// bearer token when an identity is present.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
    session: Option<SessionStore>,
}

impl HttpClient {
    pub fn public(settings: &ApiSettings) -> Result<Self, ClientError> {
        Self::build(settings, None)
    }

    pub fn authenticated(settings: &ApiSettings, session: SessionStore) -> Result<Self, ClientError> {
        Self::build(settings, Some(session))
    }

    fn build(settings: &ApiSettings, session: Option<SessionStore>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::network(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            session,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `segments` under the base address. Segments are
    /// percent-encoded, so an email can be used as a path segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::network(format!("base URL '{}' cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        let mut request = self.client.request(Method::GET, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request).await
    }

    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        self.send(self.client.request(Method::POST, url).json(body)).await
    }

    pub async fn patch<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        self.send(self.client.request(Method::PATCH, url).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        self.send(self.client.request(Method::DELETE, url)).await
    }

    async fn send<T: DeserializeOwned>(&self, mut request: RequestBuilder) -> Result<T, ClientError> {
        if let Some(session) = &self.session {
            // Never fire a secured request before the token is known.
            if let Some(identity) = session.resolved().await {
                request = request.bearer_auth(&identity.id_token);
            }
        }
        let response = request.send().await.map_err(transport_error)?;
        debug!(status = %response.status(), url = %response.url(), "Response");
        read_json(response).await
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    if err.is_decode() {
        return ClientError::Decode(err.to_string());
    }
    ClientError::Network {
        message: err.to_string(),
        timeout: err.is_timeout(),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::api(status.as_u16(), error_message(status, &body)));
    }
    let bytes = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Human-readable message for a rejected request: the body's `message` or
/// `error` field, else the raw body, else the status reason.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(body) {
        for key in ["message", "error"] {
            if let Some(text) = fields.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') && !trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}
