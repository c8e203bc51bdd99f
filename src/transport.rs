//! HTTP transport seam.
//!
//! The session and resource clients only need "send this request, give me the
//! response". [`HttpTransport`] is that contract; [`ReqwestTransport`] is the
//! default implementation. Tests swap in their own.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use reqwest::Client;
use std::collections::HashMap;
use tracing::debug;

/// A completed HTTP exchange, fully buffered.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// First value of the named header, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Header map grouped as `name -> ordered values`.
    ///
    /// Names are lowercase, as normalised by the `http` crate. Values that are
    /// not valid UTF-8 are skipped.
    pub fn header_map(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in self.headers.iter() {
            if let Ok(value) = value.to_str() {
                map.entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
        map
    }
}

impl From<http::Response<Bytes>> for Response {
    fn from(resp: http::Response<Bytes>) -> Self {
        let (parts, body) = resp.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

/// Sends a fully-built request and returns the raw response.
///
/// Implementations report any status code as `Ok`; mapping non-success
/// statuses to errors is done by [`execute`].
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Default, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Use a preconfigured client (timeouts, proxies, user agent).
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = reqwest::Request::try_from(req)
            .map_err(|e| Error::transport("failed to convert request", e))?;

        let resp = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::transport("failed to send HTTP request", e))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::transport("failed to collect response body", e))?;

        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Send `req` and turn non-success statuses into [`Error::Transport`].
pub(crate) async fn execute(
    transport: &dyn HttpTransport,
    req: http::Request<Bytes>,
) -> Result<Response> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = Response::from(transport.send(req).await?);
    debug!("{} {} -> {}", method, uri, response.status);

    if response.status.is_success() {
        Ok(response)
    } else {
        Err(Error::unexpected_status(response))
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    #[tokio::test]
    async fn execute_passes_success_through() {
        let transport = MockTransport::new();
        transport.reply(204, &[("X-Trans-Id", "tx1")], "");

        let req = http::Request::builder()
            .method(http::Method::HEAD)
            .uri("https://swift.example.com/v1/AUTH_p")
            .body(Bytes::new())
            .unwrap();
        let resp = execute(&transport, req).await.unwrap();

        assert_eq!(resp.status, StatusCode::NO_CONTENT);
        assert_eq!(resp.header("x-trans-id"), Some("tx1"));
    }

    #[tokio::test]
    async fn execute_maps_error_status_to_transport_error() {
        let transport = MockTransport::new();
        transport.reply(404, &[], "Not Found");

        let req = http::Request::builder()
            .uri("https://swift.example.com/v1/AUTH_p/missing")
            .body(Bytes::new())
            .unwrap();
        let err = execute(&transport, req).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.response().unwrap().text(), "Not Found");
    }

    #[test]
    fn header_map_groups_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append("x-account-meta-color", "blue".parse().unwrap());
        headers.append("x-account-meta-color", "green".parse().unwrap());
        headers.insert("x-account-container-count", "2".parse().unwrap());
        let resp = Response {
            status: StatusCode::NO_CONTENT,
            headers,
            body: Bytes::new(),
        };

        let map = resp.header_map();
        assert_eq!(map["x-account-meta-color"], vec!["blue", "green"]);
        assert_eq!(map["x-account-container-count"], vec!["2"]);
    }
}
