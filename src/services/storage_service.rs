//! src/services/storage_service.rs
//!
//! ObjectStorage: the account-level client. Owns the shared [`Session`] and
//! the one request path every resource operation uses:
//! check for an account URL, ensure a fresh token, attach `X-Auth-Token`,
//! send, and map non-success statuses to errors.

use crate::{
    config::{Endpoints, Region},
    errors::{Error, Result},
    models::{
        container::Container,
        metadata::{self, Metadata},
    },
    services::session::{AUTH_TOKEN_HEADER, Credentials, Session, SessionStatus},
    transport::{self, HttpTransport, ReqwestTransport, Response},
};
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method};
use std::sync::Arc;
use tracing::{debug, error};

/// Client for one object storage account.
///
/// Cheap to clone; clones share the same session, so a token obtained
/// through one handle is used by all of them.
#[derive(Clone, Debug)]
pub struct ObjectStorage {
    session: Arc<Session>,
}

/// Builder for [`ObjectStorage`] when the defaults of
/// [`ObjectStorage::initialize`] are not enough.
#[derive(Default)]
pub struct ObjectStorageBuilder {
    region: Option<Region>,
    endpoints: Option<Endpoints>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ObjectStorageBuilder {
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Explicit endpoints; take precedence over `region`.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn transport(mut self, transport: impl HttpTransport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<ObjectStorage> {
        let endpoints = match (self.endpoints, self.region) {
            (Some(endpoints), _) => endpoints,
            (None, Some(region)) => region.endpoints(),
            (None, None) => {
                return Err(Error::Configuration(
                    "a region or explicit endpoints must be set before use".into(),
                ));
            }
        };
        endpoints.validate()?;

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::default()));

        Ok(ObjectStorage {
            session: Arc::new(Session::new(endpoints, transport)),
        })
    }
}

impl ObjectStorage {
    /// Client for `region` using the default `reqwest` transport.
    /// No network traffic happens until [`connect`](Self::connect).
    pub fn initialize(region: Region) -> Self {
        Self {
            session: Arc::new(Session::new(
                region.endpoints(),
                Arc::new(ReqwestTransport::default()),
            )),
        }
    }

    pub fn builder() -> ObjectStorageBuilder {
        ObjectStorageBuilder::default()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Authenticate and remember the credentials for later refreshes.
    /// Returns the bearer token.
    pub async fn connect(
        &self,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<String> {
        self.session
            .connect(Credentials::new(project_id, user_id, password))
            .await
    }

    pub async fn ensure_fresh_token(&self) -> Result<String> {
        self.session.ensure_fresh_token().await
    }

    /// Create `name`, or succeed quietly if it already exists.
    pub async fn create_container(&self, name: &str) -> Result<Container> {
        self.send(Method::PUT, &[name], HeaderMap::new(), Bytes::new())
            .await
            .inspect_err(|err| error!("failed to create container {}: {}", name, err))?;
        debug!("created container {}", name);
        Ok(Container::new(self, name))
    }

    /// Probe for `name`; a missing container surfaces as a 404 transport error.
    pub async fn get_container(&self, name: &str) -> Result<Container> {
        self.send(Method::GET, &[name], HeaderMap::new(), Bytes::new())
            .await
            .inspect_err(|err| error!("failed to retrieve container {}: {}", name, err))?;
        Ok(Container::new(self, name))
    }

    /// All containers of the account, in the order the server lists them.
    pub async fn list_containers(&self) -> Result<Vec<Container>> {
        let response = self
            .send(Method::GET, &[], HeaderMap::new(), Bytes::new())
            .await
            .inspect_err(|err| error!("failed to list containers: {}", err))?;

        let containers: Vec<Container> = parse_listing(&response)
            .into_iter()
            .map(|name| Container::new(self, name))
            .collect();
        debug!("listed {} containers", containers.len());
        Ok(containers)
    }

    /// Delete `name`. The server refuses non-empty or missing containers.
    pub async fn delete_container(&self, name: &str) -> Result<()> {
        self.send(Method::DELETE, &[name], HeaderMap::new(), Bytes::new())
            .await
            .inspect_err(|err| error!("failed to delete container {}: {}", name, err))?;
        debug!("deleted container {}", name);
        Ok(())
    }

    /// Every header of a HEAD on the account; filter with
    /// [`metadata::filter_prefixed`] and [`metadata::ACCOUNT_METADATA_PREFIX`].
    pub async fn account_metadata(&self) -> Result<Metadata> {
        self.fetch_metadata(&[]).await
    }

    /// POST each entry as a header. Names are sent unmodified, so account
    /// metadata keys need the `X-Account-Meta-` prefix.
    pub async fn update_account_metadata<I, K, V>(&self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.post_metadata(&[], updates).await
    }

    pub(crate) async fn fetch_metadata(&self, path: &[&str]) -> Result<Metadata> {
        let response = self
            .send(Method::HEAD, path, HeaderMap::new(), Bytes::new())
            .await
            .inspect_err(|err| {
                error!("failed to retrieve metadata for /{}: {}", path.join("/"), err)
            })?;
        debug!("retrieved metadata for /{}", path.join("/"));
        Ok(response.header_map())
    }

    pub(crate) async fn post_metadata<I, K, V>(&self, path: &[&str], updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let headers = metadata::to_headers(updates)?;
        self.send(Method::POST, path, headers, Bytes::new())
            .await
            .inspect_err(|err| {
                error!("failed to update metadata for /{}: {}", path.join("/"), err)
            })?;
        debug!("updated metadata for /{}", path.join("/"));
        Ok(())
    }

    /// URL of a resource below the account: `accountURL/seg1/seg2...`.
    pub(crate) fn resource_url(&self, path: &[&str]) -> Result<String> {
        Ok(join_path(self.session.account_url()?, path))
    }

    /// Gate every resource request goes through.
    ///
    /// A failed reauthentication aborts the request; no further retries.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &[&str],
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response> {
        if self.session.account_url().is_err() {
            error!("not yet authenticated with object storage; call connect() first");
            return Err(Error::NotAuthenticated);
        }

        let grant = self.session.fresh_grant().await.inspect_err(|_| {
            error!("could not authenticate with object storage; call connect() to do so")
        })?;

        // Token and account URL come from the same authentication.
        let url = join_path(grant.account_url, path);

        let mut token_value = HeaderValue::from_str(&grant.token.value)
            .map_err(|_| Error::authentication("token is not a valid header value"))?;
        token_value.set_sensitive(true);

        let mut req = http::Request::builder()
            .method(method)
            .uri(&url)
            .body(body)
            .map_err(|e| Error::InvalidRequest(format!("cannot build request for {url}: {e}")))?;
        req.headers_mut().extend(headers);
        req.headers_mut().insert(AUTH_TOKEN_HEADER, token_value);

        transport::execute(self.session.transport(), req).await
    }
}

fn join_path(mut url: String, path: &[&str]) -> String {
    for segment in path {
        url.push('/');
        url.push_str(&urlencoding::encode(segment));
    }
    url
}

/// Names from a plain-text listing, one per line, blank lines skipped.
///
/// Names are kept byte-for-byte apart from the line terminator; invalid
/// UTF-8 is replaced rather than dropping the whole listing.
pub(crate) fn parse_listing(response: &Response) -> Vec<String> {
    response
        .text()
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
