//! Container-scoped operations: storing, fetching, listing and deleting
//! objects, and container metadata.

use crate::{
    errors::Result,
    models::{container::Container, metadata::Metadata, object::Object},
    services::storage_service::parse_listing,
};
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, header};
use tracing::{debug, error, warn};

impl Container {
    /// Upload `data` as `name`, replacing any existing object.
    ///
    /// The returned handle carries the same bytes as its cached payload.
    pub async fn store_object(&self, name: &str, data: impl Into<Bytes>) -> Result<Object> {
        let data: Bytes = data.into();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(data.len()));

        let response = self
            .storage
            .send(Method::PUT, &[self.name(), name], headers, data.clone())
            .await
            .inspect_err(|err| error!("failed to store object {}: {}", name, err))?;

        // Swift answers with the MD5 of what it wrote.
        if let Some(etag) = response.header(header::ETAG.as_str()) {
            let expected = format!("{:x}", md5::compute(&data));
            if !etag.trim_matches('"').eq_ignore_ascii_case(&expected) {
                warn!(
                    "etag mismatch storing {}/{}: server {} local {}",
                    self.name(),
                    name,
                    etag,
                    expected
                );
            }
        }

        debug!("stored object {} ({} bytes)", name, data.len());
        Ok(Object::new(self, name, Some(data)))
    }

    /// Download `name`; the body becomes the handle's payload.
    pub async fn get_object(&self, name: &str) -> Result<Object> {
        let response = self
            .storage
            .send(Method::GET, &[self.name(), name], HeaderMap::new(), Bytes::new())
            .await
            .inspect_err(|err| error!("failed to retrieve object {}: {}", name, err))?;
        debug!("retrieved object {}", name);
        Ok(Object::new(self, name, Some(response.body)))
    }

    /// Objects in this container, in listing order, without payloads.
    pub async fn list_objects(&self) -> Result<Vec<Object>> {
        let response = self
            .storage
            .send(Method::GET, &[self.name()], HeaderMap::new(), Bytes::new())
            .await
            .inspect_err(|err| {
                error!("failed to retrieve object list for container {}: {}", self.name(), err)
            })?;

        let objects: Vec<Object> = parse_listing(&response)
            .into_iter()
            .map(|name| Object::new(self, name, None))
            .collect();
        debug!("listed {} objects in {}", objects.len(), self.name());
        Ok(objects)
    }

    pub async fn delete_object(&self, name: &str) -> Result<()> {
        self.storage
            .send(Method::DELETE, &[self.name(), name], HeaderMap::new(), Bytes::new())
            .await
            .inspect_err(|err| error!("failed to delete object {}: {}", name, err))?;
        debug!("deleted object {}", name);
        Ok(())
    }

    /// Delete this container through the account client.
    pub async fn delete(&self) -> Result<()> {
        self.storage.delete_container(self.name()).await
    }

    /// Every header of a HEAD on the container.
    pub async fn metadata(&self) -> Result<Metadata> {
        self.storage.fetch_metadata(&[self.name()]).await
    }

    /// POST each entry as a header; keys need the `X-Container-Meta-` prefix.
    pub async fn update_metadata<I, K, V>(&self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.storage.post_metadata(&[self.name()], updates).await
    }
}
