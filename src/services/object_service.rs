//! Object-scoped operations: loading payloads, deletion and object metadata.

use crate::{
    errors::Result,
    models::{metadata::Metadata, object::Object},
};
use bytes::Bytes;
use http::{HeaderMap, Method};
use tracing::{debug, error};

impl Object {
    /// Download the payload. With `should_cache` the bytes also replace the
    /// handle's cached payload; otherwise the cache is left as it was.
    pub async fn load(&mut self, should_cache: bool) -> Result<Bytes> {
        debug!("loading object {}", self.name());
        let response = self
            .container()
            .storage
            .send(
                Method::GET,
                &[self.container().name(), self.name()],
                HeaderMap::new(),
                Bytes::new(),
            )
            .await
            .inspect_err(|err| error!("failed to load object {}: {}", self.name(), err))?;

        let data = response.body;
        if should_cache {
            self.data = Some(data.clone());
        }
        debug!("loaded object {} ({} bytes)", self.name(), data.len());
        Ok(data)
    }

    /// Delete this object from the container it was obtained from.
    pub async fn delete(&self) -> Result<()> {
        self.container().delete_object(self.name()).await
    }

    /// Every header of a HEAD on the object.
    pub async fn metadata(&self) -> Result<Metadata> {
        self.container()
            .storage
            .fetch_metadata(&[self.container().name(), self.name()])
            .await
    }

    /// POST each entry as a header; keys need the `X-Object-Meta-` prefix.
    pub async fn update_metadata<I, K, V>(&self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.container()
            .storage
            .post_metadata(&[self.container().name(), self.name()], updates)
            .await
    }
}
