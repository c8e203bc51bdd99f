//! Represents an object (blob) stored in a container.

use crate::{errors::Result, models::container::Container};
use bytes::Bytes;
use std::fmt;

/// A handle to a stored object, optionally carrying its payload.
///
/// The payload is present when the handle came from a store or a get, or
/// after `load(true)`. Listings produce handles without one.
#[derive(Clone)]
pub struct Object {
    name: String,
    /// Used only to address the object; never modified through it.
    container: Container,
    pub(crate) data: Option<Bytes>,
}

impl Object {
    /// Build a handle for an object that already exists remotely.
    pub fn new(container: &Container, name: impl Into<String>, data: Option<Bytes>) -> Self {
        Self {
            name: name.into(),
            container: container.clone(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// `accountURL/container/name`.
    pub fn url(&self) -> Result<String> {
        self.container
            .storage
            .resource_url(&[self.container.name(), self.name.as_str()])
    }

    /// Payload cached on this handle, without touching the network.
    pub fn cached_data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("container", &self.container.name())
            .field("cached_bytes", &self.data.as_ref().map(Bytes::len))
            .finish()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
