//! Represents a container, the account-level namespace for objects.

use crate::{errors::Result, services::storage_service::ObjectStorage};
use std::fmt;

/// A handle to a container in the authenticated account.
///
/// Obtained from [`ObjectStorage::create_container`], [`ObjectStorage::get_container`],
/// a listing, or built directly with [`Container::new`]. Deleting the remote
/// container leaves existing handles usable as names; operations on them
/// simply fail with the server's status.
#[derive(Clone)]
pub struct Container {
    pub(crate) storage: ObjectStorage,
    name: String,
}

impl Container {
    pub fn new(storage: &ObjectStorage, name: impl Into<String>) -> Self {
        Self {
            storage: storage.clone(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `accountURL/name`. Fails with `NotAuthenticated` before the first
    /// successful connect.
    pub fn url(&self) -> Result<String> {
        self.storage.resource_url(&[self.name.as_str()])
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container").field("name", &self.name).finish()
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
