//! Client for OpenStack Swift object storage behind Keystone v3 authentication.
//!
//! ## Structure
//! - [`ObjectStorage`]: account-level client; owns the [`Session`]
//!   - `connect`, `create_container`, `get_container`, `list_containers`,
//!     `delete_container`, `account_metadata`, `update_account_metadata`
//! - [`Container`]: `store_object`, `get_object`, `list_objects`,
//!   `delete_object`, `delete`, `metadata`, `update_metadata`
//! - [`Object`]: `load`, `delete`, `metadata`, `update_metadata`,
//!   `cached_data`
//!
//! Every network operation first checks the session token and
//! reauthenticates with the stored credentials when it has expired.
//!
//! ```no_run
//! use object_storage::{ObjectStorage, Region};
//!
//! # async fn run() -> object_storage::Result<()> {
//! let storage = ObjectStorage::initialize(Region::Dallas);
//! storage.connect("project-id", "user-id", "password").await?;
//!
//! let photos = storage.create_container("photos").await?;
//! photos.store_object("cat.jpg", vec![0u8; 16]).await?;
//! for object in photos.list_objects().await? {
//!     println!("{}", object.name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod listener;
pub mod models;
pub mod services;
pub mod transport;

pub use config::{Endpoints, Region};
pub use errors::{Error, Result};
pub use listener::{ResponseListener, callbacks, dispatch};
pub use models::{
    container::Container,
    metadata::{
        ACCOUNT_METADATA_PREFIX, CONTAINER_METADATA_PREFIX, Metadata, OBJECT_METADATA_PREFIX,
        filter_prefixed,
    },
    object::Object,
};
pub use services::{
    session::{AuthToken, Credentials, Session, SessionStatus},
    storage_service::{ObjectStorage, ObjectStorageBuilder},
};
pub use transport::{HttpTransport, ReqwestTransport, Response};
