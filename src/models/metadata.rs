//! Metadata carried in HTTP headers.
//!
//! Swift stores user metadata as headers with a per-resource prefix
//! (`X-Account-Meta-*`, `X-Container-Meta-*`, `X-Object-Meta-*`). Reads return
//! the whole header map; updates send names exactly as given, so callers add
//! the prefix themselves.

use crate::errors::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::{BTreeMap, HashMap};

pub const ACCOUNT_METADATA_PREFIX: &str = "X-Account-Meta-";
pub const CONTAINER_METADATA_PREFIX: &str = "X-Container-Meta-";
pub const OBJECT_METADATA_PREFIX: &str = "X-Object-Meta-";

/// Response headers as `lowercase name -> ordered values`.
pub type Metadata = HashMap<String, Vec<String>>;

/// Entries whose name starts with `prefix` (case-insensitive), keyed by the
/// remainder of the name. Only the first value of each header is kept.
pub fn filter_prefixed(metadata: &Metadata, prefix: &str) -> BTreeMap<String, String> {
    let prefix = prefix.to_ascii_lowercase();
    metadata
        .iter()
        .filter_map(|(name, values)| {
            let key = name.to_ascii_lowercase().strip_prefix(&prefix)?.to_string();
            let value = values.first()?.clone();
            Some((key, value))
        })
        .collect()
}

/// Turn update entries into request headers, rejecting anything that is not
/// a legal header name or value.
pub(crate) fn to_headers<I, K, V>(updates: I) -> Result<HeaderMap>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in updates {
        let name = name.as_ref();
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidRequest(format!("`{name}` is not a valid header name")))?;
        let header_value = HeaderValue::from_str(value.as_ref()).map_err(|_| {
            Error::InvalidRequest(format!("value for `{name}` is not a valid header value"))
        })?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}
