//! Deployment regions and the endpoints they resolve to.

use crate::errors::{Error, Result};
use std::{fmt, str::FromStr};

/// Keystone v3 token endpoint shared by both regions.
pub const IDENTITY_URL: &str = "https://identity.open.softlayer.com/v3/auth/tokens";

const DALLAS_ACCOUNT_URL_PREFIX: &str = "https://dal.objectstorage.open.softlayer.com/v1/AUTH_";
const LONDON_ACCOUNT_URL_PREFIX: &str = "https://lon.objectstorage.open.softlayer.com/v1/AUTH_";

/// Supported object storage regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Dallas,
    London,
}

impl Region {
    pub fn endpoints(self) -> Endpoints {
        let prefix = match self {
            Region::Dallas => DALLAS_ACCOUNT_URL_PREFIX,
            Region::London => LONDON_ACCOUNT_URL_PREFIX,
        };
        Endpoints {
            identity_url: IDENTITY_URL.to_string(),
            account_url_prefix: prefix.to_string(),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Dallas => f.write_str("dallas"),
            Region::London => f.write_str("london"),
        }
    }
}

impl FromStr for Region {
    type Err = Error;

    /// Case-insensitive; accepts the city names and the platform region ids.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dallas" | "dal" | "us-south" => Ok(Region::Dallas),
            "london" | "lon" | "eu-gb" => Ok(Region::London),
            other => Err(Error::Configuration(format!(
                "region `{other}` is not supported (expected dallas or london)"
            ))),
        }
    }
}

/// Where to authenticate and where account URLs live.
///
/// Normally derived from a [`Region`]; built directly to target a private
/// deployment or a local test server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Full URL of the token endpoint (`.../v3/auth/tokens`).
    pub identity_url: String,
    /// Account URL minus the project ID, e.g. `https://host/v1/AUTH_`.
    pub account_url_prefix: String,
}

impl Endpoints {
    pub fn new(identity_url: impl Into<String>, account_url_prefix: impl Into<String>) -> Self {
        Self {
            identity_url: identity_url.into(),
            account_url_prefix: account_url_prefix.into(),
        }
    }

    /// Account URL for a project: the prefix with the percent-encoded
    /// project ID appended.
    pub fn account_url(&self, project_id: &str) -> String {
        format!(
            "{}{}",
            self.account_url_prefix,
            urlencoding::encode(project_id)
        )
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (what, url) in [
            ("identity URL", &self.identity_url),
            ("account URL prefix", &self.account_url_prefix),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::Configuration(format!(
                    "{what} `{url}` must be an http(s) URL"
                )));
            }
        }
        Ok(())
    }
}
