//! Error taxonomy shared by the session and every resource client.
//!
//! Errors are `Clone` because a single authentication exchange may be awaited
//! by several callers at once, and each of them receives its own copy of the
//! outcome.

use crate::transport::Response;
use std::{error::Error as StdError, sync::Arc};
use thiserror::Error;

/// Underlying cause of a failure, shareable between coalesced waiters.
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The client was built without a usable region or endpoint set.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The identity exchange did not yield a usable token.
    ///
    /// `response` is present when the identity service answered but its
    /// answer could not be used (missing token header, bad body).
    #[error("authentication failed: {reason}")]
    Authentication {
        reason: String,
        response: Option<Box<Response>>,
        #[source]
        cause: Option<Cause>,
    },

    /// The transport failed, or the server answered with a non-success status.
    #[error("request failed: {message}")]
    Transport {
        message: String,
        response: Option<Box<Response>>,
        #[source]
        cause: Option<Cause>,
        /// Server-provided structured detail, when the error body was JSON.
        extended_info: Option<serde_json::Value>,
    },

    /// A resource call was issued before any successful `connect`.
    #[error("not authenticated with object storage; call connect() first")]
    NotAuthenticated,

    /// A header or resource name that cannot be placed on the wire.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Authentication failure that happened before any HTTP exchange.
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
            response: None,
            cause: None,
        }
    }

    /// Authentication failure caused by an unusable identity response.
    pub fn authentication_response(reason: impl Into<String>, response: Response) -> Self {
        Self::Authentication {
            reason: reason.into(),
            response: Some(Box::new(response)),
            cause: None,
        }
    }

    /// Transport failure with no response (connection refused, DNS, ...).
    pub fn transport(
        message: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            response: None,
            cause: Some(Arc::new(cause)),
            extended_info: None,
        }
    }

    /// Wrap a response whose status is not a success.
    pub fn unexpected_status(response: Response) -> Self {
        let extended_info = serde_json::from_slice::<serde_json::Value>(&response.body)
            .ok()
            .filter(|value| value.is_object());
        Self::Transport {
            message: format!("server responded with status {}", response.status),
            response: Some(Box::new(response)),
            cause: None,
            extended_info,
        }
    }

    /// Attach an underlying cause to an authentication or transport error.
    pub fn with_cause(mut self, err: impl StdError + Send + Sync + 'static) -> Self {
        match &mut self {
            Self::Authentication { cause, .. } | Self::Transport { cause, .. } => {
                *cause = Some(Arc::new(err));
            }
            _ => {}
        }
        self
    }

    /// The HTTP response associated with this failure, if an exchange happened.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Authentication { response, .. } | Self::Transport { response, .. } => {
                response.as_deref()
            }
            _ => None,
        }
    }

    /// Shortcut for the status of [`Error::response`].
    pub fn status(&self) -> Option<http::StatusCode> {
        self.response().map(|resp| resp.status)
    }

    /// True when the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(http::StatusCode::NOT_FOUND)
    }
}
