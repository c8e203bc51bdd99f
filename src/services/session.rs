//! Session manager: Keystone v3 password authentication, token expiry
//! tracking and transparent reauthentication.
//!
//! Every resource operation goes through [`Session::ensure_fresh_token`]
//! before it builds its request. Refreshes are single-flight: concurrent
//! callers that find the token expired all await the same exchange.

use crate::{
    config::Endpoints,
    errors::{Error, Result},
    transport::{self, HttpTransport},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use http::header;
use parking_lot::Mutex;
use std::{fmt, sync::Arc};
use tracing::{debug, error, warn};

/// Response header carrying the issued token.
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Request header carrying the token on resource calls.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Password credentials scoped to a single project.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub project_id: String,
    pub user_id: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            user_id: user_id.into(),
            password: password.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.user_id.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A bearer token together with the instant it stops being valid.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    /// A token is expired once `now` is no longer strictly before its expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.value.get(..4).unwrap_or("");
        f.debug_struct("AuthToken")
            .field("value", &format_args!("{shown}***"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where the session sits in its authentication lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
}

/// A token together with the account URL it was issued for.
#[derive(Debug, Clone)]
pub(crate) struct Grant {
    pub(crate) token: AuthToken,
    pub(crate) account_url: String,
}

type SharedAuth = Shared<BoxFuture<'static, Result<Grant>>>;

struct InFlight {
    generation: u64,
    exchange: SharedAuth,
}

#[derive(Default)]
struct SessionState {
    credentials: Option<Credentials>,
    token: Option<AuthToken>,
    account_url: Option<String>,
    /// Bumped by every `connect`; exchanges started under an older
    /// generation may not write their result back.
    generation: u64,
    in_flight: Option<InFlight>,
}

/// Authentication state for one identity, shared by every resource handle.
pub struct Session {
    endpoints: Endpoints,
    transport: Arc<dyn HttpTransport>,
    state: Mutex<SessionState>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoints", &self.endpoints)
            .field("status", &self.status())
            .finish()
    }
}

impl Session {
    pub fn new(endpoints: Endpoints, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoints,
            transport,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub(crate) fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    /// Account URL derived by the last successful authentication.
    pub fn account_url(&self) -> Result<String> {
        self.state
            .lock()
            .account_url
            .clone()
            .ok_or(Error::NotAuthenticated)
    }

    /// Snapshot of the current token, if any.
    pub fn token(&self) -> Option<AuthToken> {
        self.state.lock().token.clone()
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.state.lock();
        if state
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.generation == state.generation)
        {
            return SessionStatus::Authenticating;
        }
        match &state.token {
            None => SessionStatus::Unauthenticated,
            Some(token) if token.is_expired() => SessionStatus::Expired,
            Some(_) => SessionStatus::Authenticated,
        }
    }

    /// Store `credentials` and authenticate with them.
    ///
    /// Always performs an exchange, superseding any refresh still in flight.
    /// On failure the previously stored token and account URL are kept.
    pub async fn connect(self: &Arc<Self>, credentials: Credentials) -> Result<String> {
        if !credentials.is_complete() {
            debug!("authentication failed because the user ID or password was empty");
            return Err(Error::authentication("user ID and password cannot be empty"));
        }

        let exchange = {
            let mut state = self.state.lock();
            state.credentials = Some(credentials.clone());
            state.generation += 1;
            self.start_exchange(&mut state, credentials)
        };

        exchange.await.map(|grant| grant.token.value)
    }

    /// Return a valid token, reauthenticating with the stored credentials when
    /// there is none or it has expired.
    pub async fn ensure_fresh_token(self: &Arc<Self>) -> Result<String> {
        self.fresh_grant().await.map(|grant| grant.token.value)
    }

    /// Like [`ensure_fresh_token`](Self::ensure_fresh_token), but the account
    /// URL comes from the same authentication as the token.
    pub(crate) async fn fresh_grant(self: &Arc<Self>) -> Result<Grant> {
        let exchange = {
            let mut state = self.state.lock();

            if let (Some(token), Some(account_url)) = (&state.token, &state.account_url) {
                if !token.is_expired() {
                    return Ok(Grant {
                        token: token.clone(),
                        account_url: account_url.clone(),
                    });
                }
            }

            let joinable = state
                .in_flight
                .as_ref()
                .filter(|flight| flight.generation == state.generation)
                .map(|flight| flight.exchange.clone());

            match joinable {
                Some(exchange) => {
                    debug!("joining authentication already in flight");
                    exchange
                }
                None => {
                    let credentials = state.credentials.clone().ok_or(Error::NotAuthenticated)?;
                    debug!("token missing or expired, reauthenticating");
                    self.start_exchange(&mut state, credentials)
                }
            }
        };

        exchange.await
    }

    fn start_exchange(
        self: &Arc<Self>,
        state: &mut SessionState,
        credentials: Credentials,
    ) -> SharedAuth {
        let generation = state.generation;
        let session = Arc::clone(self);
        let exchange = async move { session.authenticate(generation, credentials).await }
            .boxed()
            .shared();
        state.in_flight = Some(InFlight {
            generation,
            exchange: exchange.clone(),
        });
        exchange
    }

    async fn authenticate(&self, generation: u64, credentials: Credentials) -> Result<Grant> {
        let result = self.exchange(&credentials).await.map(|token| Grant {
            token,
            account_url: self.endpoints.account_url(&credentials.project_id),
        });

        let mut state = self.state.lock();
        if state
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.generation == generation)
        {
            state.in_flight = None;
        }

        match &result {
            Ok(grant) if state.generation == generation => {
                state.token = Some(grant.token.clone());
                state.account_url = Some(grant.account_url.clone());
                debug!("authenticated, token expires at {}", grant.token.expires_at);
            }
            Ok(_) => debug!("discarding token from superseded authentication"),
            Err(err) => error!("failed to authenticate with object storage: {}", err),
        }

        result
    }

    /// One POST to the identity endpoint, parsed into a token.
    async fn exchange(&self, credentials: &Credentials) -> Result<AuthToken> {
        let body = serde_json::to_vec(&keystone_v3::AuthRequest::password(credentials))
            .map_err(|e| Error::authentication("failed to serialize auth request").with_cause(e))?;

        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri(&self.endpoints.identity_url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Bytes::from(body))
            .map_err(|e| Error::Configuration(format!("invalid identity URL: {e}")))?;

        debug!(
            "authenticating with {} as user {}",
            self.endpoints.identity_url, credentials.user_id
        );
        let response = transport::execute(self.transport(), req).await?;

        let Some(value) = response.header(SUBJECT_TOKEN_HEADER).map(str::to_string) else {
            warn!("identity response is missing the {} header", SUBJECT_TOKEN_HEADER);
            return Err(Error::authentication_response(
                "identity response missing X-Subject-Token header",
                response,
            ));
        };

        let parsed: keystone_v3::TokenResponse = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(Error::authentication_response(
                    "identity response body is not a valid token document",
                    response,
                )
                .with_cause(e));
            }
        };

        let Some(raw_expiry) = parsed.token.and_then(|t| t.expires_at) else {
            return Err(Error::authentication_response(
                "identity response missing token.expires_at",
                response,
            ));
        };

        let expires_at = match parse_expiry(&raw_expiry) {
            Ok(expires_at) => expires_at,
            Err(e) => {
                return Err(Error::authentication_response(
                    format!("failed to parse token expiry `{raw_expiry}`"),
                    response,
                )
                .with_cause(e));
            }
        };

        Ok(AuthToken { value, expires_at })
    }
}

/// Parse an ISO-8601 UTC timestamp such as `2024-01-01T00:00:00Z`.
///
/// Keystone usually adds microseconds (`...00.000000Z`); both forms parse.
pub fn parse_expiry(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw.trim()).map(|dt| dt.with_timezone(&Utc))
}

/// Keystone v3 request/response documents.
pub(crate) mod keystone_v3 {
    use super::Credentials;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    pub(crate) struct AuthRequest<'a> {
        pub(crate) auth: Auth<'a>,
    }

    #[derive(Serialize)]
    pub(crate) struct Auth<'a> {
        pub(crate) identity: Identity<'a>,
        pub(crate) scope: Scope<'a>,
    }

    #[derive(Serialize)]
    pub(crate) struct Identity<'a> {
        pub(crate) methods: [&'static str; 1],
        pub(crate) password: Password<'a>,
    }

    #[derive(Serialize)]
    pub(crate) struct Password<'a> {
        pub(crate) user: User<'a>,
    }

    #[derive(Serialize)]
    pub(crate) struct User<'a> {
        pub(crate) id: &'a str,
        pub(crate) password: &'a str,
    }

    #[derive(Serialize)]
    pub(crate) struct Scope<'a> {
        pub(crate) project: Project<'a>,
    }

    #[derive(Serialize)]
    pub(crate) struct Project<'a> {
        pub(crate) id: &'a str,
    }

    impl<'a> AuthRequest<'a> {
        pub(crate) fn password(credentials: &'a Credentials) -> Self {
            Self {
                auth: Auth {
                    identity: Identity {
                        methods: ["password"],
                        password: Password {
                            user: User {
                                id: &credentials.user_id,
                                password: &credentials.password,
                            },
                        },
                    },
                    scope: Scope {
                        project: Project {
                            id: &credentials.project_id,
                        },
                    },
                },
            }
        }
    }

    /// Only the expiry is read; everything else in the document is ignored.
    #[derive(Deserialize)]
    pub(crate) struct TokenResponse {
        pub(crate) token: Option<TokenBody>,
    }

    #[derive(Deserialize)]
    pub(crate) struct TokenBody {
        pub(crate) expires_at: Option<String>,
    }
}
