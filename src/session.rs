//! Session manager: the single owner of "who is logged in".
//!
//! State moves between `Unauthenticated`, `Authenticating` and
//! `Authenticated`. Every committed transition bumps a generation counter; an
//! operation remembers the generation it started at and only applies a
//! *failure* if nothing else committed in the meantime. A successful login
//! always applies, so the last login to succeed wins and a superseded failure
//! never clobbers it. Bootstrap and refresh only revalidate the session they
//! started from: their success is dropped if a logout or login landed first.
//!
//! The credential store is only written while the state lock is held, so the
//! stored token and the session record never disagree. No lock is held across
//! a network call, and listeners run after the lock is released.

use crate::client::{decode, ApiClient, Credential, SESSION_EXPIRED};
use crate::error::ApiError;
use crate::models::{TokenResponse, User};
use crate::transport::HttpRequest;
use parking_lot::Mutex;
use std::sync::Arc;

pub const TOKEN_PATH: &str = "/token";
pub const ME_PATH: &str = "/api/users/me";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
        }
    }
}

/// Snapshot of the authentication state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub status: SessionStatus,
    pub token: Option<String>,
    pub user: Option<User>,
    pub last_error: Option<String>,
}

impl Session {
    pub fn loading(&self) -> bool {
        self.status == SessionStatus::Authenticating
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated && self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(User),
    Refreshed(User),
    SignedOut,
    /// The backend rejected the stored token
    Invalidated,
}

type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

struct Inner {
    session: Session,
    generation: u64,
}

pub struct SessionManager {
    api: Arc<ApiClient>,
    inner: Mutex<Inner>,
    listeners: Mutex<Vec<Listener>>,
}

impl SessionManager {
    /// Create a manager and hook it into the request layer's 401 reaction
    pub fn new(api: Arc<ApiClient>) -> Arc<Self> {
        let manager = Arc::new(Self {
            api,
            inner: Mutex::new(Inner {
                session: Session::default(),
                generation: 0,
            }),
            listeners: Mutex::new(Vec::new()),
        });

        let weak = Arc::downgrade(&manager);
        manager.api.on_unauthorized(move || {
            if let Some(manager) = weak.upgrade() {
                manager.invalidate();
            }
        });
        manager
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.listeners.lock().push(Arc::new(listener));
    }

    /// Detach listeners and the 401 hook. The stored credential is kept.
    pub fn teardown(&self) {
        self.listeners.lock().clear();
        self.api.clear_unauthorized_hooks();
    }

    pub fn current_snapshot(&self) -> Session {
        self.inner.lock().session.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.lock().session.is_admin()
    }

    /// Validate a persisted token, if there is one
    pub fn bootstrap(&self) -> Result<Option<User>, ApiError> {
        let Some(token) = self.api.store().load() else {
            tracing::info!("no stored credential");
            let mut inner = self.inner.lock();
            inner.session.status = SessionStatus::Unauthenticated;
            return Ok(None);
        };

        let started = self.begin(Some(&token));
        match self.fetch_me(Credential::Stored) {
            Ok(user) => {
                if !self.commit_success(&token, user.clone(), Some(started)) {
                    return Err(superseded());
                }
                self.emit(&SessionEvent::SignedIn(user.clone()));
                Ok(Some(user))
            }
            Err(err) => {
                self.commit_failure(started, &err);
                Err(err)
            }
        }
    }

    /// Exchange credentials for a token, then load the user behind it
    pub fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::validation("Username is required"));
        }
        if password.is_empty() {
            return Err(ApiError::validation("Password is required"));
        }

        let started = self.begin(None);
        tracing::info!(username, "logging in");

        let result = self.request_token(username, password).and_then(|token| {
            // The new token is only persisted once it has been validated
            let user = self.fetch_me(Credential::Explicit(token.clone()))?;
            Ok((token, user))
        });

        match result {
            Ok((token, user)) => {
                self.commit_success(&token, user.clone(), None);
                self.emit(&SessionEvent::SignedIn(user.clone()));
                Ok(user)
            }
            Err(err) => {
                tracing::warn!(username, error = %err, "login failed");
                self.commit_failure(started, &err);
                Err(err)
            }
        }
    }

    /// Reload the current user without re-entering credentials
    pub fn refresh(&self) -> Result<User, ApiError> {
        let Some(token) = self.api.store().load() else {
            self.logout();
            return Err(ApiError::Auth {
                message: SESSION_EXPIRED.to_string(),
                status: 401,
            });
        };

        let started = self.begin(Some(&token));
        match self.fetch_me(Credential::Stored) {
            Ok(user) => {
                if !self.commit_success(&token, user.clone(), Some(started)) {
                    return Err(superseded());
                }
                self.emit(&SessionEvent::Refreshed(user.clone()));
                Ok(user)
            }
            Err(err) => {
                self.commit_failure(started, &err);
                Err(err)
            }
        }
    }

    pub fn logout(&self) {
        let had_user = {
            let mut inner = self.inner.lock();
            self.api.store().clear();
            let had_user = inner.session.user.is_some();
            inner.session = Session::default();
            inner.generation += 1;
            had_user
        };
        if had_user {
            tracing::info!("logged out");
        }
        self.emit(&SessionEvent::SignedOut);
    }

    /// Called by the request layer after it cleared a rejected token
    fn invalidate(&self) {
        {
            let mut inner = self.inner.lock();
            inner.session = Session {
                last_error: Some(SESSION_EXPIRED.to_string()),
                ..Session::default()
            };
            inner.generation += 1;
        }
        tracing::info!("session invalidated");
        self.emit(&SessionEvent::Invalidated);
    }

    fn request_token(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let request =
            HttpRequest::post(TOKEN_PATH).form(&[("username", username), ("password", password)]);
        let response = self.api.send_with(request, Credential::Anonymous)?;
        let body: TokenResponse = decode(&response)?;
        match body.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ApiError::Server {
                message: "Login failed: no access token returned".to_string(),
                status: response.status,
            }),
        }
    }

    fn fetch_me(&self, credential: Credential) -> Result<User, ApiError> {
        let response = self.api.send_with(HttpRequest::get(ME_PATH), credential)?;
        decode(&response)
    }

    /// Enter `Authenticating`; returns the generation the operation started at
    fn begin(&self, token: Option<&str>) -> u64 {
        let mut inner = self.inner.lock();
        inner.session.status = SessionStatus::Authenticating;
        inner.session.last_error = None;
        if inner.session.token.is_none() {
            inner.session.token = token.map(String::from);
        }
        inner.generation
    }

    /// Install an authenticated session. `revalidating` carries the generation
    /// a bootstrap or refresh started at; such a commit is skipped (and returns
    /// false) when another transition landed first. A fresh login passes `None`,
    /// always applies and persists its token.
    fn commit_success(&self, token: &str, user: User, revalidating: Option<u64>) -> bool {
        let mut inner = self.inner.lock();
        if let Some(started) = revalidating {
            if inner.generation != started {
                tracing::debug!(username = %user.username, "ignoring success from a superseded revalidation");
                return false;
            }
        } else if let Err(e) = self.api.store().save(token) {
            tracing::warn!(error = %e, "could not persist credential; session lasts for this process only");
        }
        tracing::info!(
            username = %user.username,
            admin = user.is_admin,
            "session established"
        );
        inner.session = Session {
            status: SessionStatus::Authenticated,
            token: Some(token.to_string()),
            user: Some(user),
            last_error: None,
        };
        inner.generation += 1;
        true
    }

    fn commit_failure(&self, started: u64, err: &ApiError) {
        let dropped_user = {
            let mut inner = self.inner.lock();
            if inner.generation != started {
                tracing::debug!(error = %err, "ignoring failure from a superseded operation");
                return;
            }

            if err.is_network() {
                // Unreachable backend says nothing about the credential
                let session = &mut inner.session;
                session.status = if session.user.is_some() {
                    SessionStatus::Authenticated
                } else {
                    SessionStatus::Unauthenticated
                };
                session.last_error = Some(err.user_message());
                inner.generation += 1;
                return;
            }

            self.api.store().clear();
            let dropped_user = inner.session.user.is_some();
            inner.session = Session {
                last_error: Some(err.user_message()),
                ..Session::default()
            };
            inner.generation += 1;
            dropped_user
        };
        if dropped_user {
            self.emit(&SessionEvent::SignedOut);
        }
    }

    fn emit(&self, event: &SessionEvent) {
        let listeners: Vec<Listener> = self.listeners.lock().clone();
        for listener in listeners {
            listener(event);
        }
    }
}

/// Error for a revalidation that lost to a logout or a newer login
fn superseded() -> ApiError {
    ApiError::Auth {
        message: SESSION_EXPIRED.to_string(),
        status: 401,
    }
}
