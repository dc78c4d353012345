//! Authenticated request layer.
//!
//! Every backend call goes through [`ApiClient::send`]. It attaches the
//! stored bearer token, turns the outcome into an [`ApiError`] exactly once,
//! and owns the one global reaction: a 401 on a token-bearing request clears
//! the credential and fires the unauthorized hooks *before* the error is
//! returned, so callers always observe a logged-out session.

use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Which credential a request carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Token from the credential store, if any. 401 triggers the global reaction.
    Stored,
    /// No token. Used for credential submission; 401 means bad credentials.
    Anonymous,
    /// A specific token not (yet) in the store. 401 is reported but does not
    /// touch the stored credential.
    Explicit(String),
}

type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    hooks: Mutex<Vec<UnauthorizedHook>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            store,
            hooks: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Register a callback run after a stored-credential request gets a 401.
    /// The credential is already cleared when the hook runs.
    pub fn on_unauthorized<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.lock().push(Arc::new(hook));
    }

    pub fn clear_unauthorized_hooks(&self) {
        self.hooks.lock().clear();
    }

    /// Send with the stored credential
    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.send_with(request, Credential::Stored)
    }

    pub fn send_with(
        &self,
        mut request: HttpRequest,
        credential: Credential,
    ) -> Result<HttpResponse, ApiError> {
        let intercept = credential == Credential::Stored;
        let auth_fallback = if credential == Credential::Anonymous {
            INVALID_CREDENTIALS
        } else {
            SESSION_EXPIRED
        };
        request.bearer = match credential {
            Credential::Stored => self.store.load(),
            Credential::Anonymous => None,
            Credential::Explicit(token) => Some(token),
        };

        tracing::debug!(
            method = request.method.as_str(),
            target = %request.target(),
            authenticated = request.bearer.is_some(),
            "api request"
        );

        let response = self.transport.send(&request).map_err(|e| {
            tracing::warn!(target = %request.target(), error = %e, "backend unreachable");
            ApiError::network(e.0)
        })?;

        if response.is_success() {
            tracing::debug!(target = %request.target(), status = response.status, "api response");
            return Ok(response);
        }

        let error = classify(&response, auth_fallback);
        if response.status == 401 && intercept {
            // A rejection of a token that has since been replaced says nothing
            // about the current credential.
            if self.store.load() == request.bearer {
                tracing::warn!(target = %request.target(), "token rejected, clearing session");
                self.store.clear();
                self.fire_unauthorized();
            } else {
                tracing::debug!(target = %request.target(), "ignoring 401 for a replaced token");
            }
        } else {
            tracing::debug!(
                target = %request.target(),
                status = response.status,
                kind = error.kind().as_str(),
                "api error"
            );
        }
        Err(error)
    }

    /// Send with the stored credential and decode the JSON body
    pub fn fetch<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let response = self.send(request)?;
        decode(&response)
    }

    fn fire_unauthorized(&self) {
        // Run hooks without holding the lock so a hook may register or clear hooks
        let hooks: Vec<UnauthorizedHook> = self.hooks.lock().clone();
        for hook in hooks {
            hook();
        }
    }
}

/// Decode a success body, treating malformed JSON as a server fault
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    response.json().map_err(|e| ApiError::Server {
        message: format!("Unexpected response from server: {}", e),
        status: response.status,
    })
}

/// Classify a non-success response
fn classify(response: &HttpResponse, auth_fallback: &str) -> ApiError {
    let detail = extract_detail(&response.body);
    match response.status {
        401 => ApiError::Auth {
            message: detail.unwrap_or_else(|| auth_fallback.to_string()),
            status: 401,
        },
        422 => ApiError::Validation {
            message: detail.unwrap_or_else(|| "Invalid input".to_string()),
            status: Some(422),
        },
        status => ApiError::Server {
            message: detail.unwrap_or_else(|| fallback_message(status)),
            status,
        },
    }
}

/// Pull a human-readable message out of a backend error body.
/// `detail` is either a string or a list of `{loc, msg}` validation entries.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let field = item
                        .get("loc")
                        .and_then(|loc| loc.as_array())
                        .and_then(|loc| loc.last())
                        .and_then(|last| last.as_str());
                    Some(match field {
                        Some(field) => format!("{}: {}", field, msg),
                        None => msg.to_string(),
                    })
                })
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn fallback_message(status: u16) -> String {
    match status {
        403 => "You do not have permission to perform this action".to_string(),
        404 => "Not found".to_string(),
        500..=599 => format!("Server error ({})", status),
        _ => format!("Request failed with status {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::error::ErrorKind;
    use crate::transport::mock::MockTransport;
    use crate::transport::Method;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client_with(mock: Arc<MockTransport>, token: Option<&str>) -> ApiClient {
        let store: Arc<dyn CredentialStore> = match token {
            Some(t) => Arc::new(MemoryCredentialStore::with_token(t)),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        ApiClient::new(mock, store)
    }

    #[test]
    fn test_attaches_stored_token() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, "/api/predictions/history", 200, json!([]));
        let client = client_with(mock.clone(), Some("abc"));

        client.send(HttpRequest::get("/api/predictions/history")).unwrap();
        let sent = mock.last(Method::Get, "/api/predictions/history").unwrap();
        assert_eq!(sent.bearer.as_deref(), Some("abc"));
    }

    #[test]
    fn test_no_token_sends_unauthenticated() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, "/api/predictions/history", 200, json!([]));
        let client = client_with(mock.clone(), None);

        client.send(HttpRequest::get("/api/predictions/history")).unwrap();
        let sent = mock.last(Method::Get, "/api/predictions/history").unwrap();
        assert_eq!(sent.bearer, None);
    }

    #[test]
    fn test_401_clears_store_before_returning() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, "/api/admin/model-versions", 401, json!({ "detail": "Could not validate credentials" }));
        let client = Arc::new(client_with(mock, Some("abc")));

        let observed = Arc::new(Mutex::new(None::<Option<String>>));
        let observed_hook = observed.clone();
        let store = client.store().clone();
        client.on_unauthorized(move || {
            // The store is already empty by the time hooks run
            *observed_hook.lock() = Some(store.load());
        });

        let err = client
            .send(HttpRequest::get("/api/admin/model-versions"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.to_string(), "Could not validate credentials");
        assert_eq!(client.store().load(), None);
        assert_eq!(*observed.lock(), Some(None));
    }

    #[test]
    fn test_401_without_detail_uses_session_expired() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, "/api/users/", 401, json!({}));
        let client = client_with(mock, Some("abc"));
        let err = client.send(HttpRequest::get("/api/users/")).unwrap_err();
        assert_eq!(err.to_string(), SESSION_EXPIRED);
    }

    #[test]
    fn test_anonymous_401_does_not_fire_hooks() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Post, "/token", 401, json!({}));
        let client = client_with(mock.clone(), Some("existing"));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        client.on_unauthorized(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let err = client
            .send_with(
                HttpRequest::post("/token").form(&[("username", "doctor1"), ("password", "wrong")]),
                Credential::Anonymous,
            )
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.to_string(), INVALID_CREDENTIALS);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(client.store().load(), Some("existing".to_string()));
        assert_eq!(mock.last(Method::Post, "/token").unwrap().bearer, None);
    }

    #[test]
    fn test_explicit_token_401_leaves_store_alone() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, "/api/users/me", 401, json!({}));
        let client = client_with(mock.clone(), Some("stored"));

        let err = client
            .send_with(
                HttpRequest::get("/api/users/me"),
                Credential::Explicit("fresh".to_string()),
            )
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(client.store().load(), Some("stored".to_string()));
        assert_eq!(
            mock.last(Method::Get, "/api/users/me").unwrap().bearer.as_deref(),
            Some("fresh")
        );
    }

    #[test]
    fn test_other_statuses_pass_through() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Post, "/api/admin/model-versions/9/activate", 404, json!({ "detail": "Model version not found" }));
        mock.on(Method::Get, "/api/users/", 403, json!({}));
        mock.on(Method::Get, "/api/predictions/history", 500, json!("boom"));
        let client = client_with(mock, Some("abc"));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        client.on_unauthorized(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let err = client
            .send(HttpRequest::post("/api/admin/model-versions/9/activate"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "Model version not found");

        let err = client.send(HttpRequest::get("/api/users/")).unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        assert!(err.to_string().contains("permission"));

        let err = client
            .send(HttpRequest::get("/api/predictions/history"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Server error (500)");

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(client.store().load(), Some("abc".to_string()));
    }

    #[test]
    fn test_network_failure_keeps_token() {
        let mock = Arc::new(MockTransport::new());
        mock.on_unreachable(Method::Get, "/api/users/me");
        let client = client_with(mock, Some("abc"));

        let err = client.send(HttpRequest::get("/api/users/me")).unwrap_err();
        assert!(err.is_network());
        assert_eq!(client.store().load(), Some("abc".to_string()));
    }

    #[test]
    fn test_validation_detail_array() {
        let body = json!({
            "detail": [
                { "loc": ["body", "email"], "msg": "value is not a valid email address", "type": "value_error" },
                { "loc": ["body"], "msg": "field required" }
            ]
        })
        .to_string();
        let err = classify(&HttpResponse { status: 422, body }, SESSION_EXPIRED);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status_code(), Some(422));
        assert_eq!(
            err.to_string(),
            "email: value is not a valid email address; body: field required"
        );
    }

    #[test]
    fn test_extract_detail_shapes() {
        assert_eq!(extract_detail("not json"), None);
        assert_eq!(extract_detail(r#"{"detail": null}"#), None);
        assert_eq!(extract_detail(r#"{"detail": "  "}"#), None);
        assert_eq!(
            extract_detail(r#"{"detail": {"code": 7}}"#),
            Some(r#"{"code":7}"#.to_string())
        );
    }

    #[test]
    fn test_decode_malformed_body() {
        let resp = HttpResponse {
            status: 200,
            body: "<html>".to_string(),
        };
        let err = decode::<Value>(&resp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.status_code(), Some(200));
    }
}
