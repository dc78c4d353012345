//! HTTP seam between the request layer and the network.
//!
//! The transport knows nothing about sessions: it sends exactly what it is
//! given and reports either a status + body or a transport-level failure.
//! Non-2xx statuses are *responses*, not errors, at this layer.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// application/x-www-form-urlencoded
    Form(Vec<(String, String)>),
    /// multipart/form-data with a single file part
    Multipart {
        field: String,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the configured origin, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    /// Bearer token to send; filled in by the request layer
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        self.body = Body::Form(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn multipart(mut self, field: &str, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        self.body = Body::Multipart {
            field: field.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        };
        self
    }

    /// Path plus encoded query string, for logs
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }

    /// Look up a form field
    #[cfg(test)]
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            Body::Form(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// The request never produced an HTTP response.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Trait for HTTP transports to allow mocking
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub struct UreqTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` is a transport-level limit; `None` waits indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: builder.build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut req = self.agent.request(request.method.as_str(), &url);
        for (key, value) in &request.query {
            req = req.query(key, value);
        }
        if let Some(token) = &request.bearer {
            req = req.set("Authorization", &format!("Bearer {}", token));
        }
        req = req.set("Accept", "application/json");

        let result = match &request.body {
            Body::Empty => req.call(),
            Body::Json(value) => req
                .set("Content-Type", "application/json")
                .send_json(value.clone()),
            Body::Form(pairs) => {
                let pairs: Vec<(&str, &str)> = pairs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                req.send_form(&pairs)
            }
            Body::Multipart {
                field,
                file_name,
                content_type,
                bytes,
            } => {
                let boundary = format!("----orthodash-{}", uuid::Uuid::new_v4().simple());
                let payload = encode_multipart(&boundary, field, file_name, content_type, bytes);
                req.set(
                    "Content-Type",
                    &format!("multipart/form-data; boundary={}", boundary),
                )
                .send_bytes(&payload)
            }
        };

        match result {
            Ok(resp) => {
                let status = resp.status();
                let body = resp
                    .into_string()
                    .map_err(|e| TransportError(format!("Failed to read response: {}", e)))?;
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Status(status, resp)) => Ok(HttpResponse {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(t)) => Err(TransportError(t.to_string())),
        }
    }
}

/// Encode a single-file multipart/form-data body
fn encode_multipart(
    boundary: &str,
    field: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(bytes.len() + 256);
    payload.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    payload.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field,
            file_name.replace('"', "")
        )
        .as_bytes(),
    );
    payload.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    payload.extend_from_slice(bytes);
    payload.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    payload
}

#[cfg(test)]
pub mod mock {
    //! Scripted transport for tests.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    pub enum Reply {
        Status(u16, Value),
        Unreachable,
    }

    type Handler = Arc<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

    struct Route {
        handlers: Vec<Handler>,
        calls: usize,
    }

    /// Routes are matched on method + path (query ignored). A route with
    /// several replies serves them in order and then repeats the last one.
    #[derive(Default)]
    pub struct MockTransport {
        routes: Mutex<HashMap<(Method, String), Route>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on_fn<F>(&self, method: Method, path: &str, handler: F) -> &Self
        where
            F: Fn(&HttpRequest) -> Reply + Send + Sync + 'static,
        {
            self.routes
                .lock()
                .entry((method, path.to_string()))
                .or_insert_with(|| Route {
                    handlers: Vec::new(),
                    calls: 0,
                })
                .handlers
                .push(Arc::new(handler));
            self
        }

        pub fn on(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
            self.on_fn(method, path, move |_| Reply::Status(status, body.clone()))
        }

        pub fn on_unreachable(&self, method: Method, path: &str) -> &Self {
            self.on_fn(method, path, |_| Reply::Unreachable)
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().clone()
        }

        pub fn count(&self, method: Method, path: &str) -> usize {
            self.requests
                .lock()
                .iter()
                .filter(|r| r.method == method && r.path == path)
                .count()
        }

        pub fn last(&self, method: Method, path: &str) -> Option<HttpRequest> {
            self.requests
                .lock()
                .iter()
                .rev()
                .find(|r| r.method == method && r.path == path)
                .cloned()
        }
    }

    impl Transport for MockTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().push(request.clone());

            // Clone the handler out so a blocking handler does not hold the lock
            let handler = {
                let mut routes = self.routes.lock();
                match routes.get_mut(&(request.method, request.path.clone())) {
                    Some(route) if !route.handlers.is_empty() => {
                        let idx = route.calls.min(route.handlers.len() - 1);
                        route.calls += 1;
                        Some(Arc::clone(&route.handlers[idx]))
                    }
                    _ => None,
                }
            };

            let reply = match handler {
                Some(handler) => handler(request),
                None => Reply::Status(404, serde_json::json!({ "detail": "Not Found" })),
            };

            match reply {
                Reply::Status(status, body) => Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
                Reply::Unreachable => Err(TransportError("connection refused".to_string())),
            }
        }
    }
}
