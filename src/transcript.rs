//! JSONL activity log, one file per console session.
//!
//! Command arguments are never written: they can contain passwords.

use crate::error::ApiError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Transcript {
    pub path: PathBuf,
    session_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    pub fn new(path: &Path, session_id: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open transcript {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            file,
        })
    }

    /// New transcript named after the session id inside `dir`
    pub fn in_dir(dir: &Path, session_id: &str) -> Result<Self> {
        Self::new(&dir.join(format!("{}.jsonl", session_id)), session_id)
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn session_start(&mut self, base_url: &str) -> Result<()> {
        self.log("session_start", serde_json::json!({ "base_url": base_url }))
    }

    pub fn command(&mut self, name: &str, view: &str) -> Result<()> {
        self.log(
            "command",
            serde_json::json!({ "name": name, "view": view }),
        )
    }

    pub fn login_ok(&mut self, username: &str, is_admin: bool) -> Result<()> {
        self.log(
            "login_ok",
            serde_json::json!({ "username": username, "is_admin": is_admin }),
        )
    }

    pub fn login_failed(&mut self, username: &str, error: &ApiError) -> Result<()> {
        self.log(
            "login_failed",
            serde_json::json!({
                "username": username,
                "kind": error.kind().as_str(),
                "status": error.status_code(),
            }),
        )
    }

    pub fn logout(&mut self) -> Result<()> {
        self.log("logout", serde_json::json!({}))
    }

    /// The backend rejected the stored token
    pub fn session_invalidated(&mut self) -> Result<()> {
        self.log("session_invalidated", serde_json::json!({}))
    }

    pub fn request_failed(&mut self, command: &str, error: &ApiError) -> Result<()> {
        self.log(
            "request_failed",
            serde_json::json!({
                "command": command,
                "kind": error.kind().as_str(),
                "status": error.status_code(),
                "message": error.to_string(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_events_are_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcript = Transcript::in_dir(&dir.path().join("sessions"), "abc-123").unwrap();
        transcript.session_start("http://localhost:8000").unwrap();
        transcript.login_ok("doctor1", false).unwrap();
        transcript
            .request_failed(
                "/models",
                &ApiError::Server {
                    message: "boom".to_string(),
                    status: 500,
                },
            )
            .unwrap();

        let events = lines(&transcript.path);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["type"], "session_start");
        assert_eq!(events[0]["session_id"], "abc-123");
        assert_eq!(events[1]["username"], "doctor1");
        assert_eq!(events[2]["kind"], "server");
        assert_eq!(events[2]["status"], 500);
        assert!(events[2]["ts"].is_string());
    }

    #[test]
    fn test_login_failure_omits_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.jsonl");
        let mut transcript = Transcript::new(&path, "s").unwrap();
        transcript
            .login_failed(
                "doctor1",
                &ApiError::Auth {
                    message: "Invalid username or password".to_string(),
                    status: 401,
                },
            )
            .unwrap();
        transcript.logout().unwrap();

        let events = lines(&path);
        assert_eq!(events[0]["kind"], "auth");
        assert!(events[0].get("message").is_none());
        assert_eq!(events[1]["type"], "logout");
    }
}
