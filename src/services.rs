//! Typed wrappers for the backend endpoints.
//!
//! Every call goes through the authenticated request layer, so a 401 anywhere
//! in here ends the session the same way.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{
    ManualTrainingEntry, Measurements, ModelVersion, NewUser, PredictionRecord, PredictionRequest,
    PredictionResult, ProfileUpdate, TrainingEntry, User, VerificationFilter,
};
use crate::transport::HttpRequest;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Profile form as typed by the user
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub email: String,
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl ProfileForm {
    /// Check the form and build the request body.
    /// Passwords are only sent when both current and new are given.
    pub fn validate(&self) -> Result<ProfileUpdate, ApiError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ApiError::validation("Email is required"));
        }
        if !is_valid_email(email) {
            return Err(ApiError::validation("Invalid email address"));
        }
        if !self.new_password.is_empty() {
            if self.new_password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ApiError::validation(format!(
                    "Password must be at least {} characters",
                    MIN_PASSWORD_LEN
                )));
            }
            if self.current_password.is_empty() {
                return Err(ApiError::validation(
                    "Current password is required to set a new password",
                ));
            }
            if self.confirm_password != self.new_password {
                return Err(ApiError::validation("Passwords must match"));
            }
        } else if !self.current_password.is_empty() {
            return Err(ApiError::validation(
                "New password is required when current password is provided",
            ));
        }

        let changing = !self.new_password.is_empty();
        Ok(ProfileUpdate {
            email: email.to_string(),
            password: changing.then(|| self.new_password.clone()),
            current_password: changing.then(|| self.current_password.clone()),
        })
    }
}

fn require(value: &str, message: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::validation(message))
    } else {
        Ok(())
    }
}

/// Content type for an accepted spreadsheet, by extension
pub fn excel_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "xls" => Some("application/vnd.ms-excel"),
        _ => None,
    }
}

pub struct Services {
    api: Arc<ApiClient>,
}

impl Services {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    // --- own account ---

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.api
            .fetch(HttpRequest::put("/api/users/me").json(to_json(update)))
    }

    // --- predictions ---

    pub fn predict(&self, measurements: &Measurements) -> Result<PredictionResult, ApiError> {
        let body = PredictionRequest {
            measurements: measurements.clone(),
        };
        self.api
            .fetch(HttpRequest::post("/api/predictions/").json(to_json(&body)))
    }

    pub fn prediction_history(&self) -> Result<Vec<PredictionRecord>, ApiError> {
        self.api.fetch(HttpRequest::get("/api/predictions/history"))
    }

    // --- user administration ---

    pub fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.api.fetch(HttpRequest::get("/api/users/"))
    }

    pub fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        require(&user.username, "Username is required")?;
        require(&user.email, "Email is required")?;
        require(&user.password, "Password is required")?;
        if !is_valid_email(user.email.trim()) {
            return Err(ApiError::validation("Invalid email address"));
        }
        self.api
            .fetch(HttpRequest::post("/api/users/register").json(to_json(user)))
    }

    pub fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<Value, ApiError> {
        self.api.fetch(
            HttpRequest::put(format!("/api/users/{}/admin", user_id)).query("is_admin", is_admin),
        )
    }

    pub fn set_active(&self, user_id: i64, is_active: bool) -> Result<Value, ApiError> {
        self.api.fetch(
            HttpRequest::put(format!("/api/users/{}/active", user_id))
                .query("is_active", is_active),
        )
    }

    /// Users are never hard-deleted; "delete" deactivates the account
    pub fn deactivate_user(&self, user_id: i64) -> Result<Value, ApiError> {
        self.set_active(user_id, false)
    }

    // --- training data ---

    pub fn training_data(
        &self,
        filter: VerificationFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<TrainingEntry>, ApiError> {
        let mut request = HttpRequest::get("/api/admin/training-data")
            .query("skip", skip)
            .query("limit", limit);
        if let Some(verified) = filter.as_query() {
            request = request.query("verified", verified);
        }
        self.api.fetch(request)
    }

    pub fn verify_training(&self, entry_id: i64, verified: bool) -> Result<Value, ApiError> {
        self.api.fetch(
            HttpRequest::post(format!("/api/admin/training-data/{}/verify", entry_id))
                .query("verified", verified),
        )
    }

    pub fn add_manual_training(&self, entry: &ManualTrainingEntry) -> Result<Value, ApiError> {
        if entry.input_data.is_empty() {
            return Err(ApiError::validation("Please fill at least one field"));
        }
        self.api
            .fetch(HttpRequest::post("/api/admin/training-data/manual").json(to_json(entry)))
    }

    /// Upload a spreadsheet of training cases. The file is sent as-is.
    pub fn upload_excel(&self, path: &Path) -> Result<Value, ApiError> {
        let content_type = excel_content_type(path).ok_or_else(|| {
            ApiError::validation("Please select a valid Excel file (.xlsx or .xls)")
        })?;
        let bytes = std::fs::read(path).map_err(|e| {
            ApiError::validation(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.xlsx");
        tracing::info!(file = file_name, bytes = bytes.len(), "uploading training spreadsheet");
        self.api.fetch(
            HttpRequest::post("/api/admin/upload-excel").multipart("file", file_name, content_type, bytes),
        )
    }

    // --- models ---

    pub fn model_versions(&self) -> Result<Vec<ModelVersion>, ApiError> {
        self.api.fetch(HttpRequest::get("/api/admin/model-versions"))
    }

    pub fn activate_model(&self, version_id: i64) -> Result<Value, ApiError> {
        self.api.fetch(HttpRequest::post(format!(
            "/api/admin/model-versions/{}/activate",
            version_id
        )))
    }

    pub fn train_model(&self, description: &str) -> Result<Value, ApiError> {
        require(description, "Please provide a description for the model")?;
        self.api.fetch(
            HttpRequest::post("/api/admin/train-model").query("description", description.trim()),
        )
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    // Plain structs of strings, numbers and maps with string keys always serialize
    serde_json::to_value(value).unwrap_or(Value::Null)
}
