//! Wire types for the treatment-decision backend.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Measurement name → numeric value, as the backend expects it
pub type Measurements = BTreeMap<String, f64>;

/// Response of `POST /token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Body of `PUT /api/users/me`
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
}

/// Body of `POST /api/users/register`
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    pub measurements: Measurements,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionResult {
    pub extraction_required: bool,
    pub confidence: f64,
    #[serde(default)]
    pub explanation: Vec<String>,
    #[serde(default)]
    pub raw_prediction: f64,
}

/// Entry of `GET /api/predictions/history`
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRecord {
    pub id: i64,
    pub extraction_required: bool,
    pub confidence: f64,
    #[serde(default)]
    pub explanation: Vec<String>,
    #[serde(default)]
    pub raw_prediction: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Measurements the prediction was made from
    #[serde(default, alias = "measurements")]
    pub input_data: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingEntry {
    pub id: i64,
    #[serde(default)]
    pub input_data: BTreeMap<String, Value>,
    pub actual_outcome: bool,
    #[serde(default)]
    pub submitted_by: Option<Value>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /api/admin/training-data/manual`
#[derive(Debug, Clone, Serialize)]
pub struct ManualTrainingEntry {
    pub input_data: Measurements,
    pub actual_outcome: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelVersion {
    pub id: i64,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

/// Which training entries to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationFilter {
    #[default]
    All,
    Verified,
    Unverified,
}

impl FromStr for VerificationFilter {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "verified" => Ok(Self::Verified),
            "unverified" | "pending" => Ok(Self::Unverified),
            _ => Err(ApiError::validation(format!(
                "Unknown filter: {} (all, verified, unverified)",
                s
            ))),
        }
    }
}

impl VerificationFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Verified => "verified",
            Self::Unverified => "unverified",
        }
    }

    /// Value of the `verified` query parameter, if one is sent
    pub fn as_query(&self) -> Option<bool> {
        match self {
            Self::All => None,
            Self::Verified => Some(true),
            Self::Unverified => Some(false),
        }
    }
}

pub fn outcome_label(extraction_required: bool) -> &'static str {
    if extraction_required {
        "Extraction"
    } else {
        "Non-Extraction"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_defaults() {
        let user: User =
            serde_json::from_value(json!({ "id": 1, "username": "doctor1", "is_admin": false }))
                .unwrap();
        assert_eq!(user.email, "");
        assert!(user.is_active);
        assert!(!user.is_admin);
    }

    #[test]
    fn test_profile_update_skips_absent_passwords() {
        let update = ProfileUpdate {
            email: "a@b.co".to_string(),
            password: None,
            current_password: None,
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({ "email": "a@b.co" }));
    }

    #[test]
    fn test_verification_filter() {
        assert_eq!("ALL".parse::<VerificationFilter>(), Ok(VerificationFilter::All));
        assert_eq!("pending".parse::<VerificationFilter>(), Ok(VerificationFilter::Unverified));
        let err = "bogus".parse::<VerificationFilter>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown filter: bogus (all, verified, unverified)");
        assert_eq!(VerificationFilter::Unverified.as_str(), "unverified");
        assert_eq!(VerificationFilter::All.as_query(), None);
        assert_eq!(VerificationFilter::Verified.as_query(), Some(true));
        assert_eq!(VerificationFilter::Unverified.as_query(), Some(false));
    }

    #[test]
    fn test_model_version_nullable_fields() {
        let version: ModelVersion = serde_json::from_value(json!({
            "id": 3,
            "version": "v3",
            "description": null,
            "accuracy": null,
            "created_at": "2024-05-01T10:00:00",
            "is_active": true
        }))
        .unwrap();
        assert_eq!(version.accuracy, None);
        assert!(version.is_active);
        assert_eq!(outcome_label(true), "Extraction");
        assert_eq!(outcome_label(false), "Non-Extraction");
    }
}
