//! Dashboard summaries and display helpers.

use crate::error::ApiError;
use crate::models::{PredictionRecord, VerificationFilter};
use crate::services::Services;
use chrono::{DateTime, Local, NaiveDateTime};
use serde_json::Value;

/// Predictions shown on the user dashboard
pub const RECENT_PREDICTIONS: usize = 5;

const TRAINING_SAMPLE_LIMIT: usize = 100;
const PENDING_SAMPLE_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct AdminStats {
    pub predictions: usize,
    pub training_data: usize,
    pub pending_verification: usize,
    pub users: usize,
    /// Version string of the active model, or "None"
    pub active_model: String,
}

/// Gather the admin overview. Counts are of what the backend returns for
/// each listing, so large collections are capped by the listing limit.
pub fn admin_stats(services: &Services) -> Result<AdminStats, ApiError> {
    let predictions = services.prediction_history()?.len();
    let training_data = services
        .training_data(VerificationFilter::All, 0, TRAINING_SAMPLE_LIMIT)?
        .len();
    let pending_verification = services
        .training_data(VerificationFilter::Unverified, 0, PENDING_SAMPLE_LIMIT)?
        .len();
    let users = services.list_users()?.len();
    let active_model = services
        .model_versions()?
        .into_iter()
        .find(|m| m.is_active)
        .map(|m| m.version)
        .unwrap_or_else(|| "None".to_string());

    Ok(AdminStats {
        predictions,
        training_data,
        pending_verification,
        users,
        active_model,
    })
}

pub fn recent_predictions(services: &Services) -> Result<Vec<PredictionRecord>, ApiError> {
    let mut history = services.prediction_history()?;
    history.truncate(RECENT_PREDICTIONS);
    Ok(history)
}

/// One prediction from the history listing; the backend has no per-id lookup
pub fn find_prediction(services: &Services, id: i64) -> Result<PredictionRecord, ApiError> {
    services
        .prediction_history()?
        .into_iter()
        .find(|record| record.id == id)
        .ok_or_else(|| ApiError::validation(format!("No prediction with id {}", id)))
}

/// Input parameters worth showing: nulls dropped, numbers to two decimals
pub fn input_rows(input: &std::collections::BTreeMap<String, Value>) -> Vec<(&str, String)> {
    input
        .iter()
        .filter_map(|(name, value)| {
            let shown = match value {
                Value::Null => return None,
                Value::Number(n) => match n.as_f64() {
                    Some(f) => format!("{:.2}", f),
                    None => n.to_string(),
                },
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((name.as_str(), shown))
        })
        .collect()
}

/// Render a backend timestamp in local time. Timestamps without an offset
/// are taken as already local.
pub fn format_timestamp(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return "N/A".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => naive.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Model accuracy as a percentage with two decimals
pub fn format_accuracy(accuracy: Option<f64>) -> String {
    match accuracy {
        Some(a) if a > 0.0 => format!("{:.2}%", a * 100.0),
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiClient;
    use crate::credentials::{CredentialStore, MemoryCredentialStore};
    use crate::transport::mock::MockTransport;
    use crate::transport::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<MockTransport>, Services) {
        let mock = Arc::new(MockTransport::new());
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::with_token("abc"));
        (mock.clone(), Services::new(Arc::new(ApiClient::new(mock, store))))
    }

    fn prediction(id: i64) -> serde_json::Value {
        json!({ "id": id, "extraction_required": false, "confidence": 70.0 })
    }

    #[test]
    fn test_admin_stats() {
        let (mock, services) = setup();
        mock.on(
            Method::Get,
            "/api/predictions/history",
            200,
            json!([prediction(1), prediction(2), prediction(3)]),
        );
        let entry = json!({ "id": 1, "actual_outcome": true, "verified": false });
        // All entries, then the unverified listing
        mock.on(Method::Get, "/api/admin/training-data", 200, json!([entry, entry]));
        mock.on(Method::Get, "/api/admin/training-data", 200, json!([entry]));
        mock.on(
            Method::Get,
            "/api/users/",
            200,
            json!([{ "id": 1, "username": "admin", "is_admin": true }]),
        );
        mock.on(
            Method::Get,
            "/api/admin/model-versions",
            200,
            json!([
                { "id": 1, "version": "v1", "is_active": false },
                { "id": 2, "version": "v2", "is_active": true }
            ]),
        );

        let stats = admin_stats(&services).unwrap();
        assert_eq!(
            stats,
            AdminStats {
                predictions: 3,
                training_data: 2,
                pending_verification: 1,
                users: 1,
                active_model: "v2".to_string(),
            }
        );

        let requests = mock.requests();
        let training: Vec<String> = requests
            .iter()
            .filter(|r| r.path == "/api/admin/training-data")
            .map(|r| r.target())
            .collect();
        assert_eq!(
            training,
            vec![
                "/api/admin/training-data?skip=0&limit=100".to_string(),
                "/api/admin/training-data?skip=0&limit=1000&verified=false".to_string(),
            ]
        );
    }

    #[test]
    fn test_admin_stats_without_active_model() {
        let (mock, services) = setup();
        mock.on(Method::Get, "/api/predictions/history", 200, json!([]));
        mock.on(Method::Get, "/api/admin/training-data", 200, json!([]));
        mock.on(Method::Get, "/api/users/", 200, json!([]));
        mock.on(Method::Get, "/api/admin/model-versions", 200, json!([]));
        assert_eq!(admin_stats(&services).unwrap().active_model, "None");
    }

    #[test]
    fn test_admin_stats_stops_on_error() {
        let (mock, services) = setup();
        mock.on(Method::Get, "/api/predictions/history", 500, json!({}));
        assert!(admin_stats(&services).is_err());
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_recent_predictions() {
        let (mock, services) = setup();
        let history: Vec<_> = (1..=8).map(prediction).collect();
        mock.on(Method::Get, "/api/predictions/history", 200, json!(history));
        let recent = recent_predictions(&services).unwrap();
        assert_eq!(recent.len(), RECENT_PREDICTIONS);
        assert_eq!(recent[0].id, 1);
    }

    #[test]
    fn test_find_prediction() {
        let (mock, services) = setup();
        mock.on(
            Method::Get,
            "/api/predictions/history",
            200,
            json!([
                prediction(1),
                {
                    "id": 2,
                    "extraction_required": true,
                    "confidence": 91.5,
                    "explanation": ["Severe crowding in the lower arch"],
                    "raw_prediction": 0.915,
                    "created_at": "2024-05-01T10:00:00",
                    "input_data": { "Overjet": 4, "ANB angle": null, "Overbite": 2.5 }
                }
            ]),
        );

        let record = find_prediction(&services, 2).unwrap();
        assert_eq!(record.explanation, vec!["Severe crowding in the lower arch"]);
        assert_eq!(record.raw_prediction, Some(0.915));
        assert_eq!(
            input_rows(&record.input_data),
            vec![("Overbite", "2.50".to_string()), ("Overjet", "4.00".to_string())]
        );

        let err = find_prediction(&services, 9).unwrap_err();
        assert_eq!(err.to_string(), "No prediction with id 9");
    }

    #[test]
    fn test_history_accepts_measurements_key() {
        let record: PredictionRecord = serde_json::from_value(json!({
            "id": 3,
            "extraction_required": false,
            "confidence": 60.0,
            "measurements": { "U1-SN": "n/a" }
        }))
        .unwrap();
        assert_eq!(input_rows(&record.input_data), vec![("U1-SN", "n/a".to_string())]);
        assert!(record.explanation.is_empty());
        assert_eq!(record.raw_prediction, None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(None), "N/A");
        assert_eq!(format_timestamp(Some("")), "N/A");
        assert_eq!(
            format_timestamp(Some("2024-05-01T10:00:00")),
            "2024-05-01 10:00:00"
        );
        assert_eq!(
            format_timestamp(Some("2024-05-01T10:00:00.123456")),
            "2024-05-01 10:00:00"
        );
        assert_ne!(format_timestamp(Some("2024-05-01T10:00:00Z")), "N/A");
        assert_eq!(format_timestamp(Some("yesterday")), "yesterday");
    }

    #[test]
    fn test_format_accuracy() {
        assert_eq!(format_accuracy(Some(0.8123)), "81.23%");
        assert_eq!(format_accuracy(None), "N/A");
        assert_eq!(format_accuracy(Some(0.0)), "N/A");
    }
}
