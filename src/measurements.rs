//! Measurement catalog and input cleaning.
//!
//! Field names are the backend's keys verbatim, including punctuation.

use crate::error::ApiError;
use crate::models::Measurements;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

pub struct Group {
    pub id: &'static str,
    pub title: &'static str,
    pub fields: &'static [&'static str],
}

pub const GROUPS: &[Group] = &[
    Group {
        id: "photographic",
        title: "Photographic Analysis",
        fields: &["NLA (Whole Number)"],
    },
    Group {
        id: "careys",
        title: "Model Analysis (Carey's)",
        fields: &[
            "Total Tooth Material (Carey's Analysis) (Whole Number)",
            "Arch Length (Carey's Analysis) (Whole Number)",
        ],
    },
    Group {
        id: "arch-perimeter",
        title: "Model Analysis (Arch Perimeter)",
        fields: &[
            "Total Tooth Material (Arch Perimeter Analysis)",
            "Arch Length (Arch Perimeter Analysis) (Whole Number)",
        ],
    },
    Group {
        id: "ashley-howe",
        title: "Model Analysis (Ashley Howe's)",
        fields: &[
            "Total Tooth Material (Ashley Howe's)",
            "Premolar Diameter (Ashley Howe's)",
            "Basal Arch Width (Ashley Howe's)",
            "Premolar Basal Arch Width %",
        ],
    },
    Group {
        id: "model-others",
        title: "Model Analysis (Others)",
        fields: &[
            "Crowding in the Upper arch",
            "Crowding in the Lower arch",
            "Overbite",
            "Overjet",
            "Curve of Spee",
        ],
    },
    Group {
        id: "hard-tissue",
        title: "Hard Tissue Cephalometrics",
        fields: &[
            "ANB angle",
            "Mandibular Plane Angle (Go-Gn to Sn)",
            "U1-NA",
            "U1-NA (mm)",
            "L1-NB",
            "L1-NB (mm)",
            "U1-SN",
            "U1-PP",
        ],
    },
    Group {
        id: "soft-tissue",
        title: "Soft Tissue Cephalometrics",
        fields: &[
            "Facial Angle (G-Sn-Pos) (Down)",
            "UL-E Plane (mm) (Rickett's)",
            "LL-E Plane (mm) (Rickett's)",
            "Z Angle (Merrifield)",
            "Lip Strain (Holdway)",
            "Interlabial Gap (Stms-Stmi) (Arnett & Bergnett)",
            "S-Line Upper Lip (Steiner's)",
            "S-Line Lower Lip (Steiner's)",
        ],
    },
];

/// Fields accepted for a manually entered training case
pub const MANUAL_TRAINING_FIELDS: &[&str] = &[
    "ANB angle",
    "Mandibular Plane Angle (Go-Gn to Sn)",
    "U1-NA",
    "U1-NA (mm)",
    "L1-NB",
    "L1-NB (mm)",
    "U1-SN",
    "U1-PP",
    "NLA (Whole Number)",
    "Premolar Basal Arch Width %",
    "Crowding in the Upper arch",
    "Crowding in the Lower arch",
    "Overbite",
    "Overjet",
    "UL-E Plane (mm) (Rickett's)",
    "LL-E Plane (mm) (Rickett's)",
    "Z Angle (Merrifield)",
];

/// Look up a group by its short id
pub fn group(id: &str) -> Option<&'static Group> {
    GROUPS.iter().find(|g| g.id.eq_ignore_ascii_case(id))
}

pub fn prediction_fields() -> impl Iterator<Item = &'static str> {
    GROUPS.iter().flat_map(|g| g.fields.iter().copied())
}

pub fn is_prediction_field(name: &str) -> bool {
    prediction_fields().any(|f| f == name)
}

/// Turn raw form values into numbers.
///
/// Blank values are skipped. Anything else must parse as a number, and its
/// name must pass `allowed`.
pub fn clean<'a, I, F>(raw: I, allowed: F) -> Result<Measurements, ApiError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
    F: Fn(&str) -> bool,
{
    let mut cleaned = Measurements::new();
    for (name, value) in raw {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if !allowed(name) {
            return Err(ApiError::validation(format!("Unknown measurement: {}", name)));
        }
        let number: f64 = value
            .parse()
            .ok()
            .filter(|n: &f64| n.is_finite())
            .ok_or_else(|| ApiError::validation(format!("{} must be a number", name)))?;
        cleaned.insert(name.to_string(), number);
    }
    Ok(cleaned)
}

pub fn clean_prediction<'a, I>(raw: I) -> Result<Measurements, ApiError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    clean(raw, is_prediction_field)
}

/// Manual training entries need at least one value
pub fn clean_manual<'a, I>(raw: I) -> Result<Measurements, ApiError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let cleaned = clean(raw, |name| MANUAL_TRAINING_FIELDS.contains(&name))?;
    if cleaned.is_empty() {
        return Err(ApiError::validation("Please fill at least one field"));
    }
    Ok(cleaned)
}

/// Read a TOML or JSON table of measurement name → value.
///
/// Values may be numbers or strings; both come back as strings so they go
/// through the same cleaning as typed input.
pub fn load_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let mut raw = BTreeMap::new();
    match ext.as_str() {
        "toml" => {
            let table: toml::Table = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            for (name, value) in table {
                let text = match value {
                    toml::Value::String(s) => s,
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    other => bail!("{}: unsupported value {}", name, other),
                };
                raw.insert(name, text);
            }
        }
        "json" => {
            let value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            let serde_json::Value::Object(map) = value else {
                bail!("{}: expected a JSON object", path.display());
            };
            for (name, value) in map {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Null => String::new(),
                    other => bail!("{}: unsupported value {}", name, other),
                };
                raw.insert(name, text);
            }
        }
        _ => bail!(
            "Unsupported measurement file {} (expected .toml or .json)",
            path.display()
        ),
    }
    Ok(raw)
}

pub fn confidence_label(confidence: f64) -> &'static str {
    if confidence >= 90.0 {
        "Very High"
    } else if confidence >= 75.0 {
        "High"
    } else if confidence >= 60.0 {
        "Moderate"
    } else {
        "Low"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_catalog() {
        assert_eq!(GROUPS.len(), 7);
        assert_eq!(prediction_fields().count(), 31);
        assert!(is_prediction_field("Curve of Spee"));
        assert!(!is_prediction_field("curve of spee"));
        // Manual subset is drawn from the prediction fields
        for field in MANUAL_TRAINING_FIELDS {
            assert!(is_prediction_field(field), "{}", field);
        }
        assert_eq!(MANUAL_TRAINING_FIELDS.len(), 17);
    }

    #[test]
    fn test_group_lookup() {
        let soft = group("Soft-Tissue").unwrap();
        assert_eq!(soft.title, "Soft Tissue Cephalometrics");
        assert_eq!(soft.fields.len(), 8);
        assert!(group("careys").is_some());
        assert!(group("ceph").is_none());
    }

    #[test]
    fn test_clean_skips_blank_and_parses() {
        let cleaned = clean_prediction([
            ("ANB angle", "4.5"),
            ("Overjet", ""),
            ("Overbite", "  "),
            ("NLA (Whole Number)", " 102 "),
        ])
        .unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned["ANB angle"], 4.5);
        assert_eq!(cleaned["NLA (Whole Number)"], 102.0);
    }

    #[test]
    fn test_clean_rejects_bad_values() {
        let err = clean_prediction([("Overjet", "abc")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Overjet must be a number");

        let err = clean_prediction([("Overjet", "NaN")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = clean_prediction([("Shoe size", "42")]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown measurement: Shoe size");
    }

    #[test]
    fn test_clean_manual() {
        let err = clean_manual([("Overjet", "")]).unwrap_err();
        assert_eq!(err.to_string(), "Please fill at least one field");

        // Curve of Spee is not part of the manual form
        assert!(clean_manual([("Curve of Spee", "1")]).is_err());

        let cleaned = clean_manual([("U1-PP", "110")]).unwrap();
        assert_eq!(cleaned["U1-PP"], 110.0);
    }

    #[test]
    fn test_load_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("case.toml");
        std::fs::write(
            &toml_path,
            "\"ANB angle\" = 4.5\n\"NLA (Whole Number)\" = 100\nOverjet = \"3\"\n",
        )
        .unwrap();
        let raw = load_file(&toml_path).unwrap();
        assert_eq!(raw["ANB angle"], "4.5");
        assert_eq!(raw["NLA (Whole Number)"], "100");
        let cleaned = clean_prediction(raw.iter().map(|(k, v)| (k.as_str(), v.as_str()))).unwrap();
        assert_eq!(cleaned["Overjet"], 3.0);

        let json_path = dir.path().join("case.json");
        std::fs::write(&json_path, r#"{"Overbite": 2, "Overjet": null}"#).unwrap();
        let raw = load_file(&json_path).unwrap();
        assert_eq!(raw["Overbite"], "2");
        assert_eq!(raw["Overjet"], "");

        let bad = dir.path().join("case.csv");
        std::fs::write(&bad, "x").unwrap();
        assert!(load_file(&bad).is_err());

        let array = dir.path().join("list.json");
        std::fs::write(&array, "[1, 2]").unwrap();
        assert!(load_file(&array).is_err());
    }

    #[test]
    fn test_confidence_label() {
        assert_eq!(confidence_label(95.0), "Very High");
        assert_eq!(confidence_label(90.0), "Very High");
        assert_eq!(confidence_label(80.0), "High");
        assert_eq!(confidence_label(60.0), "Moderate");
        assert_eq!(confidence_label(59.9), "Low");
    }
}
