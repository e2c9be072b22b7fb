//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the workflow. The
//! core never reads environment variables itself; the binary reads them and hands the raw
//! values to the parsing helpers below.

use crate::constants::DEFAULT_UNSUPPORTED_DICOM_TYPES;
use crate::{HiResError, HiResResult};
use hires_types::NonEmptyText;

/// Which id-based eligibility rules apply.
///
/// Two rule sets have been deployed: one ignores structure ids, the other also skips ETD and
/// zOrig structures. Neither is assumed; the caller chooses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdPolicy {
    /// Attribute rules only.
    #[default]
    Standard,
    /// Attribute rules plus the ETD and zOrig id-substring rules.
    ExcludeDerived,
}

impl IdPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPolicy::Standard => "standard",
            IdPolicy::ExcludeDerived => "exclude-derived",
        }
    }
}

impl std::fmt::Display for IdPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IdPolicy {
    type Err = HiResError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(IdPolicy::Standard),
            "exclude-derived" | "strict" => Ok(IdPolicy::ExcludeDerived),
            other => Err(HiResError::InvalidInput(format!(
                "unknown id policy '{other}' (expected 'standard' or 'exclude-derived')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    id_policy: IdPolicy,
    unsupported_dicom_types: Vec<NonEmptyText>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// Duplicate DICOM types are dropped, keeping first-seen order.
    pub fn new(
        id_policy: IdPolicy,
        unsupported_dicom_types: Vec<String>,
    ) -> HiResResult<Self> {
        let mut types: Vec<NonEmptyText> = Vec::with_capacity(unsupported_dicom_types.len());
        for raw in unsupported_dicom_types {
            let dicom_type = NonEmptyText::new(&raw).map_err(|e| {
                HiResError::InvalidInput(format!("unsupported DICOM type '{raw}': {e}"))
            })?;
            if !types.contains(&dicom_type) {
                types.push(dicom_type);
            }
        }

        Ok(Self {
            id_policy,
            unsupported_dicom_types: types,
        })
    }

    pub fn id_policy(&self) -> IdPolicy {
        self.id_policy
    }

    pub fn unsupported_dicom_types(&self) -> &[NonEmptyText] {
        &self.unsupported_dicom_types
    }

    /// Exact, case-sensitive match against the unsupported list.
    pub fn is_unsupported_dicom_type(&self, dicom_type: &str) -> bool {
        self.unsupported_dicom_types
            .iter()
            .any(|t| t.as_str() == dicom_type)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            id_policy: IdPolicy::default(),
            unsupported_dicom_types: default_unsupported_dicom_types(),
        }
    }
}

fn default_unsupported_dicom_types() -> Vec<NonEmptyText> {
    DEFAULT_UNSUPPORTED_DICOM_TYPES
        .iter()
        .filter_map(|t| NonEmptyText::new(t).ok())
        .collect()
}

/// Parse the id policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`IdPolicy::Standard`].
pub fn id_policy_from_env_value(value: Option<String>) -> HiResResult<IdPolicy> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<IdPolicy>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

/// Parse a comma-separated list of unsupported DICOM types.
///
/// If `value` is `None` or empty/whitespace, returns the default list (`SUPPORT`, `MARKER`).
/// Empty entries between commas are rejected.
pub fn unsupported_dicom_types_from_env_value(value: Option<String>) -> HiResResult<Vec<String>> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(DEFAULT_UNSUPPORTED_DICOM_TYPES
            .iter()
            .map(|t| t.to_string())
            .collect());
    };

    value
        .split(',')
        .map(|t| {
            let t = t.trim();
            if t.is_empty() {
                Err(HiResError::InvalidInput(
                    "unsupported DICOM type list contains an empty entry".into(),
                ))
            } else {
                Ok(t.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_standard_policy_and_default_types() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.id_policy(), IdPolicy::Standard);
        assert!(cfg.is_unsupported_dicom_type("SUPPORT"));
        assert!(cfg.is_unsupported_dicom_type("MARKER"));
        assert!(!cfg.is_unsupported_dicom_type("PTV"));
    }

    #[test]
    fn test_dicom_type_match_is_case_sensitive() {
        let cfg = CoreConfig::default();
        assert!(!cfg.is_unsupported_dicom_type("marker"));
    }

    #[test]
    fn test_new_rejects_empty_dicom_type() {
        let err = CoreConfig::new(IdPolicy::Standard, vec!["SUPPORT".into(), "  ".into()])
            .expect_err("should reject empty type");
        assert!(matches!(err, HiResError::InvalidInput(msg) if msg.contains("cannot be empty")));
    }

    #[test]
    fn test_new_drops_duplicate_types() {
        let cfg = CoreConfig::new(
            IdPolicy::ExcludeDerived,
            vec!["MARKER".into(), "SUPPORT".into(), "MARKER".into()],
        )
        .unwrap();
        let types: Vec<&str> = cfg.unsupported_dicom_types().iter().map(|t| t.as_str()).collect();
        assert_eq!(types, vec!["MARKER", "SUPPORT"]);
    }

    #[test]
    fn test_id_policy_from_env_value() {
        assert_eq!(id_policy_from_env_value(None).unwrap(), IdPolicy::Standard);
        assert_eq!(
            id_policy_from_env_value(Some("  ".into())).unwrap(),
            IdPolicy::Standard
        );
        assert_eq!(
            id_policy_from_env_value(Some("Exclude-Derived".into())).unwrap(),
            IdPolicy::ExcludeDerived
        );
        assert_eq!(
            id_policy_from_env_value(Some("strict".into())).unwrap(),
            IdPolicy::ExcludeDerived
        );

        let err = id_policy_from_env_value(Some("lenient".into())).expect_err("unknown policy");
        assert!(matches!(err, HiResError::InvalidInput(msg) if msg.contains("lenient")));
    }

    #[test]
    fn test_unsupported_dicom_types_from_env_value() {
        assert_eq!(
            unsupported_dicom_types_from_env_value(None).unwrap(),
            vec!["SUPPORT".to_string(), "MARKER".to_string()]
        );
        assert_eq!(
            unsupported_dicom_types_from_env_value(Some(" BOLUS , MARKER ".into())).unwrap(),
            vec!["BOLUS".to_string(), "MARKER".to_string()]
        );
        assert!(unsupported_dicom_types_from_env_value(Some("BOLUS,,MARKER".into())).is_err());
    }
}
