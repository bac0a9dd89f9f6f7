//! The severity scale shared by incidents, alerts and request thresholds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IncidentError, Result};

/// Ordered health severity of an alert or incident.
///
/// The derived ordering is the scale order: `None < Healthy < Warning < Critical`.
/// Incidents escalate to the maximum severity among their member alerts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unclassified or unknown; never produces an incident.
    #[default]
    None,
    /// Classified but not degrading anything.
    Healthy,
    /// Degraded, should be investigated.
    Warning,
    /// Failing, requires immediate attention.
    Critical,
}

impl Severity {
    /// All levels in ascending order.
    pub const ALL: [Self; 4] = [Self::None, Self::Healthy, Self::Warning, Self::Critical];

    /// Returns the canonical name of the level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Maps a health sample value to a level.
    ///
    /// `0` is healthy, `1` warning and anything from `2` up critical.
    /// Negative and NaN samples are unclassified.
    #[must_use]
    pub fn from_sample(value: f64) -> Self {
        if value.is_nan() || value < 0.0 {
            Self::None
        } else if value >= 2.0 {
            Self::Critical
        } else if value >= 1.0 {
            Self::Warning
        } else {
            Self::Healthy
        }
    }

    /// Returns true if this level is at least `threshold`.
    #[must_use]
    pub fn meets(&self, threshold: Self) -> bool {
        *self >= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = IncidentError;

    /// Parses a canonical level name, case-insensitively.
    ///
    /// `unknown` is accepted for `none` and `info` for `healthy`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "unknown" => Ok(Self::None),
            "healthy" | "info" => Ok(Self::Healthy),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            _ => Err(IncidentError::InvalidSeverity {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn severity_total_order() {
        assert!(Severity::None < Severity::Healthy);
        assert!(Severity::Healthy < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert_eq!(
            Severity::ALL.iter().max().copied(),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn all_is_listed_in_ascending_order() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test_case(0.0, Severity::Healthy ; "zero is healthy")]
    #[test_case(1.0, Severity::Warning ; "one is warning")]
    #[test_case(2.0, Severity::Critical ; "two is critical")]
    #[test_case(3.0, Severity::Critical ; "above two is critical")]
    #[test_case(-1.0, Severity::None ; "negative is none")]
    #[test_case(f64::NAN, Severity::None ; "nan is none")]
    fn severity_from_sample(value: f64, expected: Severity) {
        assert_eq!(Severity::from_sample(value), expected);
    }

    #[test_case("none", Severity::None)]
    #[test_case("unknown", Severity::None)]
    #[test_case("healthy", Severity::Healthy)]
    #[test_case("info", Severity::Healthy)]
    #[test_case("warning", Severity::Warning)]
    #[test_case("Critical", Severity::Critical)]
    fn severity_parse(name: &str, expected: Severity) {
        assert_eq!(name.parse::<Severity>().ok(), Some(expected));
    }

    #[test]
    fn severity_parse_rejects_unknown_name() {
        match "urgent".parse::<Severity>() {
            Err(IncidentError::InvalidSeverity { value }) => assert_eq!(value, "urgent"),
            other => panic!("expected InvalidSeverity, got {other:?}"),
        }
    }

    #[test]
    fn severity_name_roundtrip() {
        for sev in Severity::ALL {
            assert_eq!(sev.to_string().parse::<Severity>().ok(), Some(sev));
        }
    }

    #[test]
    fn severity_threshold() {
        assert!(Severity::Critical.meets(Severity::Warning));
        assert!(Severity::Warning.meets(Severity::Warning));
        assert!(!Severity::Healthy.meets(Severity::Warning));
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
