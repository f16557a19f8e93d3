use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a stored or received label does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid enum value for {field}: {value}")]
pub struct InvalidEnumValue {
    pub field: &'static str,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
///
/// The string form doubles as the serde representation, so persisted JSON and
/// the analysis service's enum labels round-trip through the same table.
/// Variant declaration order defines `Ord`.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnumValue {
                        field: stringify!($name),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// Ordered criticality of a diagnosis conclusion.
    Severity {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Critical => "Critical",
    }
);

str_enum!(
    /// After-sales handling state of a diagnosis record.
    ProcessingStatus {
        Unprocessed => "Unprocessed",
        Processing => "Processing",
        Processed => "Processed",
    }
);

str_enum!(FeedbackRating {
    Helpful => "Helpful",
    NotHelpful => "Not Helpful",
});

impl Default for ProcessingStatus {
    fn default() -> Self {
        Self::Unprocessed
    }
}

impl ProcessingStatus {
    /// Operator-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unprocessed => "未处理",
            Self::Processing => "处理中",
            Self::Processed => "已处理",
        }
    }
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "低",
            Self::Medium => "中",
            Self::High => "高",
            Self::Critical => "严重",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn severity_round_trip() {
        for (variant, s) in [
            (Severity::Low, "Low"),
            (Severity::Medium, "Medium"),
            (Severity::High, "High"),
            (Severity::Critical, "Critical"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Severity::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::ALL.iter().max(), Some(&Severity::Critical));
    }

    #[test]
    fn severity_rejects_unknown_label() {
        let err = Severity::from_str("Catastrophic").unwrap_err();
        assert_eq!(err.field, "Severity");
        assert_eq!(err.value, "Catastrophic");
        // Labels are case-sensitive, matching the response schema enum.
        assert!(Severity::from_str("low").is_err());
    }

    #[test]
    fn feedback_rating_serializes_with_space() {
        let json = serde_json::to_string(&FeedbackRating::NotHelpful).unwrap();
        assert_eq!(json, "\"Not Helpful\"");
        let parsed: FeedbackRating = serde_json::from_str("\"Helpful\"").unwrap();
        assert_eq!(parsed, FeedbackRating::Helpful);
    }

    #[test]
    fn processing_status_defaults_to_unprocessed() {
        assert_eq!(ProcessingStatus::default(), ProcessingStatus::Unprocessed);
        assert_eq!(ProcessingStatus::Processing.label(), "处理中");
    }
}
