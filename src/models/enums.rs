use serde::{Deserialize, Serialize};
use std::fmt;

/// An enum that can be decoded from either its vendor numeric code or its
/// canonical label — the same value, two wire shapes, used both by the
/// record transformer (decoding vendor JSON) and the filter grammar
/// (decoding a query parameter).
pub trait CodedEnum: Sized + Copy {
    fn from_code(code: i64) -> Option<Self>;
    fn from_label(label: &str) -> Option<Self>;
    fn label(&self) -> &'static str;
    fn code(&self) -> i64;

    fn parse_any(raw: &str) -> Option<Self> {
        if let Ok(code) = raw.trim().parse::<i64>() {
            return Self::from_code(code);
        }
        Self::from_label(raw.trim())
    }
}

macro_rules! coded_enum {
    ($name:ident { $($variant:ident = $code:expr => $label:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl CodedEnum for $name {
            fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn from_label(label: &str) -> Option<Self> {
                let lower = label.to_ascii_lowercase();
                match lower.as_str() {
                    $($label => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            fn code(&self) -> i64 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.label())
            }
        }
    };
}

coded_enum!(JobType {
    Hourly = 1 => "hourly",
    FixedPrice = 2 => "fixed-price",
});

coded_enum!(JobStatus {
    Open = 1 => "open",
    Closed = 2 => "closed",
});

coded_enum!(ContractorTier {
    Entry = 1 => "entry",
    Intermediate = 2 => "intermediate",
    Expert = 3 => "expert",
});

/// Preferred English level, 0 (none specified) through 4 (native/bilingual).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnglishLevel(pub u8);

impl EnglishLevel {
    pub fn clamp_valid(raw: u8) -> Self {
        Self(raw.min(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_round_trips_code_and_label() {
        assert_eq!(JobType::from_code(1), Some(JobType::Hourly));
        assert_eq!(JobType::from_code(2), Some(JobType::FixedPrice));
        assert_eq!(JobType::from_label("Fixed-Price"), Some(JobType::FixedPrice));
        assert_eq!(JobType::parse_any("1"), Some(JobType::Hourly));
        assert_eq!(JobType::parse_any("hourly"), Some(JobType::Hourly));
        assert_eq!(JobType::parse_any("nonsense"), None);
    }

    #[test]
    fn contractor_tier_labels() {
        assert_eq!(ContractorTier::Expert.label(), "expert");
        assert_eq!(ContractorTier::parse_any("2"), Some(ContractorTier::Intermediate));
    }
}
