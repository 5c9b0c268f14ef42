use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::AppError;
use crate::models::enums::CodedEnum;

/// Accepts the boolean vocabulary of §4.C: {0,1,true,false,yes,no,on,off}.
pub fn parse_bool(field: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::malformed(
            field,
            format!("expected one of 0/1/true/false/yes/no/on/off, got '{other}'"),
        )),
    }
}

/// Case-preserving, case-insensitive-deduped CSV set. First occurrence of
/// each case variant wins; order is the order first seen (callers that need
/// determinism for cache-key purposes should sort before formatting).
pub fn parse_csv_set(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let lower = token.to_ascii_lowercase();
        if seen.insert(lower) {
            out.push(token.to_string());
        }
    }
    out
}

/// A single min/max bound, e.g. budget or rate ranges.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeFilter {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        if let Some(min) = self.min
            && value < min
        {
            return false;
        }
        if let Some(max) = self.max
            && value > max
        {
            return false;
        }
        true
    }
}

/// Parses the multi-value range grammar of §4.C: comma-separated tokens of
/// `min-max`, `min-`, `-max`, or a bare value expanding to `[v,v]`. Multiple
/// comma-separated tokens are unioned into the widest enclosing bound —
/// this core treats a range family as a single bound per request, not a
/// set of disjoint intervals, matching how the transformed filters consume
/// a single `min`/`max` pair downstream.
pub fn parse_range(field: &str, raw: &str) -> Result<RangeFilter, AppError> {
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;

    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let (lo, hi) = if let Some(rest) = token.strip_prefix('-') {
            (None, Some(parse_number(field, rest)?))
        } else if let Some(rest) = token.strip_suffix('-') {
            (Some(parse_number(field, rest)?), None)
        } else if let Some((lo_raw, hi_raw)) = token.split_once('-') {
            (
                Some(parse_number(field, lo_raw)?),
                Some(parse_number(field, hi_raw)?),
            )
        } else {
            let v = parse_number(field, token)?;
            (Some(v), Some(v))
        };

        min = match (min, lo) {
            (None, x) => x,
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
        };
        max = match (max, hi) {
            (None, x) => x,
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
        };
    }

    Ok(RangeFilter { min, max })
}

fn parse_number(field: &str, raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::malformed(field, format!("'{raw}' is not a number")))
}

/// Decodes an enum accepting either numeric code or canonical label.
/// Unknown tokens fail the request with a field-scoped diagnostic per §4.C.
pub fn parse_enum<E: CodedEnum>(field: &str, raw: &str) -> Result<E, AppError> {
    E::parse_any(raw).ok_or_else(|| {
        AppError::malformed(field, format!("unrecognized value '{raw}' for {field}"))
    })
}

/// CSV list of enum tokens (e.g. a multi-tier `contractor_tier` filter).
pub fn parse_enum_csv<E: CodedEnum>(field: &str, raw: &str) -> Result<Vec<E>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| parse_enum(field, t))
        .collect()
}

/// Accepts RFC 3339 with or without fractional seconds, and bare dates
/// (`YYYY-MM-DD`, midnight UTC), per §4.C.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let dt = naive.and_hms_opt(0, 0, 0).unwrap();
        return Ok(Utc.from_utc_datetime(&dt));
    }
    Err(AppError::malformed(
        field,
        format!("'{raw}' is not a recognized timestamp"),
    ))
}

pub fn parse_limit(raw: Option<&str>) -> Result<u32, AppError> {
    let value = match raw {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::malformed("limit", format!("'{raw}' is not an integer")))?,
        None => 20,
    };
    Ok(value.clamp(1, 50) as u32)
}

pub fn parse_offset(field_limit: u32, raw: Option<&str>) -> Result<u32, AppError> {
    let value = match raw {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::malformed("offset", format!("'{raw}' is not an integer")))?,
        None => 0,
    };
    if value < 0 {
        return Err(AppError::malformed("offset", "offset must not be negative"));
    }
    let value = value as u32;
    if field_limit != 0 && value % field_limit != 0 {
        return Err(AppError::malformed(
            "offset",
            format!("offset must be a multiple of limit ({field_limit})"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::ContractorTier;

    #[test]
    fn bool_vocabulary() {
        for truthy in ["1", "true", "TRUE", "yes", "on"] {
            assert!(parse_bool("f", truthy).unwrap());
        }
        for falsy in ["0", "false", "no", "off"] {
            assert!(!parse_bool("f", falsy).unwrap());
        }
        assert!(parse_bool("f", "maybe").is_err());
    }

    #[test]
    fn csv_set_dedups_case_insensitively_preserving_first_case() {
        let set = parse_csv_set("Rust, rust, PYTHON, python, Go");
        assert_eq!(set, vec!["Rust", "PYTHON", "Go"]);
    }

    #[test]
    fn range_single_value_expands_to_equal_bounds() {
        let r = parse_range("amount", "500").unwrap();
        assert_eq!(r.min, Some(500.0));
        assert_eq!(r.max, Some(500.0));
    }

    #[test]
    fn range_open_ended_forms() {
        let min_only = parse_range("amount", "100-").unwrap();
        assert_eq!(min_only.min, Some(100.0));
        assert_eq!(min_only.max, None);

        let max_only = parse_range("amount", "-100").unwrap();
        assert_eq!(max_only.min, None);
        assert_eq!(max_only.max, Some(100.0));

        let both = parse_range("amount", "100-500").unwrap();
        assert_eq!(both.min, Some(100.0));
        assert_eq!(both.max, Some(500.0));
    }

    #[test]
    fn enum_csv_multi_tier() {
        let tiers: Vec<ContractorTier> = parse_enum_csv("contractor_tier", "entry,3").unwrap();
        assert_eq!(tiers, vec![ContractorTier::Entry, ContractorTier::Expert]);
    }

    #[test]
    fn offset_must_be_multiple_of_limit() {
        assert!(parse_offset(10, Some("20")).is_ok());
        assert!(parse_offset(10, Some("15")).is_err());
    }

    #[test]
    fn limit_clamps_to_1_50() {
        assert_eq!(parse_limit(Some("0")).unwrap(), 1);
        assert_eq!(parse_limit(Some("1000")).unwrap(), 50);
        assert_eq!(parse_limit(None).unwrap(), 20);
    }

    #[test]
    fn timestamp_accepts_rfc3339_variants_and_bare_date() {
        assert!(parse_timestamp("t", "2024-10-24T08:12:43Z").is_ok());
        assert!(parse_timestamp("t", "2024-10-24T08:12:43.123Z").is_ok());
        assert!(parse_timestamp("t", "2024-10-24").is_ok());
        assert!(parse_timestamp("t", "not-a-date").is_err());
    }
}
