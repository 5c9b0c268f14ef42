//! Canonical label tables for the small set of vendor-supplied fields that
//! arrive as free-ish text but are drawn from a known, small vocabulary
//! (§3 invariant: "durations and workloads are canonicalized to known
//! vocabulary entries or echoed verbatim"). A value that doesn't match any
//! known entry passes through untouched rather than being rejected — the
//! vendor is free to add new labels before this crate's table catches up.

const DURATION_ENTRIES: &[(&str, &str)] = &[
    ("lessthan1month", "Less than 1 month"),
    ("1to3months", "1 to 3 months"),
    ("3to6months", "3 to 6 months"),
    ("morethan6months", "More than 6 months"),
];

const WORKLOAD_ENTRIES: &[(&str, &str)] = &[
    ("lessthan30hrsweek", "Less than 30 hrs/week"),
    ("morethan30hrsweek", "More than 30 hrs/week"),
    ("asneeded", "As needed - open to suggestions"),
];

/// Proposals-tier buckets, keyed by the vendor's own loose text (including
/// its URL-facet shorthand `5+`, `10+`, ... which all collapse to the
/// matching "N to M" / "N+" canonical bucket used by this grammar).
const PROPOSALS_TIER_ENTRIES: &[(&str, &str)] = &[
    ("lessthan5", "Less than 5"),
    ("5to10", "5 to 10"),
    ("10to15", "10 to 15"),
    ("15to20", "15 to 20"),
    ("20to50", "20 to 50"),
    ("50plus", "50+"),
];

fn fold(raw: &str) -> String {
    raw.to_ascii_lowercase().chars().filter(|c| c.is_alphanumeric()).collect()
}

fn canonicalize(table: &[(&str, &str)], raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let folded = fold(trimmed);
    table
        .iter()
        .find(|(key, _)| *key == folded)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

pub fn canonicalize_duration(raw: &str) -> String {
    canonicalize(DURATION_ENTRIES, raw)
}

pub fn canonicalize_workload(raw: &str) -> String {
    canonicalize(WORKLOAD_ENTRIES, raw)
}

/// Normalizes a proposals-tier token, including the Upwork URL translator's
/// `5+` → `5-` rewrite (§4.D): Upwork's own lowest-bucket facet is spelled
/// with a trailing `+`, which collides with this grammar's range-filter
/// convention where `+` has no special meaning but a trailing `-` denotes
/// an open-ended minimum — so that one token is rewritten before lookup.
pub fn canonicalize_proposals_tier(raw: &str) -> String {
    let trimmed = raw.trim();
    let rewritten = if trimmed == "5+" { "5-".to_string() } else { trimmed.to_string() };
    canonicalize(PROPOSALS_TIER_ENTRIES, &rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_duration_variants_canonicalize() {
        assert_eq!(canonicalize_duration("1 to 3 months"), "1 to 3 months");
        assert_eq!(canonicalize_duration("1To3Months"), "1 to 3 months");
        assert_eq!(canonicalize_duration("weird vendor label"), "weird vendor label");
    }

    #[test]
    fn known_workload_variants_canonicalize() {
        assert_eq!(canonicalize_workload("More Than 30 Hrs/Week"), "More than 30 hrs/week");
        assert_eq!(canonicalize_workload("unrecognized"), "unrecognized");
    }

    #[test]
    fn proposals_tier_plus_becomes_dash() {
        assert_eq!(canonicalize_proposals_tier("50+"), "50+");
        assert_eq!(canonicalize_proposals_tier("5+"), "5-");
    }
}
