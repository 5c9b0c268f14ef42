use url::Url;

/// Renames an Upwork search-URL query key to its grammar-native
/// counterpart, per §4.D. Keys already native to this grammar (ranges
/// like `amount`/`hourly_rate`/`client_hires`, and anything not listed
/// here) pass through untouched; keys with no known mapping and no
/// grammar-native meaning are silently dropped.
fn rename_key(key: &str) -> Option<&'static str> {
    match key {
        "q" => Some("search"),
        "t" => Some("job_type"),
        "job_type" => Some("job_type"),
        "client_payment_verification_status" => Some("payment_verified"),
        "subcategory" => Some("category"),
        "subcategory2_uid" => Some("category"),
        "client_country" => Some("country"),
        "contractor_tier" => Some("contractor_tier"),
        "amount" => Some("budget"),
        "hourly_rate" => Some("hourly_rate"),
        "client_hires" => Some("client_hires"),
        "sort" => Some("sort"),
        "location" => Some("country"),
        _ => None,
    }
}

/// Normalizes a value for its renamed key. Upwork's job-type values use
/// numeric codes identical to this grammar's `CodedEnum` wire format, so
/// no translation beyond trimming is needed; `client_payment_verification_status`
/// uses the literal string `VERIFIED` where this grammar wants a bool.
fn normalize_value(renamed_key: &str, value: &str) -> String {
    if renamed_key == "payment_verified" {
        return match value.to_ascii_uppercase().as_str() {
            "VERIFIED" => "true".to_string(),
            _ => "false".to_string(),
        };
    }
    value.trim().to_string()
}

/// Translates an Upwork job-search URL's query parameters into this
/// grammar's native `key=value` pairs. Unknown keys (anything Upwork's
/// search UI emits that this feed has no analogue for — facets like
/// `nbs`, `page`, UI-only state) are dropped rather than erroring, since
/// an Upwork URL is expected to carry more state than this grammar
/// exposes (§4.D).
///
/// Returns pairs rather than a query string so the caller can merge them
/// with any directly-supplied grammar params before a single parse pass —
/// translated keys are merged first, then overridden by anything the
/// caller passed directly, matching the "translate, then merge, then
/// parse" order in §4.D/§4.G.
pub fn translate(upwork_url: &str) -> Result<Vec<(String, String)>, UpworkUrlError> {
    let url = Url::parse(upwork_url).map_err(|_| UpworkUrlError::Malformed)?;

    let host = url.host_str().unwrap_or_default();
    if !host.eq_ignore_ascii_case("www.upwork.com") && !host.eq_ignore_ascii_case("upwork.com") {
        return Err(UpworkUrlError::UnexpectedHost(host.to_string()));
    }

    let mut out = Vec::new();
    for (key, value) in url.query_pairs() {
        if let Some(renamed) = rename_key(&key) {
            let normalized = normalize_value(renamed, &value);
            if !normalized.is_empty() {
                out.push((renamed.to_string(), normalized));
            }
        }
    }
    Ok(out)
}

#[derive(Debug, thiserror::Error)]
pub enum UpworkUrlError {
    #[error("not a valid URL")]
    Malformed,
    #[error("unexpected host '{0}', expected an upwork.com search URL")]
    UnexpectedHost(String),
}

/// Merges translated pairs under a caller-supplied param map, with the
/// caller's own values taking precedence on key collision (§4.D/§4.G).
pub fn merge_into(
    translated: Vec<(String, String)>,
    explicit: &std::collections::HashMap<String, String>,
) -> std::collections::HashMap<String, String> {
    let mut merged: std::collections::HashMap<String, String> = translated.into_iter().collect();
    for (k, v) in explicit {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_known_keys_and_drops_unknown() {
        let pairs = translate(
            "https://www.upwork.com/nx/search/jobs/?q=rust+backend&t=1&nbs=1&page=3",
        )
        .unwrap();
        assert!(pairs.contains(&("search".to_string(), "rust backend".to_string())));
        assert!(pairs.contains(&("job_type".to_string(), "1".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "nbs" || k == "page"));
    }

    #[test]
    fn payment_verification_status_becomes_boolean() {
        let pairs = translate(
            "https://www.upwork.com/nx/search/jobs/?client_payment_verification_status=VERIFIED",
        )
        .unwrap();
        assert!(pairs.contains(&("payment_verified".to_string(), "true".to_string())));
    }

    #[test]
    fn rejects_non_upwork_host() {
        let err = translate("https://example.com/?q=rust").unwrap_err();
        assert!(matches!(err, UpworkUrlError::UnexpectedHost(_)));
    }

    #[test]
    fn explicit_params_override_translated_ones() {
        let translated = vec![("job_type".to_string(), "1".to_string())];
        let mut explicit = std::collections::HashMap::new();
        explicit.insert("job_type".to_string(), "2".to_string());
        let merged = merge_into(translated, &explicit);
        assert_eq!(merged.get("job_type"), Some(&"2".to_string()));
    }
}
