pub mod params;

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::enums::{CodedEnum, ContractorTier, JobStatus, JobType};
use params::RangeFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    PublishTime,
    LastVisited,
    Budget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub const DEFAULT: Sort = Sort {
        field: SortField::PublishTime,
        direction: SortDirection::Descending,
    };

    /// Budget sort has no native index to lean on and must be applied to
    /// the already-overfetched, already-filtered result set in memory
    /// (§4.G step 5 / §9 `needsInMemorySort`).
    pub fn needs_in_memory_sort(&self) -> bool {
        self.field == SortField::Budget
    }

    pub fn native_field(&self) -> &'static str {
        match self.field {
            SortField::PublishTime => "publish_time",
            SortField::LastVisited => "last_visited_at",
            SortField::Budget => "publish_time",
        }
    }

    fn canonical(&self) -> &'static str {
        match (self.field, self.direction) {
            (SortField::PublishTime, SortDirection::Descending) => "publish_time_desc",
            (SortField::PublishTime, SortDirection::Ascending) => "publish_time_asc",
            (SortField::LastVisited, SortDirection::Descending) => "last_visited_desc",
            (SortField::LastVisited, SortDirection::Ascending) => "last_visited_asc",
            (SortField::Budget, SortDirection::Descending) => "budget_desc",
            (SortField::Budget, SortDirection::Ascending) => "budget_asc",
        }
    }

    /// Parses a sort token, including the vendor aliases `recency` and
    /// `relevance`, both of which fold onto the default publish-time-desc
    /// ordering since this surface has no relevance scoring of its own
    /// (§4.D passthrough note).
    fn parse(raw: &str) -> Result<Sort, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "recency" | "relevance" | "publish_time_desc" => Ok(Sort::DEFAULT),
            "publish_time_asc" => Ok(Sort {
                field: SortField::PublishTime,
                direction: SortDirection::Ascending,
            }),
            "last_visited_desc" => Ok(Sort {
                field: SortField::LastVisited,
                direction: SortDirection::Descending,
            }),
            "last_visited_asc" => Ok(Sort {
                field: SortField::LastVisited,
                direction: SortDirection::Ascending,
            }),
            "budget_desc" => Ok(Sort {
                field: SortField::Budget,
                direction: SortDirection::Descending,
            }),
            "budget_asc" => Ok(Sort {
                field: SortField::Budget,
                direction: SortDirection::Ascending,
            }),
            other => Err(AppError::malformed("sort", format!("unrecognized sort '{other}'"))),
        }
    }
}

/// Timezone-prefix/country-set shortcuts for the `location` family, per
/// §4.G step 4. Expanded at residual-filter evaluation time rather than at
/// parse time, since the match is against buyer fields on each candidate
/// record rather than against the filter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionShortcut {
    Africa,
    Europe,
    Caribbean,
}

impl RegionShortcut {
    fn parse(token: &str) -> Option<RegionShortcut> {
        match token.to_ascii_lowercase().as_str() {
            "africa" => Some(RegionShortcut::Africa),
            "europe" => Some(RegionShortcut::Europe),
            "caribbean" => Some(RegionShortcut::Caribbean),
            _ => None,
        }
    }

    pub fn timezone_prefixes(&self) -> &'static [&'static str] {
        match self {
            RegionShortcut::Africa => &["Africa/"],
            RegionShortcut::Europe => &["Europe/"],
            RegionShortcut::Caribbean => &["America/"],
        }
    }

    /// Caribbean has no single IANA timezone-area prefix of its own (its
    /// zones live under `America/`), so it also gets an explicit country
    /// allowlist rather than relying on prefix matching alone.
    pub fn caribbean_countries() -> &'static [&'static str] {
        &[
            "jamaica",
            "trinidad and tobago",
            "bahamas",
            "barbados",
            "dominican republic",
            "haiti",
            "cuba",
            "puerto rico",
        ]
    }
}

/// Shared parsed-filter core for both `GET /jobs` and `GET /job-list`.
/// The two endpoints differ only in which record shape they ultimately
/// query and transform (§4.C, §4.G) — the filter grammar itself is one
/// parsing path, consistent with keeping a single source of truth for the
/// round-trip and cache-key determinism properties in §8.
#[derive(Debug, Clone)]
pub struct JobFilter {
    pub limit: u32,
    pub offset: u32,
    pub sort: Sort,
    pub search: Option<String>,

    pub job_type: Option<JobType>,
    pub status: Option<JobStatus>,
    pub contractor_tiers: Vec<ContractorTier>,
    pub payment_verified: Option<bool>,
    pub rising_talent: Option<bool>,
    pub portfolio_required: Option<bool>,

    pub budget: RangeFilter,
    pub hourly_rate: RangeFilter,
    pub client_hires: RangeFilter,

    pub tags: Vec<String>,
    pub skills: Vec<String>,
    pub category: Vec<String>,
    pub country: Vec<String>,
    pub regions: Vec<RegionShortcut>,

    pub min_job_success_score: Option<f64>,
    pub min_hours_logged: Option<f64>,
    pub min_english_level: Option<u8>,
    pub min_hours_per_week: Option<f64>,

    pub posted_after: Option<DateTime<Utc>>,
    pub posted_before: Option<DateTime<Utc>>,
}

impl JobFilter {
    pub fn parse(params: &std::collections::HashMap<String, String>) -> Result<Self, AppError> {
        let get = |k: &str| params.get(k).map(String::as_str);

        let limit = params::parse_limit(get("limit"))?;
        let offset = params::parse_offset(limit, get("offset"))?;
        let sort = match get("sort") {
            Some(raw) => Sort::parse(raw)?,
            None => Sort::DEFAULT,
        };

        let job_type = get("job_type")
            .or_else(|| get("t"))
            .map(|raw| params::parse_enum("job_type", raw))
            .transpose()?;
        let status = get("status")
            .map(|raw| params::parse_enum("status", raw))
            .transpose()?;
        let contractor_tiers = get("contractor_tier")
            .map(|raw| params::parse_enum_csv("contractor_tier", raw))
            .transpose()?
            .unwrap_or_default();

        let payment_verified = get("payment_verified")
            .map(|raw| params::parse_bool("payment_verified", raw))
            .transpose()?;
        let rising_talent = get("rising_talent")
            .map(|raw| params::parse_bool("rising_talent", raw))
            .transpose()?;
        let portfolio_required = get("portfolio_required")
            .map(|raw| params::parse_bool("portfolio_required", raw))
            .transpose()?;

        let budget = match get("budget") {
            Some(raw) => params::parse_range("budget", raw)?,
            None => match get("amount") {
                Some(raw) => params::parse_range("amount", raw)?,
                None => RangeFilter::default(),
            },
        };
        let hourly_rate = get("hourly_rate")
            .map(|raw| params::parse_range("hourly_rate", raw))
            .transpose()?
            .unwrap_or_default();
        let client_hires = get("client_hires")
            .map(|raw| params::parse_range("client_hires", raw))
            .transpose()?
            .unwrap_or_default();

        let tags = get("tags").map(params::parse_csv_set).unwrap_or_default();
        let skills = get("skills").map(params::parse_csv_set).unwrap_or_default();
        let category = get("category").map(params::parse_csv_set).unwrap_or_default();

        let mut country = Vec::new();
        let mut regions = Vec::new();
        if let Some(raw) = get("country").or_else(|| get("location")) {
            for token in params::parse_csv_set(raw) {
                match RegionShortcut::parse(&token) {
                    Some(region) => regions.push(region),
                    None => country.push(token),
                }
            }
        }

        let min_job_success_score = parse_optional_number(get("min_job_success_score"), "min_job_success_score")?;
        let min_hours_logged = parse_optional_number(get("min_hours_logged"), "min_hours_logged")?;
        let min_hours_per_week = parse_optional_number(get("min_hours_per_week"), "min_hours_per_week")?;
        let min_english_level = get("min_english_level")
            .map(|raw| {
                raw.trim()
                    .parse::<u8>()
                    .map_err(|_| AppError::malformed("min_english_level", format!("'{raw}' is not an integer")))
            })
            .transpose()?;

        let posted_after = get("posted_after")
            .map(|raw| params::parse_timestamp("posted_after", raw))
            .transpose()?;
        let posted_before = get("posted_before")
            .map(|raw| params::parse_timestamp("posted_before", raw))
            .transpose()?;

        let search = get("search").or_else(|| get("q")).map(|s| s.to_string());
        if let Some(expr) = &search {
            // Validate eagerly so a malformed boolean expression fails the
            // request here rather than silently matching nothing downstream.
            crate::search::parse(expr).map_err(|e| AppError::malformed("search", e.to_string()))?;
        }

        Ok(JobFilter {
            limit,
            offset,
            sort,
            search,
            job_type,
            status,
            contractor_tiers,
            payment_verified,
            rising_talent,
            portfolio_required,
            budget,
            hourly_rate,
            client_hires,
            tags,
            skills,
            category,
            country,
            regions,
            min_job_success_score,
            min_hours_logged,
            min_english_level,
            min_hours_per_week,
            posted_after,
            posted_before,
        })
    }

    /// Canonical, deterministically-ordered query string. Used both as the
    /// cache-key input (§4.G step 2) and to satisfy the round-trip
    /// testable property `parse(format(filter)) == filter` (§8): every
    /// field present here fully determines its counterpart in `parse`,
    /// and omission of a key always means "default"/`None` on both sides.
    pub fn format(&self) -> String {
        let mut out = String::new();
        let mut push = |k: &str, v: String| {
            if !out.is_empty() {
                out.push('&');
            }
            let _ = write!(out, "{k}={v}");
        };

        push("limit", self.limit.to_string());
        push("offset", self.offset.to_string());
        push("sort", self.sort.canonical().to_string());

        if let Some(search) = &self.search {
            push("search", search.clone());
        }
        if let Some(jt) = self.job_type {
            push("job_type", jt.label().to_string());
        }
        if let Some(status) = self.status {
            push("status", status.label().to_string());
        }
        if !self.contractor_tiers.is_empty() {
            let mut labels: Vec<&str> = self.contractor_tiers.iter().map(|t| t.label()).collect();
            labels.sort_unstable();
            push("contractor_tier", labels.join(","));
        }
        if let Some(b) = self.payment_verified {
            push("payment_verified", b.to_string());
        }
        if let Some(b) = self.rising_talent {
            push("rising_talent", b.to_string());
        }
        if let Some(b) = self.portfolio_required {
            push("portfolio_required", b.to_string());
        }
        push_range(&mut push, "budget", &self.budget);
        push_range(&mut push, "hourly_rate", &self.hourly_rate);
        push_range(&mut push, "client_hires", &self.client_hires);
        push_set(&mut push, "tags", &self.tags);
        push_set(&mut push, "skills", &self.skills);
        push_set(&mut push, "category", &self.category);

        if !self.country.is_empty() || !self.regions.is_empty() {
            let mut tokens: Vec<String> = self.country.clone();
            for region in &self.regions {
                tokens.push(
                    match region {
                        RegionShortcut::Africa => "africa",
                        RegionShortcut::Europe => "europe",
                        RegionShortcut::Caribbean => "caribbean",
                    }
                    .to_string(),
                );
            }
            tokens.sort_unstable_by_key(|t| t.to_ascii_lowercase());
            push("country", tokens.join(","));
        }

        if let Some(v) = self.min_job_success_score {
            push("min_job_success_score", format_number(v));
        }
        if let Some(v) = self.min_hours_logged {
            push("min_hours_logged", format_number(v));
        }
        if let Some(v) = self.min_english_level {
            push("min_english_level", v.to_string());
        }
        if let Some(v) = self.min_hours_per_week {
            push("min_hours_per_week", format_number(v));
        }
        if let Some(t) = self.posted_after {
            push("posted_after", t.to_rfc3339());
        }
        if let Some(t) = self.posted_before {
            push("posted_before", t.to_rfc3339());
        }

        out
    }
}

fn push_range(push: &mut impl FnMut(&str, String), field: &str, range: &RangeFilter) {
    if range.is_empty() {
        return;
    }
    let value = match (range.min, range.max) {
        (Some(min), Some(max)) if min == max => format_number(min),
        (Some(min), Some(max)) => format!("{}-{}", format_number(min), format_number(max)),
        (Some(min), None) => format!("{}-", format_number(min)),
        (None, Some(max)) => format!("-{}", format_number(max)),
        (None, None) => return,
    };
    push(field, value);
}

fn push_set(push: &mut impl FnMut(&str, String), field: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    let mut sorted: Vec<&String> = values.iter().collect();
    sorted.sort_unstable_by_key(|v| v.to_ascii_lowercase());
    push(field, sorted.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(","));
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn parse_optional_number(raw: Option<&str>, field: &str) -> Result<Option<f64>, AppError> {
    raw.map(|raw| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| AppError::malformed(field, format!("'{raw}' is not a number")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn format_then_parse_round_trips() {
        let raw = params(&[
            ("limit", "25"),
            ("offset", "50"),
            ("sort", "budget_desc"),
            ("job_type", "hourly"),
            ("contractor_tier", "expert,entry"),
            ("payment_verified", "true"),
            ("budget", "500-2000"),
            ("tags", "Rust,rust,Go"),
            ("country", "US,africa"),
        ]);
        let filter = JobFilter::parse(&raw).unwrap();
        let formatted = filter.format();
        let reparsed = JobFilter::parse(&parse_query_string(&formatted)).unwrap();
        assert_eq!(filter.format(), reparsed.format());
    }

    #[test]
    fn vendor_sort_aliases_fold_to_default() {
        let recency = params(&[("sort", "recency")]);
        let relevance = params(&[("sort", "relevance")]);
        let none = params(&[]);
        assert_eq!(JobFilter::parse(&recency).unwrap().sort, Sort::DEFAULT);
        assert_eq!(JobFilter::parse(&relevance).unwrap().sort, Sort::DEFAULT);
        assert_eq!(JobFilter::parse(&none).unwrap().sort, Sort::DEFAULT);
    }

    #[test]
    fn region_shortcuts_are_split_from_country_codes() {
        let raw = params(&[("country", "US,africa,CA")]);
        let filter = JobFilter::parse(&raw).unwrap();
        assert_eq!(filter.country, vec!["US".to_string(), "CA".to_string()]);
        assert_eq!(filter.regions, vec![RegionShortcut::Africa]);
    }

    #[test]
    fn budget_sort_requires_in_memory_sort() {
        assert!(Sort {
            field: SortField::Budget,
            direction: SortDirection::Descending
        }
        .needs_in_memory_sort());
        assert!(!Sort::DEFAULT.needs_in_memory_sort());
    }

    fn parse_query_string(s: &str) -> HashMap<String, String> {
        s.split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}
