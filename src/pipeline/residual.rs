use crate::filter::{JobFilter, RegionShortcut};
use crate::models::job::JobRecord;
use crate::search;

/// Predicate applied to each candidate record after the origin query and
/// record transform have already narrowed by sort field — everything the
/// origin store's native query can't express on its own (§4.G step 4).
pub fn matches_job(filter: &JobFilter, job: &JobRecord) -> bool {
    if job.is_private() {
        return false;
    }

    if let Some(job_type) = filter.job_type
        && job.job_type != Some(job_type)
    {
        return false;
    }
    if let Some(status) = filter.status
        && job.status != Some(status)
    {
        return false;
    }
    if !filter.contractor_tiers.is_empty() {
        match job.contractor_tier {
            Some(tier) if filter.contractor_tiers.contains(&tier) => {}
            _ => return false,
        }
    }

    let buyer = job.buyer.as_ref();

    if let Some(want) = filter.payment_verified
        && buyer.and_then(|b| b.payment_verified).unwrap_or(false) != want
    {
        return false;
    }

    let qualifications = job.qualifications.as_ref();
    if let Some(want) = filter.rising_talent
        && qualifications.and_then(|q| q.rising_talent).unwrap_or(false) != want
    {
        return false;
    }
    if let Some(want) = filter.portfolio_required
        && qualifications.and_then(|q| q.portfolio_required).unwrap_or(false) != want
    {
        return false;
    }

    if !filter.budget.is_empty() {
        match job.budget_sort_value() {
            Some(value) if filter.budget.contains(value) => {}
            _ => return false,
        }
    }
    if !filter.hourly_rate.is_empty() {
        let in_range = job
            .hourly_budget
            .as_ref()
            .map(|h| h.min.is_some_and(|v| filter.hourly_rate.contains(v)) || h.max.is_some_and(|v| filter.hourly_rate.contains(v)))
            .unwrap_or(false);
        if !in_range {
            return false;
        }
    }
    if !filter.client_hires.is_empty() {
        match buyer.and_then(|b| b.total_jobs_with_hires) {
            Some(v) if filter.client_hires.contains(v as f64) => {}
            _ => return false,
        }
    }

    if !filter.tags.is_empty() && !csv_overlaps(&filter.tags, &job.tags) {
        return false;
    }
    if !filter.skills.is_empty() && !csv_overlaps(&filter.skills, &job.skills) {
        return false;
    }
    if !filter.category.is_empty() {
        let matches = job
            .category
            .as_ref()
            .and_then(|c| c.slug.as_deref().or(c.name.as_deref()))
            .is_some_and(|cat| filter.category.iter().any(|want| want.eq_ignore_ascii_case(cat)));
        if !matches {
            return false;
        }
    }

    if !filter.country.is_empty() || !filter.regions.is_empty() {
        let country = job.location.as_ref().and_then(|l| l.country.as_deref());
        let timezone = buyer.and_then(|b| b.timezone.as_deref());
        let by_country = country.is_some_and(|c| filter.country.iter().any(|want| want.eq_ignore_ascii_case(c)));
        let by_region = filter.regions.iter().any(|region| matches_region(*region, country, timezone));
        if !(by_country || by_region) {
            return false;
        }
    }

    if let Some(min) = filter.min_job_success_score
        && qualifications.and_then(|q| q.min_job_success_score).unwrap_or(0.0) < min
    {
        return false;
    }
    if let Some(min) = filter.min_hours_logged
        && qualifications.and_then(|q| q.min_hours_logged).unwrap_or(0.0) < min
    {
        return false;
    }
    if let Some(min) = filter.min_hours_per_week
        && qualifications.and_then(|q| q.min_hours_per_week).unwrap_or(0.0) < min
    {
        return false;
    }
    if let Some(min) = filter.min_english_level
        && qualifications.and_then(|q| q.preferred_english_level).map(|l| l.0).unwrap_or(0) < min
    {
        return false;
    }

    if let Some(after) = filter.posted_after
        && job.publish_time.is_none_or(|t| t < after)
    {
        return false;
    }
    if let Some(before) = filter.posted_before
        && job.publish_time.is_none_or(|t| t > before)
    {
        return false;
    }

    if let Some(raw) = &filter.search {
        match search::parse(raw) {
            Ok(Some(expr)) => {
                let haystack = record_haystack(job);
                let tokens = search::tokenize_record_text(&haystack);
                if !search::matches(&expr, &haystack.to_lowercase(), &tokens) {
                    return false;
                }
            }
            Ok(None) => {}
            Err(_) => return false,
        }
    }

    true
}

fn matches_region(region: RegionShortcut, country: Option<&str>, timezone: Option<&str>) -> bool {
    if let Some(tz) = timezone
        && region.timezone_prefixes().iter().any(|prefix| tz.starts_with(prefix))
    {
        if region == RegionShortcut::Caribbean {
            // `America/` also covers non-Caribbean zones; narrow further
            // with the country allowlist below rather than trusting the
            // prefix alone.
        } else {
            return true;
        }
    }
    if region == RegionShortcut::Caribbean
        && let Some(c) = country
    {
        return RegionShortcut::caribbean_countries().iter().any(|want| want.eq_ignore_ascii_case(c));
    }
    false
}

fn csv_overlaps(wanted: &[String], actual: &[String]) -> bool {
    wanted.iter().any(|w| actual.iter().any(|a| a.eq_ignore_ascii_case(w)))
}

/// Per-record text index for the search expression evaluator (§4.E):
/// title, description, engagement, duration, workload, tags, skills,
/// occupations, and category/buyer textual fields, concatenated.
fn record_haystack(job: &JobRecord) -> String {
    let mut parts = Vec::new();
    parts.extend(job.title.iter().cloned());
    parts.extend(job.description.iter().cloned());
    parts.extend(job.engagement.iter().cloned());
    parts.extend(job.duration_label.iter().cloned());
    parts.extend(job.workload.iter().cloned());
    parts.extend(job.tags.iter().cloned());
    parts.extend(job.skills.iter().cloned());
    parts.extend(job.occupations.iter().cloned());
    if let Some(category) = &job.category {
        parts.extend(category.name.iter().cloned());
        parts.extend(category.group.iter().cloned());
    }
    if let Some(buyer) = &job.buyer {
        parts.extend(buyer.country.iter().cloned());
        parts.extend(buyer.city.iter().cloned());
        parts.extend(buyer.company_industry.iter().cloned());
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_job() -> JobRecord {
        let mut job = JobRecord::placeholder("j1".into(), None, None, "unused");
        job.privacy_reason = None;
        job.title = Some("Senior Rust Backend Engineer".into());
        job.tags = vec!["rust".into(), "backend".into()];
        job
    }

    #[test]
    fn private_placeholder_never_matches() {
        let filter = JobFilter::parse(&HashMap::new()).unwrap();
        let placeholder = JobRecord::placeholder("p1".into(), None, None, "forbidden");
        assert!(!matches_job(&filter, &placeholder));
    }

    #[test]
    fn search_expression_filters_on_title() {
        let mut params = HashMap::new();
        params.insert("search".to_string(), "rust AND backend".to_string());
        let filter = JobFilter::parse(&params).unwrap();
        assert!(matches_job(&filter, &base_job()));

        let mut params2 = HashMap::new();
        params2.insert("search".to_string(), "python".to_string());
        let filter2 = JobFilter::parse(&params2).unwrap();
        assert!(!matches_job(&filter2, &base_job()));
    }

    #[test]
    fn tag_filter_is_case_insensitive() {
        let mut params = HashMap::new();
        params.insert("tags".to_string(), "RUST".to_string());
        let filter = JobFilter::parse(&params).unwrap();
        assert!(matches_job(&filter, &base_job()));
    }
}
