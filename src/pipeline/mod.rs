mod residual;
mod sort;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;

use crate::cache::{CacheStore, CacheStoreExt, keys};
use crate::error::AppError;
use crate::filter::JobFilter;
use crate::models::job::{JobDto, JobRecord};
use crate::models::job_summary::{JobSummary, JobSummaryDto};
use crate::origin::{Origin, OriginStore};
use crate::transform;

/// Overall deadline for one query, from cache lookup through origin query,
/// transform, filter, sort, and cache write-back. A query that can't
/// complete in this window is cancelled rather than left to run
/// indefinitely against a degraded origin store (§4.G / §5).
const QUERY_DEADLINE: Duration = Duration::from_secs(20);

/// Floor/ceiling on how many documents are pulled per request regardless
/// of `limit`/`offset`, so a large offset on a narrow filter can't turn
/// into an unbounded table scan (§4.G step 3).
const OVERFETCH_FLOOR: u32 = 100;
const OVERFETCH_CEILING: u32 = 500;

const RESPONSE_CACHE_TTL: Duration = Duration::from_secs(60);

pub struct QueryResult<T> {
    pub data: Vec<T>,
    pub count: usize,
    pub last_updated: chrono::DateTime<Utc>,
    pub from_cache: bool,
}

fn overfetch_for(filter: &JobFilter) -> u32 {
    let base = (filter.limit + filter.offset) * 3;
    let base = base.max(OVERFETCH_FLOOR).min(OVERFETCH_CEILING);
    if filter.sort.needs_in_memory_sort() {
        (base * 2).min(OVERFETCH_CEILING * 2)
    } else {
        base
    }
}

pub struct QueryPipeline<C, O = OriginStore> {
    cache: Arc<C>,
    origin: O,
}

impl<C: CacheStore + 'static, O: Origin + 'static> QueryPipeline<C, O> {
    pub fn new(cache: Arc<C>, origin: O) -> Self {
        Self { cache, origin }
    }

    pub async fn query_jobs(&self, filter: &JobFilter) -> Result<QueryResult<JobDto>, AppError> {
        let cache_key = keys::response_key("jobs", &filter.format());

        // A cache transport failure degrades to a miss rather than failing
        // the request — the origin store is still authoritative (§7 kind 4).
        let cached = match self.cache.get::<Vec<JobDto>>(&cache_key).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("response cache read failed, treating as miss: {e}");
                None
            }
        };
        if let Some(cached) = cached {
            let _ = self.cache.increment(keys::STATS_HITS).await;
            return Ok(QueryResult {
                count: cached.len(),
                data: cached,
                last_updated: Utc::now(),
                from_cache: true,
            });
        }
        let _ = self.cache.increment(keys::STATS_MISSES).await;

        let run = self.run_jobs(filter);
        let records = tokio::time::timeout(QUERY_DEADLINE, run)
            .await
            .map_err(|_| AppError::Cancelled)??;

        let dtos: Vec<JobDto> = records.iter().map(to_job_dto).collect();

        // Best-effort write-back: a cache failure here degrades to an
        // extra origin query next time, not a failed request (§4.A / §9).
        if let Err(e) = self.cache.set(&cache_key, &dtos, RESPONSE_CACHE_TTL).await {
            tracing::warn!("response cache write-back failed: {e}");
        }

        Ok(QueryResult {
            count: dtos.len(),
            data: dtos,
            last_updated: Utc::now(),
            from_cache: false,
        })
    }

    async fn run_jobs(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, AppError> {
        let overfetch = overfetch_for(filter);
        let mut stream = self
            .origin
            .stream_jobs(filter.sort.native_field(), matches!(filter.sort.direction, crate::filter::SortDirection::Descending), overfetch)
            .await
            .map_err(|e| AppError::Origin(e.to_string()))?;

        let mut matched = Vec::new();
        let mut seen_documents = 0usize;
        let mut seen_ids = std::collections::HashSet::new();
        while let Some(item) = stream.next().await {
            let (doc_id, raw) = item.map_err(|e| AppError::Origin(e.to_string()))?;
            seen_documents += 1;
            let transformed = transform::transform_document(&doc_id, &raw);
            if transformed.jobs.is_empty() {
                tracing::warn!(document = %doc_id, "document yielded zero job records");
            }
            for record in transformed.jobs {
                // Per-response dedup (§3): a record may already have surfaced
                // as a `similarJobs` fan-out of an earlier document.
                if record.id.is_empty() || !seen_ids.insert(record.id.clone()) {
                    continue;
                }
                if residual::matches_job(filter, &record) {
                    matched.push(record);
                }
            }
        }
        if seen_documents == 0 {
            tracing::warn!("origin query for jobs returned zero documents");
        }

        sort::sort_jobs(&mut matched, filter.sort);

        let start = (filter.offset as usize).min(matched.len());
        let end = (start + filter.limit as usize).min(matched.len());
        Ok(matched[start..end].to_vec())
    }

    pub async fn query_job_list(&self, filter: &JobFilter) -> Result<QueryResult<JobSummaryDto>, AppError> {
        let cache_key = keys::response_key("job-list", &filter.format());

        let cached = match self.cache.get::<Vec<JobSummaryDto>>(&cache_key).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("response cache read failed, treating as miss: {e}");
                None
            }
        };
        if let Some(cached) = cached {
            let _ = self.cache.increment(keys::STATS_HITS).await;
            return Ok(QueryResult {
                count: cached.len(),
                data: cached,
                last_updated: Utc::now(),
                from_cache: true,
            });
        }
        let _ = self.cache.increment(keys::STATS_MISSES).await;

        let run = self.run_job_list(filter);
        let records = tokio::time::timeout(QUERY_DEADLINE, run)
            .await
            .map_err(|_| AppError::Cancelled)??;

        let dtos: Vec<JobSummaryDto> = records.iter().map(to_summary_dto).collect();

        if let Err(e) = self.cache.set(&cache_key, &dtos, RESPONSE_CACHE_TTL).await {
            tracing::warn!("response cache write-back failed: {e}");
        }

        Ok(QueryResult {
            count: dtos.len(),
            data: dtos,
            last_updated: Utc::now(),
            from_cache: false,
        })
    }

    async fn run_job_list(&self, filter: &JobFilter) -> Result<Vec<JobSummary>, AppError> {
        let overfetch = overfetch_for(filter);
        let mut stream = self
            .origin
            .stream_job_summaries(filter.sort.native_field(), matches!(filter.sort.direction, crate::filter::SortDirection::Descending), overfetch)
            .await
            .map_err(|e| AppError::Origin(e.to_string()))?;

        let mut matched = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();
        while let Some(item) = stream.next().await {
            let (doc_id, raw) = item.map_err(|e| AppError::Origin(e.to_string()))?;
            if let Some(summary) = transform::transform_summary(&doc_id, &raw)
                && !summary.id.is_empty()
                && seen_ids.insert(summary.id.clone())
                && matches_summary(filter, &summary)
            {
                matched.push(summary);
            }
        }

        sort::sort_summaries(&mut matched, filter.sort);

        let start = (filter.offset as usize).min(matched.len());
        let end = (start + filter.limit as usize).min(matched.len());
        Ok(matched[start..end].to_vec())
    }
}

/// Narrower residual predicate for `job_list`, whose documents carry
/// fewer fields than a full job record — only the dimensions the summary
/// shape can actually answer are checked (§4.G step 4 / §3).
fn matches_summary(filter: &JobFilter, summary: &JobSummary) -> bool {
    if summary.is_private() {
        return false;
    }
    if let Some(job_type) = filter.job_type
        && summary.job_type != Some(job_type)
    {
        return false;
    }
    if let Some(want) = filter.payment_verified
        && summary.payment_verified.unwrap_or(false) != want
    {
        return false;
    }
    if !filter.budget.is_empty() {
        match summary.budget_sort_value() {
            Some(value) if filter.budget.contains(value) => {}
            _ => return false,
        }
    }
    if !filter.country.is_empty() {
        let matches = summary
            .client_country
            .as_deref()
            .is_some_and(|c| filter.country.iter().any(|want| want.eq_ignore_ascii_case(c)));
        if !matches {
            return false;
        }
    }
    if let Some(raw) = &filter.search
        && let Ok(Some(expr)) = crate::search::parse(raw)
    {
        let mut parts: Vec<&str> = Vec::new();
        parts.extend(summary.title.as_deref());
        parts.extend(summary.description.as_deref());
        parts.extend(summary.engagement.as_deref());
        parts.extend(summary.duration_label.as_deref());
        let skills: Vec<&str> = summary.skills.iter().map(String::as_str).collect();
        parts.extend(skills);
        let haystack = parts.join(" ");
        let tokens = crate::search::tokenize_record_text(&haystack);
        if !crate::search::matches(&expr, &haystack.to_lowercase(), &tokens) {
            return false;
        }
    }
    true
}

fn relative_time(from: chrono::DateTime<Utc>) -> String {
    let delta = Utc::now().signed_duration_since(from);
    let seconds = delta.num_seconds();
    if seconds < 1 {
        // Sub-second deltas and future times (publish_time set slightly
        // ahead of when this query runs) both read as "just now" (§4.G
        // step 7) rather than "0 seconds ago" or a tense that implies the
        // clock skew is meaningful.
        return "just now".to_string();
    }
    let (value, unit) = if seconds < 60 {
        (seconds, "second")
    } else if seconds < 3600 {
        (seconds / 60, "minute")
    } else if seconds < 86_400 {
        (seconds / 3600, "hour")
    } else {
        (seconds / 86_400, "day")
    };
    let plural = if value == 1 { "" } else { "s" };
    format!("{value} {unit}{plural} ago")
}

fn to_job_dto(job: &JobRecord) -> JobDto {
    JobDto {
        id: job.id.clone(),
        title: job.title.clone(),
        description: job.description.clone(),
        job_type: job.job_type.map(|t| t.label().to_string()),
        status: job.status.map(|s| s.label().to_string()),
        contractor_tier: job.contractor_tier.map(|t| t.label().to_string()),
        posted_on: job.posted_on.map(|t| t.to_rfc3339()),
        created_on: job.created_on.map(|t| t.to_rfc3339()),
        publish_time: job.publish_time.map(|t| t.to_rfc3339()),
        publish_time_relative: job.publish_time.map(relative_time),
        category: job.category.clone(),
        budget: job.budget.clone(),
        hourly_budget: job.hourly_budget.clone(),
        buyer: job.buyer.clone(),
        client_activity: job.client_activity.clone(),
        location: job.location.clone(),
        tags: job.tags.clone(),
        skills: job.skills.clone(),
        occupations: job.occupations.clone(),
        url: job.url.clone(),
        last_visited_at: job.last_visited_at.map(|t| t.to_rfc3339()),
        duration_label: job.duration_label.clone(),
        engagement: job.engagement.clone(),
        workload: job.workload.clone(),
        is_contract_to_hire: job.is_contract_to_hire,
        number_of_positions: job.number_of_positions,
        was_renewed: job.was_renewed,
        premium: job.premium,
        hide_budget: job.hide_budget,
        proposals_tier: job.proposals_tier.clone(),
        tier_text: job.tier_text.clone(),
        qualifications: job.qualifications.clone(),
        weekly_retainer_budget: job.weekly_retainer_budget,
        is_private: job.is_private(),
        privacy_reason: job.privacy_reason.clone(),
        ciphertext: job.ciphertext.clone(),
        recno: job.recno,
    }
}

fn to_summary_dto(summary: &JobSummary) -> JobSummaryDto {
    JobSummaryDto {
        id: summary.id.clone(),
        title: summary.title.clone(),
        description: summary.description.clone(),
        job_type: summary.job_type.map(|t| t.label().to_string()),
        duration_label: summary.duration_label.clone(),
        engagement: summary.engagement.clone(),
        skills: summary.skills.clone(),
        budget: summary.budget.clone(),
        weekly_retainer_budget: summary.weekly_retainer_budget,
        hourly_min: summary.hourly_min,
        hourly_max: summary.hourly_max,
        hourly_currency: summary.hourly_currency.clone(),
        payment_verified: summary.payment_verified,
        client_country: summary.client_country.clone(),
        ciphertext: summary.ciphertext.clone(),
        url: summary.url.clone(),
        published_at: summary.published_at.map(|t| t.to_rfc3339()),
        was_renewed: summary.was_renewed,
        last_visited_at: summary.last_visited_at.map(|t| t.to_rfc3339()),
        is_contract_to_hire: summary.is_contract_to_hire,
        premium: summary.premium,
        hide_budget: summary.hide_budget,
        is_private: summary.is_private(),
        privacy_reason: summary.privacy_reason.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::cache::{CacheError, CacheStore, InMemoryCache};
    use crate::origin::fake::FakeOrigin;

    #[test]
    fn relative_time_reads_just_now_for_sub_second_and_future() {
        let now = Utc::now();
        assert_eq!(relative_time(now), "just now");
        assert_eq!(relative_time(now + chrono::Duration::minutes(5)), "just now");
    }

    #[test]
    fn relative_time_picks_appropriate_unit() {
        let now = Utc::now();
        assert_eq!(relative_time(now - chrono::Duration::seconds(30)), "30 seconds ago");
        assert!(relative_time(now - chrono::Duration::hours(3)).contains("hour"));
        assert!(relative_time(now - chrono::Duration::days(2)).contains("day"));
    }

    #[test]
    fn overfetch_doubles_for_in_memory_sort() {
        let mut params = HashMap::new();
        params.insert("limit".to_string(), "20".to_string());
        params.insert("sort".to_string(), "budget_desc".to_string());
        let filter = JobFilter::parse(&params).unwrap();
        let without_budget = {
            let mut p2 = params.clone();
            p2.insert("sort".to_string(), "publish_time_desc".to_string());
            JobFilter::parse(&p2).unwrap()
        };
        assert!(overfetch_for(&filter) >= overfetch_for(&without_budget));
    }

    fn job_document(ciphertext: &str, publish_time: &str, fixed_amount: Option<f64>) -> (String, Value) {
        let mut job = json!({
            "ciphertext": ciphertext,
            "title": format!("Job {ciphertext}"),
            "publishTime": publish_time,
        });
        if let Some(amount) = fixed_amount {
            job["budget"] = json!({ "amount": amount, "currencyCode": "USD" });
        }
        (ciphertext.to_string(), json!({ "job": job }))
    }

    /// A `CacheStore` whose reads always fail, used to prove the query
    /// pipeline degrades a cache transport error to a miss rather than
    /// failing the request (§7 kind 4).
    #[derive(Default)]
    struct FailingCache;

    #[async_trait]
    impl CacheStore for FailingCache {
        async fn get_raw(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Transport("connection refused".into()))
        }
        async fn set_raw(&self, _key: &str, _value: String, _ttl: StdDuration) -> Result<(), CacheError> {
            Ok(())
        }
        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Ok(false)
        }
        async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
            Ok(false)
        }
        async fn set_if_absent_raw(&self, _key: &str, _value: String, _ttl: StdDuration) -> Result<bool, CacheError> {
            Ok(true)
        }
        async fn increment(&self, _counter: &str) -> Result<i64, CacheError> {
            Err(CacheError::Transport("connection refused".into()))
        }
        async fn scan_prefix(&self, _prefix: &str) -> Result<Vec<String>, CacheError> {
            Ok(Vec::new())
        }
    }

    fn empty_filter() -> JobFilter {
        JobFilter::parse(&HashMap::new()).unwrap()
    }

    #[tokio::test]
    async fn query_jobs_preserves_origin_order_and_paginates() {
        let jobs = vec![
            job_document("c", "2026-01-03T00:00:00Z", None),
            job_document("b", "2026-01-02T00:00:00Z", None),
            job_document("a", "2026-01-01T00:00:00Z", None),
        ];
        let pipeline = QueryPipeline::new(Arc::new(InMemoryCache::new()), FakeOrigin::with_jobs(jobs));

        let mut params = HashMap::new();
        params.insert("limit".to_string(), "1".to_string());
        params.insert("offset".to_string(), "1".to_string());
        let filter = JobFilter::parse(&params).unwrap();

        let result = pipeline.query_jobs(&filter).await.unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.data[0].id, "b");
        assert!(!result.from_cache);
    }

    #[tokio::test]
    async fn query_jobs_sorts_by_budget_in_memory() {
        let jobs = vec![
            job_document("low", "2026-01-01T00:00:00Z", Some(50.0)),
            job_document("high", "2026-01-01T00:00:00Z", Some(500.0)),
            job_document("none", "2026-01-01T00:00:00Z", None),
        ];
        let pipeline = QueryPipeline::new(Arc::new(InMemoryCache::new()), FakeOrigin::with_jobs(jobs));

        let mut params = HashMap::new();
        params.insert("sort".to_string(), "budget_desc".to_string());
        let filter = JobFilter::parse(&params).unwrap();

        let result = pipeline.query_jobs(&filter).await.unwrap();
        let ids: Vec<&str> = result.data.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low", "none"]);
    }

    #[tokio::test]
    async fn query_jobs_applies_budget_range_filter() {
        let jobs = vec![
            job_document("cheap", "2026-01-01T00:00:00Z", Some(50.0)),
            job_document("mid", "2026-01-01T00:00:00Z", Some(500.0)),
            job_document("expensive", "2026-01-01T00:00:00Z", Some(5000.0)),
        ];
        let pipeline = QueryPipeline::new(Arc::new(InMemoryCache::new()), FakeOrigin::with_jobs(jobs));

        let mut params = HashMap::new();
        params.insert("budget".to_string(), "100-1000".to_string());
        let filter = JobFilter::parse(&params).unwrap();

        let result = pipeline.query_jobs(&filter).await.unwrap();
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].id, "mid");
    }

    #[tokio::test]
    async fn query_jobs_second_call_is_served_from_cache() {
        let jobs = vec![job_document("only", "2026-01-01T00:00:00Z", None)];
        let pipeline = QueryPipeline::new(Arc::new(InMemoryCache::new()), FakeOrigin::with_jobs(jobs));
        let filter = empty_filter();

        let first = pipeline.query_jobs(&filter).await.unwrap();
        assert!(!first.from_cache);
        let second = pipeline.query_jobs(&filter).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.data.len(), first.data.len());
    }

    #[tokio::test]
    async fn query_jobs_falls_through_to_origin_when_cache_read_fails() {
        let jobs = vec![job_document("only", "2026-01-01T00:00:00Z", None)];
        let pipeline = QueryPipeline::new(Arc::new(FailingCache), FakeOrigin::with_jobs(jobs));

        let result = pipeline.query_jobs(&empty_filter()).await.unwrap();
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].id, "only");
    }
}
