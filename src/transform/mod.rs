use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::enums::{CodedEnum, ContractorTier, EnglishLevel, JobStatus, JobType};
use crate::models::job::{Budget, Buyer, Category, ClientActivity, HourlyBudget, JobRecord, Location, Qualifications};
use crate::models::job_summary::JobSummary;

/// Candidate paths the ingestion layer has stored the job payload under,
/// newest convention first. Mirrors the tolerant, multi-path extraction the
/// original scraping collector uses for its own vendor payloads — the
/// upstream page's client-side state shape has shifted more than once, and
/// documents written under an older shape still need to parse.
const JOB_PATHS: &[&[&str]] = &[
    &["state", "jobDetails", "job"],
    &["state", "job", "job"],
    &["state", "job"],
    &["job"],
];

const BUYER_PATHS: &[&[&str]] = &[
    &["state", "jobDetails", "buyer"],
    &["state", "job", "buyer"],
    &["buyer"],
];

const ERROR_RESPONSE_PATHS: &[&[&str]] = &[&["state", "job", "errorResponse"], &["errorResponse"]];

fn dig<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = value;
    for segment in path {
        cur = cur.get(segment)?;
    }
    Some(cur)
}

fn find_first<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths.iter().find_map(|p| dig(value, p))
}

fn as_str(v: Option<&Value>) -> Option<String> {
    v.and_then(|v| v.as_str()).map(str::to_string)
}

fn as_f64(v: Option<&Value>) -> Option<f64> {
    v.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

fn as_i64(v: Option<&Value>) -> Option<i64> {
    v.and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

fn as_bool(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map(|i| i != 0).unwrap_or(false),
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

fn as_timestamp(v: Option<&Value>) -> Option<DateTime<Utc>> {
    match v {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        // Upwork-shaped payloads sometimes carry epoch seconds/millis as numbers.
        Some(Value::Number(n)) => n.as_i64().and_then(|epoch| {
            if epoch > 10_000_000_000 {
                Utc.timestamp_millis_opt(epoch).single()
            } else {
                Utc.timestamp_opt(epoch, 0).single()
            }
        }),
        _ => None,
    }
}

fn as_string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

fn as_coded<E: CodedEnum>(v: Option<&Value>) -> Option<E> {
    match v {
        Some(Value::Number(n)) => n.as_i64().and_then(E::from_code),
        Some(Value::String(s)) => E::parse_any(s),
        _ => None,
    }
}

/// Synthesizes the public job URL from the ciphertext vendor id when the
/// payload doesn't carry an explicit URL of its own.
fn synthesize_url(ciphertext: &str) -> String {
    format!("https://www.upwork.com/jobs/{ciphertext}")
}

fn extract_budget(job: &Value) -> (Option<Budget>, Option<HourlyBudget>) {
    // `budget.*` is the newer shape; `amount.*` is the legacy one. Budget
    // wins when both are present (§4.F).
    let fixed_amount = as_f64(dig(job, &["budget", "amount"]))
        .or_else(|| as_f64(dig(job, &["amount", "amount"])))
        .or_else(|| as_f64(dig(job, &["amount"])));
    let fixed_currency = as_str(dig(job, &["budget", "currencyCode"]))
        .or_else(|| as_str(dig(job, &["amount", "currencyCode"])));

    let hourly_min = as_f64(dig(job, &["hourlyBudgetMin"])).or_else(|| as_f64(dig(job, &["hourlyBudget", "min"])));
    let hourly_max = as_f64(dig(job, &["hourlyBudgetMax"])).or_else(|| as_f64(dig(job, &["hourlyBudget", "max"])));
    // Hourly jobs don't always carry their own currency; fall back to the
    // fixed-price currency field rather than leaving it unset (§4.F).
    let hourly_currency = as_str(dig(job, &["hourlyBudget", "currencyCode"])).or_else(|| fixed_currency.clone());

    let budget = fixed_amount.map(|amount| Budget {
        fixed_amount: Some(amount),
        currency: fixed_currency,
    });
    let hourly_budget = if hourly_min.is_some() || hourly_max.is_some() {
        Some(HourlyBudget {
            min: hourly_min,
            max: hourly_max,
            currency: hourly_currency,
        })
    } else {
        None
    };

    (budget, hourly_budget)
}

fn extract_buyer(root: &Value) -> Option<Buyer> {
    let buyer = find_first(root, BUYER_PATHS)?;
    Some(Buyer {
        payment_verified: Some(as_bool(dig(buyer, &["isPaymentMethodVerified"]))),
        country: as_str(dig(buyer, &["location", "country"])),
        city: as_str(dig(buyer, &["location", "city"])),
        timezone: as_str(dig(buyer, &["location", "timezone"])),
        total_spent: as_f64(dig(buyer, &["stats", "totalCharges", "amount"])),
        total_assignments: as_i64(dig(buyer, &["stats", "totalAssignments"])),
        total_jobs_with_hires: as_i64(dig(buyer, &["stats", "hireRate"])),
        active_assignments: as_i64(dig(buyer, &["stats", "activeAssignmentsCount"])),
        feedback_count: as_i64(dig(buyer, &["stats", "feedbackCount"])),
        total_hours: as_f64(dig(buyer, &["stats", "totalHours"])),
        score: as_f64(dig(buyer, &["stats", "score"])),
        company_industry: as_str(dig(buyer, &["company", "industry"])),
        company_size: as_str(dig(buyer, &["company", "size"])),
        contract_date: as_timestamp(dig(buyer, &["stats", "lastContractDate"])),
        open_jobs_count: as_i64(dig(buyer, &["stats", "openJobsCount"])),
    })
}

fn extract_client_activity(job: &Value) -> Option<ClientActivity> {
    let activity = dig(job, &["clientActivity"])?;
    Some(ClientActivity {
        last_buyer_activity: as_timestamp(dig(activity, &["lastBuyerActivity"])),
        total_applicants: as_i64(dig(activity, &["totalApplicants"])),
        total_hired: as_i64(dig(activity, &["totalHired"])),
        total_invited_to_interview: as_i64(dig(activity, &["totalInvitedToInterview"])),
        unanswered_invites: as_i64(dig(activity, &["unansweredInvites"])),
    })
}

fn extract_qualifications(job: &Value) -> Option<Qualifications> {
    let q = dig(job, &["qualifications"])?;
    Some(Qualifications {
        min_job_success_score: as_f64(dig(q, &["minJobSuccessScore"])),
        min_hours_logged: as_f64(dig(q, &["minOdeskHours"])),
        preferred_english_level: as_i64(dig(q, &["englishSkill", "level"])).map(|l| EnglishLevel::clamp_valid(l as u8)),
        rising_talent: Some(as_bool(dig(q, &["risingTalent"]))),
        portfolio_required: Some(as_bool(dig(q, &["requiredPortfolio"]))),
        min_hours_per_week: as_f64(dig(q, &["minHoursPerWeek"])),
    })
}

/// Result of transforming one stored document, which may fan out into the
/// primary job plus zero or more `similarJobs[]` entries (§4.F).
pub struct TransformedJobs {
    pub jobs: Vec<JobRecord>,
}

/// Transforms one raw stored document into the structured domain records
/// it contains, generalizing the optional-chained multi-path JSON
/// extraction used for the vendor job-board payload elsewhere in this
/// codebase. Never errors: a document whose shape doesn't match any known
/// path yields zero records, logged at the call site so the operator can
/// notice a document producing nothing (§4.F / §9).
///
/// `url`/`last_visited_at` are ingestion-level metadata stored alongside
/// the raw vendor payload at the document's top level; when absent there
/// they're recovered from within the vendor payload itself where present.
pub fn transform_document(id: &str, raw: &Value) -> TransformedJobs {
    let url = as_str(dig(raw, &["url"]));
    let last_visited_at = as_timestamp(dig(raw, &["last_visited_at"]));

    if let Some(error_response) = find_first(raw, ERROR_RESPONSE_PATHS) {
        let reason = as_str(dig(error_response, &["message"]))
            .or_else(|| as_str(Some(error_response)))
            .unwrap_or_else(|| "access restricted".to_string());
        return TransformedJobs {
            jobs: vec![JobRecord::placeholder(id.to_string(), url, last_visited_at, &reason)],
        };
    }

    let mut jobs = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();

    if let Some(job_value) = find_first(raw, JOB_PATHS) {
        if let Some(record) = transform_one(id, job_value, raw, url.as_deref(), last_visited_at) {
            seen_ids.insert(record.id.clone());
            jobs.push(record);
        }

        for (idx, similar) in dig(raw, &["state", "similarJobs"])
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
        {
            let similar_id = as_str(dig(similar, &["ciphertext"]))
                .or_else(|| as_str(dig(similar, &["id"])))
                .unwrap_or_else(|| format!("{id}:similar:{idx}"));
            if seen_ids.contains(&similar_id) {
                continue;
            }
            if let Some(record) = transform_one(&similar_id, similar, raw, None, last_visited_at) {
                seen_ids.insert(record.id.clone());
                jobs.push(record);
            }
        }
    }

    TransformedJobs { jobs }
}

fn transform_one(
    id: &str,
    job: &Value,
    root: &Value,
    url: Option<&str>,
    last_visited_at: Option<DateTime<Utc>>,
) -> Option<JobRecord> {
    let ciphertext = as_str(dig(job, &["ciphertext"])).or_else(|| as_str(dig(job, &["id"])));
    let resolved_url = url
        .map(str::to_string)
        .or_else(|| as_str(dig(job, &["url"])))
        .or_else(|| ciphertext.as_deref().map(synthesize_url));

    let (budget, hourly_budget) = extract_budget(job);

    Some(JobRecord {
        id: id.to_string(),
        title: as_str(dig(job, &["title"])),
        description: as_str(dig(job, &["description"])),
        job_type: as_coded::<JobType>(dig(job, &["jobType"])),
        status: as_coded::<JobStatus>(dig(job, &["status"])),
        contractor_tier: as_coded::<ContractorTier>(dig(job, &["contractorTier"])),
        category: Some(Category {
            name: as_str(dig(job, &["category", "name"])),
            slug: as_str(dig(job, &["category", "urlSlug"])),
            group: as_str(dig(job, &["category", "group", "name"])),
            group_slug: as_str(dig(job, &["category", "group", "urlSlug"])),
        }),
        posted_on: as_timestamp(dig(job, &["postedOn"])),
        created_on: as_timestamp(dig(job, &["createdOn"])),
        publish_time: as_timestamp(dig(job, &["publishTime"])).or_else(|| as_timestamp(dig(job, &["postedOn"]))),
        budget,
        hourly_budget,
        buyer: extract_buyer(root),
        client_activity: extract_client_activity(job),
        location: Some(Location {
            country: as_str(dig(job, &["location", "country"])),
            city: as_str(dig(job, &["location", "city"])),
            timezone: as_str(dig(job, &["location", "timezone"])),
        }),
        tags: as_string_list(dig(job, &["tags"])),
        skills: as_string_list(dig(job, &["skills"])).into_iter().chain(as_string_list(dig(job, &["attrs"]))).collect(),
        occupations: as_string_list(dig(job, &["occupations"])),
        duration_label: as_str(dig(job, &["durationLabel"])).map(|v| crate::vocabulary::canonicalize_duration(&v)),
        engagement: as_str(dig(job, &["engagement"])),
        workload: as_str(dig(job, &["workload"])).map(|v| crate::vocabulary::canonicalize_workload(&v)),
        proposals_tier: as_str(dig(job, &["proposalsTier"])).map(|v| crate::vocabulary::canonicalize_proposals_tier(&v)),
        tier_text: as_str(dig(job, &["tierText"])),
        qualifications: extract_qualifications(job),
        weekly_retainer_budget: as_f64(dig(job, &["weeklyRetainerBudget"])),
        is_contract_to_hire: as_bool(dig(job, &["isContractToHire"])),
        number_of_positions: as_i64(dig(job, &["numberOfPositions"])),
        was_renewed: as_bool(dig(job, &["wasRenewed"])),
        premium: as_bool(dig(job, &["premium"])),
        hide_budget: as_bool(dig(job, &["hideBudget"])),
        privacy_reason: None,
        ciphertext,
        recno: as_i64(dig(job, &["recno"])),
        url: resolved_url,
        last_visited_at,
    })
}

/// Narrower transform for the `job_list` collection feeding `/job-list`,
/// which stores summaries rather than full job documents.
pub fn transform_summary(id: &str, raw: &Value) -> Option<JobSummary> {
    let last_visited_at = as_timestamp(dig(raw, &["last_visited_at"]));

    if let Some(error_response) = find_first(raw, ERROR_RESPONSE_PATHS) {
        let reason = as_str(dig(error_response, &["message"])).unwrap_or_else(|| "access restricted".to_string());
        return Some(JobSummary {
            id: id.to_string(),
            title: None,
            description: None,
            job_type: None,
            duration_label: None,
            engagement: None,
            skills: Vec::new(),
            budget: None,
            weekly_retainer_budget: None,
            hourly_min: None,
            hourly_max: None,
            hourly_currency: None,
            payment_verified: None,
            client_country: None,
            ciphertext: None,
            url: None,
            published_at: None,
            was_renewed: false,
            last_visited_at,
            is_contract_to_hire: false,
            premium: false,
            hide_budget: false,
            privacy_reason: Some(reason),
        });
    }

    let job = find_first(raw, JOB_PATHS).unwrap_or(raw);
    let (budget, hourly_budget) = extract_budget(job);
    let ciphertext = as_str(dig(job, &["ciphertext"])).or_else(|| as_str(dig(job, &["id"])));

    Some(JobSummary {
        id: id.to_string(),
        title: as_str(dig(job, &["title"])),
        description: as_str(dig(job, &["description"])),
        job_type: as_coded::<JobType>(dig(job, &["jobType"])),
        duration_label: as_str(dig(job, &["durationLabel"])).map(|v| crate::vocabulary::canonicalize_duration(&v)),
        engagement: as_str(dig(job, &["engagement"])),
        skills: as_string_list(dig(job, &["skills"])),
        weekly_retainer_budget: as_f64(dig(job, &["weeklyRetainerBudget"])),
        hourly_min: hourly_budget.as_ref().and_then(|h| h.min),
        hourly_max: hourly_budget.as_ref().and_then(|h| h.max),
        hourly_currency: hourly_budget.and_then(|h| h.currency),
        payment_verified: find_first(raw, BUYER_PATHS).map(|b| as_bool(dig(b, &["isPaymentMethodVerified"]))),
        client_country: as_str(dig(job, &["location", "country"])),
        url: as_str(dig(job, &["url"])).or_else(|| ciphertext.as_deref().map(synthesize_url)),
        ciphertext,
        budget,
        published_at: as_timestamp(dig(job, &["publishTime"])).or_else(|| as_timestamp(dig(job, &["postedOn"]))),
        was_renewed: as_bool(dig(job, &["wasRenewed"])),
        last_visited_at,
        is_contract_to_hire: as_bool(dig(job, &["isContractToHire"])),
        premium: as_bool(dig(job, &["premium"])),
        hide_budget: as_bool(dig(job, &["hideBudget"])),
        privacy_reason: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_job_from_nested_state_path() {
        let raw = json!({
            "state": {
                "jobDetails": {
                    "job": {
                        "title": "Rust Backend Engineer",
                        "ciphertext": "abc123",
                        "jobType": 1,
                        "budget": { "amount": 2500, "currencyCode": "USD" },
                    },
                    "buyer": { "isPaymentMethodVerified": true }
                }
            }
        });
        let transformed = transform_document("doc1", &raw);
        assert_eq!(transformed.jobs.len(), 1);
        let job = &transformed.jobs[0];
        assert_eq!(job.title.as_deref(), Some("Rust Backend Engineer"));
        assert_eq!(job.job_type, Some(JobType::Hourly));
        assert_eq!(job.budget.as_ref().unwrap().fixed_amount, Some(2500.0));
        assert_eq!(job.url.as_deref(), Some("https://www.upwork.com/jobs/abc123"));
        assert!(job.buyer.as_ref().unwrap().payment_verified.unwrap());
    }

    #[test]
    fn error_response_produces_placeholder() {
        let raw = json!({
            "url": "https://www.upwork.com/jobs/doc2",
            "state": {
                "job": {
                    "errorResponse": { "message": "Forbidden" }
                }
            }
        });
        let transformed = transform_document("doc2", &raw);
        assert_eq!(transformed.jobs.len(), 1);
        assert!(transformed.jobs[0].is_private());
        assert_eq!(transformed.jobs[0].privacy_reason.as_deref(), Some("Forbidden"));
    }

    #[test]
    fn similar_jobs_fan_out_with_duplicate_suppression() {
        let raw = json!({
            "state": {
                "job": {
                    "job": { "ciphertext": "main", "title": "Main Job" }
                },
                "similarJobs": [
                    { "ciphertext": "sim1", "title": "Similar One" },
                    { "ciphertext": "main", "title": "Duplicate Of Main" },
                ]
            }
        });
        let transformed = transform_document("main", &raw);
        let ids: Vec<&str> = transformed.jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["main", "sim1"]);
    }

    #[test]
    fn hourly_budget_falls_back_to_fixed_currency() {
        let raw = json!({
            "job": {
                "title": "Hourly gig",
                "budget": { "amount": 1000, "currencyCode": "EUR" },
                "hourlyBudgetMin": 20,
                "hourlyBudgetMax": 40,
            }
        });
        let transformed = transform_document("doc3", &raw);
        let hourly = transformed.jobs[0].hourly_budget.as_ref().unwrap();
        assert_eq!(hourly.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn unrecognized_shape_yields_no_records() {
        let raw = json!({ "nothing": "here" });
        let transformed = transform_document("doc4", &raw);
        assert!(transformed.jobs.is_empty());
    }
}
