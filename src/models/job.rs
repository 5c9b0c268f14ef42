use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ContractorTier, EnglishLevel, JobStatus, JobType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub group: Option<String>,
    pub group_slug: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Budget {
    pub fixed_amount: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlyBudget {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Buyer {
    pub payment_verified: Option<bool>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub timezone: Option<String>,
    pub total_spent: Option<f64>,
    pub total_assignments: Option<i64>,
    pub total_jobs_with_hires: Option<i64>,
    pub active_assignments: Option<i64>,
    pub feedback_count: Option<i64>,
    pub total_hours: Option<f64>,
    pub score: Option<f64>,
    pub company_industry: Option<String>,
    pub company_size: Option<String>,
    pub contract_date: Option<DateTime<Utc>>,
    pub open_jobs_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientActivity {
    pub last_buyer_activity: Option<DateTime<Utc>>,
    pub total_applicants: Option<i64>,
    pub total_hired: Option<i64>,
    pub total_invited_to_interview: Option<i64>,
    pub unanswered_invites: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    pub country: Option<String>,
    pub city: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Qualifications {
    pub min_job_success_score: Option<f64>,
    pub min_hours_logged: Option<f64>,
    pub preferred_english_level: Option<EnglishLevel>,
    pub rising_talent: Option<bool>,
    pub portfolio_required: Option<bool>,
    pub min_hours_per_week: Option<f64>,
}

/// The full job record described by the data model. `is_private()` reports
/// whether this is a placeholder (see `JobRecord::placeholder`): every
/// field but id/url/last_visited/privacy_reason is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub job_type: Option<JobType>,
    pub status: Option<JobStatus>,
    pub contractor_tier: Option<ContractorTier>,
    pub category: Option<Category>,
    pub posted_on: Option<DateTime<Utc>>,
    pub created_on: Option<DateTime<Utc>>,
    pub publish_time: Option<DateTime<Utc>>,
    pub budget: Option<Budget>,
    pub hourly_budget: Option<HourlyBudget>,
    pub buyer: Option<Buyer>,
    pub client_activity: Option<ClientActivity>,
    pub location: Option<Location>,
    pub tags: Vec<String>,
    pub skills: Vec<String>,
    pub occupations: Vec<String>,
    pub duration_label: Option<String>,
    pub engagement: Option<String>,
    pub workload: Option<String>,
    pub proposals_tier: Option<String>,
    pub tier_text: Option<String>,
    pub qualifications: Option<Qualifications>,
    pub weekly_retainer_budget: Option<f64>,
    pub is_contract_to_hire: bool,
    pub number_of_positions: Option<i64>,
    pub was_renewed: bool,
    pub premium: bool,
    pub hide_budget: bool,
    pub privacy_reason: Option<String>,
    pub ciphertext: Option<String>,
    pub recno: Option<i64>,
    pub url: Option<String>,
    pub last_visited_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// A minimal record emitted when the ingestion layer reported the job
    /// as access-restricted (403). Per the data model invariants, it carries
    /// only identifier, URL, last-visited, and the privacy reason.
    pub fn placeholder(
        id: String,
        url: Option<String>,
        last_visited_at: Option<DateTime<Utc>>,
        reason: &str,
    ) -> Self {
        Self {
            id,
            title: None,
            description: None,
            job_type: None,
            status: None,
            contractor_tier: None,
            category: None,
            posted_on: None,
            created_on: None,
            publish_time: None,
            budget: None,
            hourly_budget: None,
            buyer: None,
            client_activity: None,
            location: None,
            tags: Vec::new(),
            skills: Vec::new(),
            occupations: Vec::new(),
            duration_label: None,
            engagement: None,
            workload: None,
            proposals_tier: None,
            tier_text: None,
            qualifications: None,
            weekly_retainer_budget: None,
            is_contract_to_hire: false,
            number_of_positions: None,
            was_renewed: false,
            premium: false,
            hide_budget: false,
            privacy_reason: Some(reason.to_string()),
            ciphertext: None,
            recno: None,
            url,
            last_visited_at,
        }
    }

    pub fn is_private(&self) -> bool {
        self.privacy_reason.is_some() && self.title.is_none()
    }

    /// Effective sort value for budget-sort: prefer the greater of fixed
    /// amount and hourly max, falling back to hourly min, per §4.G step 5 —
    /// a record may only carry hourly data.
    pub fn budget_sort_value(&self) -> Option<f64> {
        let fixed = self.budget.as_ref().and_then(|b| b.fixed_amount);
        let hourly_max = self.hourly_budget.as_ref().and_then(|h| h.max);
        let hourly_min = self.hourly_budget.as_ref().and_then(|h| h.min);

        match (fixed, hourly_max, hourly_min) {
            (Some(f), Some(h), _) => Some(f.max(h)),
            (Some(f), None, _) => Some(f),
            (None, Some(h), _) => Some(h),
            (None, None, min) => min,
        }
    }
}

/// Wire shape for the `/jobs` DTO (§6): enums rendered as labels, timestamps
/// as RFC 3339 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDto {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub contractor_tier: Option<String>,
    pub posted_on: Option<String>,
    pub created_on: Option<String>,
    pub publish_time: Option<String>,
    pub publish_time_relative: Option<String>,
    pub category: Option<Category>,
    pub budget: Option<Budget>,
    pub hourly_budget: Option<HourlyBudget>,
    pub buyer: Option<Buyer>,
    pub client_activity: Option<ClientActivity>,
    pub location: Option<Location>,
    pub tags: Vec<String>,
    pub skills: Vec<String>,
    pub occupations: Vec<String>,
    pub url: Option<String>,
    pub last_visited_at: Option<String>,
    pub duration_label: Option<String>,
    pub engagement: Option<String>,
    pub workload: Option<String>,
    pub is_contract_to_hire: bool,
    pub number_of_positions: Option<i64>,
    pub was_renewed: bool,
    pub premium: bool,
    pub hide_budget: bool,
    pub proposals_tier: Option<String>,
    pub tier_text: Option<String>,
    pub qualifications: Option<Qualifications>,
    pub weekly_retainer_budget: Option<f64>,
    pub is_private: bool,
    pub privacy_reason: Option<String>,
    pub ciphertext: Option<String>,
    pub recno: Option<i64>,
}
