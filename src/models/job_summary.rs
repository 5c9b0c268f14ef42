use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::JobType;
use super::job::Budget;

/// Narrower projection over the `job_list` sibling collection (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub job_type: Option<JobType>,
    pub duration_label: Option<String>,
    pub engagement: Option<String>,
    pub skills: Vec<String>,
    pub budget: Option<Budget>,
    pub weekly_retainer_budget: Option<f64>,
    pub hourly_min: Option<f64>,
    pub hourly_max: Option<f64>,
    pub hourly_currency: Option<String>,
    pub payment_verified: Option<bool>,
    pub client_country: Option<String>,
    pub ciphertext: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub was_renewed: bool,
    pub last_visited_at: Option<DateTime<Utc>>,
    pub is_contract_to_hire: bool,
    pub premium: bool,
    pub hide_budget: bool,
    pub privacy_reason: Option<String>,
}

impl JobSummary {
    pub fn is_private(&self) -> bool {
        self.privacy_reason.is_some() && self.title.is_none()
    }

    pub fn budget_sort_value(&self) -> Option<f64> {
        let fixed = self.budget.as_ref().and_then(|b| b.fixed_amount);
        match (fixed, self.hourly_max, self.hourly_min) {
            (Some(f), Some(h), _) => Some(f.max(h)),
            (Some(f), None, _) => Some(f),
            (None, Some(h), _) => Some(h),
            (None, None, min) => min,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummaryDto {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub duration_label: Option<String>,
    pub engagement: Option<String>,
    pub skills: Vec<String>,
    pub budget: Option<Budget>,
    pub weekly_retainer_budget: Option<f64>,
    pub hourly_min: Option<f64>,
    pub hourly_max: Option<f64>,
    pub hourly_currency: Option<String>,
    pub payment_verified: Option<bool>,
    pub client_country: Option<String>,
    pub ciphertext: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub was_renewed: bool,
    pub last_visited_at: Option<String>,
    pub is_contract_to_hire: bool,
    pub premium: bool,
    pub hide_budget: bool,
    pub is_private: bool,
    pub privacy_reason: Option<String>,
}
