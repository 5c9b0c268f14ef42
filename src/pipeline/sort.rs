use crate::filter::{Sort, SortDirection, SortField};
use crate::models::job::JobRecord;
use crate::models::job_summary::JobSummary;

/// Applies the in-memory budget sort (§4.G step 5). Records with no
/// resolvable budget value, and records whose resolved value is exactly
/// zero, sort to the end regardless of direction — a zero-valued budget
/// carries the same "nothing to rank by" signal as a missing one, not a
/// real floor price.
pub fn sort_jobs(records: &mut [JobRecord], sort: Sort) {
    if sort.field != SortField::Budget {
        return;
    }
    records.sort_by(|a, b| {
        compare_optional(effective_budget(a.budget_sort_value()), effective_budget(b.budget_sort_value()), sort.direction)
            .then_with(|| compare_id(&a.id, &b.id, sort.direction))
    });
}

pub fn sort_summaries(records: &mut [JobSummary], sort: Sort) {
    if sort.field != SortField::Budget {
        return;
    }
    records.sort_by(|a, b| {
        compare_optional(effective_budget(a.budget_sort_value()), effective_budget(b.budget_sort_value()), sort.direction)
            .then_with(|| compare_id(&a.id, &b.id, sort.direction))
    });
}

fn effective_budget(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

fn compare_optional(a: Option<f64>, b: Option<f64>, direction: SortDirection) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
    }
}

/// Ties break by id in the current sort direction (§4.G step 5), so equal
/// budget values still produce a stable, deterministic order across pages.
fn compare_id(a: &str, b: &str, direction: SortDirection) -> std::cmp::Ordering {
    match direction {
        SortDirection::Ascending => a.cmp(b),
        SortDirection::Descending => b.cmp(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Sort;
    use crate::models::job::{Budget, HourlyBudget};

    fn job(id: &str, fixed: Option<f64>, hourly_max: Option<f64>) -> JobRecord {
        let mut j = JobRecord::placeholder(id.to_string(), None, None, "x");
        j.privacy_reason = None;
        j.budget = fixed.map(|f| Budget { fixed_amount: Some(f), currency: None });
        j.hourly_budget = hourly_max.map(|h| HourlyBudget { min: None, max: Some(h), currency: None });
        j
    }

    #[test]
    fn missing_budget_sorts_to_end_regardless_of_direction() {
        let mut records = vec![job("a", Some(100.0), None), job("b", None, None), job("c", Some(50.0), None)];
        sort_jobs(
            &mut records,
            Sort { field: SortField::Budget, direction: SortDirection::Descending },
        );
        assert_eq!(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["a", "c", "b"]);

        let mut records2 = vec![job("a", Some(100.0), None), job("b", None, None), job("c", Some(50.0), None)];
        sort_jobs(
            &mut records2,
            Sort { field: SortField::Budget, direction: SortDirection::Ascending },
        );
        assert_eq!(records2.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["c", "a", "b"]);
    }

    #[test]
    fn zero_valued_budget_sorts_to_end_like_missing() {
        let mut records = vec![job("a", Some(100.0), None), job("zero", Some(0.0), None), job("b", None, None)];
        sort_jobs(
            &mut records,
            Sort { field: SortField::Budget, direction: SortDirection::Descending },
        );
        assert_eq!(records[0].id, "a");
        assert!(records[1..].iter().map(|r| r.id.as_str()).collect::<Vec<_>>().contains(&"zero"));
        assert!(records[1..].iter().map(|r| r.id.as_str()).collect::<Vec<_>>().contains(&"b"));
    }
}
