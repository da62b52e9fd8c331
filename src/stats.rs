use crate::error::{Error, Result};
use crate::models::{ApplicationRecord, CompanyStats, Status};
use crate::store::{COMPANIES, JOBS, RecordStore, USERS};

/// Per-company snapshot of the full applicant set. One fetch; any
/// gateway failure surfaces whole as `StatsUnavailable`, never as
/// partial numbers.
pub fn compute_stats(store: &dyn RecordStore, company_name: &str) -> Result<CompanyStats> {
    let all = store
        .fetch_all(USERS)
        .map_err(|e| Error::StatsUnavailable(e.to_string()))?;
    let records: Vec<ApplicationRecord> = all
        .into_values()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    Ok(tally(&records, company_name))
}

/// Counts and averages over already-decoded records. Company matching
/// is exact and case-sensitive. Statuses outside the three known
/// values fall into no bucket, and `total` is the sum of the buckets,
/// so a malformed row never inflates it. The average covers ratings
/// that are present and numeric; a record without one is left out
/// rather than counted as zero.
pub fn tally(records: &[ApplicationRecord], company_name: &str) -> CompanyStats {
    let mut stats = CompanyStats::default();
    let mut rating_sum = 0.0;
    let mut rating_count = 0usize;

    for record in records.iter().filter(|r| r.company == company_name) {
        match record.parsed_status() {
            Some(Status::Pending) => stats.pending += 1,
            Some(Status::Approved) => stats.approved += 1,
            Some(Status::Rejected) => stats.rejected += 1,
            None => {}
        }
        if let Some(rating) = record.rating {
            rating_sum += rating;
            rating_count += 1;
        }
    }

    stats.total = stats.pending + stats.approved + stats.rejected;
    stats.avg_rating = if rating_count > 0 {
        rating_sum / rating_count as f64
    } else {
        0.0
    };
    stats
}

/// Top-level record counts, for the connectivity check.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub applications: usize,
    pub companies: usize,
    pub postings: usize,
}

pub fn store_summary(store: &dyn RecordStore) -> Result<StoreSummary> {
    Ok(StoreSummary {
        applications: store.fetch_all(USERS)?.len(),
        companies: store.fetch_all(COMPANIES)?.len(),
        postings: store.fetch_all(JOBS)?.len(),
    })
}
