use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review state of one application. There are no guarded transitions:
/// staff may move a record from any state to any other in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Approved,
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Approved => "Approved",
            Status::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Status::Pending),
            "Approved" => Ok(Status::Approved),
            "Rejected" => Ok(Status::Rejected),
            _ => Err(()),
        }
    }
}

/// One applicant submission, as stored under `users/<key>`. Every field
/// is optional on the wire and defaulted here, so a half-written or
/// hand-edited node never aborts a listing. `status` stays a raw string
/// on the read side; the typed [`Status`] governs all writes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationRecord {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub summary: String,
    /// Base64 of the uploaded PDF. Never mutated after creation; only
    /// deleted along with the whole record.
    #[serde(default)]
    pub resume_data: String,
}

impl ApplicationRecord {
    /// Typed view of the status string, if it is one of the three
    /// known values.
    pub fn parsed_status(&self) -> Option<Status> {
        self.status.parse().ok()
    }

    /// Rating for display; absent or unparsable values read as 0.
    pub fn rating_or_default(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }
}

/// Accepts a rating as a number or a numeric string; anything else
/// reads as absent. The aggregator relies on this to skip malformed
/// ratings instead of failing.
fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// A registered reviewing organization. `company_name` is the value
/// applicant records point at; it is not checked for uniqueness.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A job a company is recruiting for.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPosting {
    #[serde(default)]
    pub name: String,
    /// Comma-separated keyword list, fed to the AI as scoring criteria.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub company_name: String,
}

/// Per-company snapshot derived from the full applicant set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub avg_rating: f64,
}
