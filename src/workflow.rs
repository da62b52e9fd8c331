use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde_json::json;

use crate::ai::{ResumeAnalyzer, extract_review};
use crate::error::{Error, Result};
use crate::models::{ApplicationRecord, Status};
use crate::registry;
use crate::store::{RecordStore, USERS};

/// Upload cap; the store keeps the whole payload inline in the record.
pub const MAX_RESUME_BYTES: u64 = 10 * 1024 * 1024;

/// Everything an applicant provides. Local validation runs before any
/// network call; the AI round trip and the store write come last.
pub struct SubmissionForm<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub company: &'a str,
    pub job: &'a str,
    pub resume: &'a Path,
}

/// What the submission pipeline hands back to the caller.
pub struct ScreeningOutcome {
    pub key: String,
    pub rating: i64,
    pub summary: String,
}

// --- Submission ---

/// Runs the full intake pipeline: validate the form, score the PDF
/// with the AI, and create one record under `users` with status
/// Pending. The record is written exactly once; a failure anywhere
/// leaves the store untouched.
pub fn submit_application(
    store: &dyn RecordStore,
    analyzer: &dyn ResumeAnalyzer,
    form: &SubmissionForm,
) -> Result<ScreeningOutcome> {
    let full_name = form.full_name.trim();
    let email = form.email.trim();

    if full_name.is_empty() {
        return Err(Error::Validation("full name is required".to_string()));
    }
    if !valid_email(email) {
        return Err(Error::Validation(format!(
            "invalid email address: {}",
            form.email
        )));
    }
    validate_pdf(form.resume)?;

    let companies = registry::company_names(store)?;
    if !companies.iter().any(|name| name == form.company) {
        return Err(Error::Validation(format!(
            "unknown company: {}",
            form.company
        )));
    }
    let keywords = registry::keywords_for(store, form.company, form.job)?.ok_or_else(|| {
        Error::Validation(format!(
            "{} has no posting named '{}'",
            form.company, form.job
        ))
    })?;

    let encoded = encode_resume(form.resume)?;
    let reply = analyzer.review(&encoded, &keywords)?;
    let (rating, summary) = extract_review(&reply);

    let record = json!({
        "full_name": full_name,
        "email": email,
        "company": form.company,
        "job": form.job,
        "status": Status::Pending.as_str(),
        "rating": rating,
        "summary": summary,
        "resume_data": encoded,
    });
    let key = store.create(USERS, &record)?;

    Ok(ScreeningOutcome {
        key,
        rating,
        summary,
    })
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern")
});

/// Syntactic check only.
pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Rejects anything that is not a real, reasonably sized PDF before a
/// single byte goes over the network.
pub fn validate_pdf(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::Validation(format!(
            "file does not exist: {}",
            path.display()
        )));
    }
    let is_pdf = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(Error::Validation(
            "only PDF files are supported".to_string(),
        ));
    }

    let size = fs::metadata(path)
        .map_err(|e| Error::Validation(format!("cannot read file: {}", e)))?
        .len();
    if size == 0 {
        return Err(Error::Validation("file is empty".to_string()));
    }
    if size > MAX_RESUME_BYTES {
        return Err(Error::Validation(format!(
            "file too large ({:.2} MB); maximum is 10 MB",
            size as f64 / (1024.0 * 1024.0)
        )));
    }

    let mut header = [0u8; 4];
    let mut file = fs::File::open(path)
        .map_err(|e| Error::Validation(format!("cannot read file: {}", e)))?;
    file.read_exact(&mut header)
        .map_err(|_| Error::Validation("file is not a valid PDF".to_string()))?;
    if &header != b"%PDF" {
        return Err(Error::Validation("file is not a valid PDF".to_string()));
    }

    Ok(())
}

/// Reads the PDF and produces the text-safe payload stored inline.
pub fn encode_resume(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).map_err(|e| Error::Validation(format!("cannot read file: {}", e)))?;
    Ok(STANDARD.encode(bytes))
}

/// Decodes a record's stored payload back into PDF bytes.
pub fn decode_resume(record: &ApplicationRecord) -> Result<Vec<u8>> {
    if record.resume_data.is_empty() {
        return Err(Error::NotFound(
            "no resume file on this record".to_string(),
        ));
    }
    STANDARD
        .decode(record.resume_data.as_bytes())
        .map_err(|e| Error::Validation(format!("stored resume data is corrupt: {}", e)))
}

// --- Status workflow ---

/// Moves a record to `status`. The value is validated before any
/// write; the write itself is a single-field merge, so racing staff
/// actions resolve last-write-wins at the store.
pub fn set_status(store: &dyn RecordStore, key: &str, status: &str) -> Result<Status> {
    let parsed: Status = status
        .parse()
        .map_err(|_| Error::InvalidStatus(status.to_string()))?;
    store.update(
        &format!("{}/{}", USERS, key),
        &json!({ "status": parsed.as_str() }),
    )?;
    Ok(parsed)
}

/// Removes a submission outright. Deleting an already-absent key is a
/// no-op, inherited from the gateway.
pub fn delete_application(store: &dyn RecordStore, key: &str) -> Result<()> {
    store.delete(&format!("{}/{}", USERS, key))
}

/// One record by key, decoded leniently.
pub fn fetch_application(
    store: &dyn RecordStore,
    key: &str,
) -> Result<Option<ApplicationRecord>> {
    let value = store.fetch_one(&format!("{}/{}", USERS, key))?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// --- Listing ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Job,
    Rating,
    Status,
}

#[derive(Default)]
pub struct ListFilter<'a> {
    pub search: Option<&'a str>,
    pub status: Option<Status>,
    pub sort: Option<SortKey>,
}

/// Applications for one company (exact, case-sensitive match on the
/// `company` field), keyed rows in store-key order. Search is a
/// case-insensitive substring match over name, email, and job; rating
/// sorts descending with unparseable ratings low.
pub fn list_applications(
    store: &dyn RecordStore,
    company: &str,
    filter: &ListFilter,
) -> Result<Vec<(String, ApplicationRecord)>> {
    let all = store.fetch_all(USERS)?;
    let mut rows: Vec<(String, ApplicationRecord)> = all
        .into_iter()
        .filter_map(|(key, value)| {
            serde_json::from_value::<ApplicationRecord>(value)
                .ok()
                .map(|record| (key, record))
        })
        .filter(|(_, record)| record.company == company)
        .collect();

    if let Some(needle) = filter.search {
        let needle = needle.to_lowercase();
        rows.retain(|(_, r)| {
            r.full_name.to_lowercase().contains(&needle)
                || r.email.to_lowercase().contains(&needle)
                || r.job.to_lowercase().contains(&needle)
        });
    }

    if let Some(wanted) = filter.status {
        rows.retain(|(_, r)| r.parsed_status() == Some(wanted));
    }

    match filter.sort {
        Some(SortKey::Name) => rows.sort_by(|a, b| a.1.full_name.cmp(&b.1.full_name)),
        Some(SortKey::Job) => rows.sort_by(|a, b| a.1.job.cmp(&b.1.job)),
        Some(SortKey::Rating) => rows.sort_by(|a, b| {
            b.1.rating_or_default()
                .partial_cmp(&a.1.rating_or_default())
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        Some(SortKey::Status) => rows.sort_by(|a, b| a.1.status.cmp(&b.1.status)),
        None => {}
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;
    use crate::store::{COMPANIES, JOBS};
    use std::path::PathBuf;

    struct CannedAnalyzer(&'static str);

    impl ResumeAnalyzer for CannedAnalyzer {
        fn review(&self, _pdf_base64: &str, _keywords: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn temp_pdf(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create(
                COMPANIES,
                &json!({
                    "company_name": "Acme",
                    "email": "hr@acme.example",
                    "password": "hunter22",
                }),
            )
            .unwrap();
        store
            .create(
                JOBS,
                &json!({
                    "name": "Backend Engineer",
                    "value": "rust, sql, grpc",
                    "company_name": "Acme",
                }),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_valid_email() {
        assert!(valid_email("test@example.com"));
        assert!(valid_email("user@domain.co.uk"));
        assert!(!valid_email("invalid.email"));
        assert!(!valid_email("user@nodot"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_validate_pdf_rejects_wrong_extension() {
        let path = temp_pdf("sift_test_resume.txt", b"%PDF-1.7 data");
        let result = validate_pdf(&path);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_pdf_rejects_empty_file() {
        let path = temp_pdf("sift_test_empty.pdf", b"");
        let result = validate_pdf(&path);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_pdf_rejects_bad_magic() {
        let path = temp_pdf("sift_test_magic.pdf", b"not a pdf at all");
        let result = validate_pdf(&path);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_pdf_accepts_real_header() {
        let path = temp_pdf("sift_test_ok.pdf", b"%PDF-1.4\nhello");
        assert!(validate_pdf(&path).is_ok());
    }

    #[test]
    fn test_validate_pdf_missing_file() {
        let result = validate_pdf(Path::new("/no/such/sift_file.pdf"));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_submit_application_creates_pending_record() {
        let store = seeded_store();
        let analyzer = CannedAnalyzer("Rating: 73\nSummary: Solid Rust experience.");
        let path = temp_pdf("sift_test_submit.pdf", b"%PDF-1.4\napplicant");

        let outcome = submit_application(
            &store,
            &analyzer,
            &SubmissionForm {
                full_name: "Lena Hart",
                email: "lena@example.com",
                company: "Acme",
                job: "Backend Engineer",
                resume: &path,
            },
        )
        .unwrap();

        assert_eq!(outcome.rating, 73);
        assert_eq!(outcome.summary, "Solid Rust experience.");

        let record = fetch_application(&store, &outcome.key).unwrap().unwrap();
        assert_eq!(record.full_name, "Lena Hart");
        assert_eq!(record.status, "Pending");
        assert_eq!(record.rating, Some(73.0));
        assert_eq!(decode_resume(&record).unwrap(), b"%PDF-1.4\napplicant");
    }

    #[test]
    fn test_submit_application_survives_garbled_ai_output() {
        let store = seeded_store();
        let analyzer = CannedAnalyzer("The model went off-script entirely.");
        let path = temp_pdf("sift_test_garbled.pdf", b"%PDF-1.4\napplicant");

        let outcome = submit_application(
            &store,
            &analyzer,
            &SubmissionForm {
                full_name: "Omar Díaz",
                email: "omar@example.com",
                company: "Acme",
                job: "Backend Engineer",
                resume: &path,
            },
        )
        .unwrap();

        assert_eq!(outcome.rating, 0);
        assert_eq!(outcome.summary, crate::ai::NO_SUMMARY);
    }

    #[test]
    fn test_submit_application_rejects_unknown_company() {
        let store = seeded_store();
        let analyzer = CannedAnalyzer("Rating: 50\nSummary: fine");
        let path = temp_pdf("sift_test_unknown_co.pdf", b"%PDF-1.4\nx");

        let result = submit_application(
            &store,
            &analyzer,
            &SubmissionForm {
                full_name: "A",
                email: "a@example.com",
                company: "Globex",
                job: "Backend Engineer",
                resume: &path,
            },
        );
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(store.fetch_all(USERS).unwrap().is_empty());
    }

    #[test]
    fn test_submit_application_rejects_unknown_posting() {
        let store = seeded_store();
        let analyzer = CannedAnalyzer("Rating: 50\nSummary: fine");
        let path = temp_pdf("sift_test_unknown_job.pdf", b"%PDF-1.4\nx");

        let result = submit_application(
            &store,
            &analyzer,
            &SubmissionForm {
                full_name: "A",
                email: "a@example.com",
                company: "Acme",
                job: "Street Juggler",
                resume: &path,
            },
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_set_status_read_after_write() {
        let store = seeded_store();
        let key = store
            .create(USERS, &json!({ "company": "Acme", "status": "Pending" }))
            .unwrap();

        for status in ["Approved", "Rejected", "Pending"] {
            set_status(&store, &key, status).unwrap();
            let record = fetch_application(&store, &key).unwrap().unwrap();
            assert_eq!(record.status, status);
        }
    }

    #[test]
    fn test_set_status_rejects_unknown_value_without_writing() {
        let store = seeded_store();
        let key = store
            .create(USERS, &json!({ "company": "Acme", "status": "Pending" }))
            .unwrap();

        let result = set_status(&store, &key, "Archived");
        assert!(matches!(result, Err(Error::InvalidStatus(_))));

        let record = fetch_application(&store, &key).unwrap().unwrap();
        assert_eq!(record.status, "Pending");
    }

    #[test]
    fn test_set_status_missing_record_is_not_found() {
        let store = seeded_store();
        let result = set_status(&store, "missing-key", "Approved");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete_application_is_idempotent() {
        let store = seeded_store();
        let key = store
            .create(USERS, &json!({ "company": "Acme", "status": "Pending" }))
            .unwrap();
        delete_application(&store, &key).unwrap();
        assert!(fetch_application(&store, &key).unwrap().is_none());
        delete_application(&store, &key).unwrap();
    }

    #[test]
    fn test_list_applications_filters_and_sorts() {
        let store = seeded_store();
        for (name, email, job, status, rating) in [
            ("Lena Hart", "lena@example.com", "Backend Engineer", "Approved", json!(80)),
            ("Omar Díaz", "omar@example.com", "Backend Engineer", "Pending", json!(60)),
            ("Ada Byron", "ada@example.com", "Data Analyst", "Rejected", json!("n/a")),
            ("Someone Else", "x@other.example", "Backend Engineer", "Pending", json!(95)),
        ] {
            let company = if name == "Someone Else" { "Globex" } else { "Acme" };
            store
                .create(
                    USERS,
                    &json!({
                        "full_name": name,
                        "email": email,
                        "company": company,
                        "job": job,
                        "status": status,
                        "rating": rating,
                    }),
                )
                .unwrap();
        }

        // Company scoping is exact.
        let rows = list_applications(&store, "Acme", &ListFilter::default()).unwrap();
        assert_eq!(rows.len(), 3);

        // Case-insensitive substring search over name, email, and job.
        let rows = list_applications(
            &store,
            "Acme",
            &ListFilter {
                search: Some("ENGINEER"),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(rows.len(), 2);

        // Status filter.
        let rows = list_applications(
            &store,
            "Acme",
            &ListFilter {
                status: Some(Status::Pending),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.full_name, "Omar Díaz");

        // Rating sorts descending, with the unparseable rating last.
        let rows = list_applications(
            &store,
            "Acme",
            &ListFilter {
                sort: Some(SortKey::Rating),
                ..Default::default()
            },
        )
        .unwrap();
        let names: Vec<&str> = rows.iter().map(|(_, r)| r.full_name.as_str()).collect();
        assert_eq!(names, ["Lena Hart", "Omar Díaz", "Ada Byron"]);
    }

    #[test]
    fn test_decode_resume_rejects_corrupt_payload() {
        let record = ApplicationRecord {
            resume_data: "!!! not base64 !!!".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            decode_resume(&record),
            Err(Error::Validation(_))
        ));

        let record = ApplicationRecord::default();
        assert!(matches!(decode_resume(&record), Err(Error::NotFound(_))));
    }
}
