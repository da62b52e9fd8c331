use serde_json::json;

use crate::error::{Error, Result};
use crate::models::{Company, JobPosting};
use crate::store::{COMPANIES, JOBS, RecordStore};

/// Minimum accepted password length at signup and password change.
pub const MIN_PASSWORD_LEN: usize = 6;

// --- Company accounts ---

/// Sorted names of every registered company, for applicants choosing
/// where to apply.
pub fn company_names(store: &dyn RecordStore) -> Result<Vec<String>> {
    let mut names: Vec<String> = companies_by_key(store)?
        .into_iter()
        .map(|(_, company)| company.company_name)
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    Ok(names)
}

fn companies_by_key(store: &dyn RecordStore) -> Result<Vec<(String, Company)>> {
    Ok(store
        .fetch_all(COMPANIES)?
        .into_iter()
        .filter_map(|(key, value)| {
            serde_json::from_value::<Company>(value)
                .ok()
                .map(|company| (key, company))
        })
        .collect())
}

/// Registers a company account. Email uniqueness is enforced by a
/// pre-write scan; company names are not deduplicated.
pub fn signup(
    store: &dyn RecordStore,
    company_name: &str,
    email: &str,
    password: &str,
) -> Result<String> {
    let company_name = company_name.trim();
    let email = email.trim();
    if company_name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(Error::Validation("all fields are required".to_string()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    for (_, company) in companies_by_key(store)? {
        if company.email == email {
            return Err(Error::Validation("email already registered".to_string()));
        }
    }
    store.create(
        COMPANIES,
        &json!({
            "company_name": company_name,
            "email": email,
            "password": password,
        }),
    )
}

/// Linear scan for an exact email/password match; the store has no
/// index to use. Credentials are compared in the clear to stay
/// compatible with existing records.
pub fn login(store: &dyn RecordStore, email: &str, password: &str) -> Result<Company> {
    for (_, company) in companies_by_key(store)? {
        if company.email == email && company.password == password {
            return Ok(company);
        }
    }
    Err(Error::InvalidCredentials)
}

/// Replaces the account password after verifying the old one.
pub fn change_password(
    store: &dyn RecordStore,
    email: &str,
    old: &str,
    new: &str,
) -> Result<()> {
    if new.len() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let (key, company) = companies_by_key(store)?
        .into_iter()
        .find(|(_, company)| company.email == email)
        .ok_or_else(|| Error::NotFound(format!("no company account for {}", email)))?;
    if company.password != old {
        return Err(Error::Validation("old password is incorrect".to_string()));
    }
    store.update(
        &format!("{}/{}", COMPANIES, key),
        &json!({ "password": new }),
    )
}

// --- Job postings ---

/// Postings owned by one company, with their store keys.
pub fn postings_for(
    store: &dyn RecordStore,
    company_name: &str,
) -> Result<Vec<(String, JobPosting)>> {
    Ok(store
        .fetch_all(JOBS)?
        .into_iter()
        .filter_map(|(key, value)| {
            serde_json::from_value::<JobPosting>(value)
                .ok()
                .map(|posting| (key, posting))
        })
        .filter(|(_, posting)| posting.company_name == company_name)
        .collect())
}

/// Keyword list for one posting, used as the AI scoring criteria.
pub fn keywords_for(
    store: &dyn RecordStore,
    company_name: &str,
    job_name: &str,
) -> Result<Option<String>> {
    Ok(postings_for(store, company_name)?
        .into_iter()
        .find(|(_, posting)| posting.name == job_name)
        .map(|(_, posting)| posting.value))
}

pub fn add_posting(
    store: &dyn RecordStore,
    company_name: &str,
    name: &str,
    keywords: &str,
) -> Result<String> {
    let name = name.trim();
    let keywords = keywords.trim();
    if name.is_empty() || keywords.is_empty() {
        return Err(Error::Validation(
            "job title and keywords are required".to_string(),
        ));
    }
    store.create(
        JOBS,
        &json!({
            "name": name,
            "value": keywords,
            "company_name": company_name,
        }),
    )
}

pub fn remove_posting(store: &dyn RecordStore, key: &str) -> Result<()> {
    store.delete(&format!("{}/{}", JOBS, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;

    #[test]
    fn test_signup_then_login() {
        let store = MemoryStore::new();
        signup(&store, "Acme", "hr@acme.example", "hunter22").unwrap();

        let company = login(&store, "hr@acme.example", "hunter22").unwrap();
        assert_eq!(company.company_name, "Acme");
    }

    #[test]
    fn test_signup_rejects_short_password() {
        let store = MemoryStore::new();
        let result = signup(&store, "Acme", "hr@acme.example", "abc");
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(store.fetch_all(COMPANIES).unwrap().is_empty());
    }

    #[test]
    fn test_signup_rejects_duplicate_email_before_write() {
        let store = MemoryStore::new();
        signup(&store, "Acme", "hr@acme.example", "hunter22").unwrap();

        let result = signup(&store, "Acme GmbH", "hr@acme.example", "different1");
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.fetch_all(COMPANIES).unwrap().len(), 1);
    }

    #[test]
    fn test_signup_allows_duplicate_company_names() {
        // Known gap, preserved: only the email is scanned.
        let store = MemoryStore::new();
        signup(&store, "Acme", "hr@acme.example", "hunter22").unwrap();
        signup(&store, "Acme", "jobs@acme.example", "hunter23").unwrap();
        assert_eq!(store.fetch_all(COMPANIES).unwrap().len(), 2);
    }

    #[test]
    fn test_login_wrong_password() {
        let store = MemoryStore::new();
        signup(&store, "Acme", "hr@acme.example", "hunter22").unwrap();

        let result = login(&store, "hr@acme.example", "wrong");
        assert!(matches!(result, Err(Error::InvalidCredentials)));

        let result = login(&store, "nobody@acme.example", "hunter22");
        assert!(matches!(result, Err(Error::InvalidCredentials)));
    }

    #[test]
    fn test_change_password_verifies_old_one() {
        let store = MemoryStore::new();
        signup(&store, "Acme", "hr@acme.example", "hunter22").unwrap();

        let result = change_password(&store, "hr@acme.example", "wrong", "newpass1");
        assert!(matches!(result, Err(Error::Validation(_))));

        change_password(&store, "hr@acme.example", "hunter22", "newpass1").unwrap();
        assert!(login(&store, "hr@acme.example", "newpass1").is_ok());
        assert!(login(&store, "hr@acme.example", "hunter22").is_err());
    }

    #[test]
    fn test_company_names_sorted() {
        let store = MemoryStore::new();
        signup(&store, "Zephyr", "z@z.example", "hunter22").unwrap();
        signup(&store, "Acme", "a@a.example", "hunter22").unwrap();
        assert_eq!(company_names(&store).unwrap(), ["Acme", "Zephyr"]);
    }

    #[test]
    fn test_postings_scoped_to_company() {
        let store = MemoryStore::new();
        add_posting(&store, "Acme", "Backend Engineer", "rust, sql").unwrap();
        add_posting(&store, "Globex", "Analyst", "excel").unwrap();

        let postings = postings_for(&store, "Acme").unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].1.name, "Backend Engineer");

        assert_eq!(
            keywords_for(&store, "Acme", "Backend Engineer").unwrap(),
            Some("rust, sql".to_string())
        );
        assert_eq!(keywords_for(&store, "Acme", "Analyst").unwrap(), None);
    }

    #[test]
    fn test_add_posting_requires_title_and_keywords() {
        let store = MemoryStore::new();
        let result = add_posting(&store, "Acme", "", "rust");
        assert!(matches!(result, Err(Error::Validation(_))));
        let result = add_posting(&store, "Acme", "Backend Engineer", "  ");
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_remove_posting_is_idempotent() {
        let store = MemoryStore::new();
        let key = add_posting(&store, "Acme", "Backend Engineer", "rust").unwrap();
        remove_posting(&store, &key).unwrap();
        remove_posting(&store, &key).unwrap();
        assert!(postings_for(&store, "Acme").unwrap().is_empty());
    }
}
