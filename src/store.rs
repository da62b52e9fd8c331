use std::collections::BTreeMap;
use std::env;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Subtree holding applicant submissions.
pub const USERS: &str = "users";
/// Subtree holding registered company accounts.
pub const COMPANIES: &str = "companies";
/// Subtree holding job postings.
pub const JOBS: &str = "jobs";

/// The one seam to the remote document tree. Paths are `/`-delimited
/// strings naming a subtree (`users`, `users/<key>`). Every call is a
/// fresh network round trip; nothing is cached and nothing retries.
/// Concurrent writers racing on the same path are not arbitrated here:
/// last write wins, inherited from the store.
pub trait RecordStore {
    /// All children of `path`, keyed by store key. An existing path
    /// with no children is an empty map, not an error.
    fn fetch_all(&self, path: &str) -> Result<BTreeMap<String, Value>>;

    /// One node, or `None` if the path is absent.
    fn fetch_one(&self, path: &str) -> Result<Option<Value>>;

    /// Appends a new child under `path` and returns the
    /// store-generated key.
    fn create(&self, path: &str, record: &Value) -> Result<String>;

    /// Merges `fields` into the node at `path`. Fails with `NotFound`
    /// when the node does not exist.
    fn update(&self, path: &str, fields: &Value) -> Result<()>;

    /// Removes the subtree at `path`. Deleting an absent path is not
    /// an error.
    fn delete(&self, path: &str) -> Result<()>;
}

/// Reply to a `POST` against the remote tree.
#[derive(Debug, Deserialize)]
struct PushReply {
    name: String,
}

/// Client for an RTDB-style REST surface: nodes live at
/// `{base}/{path}.json` and answer `GET`/`POST`/`PATCH`/`DELETE`.
pub struct RtdbStore {
    base_url: String,
    auth: Option<String>,
    client: reqwest::blocking::Client,
}

impl RtdbStore {
    pub fn new(base_url: impl Into<String>, auth: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Reads `SIFT_DATABASE_URL` (required) and `SIFT_DATABASE_AUTH`
    /// (optional token appended to every request).
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("SIFT_DATABASE_URL").map_err(|_| {
            Error::Config(
                "SIFT_DATABASE_URL environment variable not set. Set it to the \
                 database root, e.g. https://your-project.firebaseio.com"
                    .to_string(),
            )
        })?;
        let auth = env::var("SIFT_DATABASE_AUTH").ok();
        Ok(Self::new(base_url, auth))
    }

    fn node_url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        match &self.auth {
            Some(token) => format!("{}/{}.json?auth={}", self.base_url, path, token),
            None => format!("{}/{}.json", self.base_url, path),
        }
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            Err(Error::StoreUnavailable(format!(
                "request failed with status {}: {}",
                status, body
            )))
        }
    }

    fn read_json(response: reqwest::blocking::Response) -> Result<Value> {
        response
            .json()
            .map_err(|e| Error::StoreUnavailable(format!("malformed store response: {}", e)))
    }
}

impl RecordStore for RtdbStore {
    fn fetch_all(&self, path: &str) -> Result<BTreeMap<String, Value>> {
        let response = Self::check(self.client.get(self.node_url(path)).send()?)?;
        Ok(match Self::read_json(response)? {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        })
    }

    fn fetch_one(&self, path: &str) -> Result<Option<Value>> {
        let response = Self::check(self.client.get(self.node_url(path)).send()?)?;
        Ok(match Self::read_json(response)? {
            Value::Null => None,
            other => Some(other),
        })
    }

    fn create(&self, path: &str, record: &Value) -> Result<String> {
        if record.is_null() {
            return Err(Error::Validation(
                "refusing to create an empty record".to_string(),
            ));
        }
        let response =
            Self::check(self.client.post(self.node_url(path)).json(record).send()?)?;
        let reply: PushReply = response
            .json()
            .map_err(|e| Error::StoreUnavailable(format!("malformed push reply: {}", e)))?;
        Ok(reply.name)
    }

    fn update(&self, path: &str, fields: &Value) -> Result<()> {
        // The remote PATCH would upsert; the contract wants NotFound
        // for an absent node, so existence is checked with a read.
        if self.fetch_one(path)?.is_none() {
            return Err(Error::NotFound(path.to_string()));
        }
        Self::check(self.client.patch(self.node_url(path)).json(fields).send()?)?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        Self::check(self.client.delete(self.node_url(path)).send()?)?;
        Ok(())
    }
}
