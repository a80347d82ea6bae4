//! Hours API HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Implements
//! `EntryBackend` so the grid engine can reconcile straight against the
//! REST API.

use std::time::Duration;

use chrono::NaiveDate;
use hourgrid_core::{BackendError, Category, CategoryId, EntryBackend, EntryPayload, EntryRecord};

use crate::auth::{load_auth, AuthCredentials};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Hours API client (blocking).
#[derive(Clone)]
pub struct HoursClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
}

impl HoursClient {
    /// Create a new client using saved auth credentials.
    pub fn from_saved_auth(timeout: Duration) -> Result<Self, BackendError> {
        let creds = load_auth().ok_or(BackendError::NotAuthenticated)?;
        Self::new(creds, timeout)
    }

    /// Create a new client with explicit credentials.
    pub fn new(creds: AuthCredentials, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("hgrid/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: creds.api_base.trim_end_matches('/').to_string(),
            token: creds.token,
        })
    }

    pub fn with_base_url(token: String, api_base: String) -> Result<Self, BackendError> {
        Self::new(AuthCredentials::new(token, api_base), Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn send(&self, req: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response, BackendError> {
        let response = req
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(e.to_string())
                } else {
                    BackendError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(match status {
                401 | 403 => BackendError::NotAuthenticated,
                404 => BackendError::NotFound(error_message(&body)),
                400 | 422 => BackendError::Validation(error_message(&body)),
                _ => BackendError::Http(status, body),
            });
        }

        Ok(response)
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value, BackendError> {
        let resp = self.send(self.http.get(url).query(query))?;
        resp.json().map_err(|e| BackendError::Parse(e.to_string()))
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value, BackendError> {
        let resp = self.send(self.http.post(url).json(body))?;
        resp.json().map_err(|e| BackendError::Parse(e.to_string()))
    }
}

impl EntryBackend for HoursClient {
    fn fetch_entries(&self, subject_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<EntryRecord>, BackendError> {
        let url = format!("{}/api/subjects/{}/entries", self.api_base, subject_id);
        let json = self.get_json(&url, &[("from", from.to_string()), ("to", to.to_string())])?;
        let records = list_field(&json, "entries")?
            .iter()
            .map(parse_entry)
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("GET {} [{}..{}]: {} entries", url, from, to, records.len());
        Ok(records)
    }

    fn create_entry(&self, subject_id: &str, entry: &EntryPayload) -> Result<String, BackendError> {
        let url = format!("{}/api/subjects/{}/entries", self.api_base, subject_id);
        let json = self.post_json(&url, &payload_json(entry)?)?;
        id_field(&json, "id")
    }

    fn update_entry(&self, persisted_id: &str, entry: &EntryPayload) -> Result<(), BackendError> {
        let url = format!("{}/api/entries/{}", self.api_base, persisted_id);
        self.send(self.http.put(&url).json(&payload_json(entry)?))?;
        Ok(())
    }

    fn delete_entry(&self, persisted_id: &str) -> Result<(), BackendError> {
        let url = format!("{}/api/entries/{}", self.api_base, persisted_id);
        self.send(self.http.delete(&url))?;
        Ok(())
    }

    fn list_categories(&self, context_id: &str) -> Result<Vec<Category>, BackendError> {
        let url = format!("{}/api/contexts/{}/categories", self.api_base, context_id);
        let json = self.get_json(&url, &[])?;
        let categories = list_field(&json, "categories")?
            .iter()
            .filter_map(|c| {
                let id = id_field(c, "id").ok()?;
                Some(Category::new(id, c["name"].as_str()?))
            })
            .collect();
        Ok(categories)
    }

    fn create_category(&self, name: &str) -> Result<CategoryId, BackendError> {
        let url = format!("{}/api/categories", self.api_base);
        let json = self.post_json(&url, &serde_json::json!({ "name": name }))?;
        id_field(&json, "id").map(CategoryId::new)
    }
}

// ── Wire helpers ────────────────────────────────────────────────────

fn payload_json(entry: &EntryPayload) -> Result<serde_json::Value, BackendError> {
    serde_json::to_value(entry).map_err(|e| BackendError::Parse(e.to_string()))
}

/// Accept either a bare array or `{ "<key>": [...] }`.
fn list_field<'a>(json: &'a serde_json::Value, key: &str) -> Result<&'a Vec<serde_json::Value>, BackendError> {
    json.as_array()
        .or_else(|| json[key].as_array())
        .ok_or_else(|| BackendError::Parse(format!("Missing {} in response", key)))
}

/// Ids come back as numbers from some deployments and strings from others.
fn id_field(json: &serde_json::Value, key: &str) -> Result<String, BackendError> {
    json[key].as_i64()
        .map(|n| n.to_string())
        .or_else(|| json[key].as_str().map(String::from))
        .ok_or_else(|| BackendError::Parse(format!("Missing {} in response", key)))
}

fn parse_entry(json: &serde_json::Value) -> Result<EntryRecord, BackendError> {
    let persisted_id = id_field(json, "id")?;
    let date = json["date"]
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| BackendError::Parse(format!("Entry {} has no valid date", persisted_id)))?;
    let category_id = id_field(json, "category_id")?;
    let quantity = json["quantity"]
        .as_f64()
        .or_else(|| json["quantity"].as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| BackendError::Parse(format!("Entry {} has no quantity", persisted_id)))?;
    let owner_ref = match &json["owner_ref"] {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    Ok(EntryRecord {
        persisted_id,
        date,
        category_id: CategoryId::new(category_id),
        quantity,
        owner_ref,
    })
}

/// Pull `message`/`error` out of a JSON error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v["message"].as_str()
                .or_else(|| v["error"].as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}
