//! External make/model/trim catalog and the helpers that merge its answers
//! with what the local listings already contain.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::USER_AGENT;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 12);
const CLIENT_USER_AGENT: &str = "Autoshop/1.0 (+https://autoshop.example)";

/// CatalogClient
///
/// Interface to the external catalog. Lookups never fail: an unreachable or
/// malformed upstream yields an empty list.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn models_for_brand(&self, brand: &str) -> Vec<String>;
    async fn versions_for(&self, brand: &str, model: &str) -> Vec<String>;
}

pub type CatalogState = Arc<dyn CatalogClient>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog answered {0}")]
    Status(reqwest::StatusCode),
    #[error("catalog body is not JSON")]
    InvalidBody,
}

// --- Helpers ---

/// normalize_make
///
/// Converts a display brand into the catalog's make slug:
/// `"Mercedes-Benz"` → `"mercedes-benz"`, `"Rolls & Royce"` → `"rolls-and-royce"`.
pub fn normalize_make(brand: &str) -> String {
    let lowered = brand.trim().to_lowercase().replace('&', "and");
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn cache_key(prefix: &str, parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|");
    format!("{prefix}:{joined}")
}

/// parse_catalog_body
///
/// The catalog sometimes wraps JSON in a JSONP callback. Falls back to the
/// outermost `{...}` slice when the body does not parse as-is.
pub fn parse_catalog_body(raw: &str) -> Result<Value, CatalogError> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            serde_json::from_str(&trimmed[start..=end]).map_err(|_| CatalogError::InvalidBody)
        }
        _ => Err(CatalogError::InvalidBody),
    }
}

/// merge_unique
///
/// Trims, drops blanks and de-duplicates case-insensitively, keeping the first
/// spelling seen.
pub fn merge_unique<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for value in values {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            merged.push(trimmed.to_string());
        }
    }
    merged
}

/// Case-insensitive ordering, ties broken by the raw string.
pub fn sort_labels(labels: &mut [String]) {
    labels.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}

/// Union of local and catalog labels, de-duplicated and sorted.
pub fn merge_sorted(local: Vec<String>, remote: Vec<String>) -> Vec<String> {
    let mut merged = merge_unique(local.into_iter().chain(remote));
    sort_labels(&mut merged);
    merged
}

/// Pulls the first non-empty string field out of every object in `value[list]`.
fn labels_from(value: &Value, list: &str, fields: &[&str]) -> Vec<String> {
    value
        .get(list)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    fields
                        .iter()
                        .find_map(|field| {
                            item.get(*field)
                                .and_then(Value::as_str)
                                .filter(|label| !label.is_empty())
                        })
                })
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// --- CarQuery client ---

struct CacheEntry {
    data: Vec<String>,
    expires_at: Instant,
}

/// CarQueryClient
///
/// Talks to the CarQuery API and caches successful answers for twelve hours
/// per normalized key. Failed lookups are not cached.
pub struct CarQueryClient {
    http: reqwest::Client,
    base_url: String,
    ttl: Duration,
    models: DashMap<String, CacheEntry>,
    versions: DashMap<String, CacheEntry>,
}

impl CarQueryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            ttl: CACHE_TTL,
            models: DashMap::new(),
            versions: DashMap::new(),
        }
    }

    fn cached(map: &DashMap<String, CacheEntry>, key: &str) -> Option<Vec<String>> {
        let hit = map
            .get(key)
            .map(|entry| (entry.expires_at, entry.data.clone()));
        match hit {
            Some((expires_at, data)) if Instant::now() < expires_at => Some(data),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, map: &DashMap<String, CacheEntry>, key: String, data: Vec<String>) {
        map.insert(
            key,
            CacheEntry {
                data,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    async fn request(&self, cmd: &str, params: &[(&str, &str)]) -> Result<Value, CatalogError> {
        let mut query: Vec<(&str, &str)> = vec![("cmd", cmd)];
        query.extend(params.iter().copied().filter(|(_, v)| !v.is_empty()));

        let response = self
            .http
            .get(&self.base_url)
            .query(&query)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }
        let body = response.text().await?;
        parse_catalog_body(&body)
    }

    async fn lookup(
        &self,
        map: &DashMap<String, CacheEntry>,
        key: String,
        cmd: &str,
        params: &[(&str, &str)],
        list: &str,
        fields: &[&str],
    ) -> Vec<String> {
        if let Some(hit) = Self::cached(map, &key) {
            return hit;
        }
        match self.request(cmd, params).await {
            Ok(body) => {
                let mut labels = merge_unique(labels_from(&body, list, fields));
                sort_labels(&mut labels);
                self.store(map, key, labels.clone());
                labels
            }
            Err(err) => {
                tracing::warn!(error = %err, cmd, "catalog lookup failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl CatalogClient for CarQueryClient {
    async fn models_for_brand(&self, brand: &str) -> Vec<String> {
        let make = normalize_make(brand);
        if make.is_empty() {
            return Vec::new();
        }
        let key = cache_key("models", &[&make]);
        self.lookup(
            &self.models,
            key,
            "getModels",
            &[("make", &make)],
            "Models",
            &["model_name", "model"],
        )
        .await
    }

    async fn versions_for(&self, brand: &str, model: &str) -> Vec<String> {
        let make = normalize_make(brand);
        let model = model.trim();
        if make.is_empty() || model.is_empty() {
            return Vec::new();
        }
        let key = cache_key("versions", &[&make, model]);
        self.lookup(
            &self.versions,
            key,
            "getTrims",
            &[("make", &make), ("model", model)],
            "Trims",
            &["model_trim", "model_name", "model"],
        )
        .await
    }
}

/// StaticCatalog
///
/// Offline catalog with fixed answers, for tests and for running without
/// network access.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    pub models: Vec<String>,
    pub versions: Vec<String>,
}

#[async_trait]
impl CatalogClient for StaticCatalog {
    async fn models_for_brand(&self, brand: &str) -> Vec<String> {
        if normalize_make(brand).is_empty() {
            return Vec::new();
        }
        self.models.clone()
    }

    async fn versions_for(&self, brand: &str, model: &str) -> Vec<String> {
        if normalize_make(brand).is_empty() || model.trim().is_empty() {
            return Vec::new();
        }
        self.versions.clone()
    }
}
