use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError, Resource};
use crate::storage::KeyValueStore;

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// A stored list body and the time it was fetched from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    /// "Last updated" label for a stale list, rounded to the nearest unit.
    pub fn age_display(&self) -> String {
        last_updated_label(self.age_minutes())
    }
}

fn last_updated_label(minutes: i64) -> String {
    match minutes {
        // Negative ages come from clock skew
        m if m < 1 => "updated just now".to_string(),
        m if m < MINUTES_PER_HOUR => format!("updated {} min ago", m),
        m if m < MINUTES_PER_DAY => {
            format!("updated {} h ago", (m + MINUTES_PER_HOUR / 2) / MINUTES_PER_HOUR)
        }
        m => {
            let days = (m + MINUTES_PER_DAY / 2) / MINUTES_PER_DAY;
            let unit = if days == 1 { "day" } else { "days" };
            format!("updated {} {} ago", days, unit)
        }
    }
}

/// Where the items of a list load came from.
#[derive(Debug)]
pub enum ListSource {
    Live,
    /// The live fetch failed; items are the last good copy.
    Cached {
        cached_at: DateTime<Utc>,
        error: ApiError,
    },
    /// The live fetch failed and nothing was cached.
    Empty { error: ApiError },
}

#[derive(Debug)]
pub struct ListLoad<T> {
    pub items: Vec<T>,
    pub source: ListSource,
}

impl<T> ListLoad<T> {
    pub fn is_live(&self) -> bool {
        matches!(self.source, ListSource::Live)
    }

    /// The suppressed fetch error, if the live fetch failed.
    pub fn error(&self) -> Option<&ApiError> {
        match &self.source {
            ListSource::Live => None,
            ListSource::Cached { error, .. } | ListSource::Empty { error } => Some(error),
        }
    }
}

/// Last-known-good copies of list resources, used only when a live fetch
/// fails. Each resource has its own `<name>_cache` key, overwritten whole
/// on every successful fetch.
pub struct ListCache {
    storage: Arc<dyn KeyValueStore>,
}

impl ListCache {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn load<T: DeserializeOwned>(&self, resource: Resource) -> Result<Option<CachedData<Vec<T>>>> {
        let key = resource.cache_key();
        let Some(contents) = self.storage.get(&key)? else {
            return Ok(None);
        };

        let cached: CachedData<Vec<T>> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", key))?;

        Ok(Some(cached))
    }

    pub fn save<T: Serialize>(&self, resource: Resource, items: &[T]) -> Result<()> {
        let cached = CachedData::new(items);
        let contents = serde_json::to_string(&cached)?;
        self.storage.set(&resource.cache_key(), &contents)?;
        Ok(())
    }

    /// Run a live fetch; on success store the result, on failure fall back
    /// to the cached copy or an empty list. The fetch is always attempted.
    pub async fn read_through<T, F, Fut>(&self, resource: Resource, fetch: F) -> ListLoad<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ApiError>>,
    {
        match fetch().await {
            Ok(items) => {
                if let Err(e) = self.save(resource, &items) {
                    warn!(%resource, error = %e, "Failed to update list cache");
                }
                debug!(%resource, count = items.len(), "Fetched live list");
                ListLoad {
                    items,
                    source: ListSource::Live,
                }
            }
            Err(error) => match self.load::<T>(resource) {
                Ok(Some(cached)) => {
                    warn!(%resource, error = %error, age = %cached.age_display(), "Fetch failed, serving cached list");
                    ListLoad {
                        items: cached.data,
                        source: ListSource::Cached {
                            cached_at: cached.cached_at,
                            error,
                        },
                    }
                }
                Ok(None) => {
                    warn!(%resource, error = %error, "Fetch failed and no cached list");
                    ListLoad {
                        items: Vec::new(),
                        source: ListSource::Empty { error },
                    }
                }
                Err(e) => {
                    debug!(%resource, error = %e, "Unreadable cache entry treated as absent");
                    ListLoad {
                        items: Vec::new(),
                        source: ListSource::Empty { error },
                    }
                }
            },
        }
    }

    /// `read_through` over the resource's collection endpoint.
    pub async fn fetch_list<T>(&self, api: &ApiClient, resource: Resource) -> ListLoad<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.read_through(resource, || api.fetch_list(resource)).await
    }

    /// Age of each cached resource, for "last updated" labels.
    pub fn cache_ages(&self) -> Vec<(Resource, Option<String>)> {
        Resource::ALL
            .iter()
            .map(|&resource| {
                let age = match self.load::<serde_json::Value>(resource) {
                    Ok(Some(cached)) => Some(cached.age_display()),
                    Ok(None) => None,
                    Err(e) => {
                        debug!(%resource, error = %e, "Failed to load cache for age display");
                        None
                    }
                };
                (resource, age)
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    use crate::api::RequestCounter;
    use crate::storage::{FileStore, MemoryStore};
    use crate::test_support::{unreachable_base_url, StubServer};

    fn unavailable() -> ApiError {
        ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, String::new())
    }

    #[test]
    fn test_fresh_entry_label() {
        let cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "updated just now");

        let mut skewed = CachedData::new(vec![1]);
        skewed.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(skewed.age_display(), "updated just now");
    }

    #[test]
    fn test_last_updated_label_rounding() {
        assert_eq!(last_updated_label(5), "updated 5 min ago");
        assert_eq!(last_updated_label(89), "updated 1 h ago");
        assert_eq!(last_updated_label(95), "updated 2 h ago");
        assert_eq!(last_updated_label(25 * 60), "updated 1 day ago");
        assert_eq!(last_updated_label(36 * 60 + 1), "updated 2 days ago");
    }

    #[tokio::test]
    async fn test_failed_fetch_serves_last_good_copy() {
        let cache = ListCache::new(Arc::new(MemoryStore::new()));

        let live = cache
            .read_through(Resource::Products, || async {
                Ok::<_, ApiError>(vec![json!({"id": 1, "name": "Coffee"})])
            })
            .await;
        assert!(live.is_live());

        let fallback: ListLoad<Value> = cache
            .read_through(Resource::Products, || async { Err(unavailable()) })
            .await;
        assert_eq!(fallback.items, vec![json!({"id": 1, "name": "Coffee"})]);
        assert!(matches!(fallback.source, ListSource::Cached { .. }));
        assert!(fallback.error().is_some());
    }

    #[tokio::test]
    async fn test_failed_fetch_without_cache_is_empty() {
        let cache = ListCache::new(Arc::new(MemoryStore::new()));

        let load: ListLoad<Value> = cache
            .read_through(Resource::Sales, || async { Err(unavailable()) })
            .await;
        assert!(load.items.is_empty());
        assert!(matches!(load.source, ListSource::Empty { .. }));
    }

    #[tokio::test]
    async fn test_successful_fetch_overwrites_whole_entry() {
        let cache = ListCache::new(Arc::new(MemoryStore::new()));

        cache
            .read_through(Resource::Sales, || async { Ok::<_, ApiError>(vec![json!(1), json!(2), json!(3)]) })
            .await;
        let second = cache
            .read_through(Resource::Sales, || async { Ok::<_, ApiError>(vec![json!(4)]) })
            .await;
        assert_eq!(second.items, vec![json!(4)]);

        let stored = cache.load::<Value>(Resource::Sales).unwrap().unwrap();
        assert_eq!(stored.data, vec![json!(4)]);
    }

    #[tokio::test]
    async fn test_live_fetch_always_attempted() {
        let cache = ListCache::new(Arc::new(MemoryStore::new()));
        cache.save(Resource::Banners, &[json!("old")]).unwrap();

        let load = cache
            .read_through(Resource::Banners, || async { Ok::<_, ApiError>(vec![json!("new")]) })
            .await;
        assert!(load.is_live());
        assert_eq!(load.items, vec![json!("new")]);
    }

    #[tokio::test]
    async fn test_keys_are_partitioned_by_resource() {
        let cache = ListCache::new(Arc::new(MemoryStore::new()));
        cache.save(Resource::Products, &[json!({"id": 1})]).unwrap();

        let load: ListLoad<Value> = cache
            .read_through(Resource::Sales, || async { Err(unavailable()) })
            .await;
        assert!(load.items.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entry_treated_as_absent() {
        let storage = Arc::new(MemoryStore::new());
        storage.set("products_cache", "{garbage").unwrap();
        let cache = ListCache::new(storage);

        let load: ListLoad<Value> = cache
            .read_through(Resource::Products, || async { Err(unavailable()) })
            .await;
        assert!(load.items.is_empty());
        assert!(matches!(load.source, ListSource::Empty { .. }));
    }

    #[tokio::test]
    async fn test_cache_persists_across_restarts() {
        let dir = tempdir().unwrap();
        {
            let cache = ListCache::new(Arc::new(FileStore::new(dir.path().to_path_buf()).unwrap()));
            cache.save(Resource::Products, &[json!({"id": 1})]).unwrap();
        }

        let cache = ListCache::new(Arc::new(FileStore::new(dir.path().to_path_buf()).unwrap()));
        let load: ListLoad<Value> = cache
            .read_through(Resource::Products, || async { Err(unavailable()) })
            .await;
        assert_eq!(load.items, vec![json!({"id": 1})]);
    }

    #[tokio::test]
    async fn test_fetch_list_over_http() {
        let server = StubServer::start(200, r#"[{"id":1,"name":"Coffee"}]"#).await;
        let counter = Arc::new(RequestCounter::new());
        let api = ApiClient::new(&server.base_url, counter.clone()).unwrap();
        let storage = Arc::new(MemoryStore::new());
        let cache = ListCache::new(storage.clone());

        let live: ListLoad<Value> = cache.fetch_list(&api, Resource::Products).await;
        assert!(live.is_live());

        // Same storage, API now unreachable
        let offline = ApiClient::new(&unreachable_base_url().await, counter.clone()).unwrap();
        let fallback: ListLoad<Value> = cache.fetch_list(&offline, Resource::Products).await;
        assert_eq!(fallback.items, vec![json!({"id": 1, "name": "Coffee"})]);
        assert!(matches!(fallback.error(), Some(ApiError::Network(_))));
        assert_eq!(counter.started(), 2);
        assert_eq!(counter.finished(), 2);
    }

    #[test]
    fn test_cache_ages() {
        let cache = ListCache::new(Arc::new(MemoryStore::new()));
        cache.save(Resource::Sales, &[json!(1)]).unwrap();

        let ages = cache.cache_ages();
        let sales = ages.iter().find(|(r, _)| *r == Resource::Sales).unwrap();
        assert_eq!(sales.1.as_deref(), Some("updated just now"));
        let products = ages.iter().find(|(r, _)| *r == Resource::Products).unwrap();
        assert_eq!(products.1, None);
    }
}
