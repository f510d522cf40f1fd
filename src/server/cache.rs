//! Short-lived cache in front of the facet-value lookups.
//!
//! Value catalogues change only when the reference tables are reloaded, and
//! every client asks for the same handful of them on start-up. Entries live
//! for a fixed TTL; there is no other invalidation.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Bodies larger than this are passed through uncached.
const MAX_CACHED_BODY: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
struct Entry {
    body: Bytes,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The stored body for `key`, if it has not expired. An expired entry is
    /// removed on the way out.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                    return Some(entry.body.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|e| e.stored_at.elapsed() >= self.ttl)
        {
            entries.remove(key);
        }
        None
    }

    pub async fn insert(&self, key: String, body: Bytes) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, e| e.stored_at.elapsed() < ttl);
        entries.insert(
            key,
            Entry {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Normalized cache key: the path plus the query pairs in sorted order, so
/// `?a=1&b=2` and `?b=2&a=1` share an entry.
pub fn cache_key(uri: &Uri) -> String {
    let mut pairs: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty())
        .collect();
    pairs.sort_unstable();

    if pairs.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), pairs.join("&"))
    }
}

/// Middleware serving cached JSON bodies for GET requests and storing the
/// successful ones it lets through.
pub async fn cache_layer(
    State(cache): State<Arc<ResultCache>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = cache_key(request.uri());
    if let Some(body) = cache.get(&key).await {
        debug!(%key, "cache hit");
        return json_body(body);
    }

    let response = next.run(request).await;
    if !response.status().is_success() || !is_json(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    match axum::body::to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => {
            debug!(%key, size = bytes.len(), "cache store");
            cache.insert(key, bytes.clone()).await;
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            warn!(%key, "response body not cacheable: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

fn json_body(body: Bytes) -> Response {
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}
