use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::error::DomainError;
use crate::domain::location::Address;

const USER_AGENT: &str = "SeattlePulse/1.0";
const CACHE_CAPACITY: usize = 512;
/// Coordinates are rounded to 5 decimal places (about a metre) for caching.
const CACHE_SCALE: f64 = 100_000.0;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Address components at a point; `None` when the provider knows nothing there.
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<Address>, DomainError>;

    /// Coordinates of the best match for a free-form place name.
    async fn search(&self, query: &str) -> Result<Option<(f64, f64)>, DomainError>;
}

#[derive(Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

type CacheKey = (i64, i64);

fn cache_key(lat: f64, lon: f64) -> CacheKey {
    (
        (lat * CACHE_SCALE).round() as i64,
        (lon * CACHE_SCALE).round() as i64,
    )
}

/// Insertion-ordered cache that forgets the oldest entry once full.
struct GeocodeCache {
    capacity: usize,
    entries: HashMap<CacheKey, Option<Address>>,
    order: VecDeque<CacheKey>,
}

impl GeocodeCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Option<Address>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: CacheKey, value: Option<Address>) {
        if self.entries.insert(key, value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

/// OpenStreetMap Nominatim client with a per-attempt timeout and bounded retries.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    cache: Mutex<GeocodeCache>,
}

impl NominatimGeocoder {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            max_retries: max_retries.max(1),
            cache: Mutex::new(GeocodeCache::new(CACHE_CAPACITY)),
        })
    }

    fn cached(&self, key: &CacheKey) -> Option<Option<Address>> {
        self.cache.lock().ok().and_then(|cache| cache.get(key))
    }

    fn remember(&self, key: CacheKey, value: Option<Address>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, value);
        }
    }

    async fn reverse_once(&self, lat: f64, lon: f64) -> Result<Option<Address>, reqwest::Error> {
        let response: ReverseResponse = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "json".to_string()),
                ("zoom", "14".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.address)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<Address>, DomainError> {
        let key = cache_key(lat, lon);
        if let Some(hit) = self.cached(&key) {
            debug!(lat, lon, "reverse geocode cache hit");
            return Ok(hit);
        }

        let mut last_error = None;
        for attempt in 1..=self.max_retries {
            match self.reverse_once(lat, lon).await {
                Ok(address) => {
                    self.remember(key, address.clone());
                    return Ok(address);
                }
                Err(e) => {
                    warn!(
                        lat,
                        lon,
                        attempt,
                        max_retries = self.max_retries,
                        "reverse geocode failed: {}",
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(DomainError::Geocoding(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        ))
    }

    async fn search(&self, query: &str) -> Result<Option<(f64, f64)>, DomainError> {
        let hits: Vec<SearchHit> = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| DomainError::Geocoding(e.to_string()))?
            .json()
            .await
            .map_err(|e| DomainError::Geocoding(e.to_string()))?;

        let Some(first) = hits.into_iter().next() else {
            return Ok(None);
        };
        match (first.lat.parse::<f64>(), first.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Ok(Some((lat, lon))),
            _ => {
                warn!(query, "geocoder returned unparseable coordinates");
                Ok(None)
            }
        }
    }
}
