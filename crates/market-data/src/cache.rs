use analysis_core::{Bar, Financials, FundamentalsProvider, FundamentalsRecord, PriceHistoryProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

pub const CACHE_TTL_SECS: i64 = 300; // 5 minutes

struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// TTL cache in front of any provider.
///
/// Only hits are cached, so a symbol the upstream could not serve is asked
/// for again on the next call.
pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    fundamentals_cache: DashMap<String, CacheEntry<FundamentalsRecord>>,
    financials_cache: DashMap<String, CacheEntry<Vec<Financials>>>,
    bars_cache: DashMap<String, CacheEntry<Vec<Bar>>>,
}

impl<P> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, Duration::seconds(CACHE_TTL_SECS))
    }

    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            fundamentals_cache: DashMap::new(),
            financials_cache: DashMap::new(),
            bars_cache: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn clear(&self) {
        self.fundamentals_cache.clear();
        self.financials_cache.clear();
        self.bars_cache.clear();
    }

    fn lookup<T: Clone>(&self, cache: &DashMap<String, CacheEntry<T>>, key: &str) -> Option<T> {
        let entry = cache.get(key)?;
        if Utc::now() - entry.cached_at < self.ttl {
            return Some(entry.data.clone());
        }
        drop(entry);
        cache.remove(key);
        None
    }

    fn store<T: Clone>(cache: &DashMap<String, CacheEntry<T>>, key: String, value: Option<T>) -> Option<T> {
        if let Some(data) = &value {
            cache.insert(key, CacheEntry { data: data.clone(), cached_at: Utc::now() });
        }
        value
    }
}

#[async_trait]
impl<P: FundamentalsProvider> FundamentalsProvider for CachedProvider<P> {
    async fn fundamentals(&self, symbol: &str) -> Option<FundamentalsRecord> {
        let key = symbol.to_uppercase();
        if let Some(hit) = self.lookup(&self.fundamentals_cache, &key) {
            return Some(hit);
        }
        let fetched = self.inner.fundamentals(symbol).await;
        Self::store(&self.fundamentals_cache, key, fetched)
    }

    async fn quarterly_financials(&self, symbol: &str) -> Option<Vec<Financials>> {
        let key = symbol.to_uppercase();
        if let Some(hit) = self.lookup(&self.financials_cache, &key) {
            return Some(hit);
        }
        let fetched = self.inner.quarterly_financials(symbol).await;
        Self::store(&self.financials_cache, key, fetched)
    }
}

#[async_trait]
impl<P: PriceHistoryProvider> PriceHistoryProvider for CachedProvider<P> {
    async fn price_history(&self, symbol: &str, lookback: Duration) -> Option<Vec<Bar>> {
        let key = format!("{}:{}", symbol.to_uppercase(), lookback.num_days());
        if let Some(hit) = self.lookup(&self.bars_cache, &key) {
            return Some(hit);
        }
        let fetched = self.inner.price_history(symbol, lookback).await;
        Self::store(&self.bars_cache, key, fetched)
    }
}
