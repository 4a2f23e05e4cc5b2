//! The ordered provider chain.
//!
//! Providers are consulted strictly in trust order (API, scrape, registry).
//! `NotFound` and `Error` advance to the next provider; `Throttled` backs
//! off on that provider and retries it exactly once before advancing.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, debug_span, warn, Instrument};

use super::backoff::BackoffPolicy;
use super::rate_limit::RateGate;
use super::{ChainError, FetchOutcome, FetchedPatent, FullTextProvider, OutcomeKind};
use crate::config::ProviderConfig;
use crate::model::{DataSource, FullText};

/// A provider plus its pacing parameters, before it joins a chain.
pub struct ChainEntry {
    provider: Arc<dyn FullTextProvider>,
    min_interval: Duration,
    backoff: BackoffPolicy,
}

impl ChainEntry {
    pub fn new(provider: Arc<dyn FullTextProvider>, min_interval: Duration, backoff: BackoffPolicy) -> Self {
        Self {
            provider,
            min_interval,
            backoff,
        }
    }

    pub fn from_config(provider: Arc<dyn FullTextProvider>, config: &ProviderConfig) -> Self {
        Self::new(
            provider,
            Duration::from_millis(config.min_interval_ms),
            BackoffPolicy::from_config(&config.backoff),
        )
    }
}

/// Call counters of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub source: DataSource,
    pub calls: u64,
    pub found: u64,
    pub not_found: u64,
    pub throttled: u64,
    pub errors: u64,
}

#[derive(Default)]
struct Counters {
    calls: AtomicU64,
    found: AtomicU64,
    not_found: AtomicU64,
    throttled: AtomicU64,
    errors: AtomicU64,
}

struct Slot {
    source: DataSource,
    provider: Arc<dyn FullTextProvider>,
    gate: RateGate,
    backoff: BackoffPolicy,
    /// Consecutive throttled responses; drives the backoff exponent.
    throttle_streak: AtomicU32,
    counters: Counters,
}

/// One provider call made while resolving a patent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainAttempt {
    pub source: DataSource,
    pub outcome: OutcomeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A provider returned fresh data.
    Fetched(Box<FetchedPatent>),
    /// The cached full text stands: it is already the best this chain can
    /// offer, or no higher-priority provider had the patent.
    Cached(FullText),
    /// Every eligible provider was tried and none had the patent.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: Resolved,
    pub attempts: Vec<ChainAttempt>,
}

/// Shared by every worker and company run; each provider's rate gate lives here.
pub struct ProviderChain {
    slots: Vec<Slot>,
}

impl ProviderChain {
    /// Builds a chain ordered by trust. Fails on an empty list or when a
    /// source appears twice.
    pub fn new(entries: Vec<ChainEntry>) -> Result<Self, ChainError> {
        if entries.is_empty() {
            return Err(ChainError::NoProviders);
        }

        let mut slots: Vec<Slot> = Vec::with_capacity(entries.len());
        for entry in entries {
            let source = entry.provider.source();
            if slots.iter().any(|s| s.source == source) {
                return Err(ChainError::DuplicateProvider(source));
            }
            slots.push(Slot {
                source,
                provider: entry.provider,
                gate: RateGate::new(entry.min_interval),
                backoff: entry.backoff,
                throttle_streak: AtomicU32::new(0),
                counters: Counters::default(),
            });
        }
        slots.sort_by_key(|s| s.source.rank());

        Ok(Self { slots })
    }

    /// Sources in the order they are consulted.
    pub fn sources(&self) -> Vec<DataSource> {
        self.slots.iter().map(|s| s.source).collect()
    }

    /// The most trusted source in this chain.
    pub fn top_source(&self) -> DataSource {
        // `new` rejects empty chains.
        self.slots.first().map(|s| s.source).unwrap_or(DataSource::Api)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Resolves one patent's full text.
    ///
    /// With a `cached` full text only providers strictly more trusted than
    /// its source are consulted, and the cached text is returned when none
    /// of them has the patent. A cached text from the top source is returned
    /// without any call.
    pub async fn resolve(&self, patent_id: &str, cached: Option<&FullText>) -> Resolution {
        let span = debug_span!("resolve", patent_id = %patent_id);
        self.resolve_inner(patent_id, cached).instrument(span).await
    }

    async fn resolve_inner(&self, patent_id: &str, cached: Option<&FullText>) -> Resolution {
        let ceiling = cached.map(|c| c.data_source.rank()).unwrap_or(u8::MAX);
        let mut attempts = Vec::new();

        for slot in self.slots.iter().filter(|s| s.source.rank() < ceiling) {
            if let Some(fetched) = self.try_slot(slot, patent_id, &mut attempts).await {
                return Resolution {
                    resolved: Resolved::Fetched(fetched),
                    attempts,
                };
            }
        }

        let resolved = match cached {
            Some(full_text) => Resolved::Cached(full_text.clone()),
            None => Resolved::Unresolved,
        };
        Resolution { resolved, attempts }
    }

    /// Calls one provider, retrying once after a throttle.
    async fn try_slot(
        &self,
        slot: &Slot,
        patent_id: &str,
        attempts: &mut Vec<ChainAttempt>,
    ) -> Option<Box<FetchedPatent>> {
        let mut retried = false;
        loop {
            slot.gate.acquire().await;
            slot.counters.calls.fetch_add(1, Ordering::Relaxed);
            let outcome = slot.provider.fetch(patent_id).await;
            attempts.push(ChainAttempt {
                source: slot.source,
                outcome: outcome.kind(),
            });

            match outcome {
                FetchOutcome::Found(mut fetched) => {
                    slot.throttle_streak.store(0, Ordering::Relaxed);
                    slot.counters.found.fetch_add(1, Ordering::Relaxed);
                    // Trust follows the slot that answered.
                    fetched.full_text.data_source = slot.source;
                    debug!(source = %slot.source, "Full text found");
                    return Some(fetched);
                }
                FetchOutcome::NotFound => {
                    slot.throttle_streak.store(0, Ordering::Relaxed);
                    slot.counters.not_found.fetch_add(1, Ordering::Relaxed);
                    debug!(source = %slot.source, "Not found, advancing");
                    return None;
                }
                FetchOutcome::Error(message) => {
                    slot.throttle_streak.store(0, Ordering::Relaxed);
                    slot.counters.errors.fetch_add(1, Ordering::Relaxed);
                    warn!(source = %slot.source, error = %message, "Provider error, advancing");
                    return None;
                }
                FetchOutcome::Throttled { retry_after } => {
                    slot.counters.throttled.fetch_add(1, Ordering::Relaxed);
                    if retried {
                        warn!(source = %slot.source, "Still throttled after retry, advancing");
                        return None;
                    }
                    let streak = slot.throttle_streak.fetch_add(1, Ordering::Relaxed);
                    let delay = slot.backoff.delay(streak, retry_after);
                    warn!(
                        source = %slot.source,
                        delay_ms = delay.as_millis() as u64,
                        "Throttled, backing off before one retry"
                    );
                    slot.gate.defer(delay).await;
                    retried = true;
                }
            }
        }
    }

    /// Counter snapshot per provider, in chain order.
    pub fn stats(&self) -> Vec<ProviderStats> {
        self.slots
            .iter()
            .map(|slot| ProviderStats {
                source: slot.source,
                calls: slot.counters.calls.load(Ordering::Relaxed),
                found: slot.counters.found.load(Ordering::Relaxed),
                not_found: slot.counters.not_found.load(Ordering::Relaxed),
                throttled: slot.counters.throttled.load(Ordering::Relaxed),
                errors: slot.counters.errors.load(Ordering::Relaxed),
            })
            .collect()
    }
}
