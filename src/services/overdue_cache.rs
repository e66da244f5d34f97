//! Time-boxed cache for the "list overdue loans" query
//!
//! The underlying scan (all unreturned loans, filtered by derived state)
//! is the most expensive read in the system and gets triggered on every
//! dashboard render. The cache serves results for a fixed freshness
//! window and coalesces concurrent fetches: one caller performs the scan,
//! the others poll-wait on the in-flight flag for a bounded time. The
//! only contention here is redundant reads, so a flag plus polling is
//! enough; no queue or lock handoff.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::error::AppResult;
use crate::models::loan::{DerivedStatus, Loan};
use crate::models::thresholds::LoanThresholds;
use crate::repository::Repository;
use crate::services::state::derive_state;

/// How long a cached result is served without rescanning
pub const CACHE_FRESHNESS: Duration = Duration::from_secs(30);
/// Upper bound on waiting for another caller's in-flight fetch
pub const MAX_FETCH_WAIT: Duration = Duration::from_secs(5);
/// Poll interval while waiting on an in-flight fetch
pub const FETCH_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct CacheEntry {
    loans: Vec<Loan>,
    fetched_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    fetch_in_flight: bool,
    /// Bumped by `invalidate`; a fetch started under an older epoch must
    /// not repopulate the cache.
    epoch: u64,
}

/// Request-coalescing cache in front of the overdue-loans scan
#[derive(Default)]
pub struct OverdueQueryCache {
    state: Mutex<CacheState>,
}

enum Plan {
    Fetch,
    WaitForFetch,
}

impl OverdueQueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Drop the cached result. Called synchronously after any write that
    /// can change overdue membership; effective before the next
    /// `get_overdue_loans` call.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.entry = None;
        state.epoch += 1;
    }

    /// Loans currently in a derived Overdue or OverdueGrave state
    pub async fn get_overdue_loans(
        &self,
        repository: &Repository,
        thresholds: &LoanThresholds,
    ) -> AppResult<Vec<Loan>> {
        let plan = {
            let mut state = self.lock();
            if let Some(entry) = &state.entry {
                if entry.fetched_at.elapsed() < CACHE_FRESHNESS {
                    return Ok(entry.loans.clone());
                }
            }
            if state.fetch_in_flight {
                Plan::WaitForFetch
            } else {
                state.fetch_in_flight = true;
                Plan::Fetch
            }
        };

        match plan {
            Plan::Fetch => self.fetch_and_store(repository, thresholds).await,
            Plan::WaitForFetch => {
                let attempts = MAX_FETCH_WAIT.as_millis() / FETCH_POLL_INTERVAL.as_millis();
                for _ in 0..attempts {
                    tokio::time::sleep(FETCH_POLL_INTERVAL).await;
                    let state = self.lock();
                    if let Some(entry) = &state.entry {
                        if entry.fetched_at.elapsed() < CACHE_FRESHNESS {
                            return Ok(entry.loans.clone());
                        }
                    }
                    if !state.fetch_in_flight {
                        // The other fetch finished without a fresh result
                        // (it failed); no point waiting further.
                        break;
                    }
                }
                {
                    let mut state = self.lock();
                    if let Some(entry) = &state.entry {
                        tracing::warn!(
                            "overdue fetch still pending after {:?}, serving stale cache",
                            MAX_FETCH_WAIT
                        );
                        return Ok(entry.loans.clone());
                    }
                    state.fetch_in_flight = true;
                }
                self.fetch_and_store(repository, thresholds).await
            }
        }
    }

    async fn fetch_and_store(
        &self,
        repository: &Repository,
        thresholds: &LoanThresholds,
    ) -> AppResult<Vec<Loan>> {
        let started_epoch = {
            let state = self.lock();
            state.epoch
        };
        let result = Self::fetch(repository, thresholds).await;
        let mut state = self.lock();
        state.fetch_in_flight = false;
        match result {
            Ok(loans) => {
                if state.epoch == started_epoch {
                    state.entry =
                        Some(CacheEntry { loans: loans.clone(), fetched_at: Instant::now() });
                }
                Ok(loans)
            }
            Err(error) => {
                if let Some(entry) = &state.entry {
                    tracing::warn!("overdue fetch failed, serving stale cache: {}", error);
                    Ok(entry.loans.clone())
                } else {
                    tracing::error!("overdue fetch failed with no cache to fall back on: {}", error);
                    Err(error)
                }
            }
        }
    }

    async fn fetch(
        repository: &Repository,
        thresholds: &LoanThresholds,
    ) -> AppResult<Vec<Loan>> {
        let now = Utc::now();
        let unreturned = repository.loans.find_unreturned().await?;
        Ok(unreturned
            .into_iter()
            .filter(|loan| {
                matches!(
                    derive_state(loan, thresholds, now).status,
                    DerivedStatus::Overdue | DerivedStatus::OverdueGrave
                )
            })
            .collect())
    }

    /// Test hook: age the cached entry so freshness expiry can be
    /// exercised without waiting out the window.
    #[cfg(test)]
    pub(crate) fn age_entry_by(&self, by: Duration) {
        let mut state = self.lock();
        if let Some(entry) = &mut state.entry {
            entry.fetched_at -= by;
        }
    }
}
