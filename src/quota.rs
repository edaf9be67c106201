//! Daily usage quota tracking for billable AI operations.
//!
//! Each installation gets a per-tier allowance of operations per rolling
//! 24-hour window. The window is measured from the last reset instant, not
//! aligned to calendar midnight, which sidesteps clock/timezone ambiguity.
//! A user changing the device clock can shift the window; that is an
//! accepted weakness of the rolling-day model.

use crate::clock::Clock;
use crate::kv_store::{KvStore, USAGE_RECORD_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const RESET_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Subscription level determining the daily operation limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Weekly,
    Monthly,
}

impl Tier {
    /// Billable operations allowed per rolling day.
    pub fn daily_limit(&self) -> u32 {
        match self {
            Tier::Free => 1,
            Tier::Weekly => 3,
            Tier::Monthly => 5,
        }
    }
}

/// Persisted counter state for one installation.
///
/// `count` is monotonically non-decreasing between resets; a reset occurs
/// exactly when 24 hours have elapsed since `last_reset_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub count: u32,
    /// Epoch milliseconds of the last counter reset.
    pub last_reset_ms: i64,
}

/// Outcome of a quota check. A denied check is a normal negative result,
/// not an error; callers turn it into an upsell prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Whole hours (rounded up) until the window resets, set when denied.
    pub retry_after_hours: Option<u32>,
}

/// Read-only projection of current usage against the active tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub used: u32,
    pub limit: u32,
    pub resets_in_hours: u32,
}

/// Gates billable AI operations behind a per-tier daily quota.
///
/// One tracker instance lives for the app session and is handed to screens
/// by reference. In-memory state is authoritative; storage writes that fail
/// are logged and retried implicitly on the next successful write.
pub struct QuotaTracker {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    tier: Tier,
    record: UsageRecord,
}

impl QuotaTracker {
    /// Opens the tracker, loading any persisted record. A device that has
    /// never been used starts at `count = 0` with the window anchored now.
    pub fn open(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        let record = match store.get(USAGE_RECORD_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Discarding unparseable usage record: {}", e);
                    Self::fresh_record(clock.as_ref())
                }
            },
            Ok(None) => Self::fresh_record(clock.as_ref()),
            Err(e) => {
                tracing::warn!("Failed to load usage record: {:#}", e);
                Self::fresh_record(clock.as_ref())
            }
        };

        Self {
            store,
            clock,
            tier: Tier::Free,
            record,
        }
    }

    fn fresh_record(clock: &dyn Clock) -> UsageRecord {
        UsageRecord {
            count: 0,
            last_reset_ms: clock.now().timestamp_millis(),
        }
    }

    /// The tier the quota is currently evaluated against.
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Changes the active tier. Takes effect on the next check; the existing
    /// count is never migrated, only the ceiling it is compared against.
    pub fn set_tier(&mut self, tier: Tier) {
        self.tier = tier;
    }

    /// Checks whether another billable operation is allowed right now.
    pub fn can_use(&mut self) -> QuotaDecision {
        self.apply_reset_rule();

        if self.record.count >= self.tier.daily_limit() {
            QuotaDecision {
                allowed: false,
                retry_after_hours: Some(self.hours_until_reset()),
            }
        } else {
            QuotaDecision {
                allowed: true,
                retry_after_hours: None,
            }
        }
    }

    /// Records one billable operation. Call only after the corresponding AI
    /// call succeeded; failed calls must not consume quota.
    pub fn record_usage(&mut self) {
        self.apply_reset_rule();
        self.record.count += 1;
        self.persist();
    }

    /// Current usage against the active tier's limit.
    pub fn stats(&mut self) -> UsageStats {
        self.apply_reset_rule();
        UsageStats {
            used: self.record.count,
            limit: self.tier.daily_limit(),
            resets_in_hours: self.hours_until_reset(),
        }
    }

    /// Zeroes the counter if 24 hours have elapsed since the last reset,
    /// persisting before the caller evaluates its own result.
    fn apply_reset_rule(&mut self) {
        let now_ms = self.clock.now().timestamp_millis();
        if now_ms - self.record.last_reset_ms >= RESET_INTERVAL_MS {
            self.record.count = 0;
            self.record.last_reset_ms = now_ms;
            self.persist();
        }
    }

    fn hours_until_reset(&self) -> u32 {
        let elapsed_ms = (self.clock.now().timestamp_millis() - self.record.last_reset_ms).max(0);
        let remaining_hours = 24.0 - elapsed_ms as f64 / MS_PER_HOUR;
        remaining_hours.ceil().max(0.0) as u32
    }

    /// Writes the record to storage. Failures are non-fatal: in-memory state
    /// stays authoritative and the next successful write re-syncs it.
    fn persist(&self) {
        let raw = match serde_json::to_string(&self.record) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to serialize usage record: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(USAGE_RECORD_KEY, &raw) {
            tracing::warn!("Failed to persist usage record: {:#}", e);
        }
    }
}
