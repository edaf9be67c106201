//! Entitlement resolution across the billing provider, the replicated
//! database, and the local cache.

use super::billing::{BillingClient, BillingError, DeviceAttributes};
use super::db::SubscriptionDb;
use super::types::{
    Entitlement, NewSubscription, ResolvedStatus, StatusOrigin, SubscriptionStatus,
};
use crate::clock::Clock;
use crate::kv_store::{KvStore, DEVICE_ID_KEY, SUBSCRIPTION_STATUS_KEY};
use crate::pricing;
use crate::quota::Tier;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

/// Result of a purchase or restore flow. Cancellation by the user is a
/// normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Completed(ResolvedStatus),
    Cancelled,
}

/// Per-dependency connectivity snapshot. Diagnostics only; never used for
/// gating features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub billing_connected: bool,
    pub db_connected: bool,
    pub device_id_valid: bool,
    pub cache_available: bool,
}

/// Resolves whether this device holds an active premium entitlement.
///
/// One resolver instance lives for the app session and is constructed
/// explicitly with its collaborators; screens receive it by reference.
/// Precedence is fixed: billing provider, then database record, then local
/// cache, then the hardcoded free default. Each source is tried exactly
/// once per refresh, with no retries.
pub struct EntitlementResolver {
    billing: Box<dyn BillingClient>,
    db: Box<dyn SubscriptionDb>,
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    device_id: String,
    current: ResolvedStatus,
}

impl EntitlementResolver {
    pub fn new(
        billing: Box<dyn BillingClient>,
        db: Box<dyn SubscriptionDb>,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            billing,
            db,
            store,
            clock,
            device_id: String::new(),
            current: ResolvedStatus {
                status: SubscriptionStatus::free_default(""),
                origin: StatusOrigin::Default,
            },
        }
    }

    /// Establishes the persisted device identifier and primes the in-memory
    /// status with one refresh. Failures never propagate; the resolver is
    /// left at the free-tier default.
    pub fn initialize(&mut self) {
        self.device_id = self.ensure_device_id();
        self.current = ResolvedStatus {
            status: SubscriptionStatus::free_default(&self.device_id),
            origin: StatusOrigin::Default,
        };
        self.refresh_status();
    }

    /// The opaque identifier correlating this installation with remote
    /// subscription records. Generated once, persisted thereafter.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The most recently resolved status.
    pub fn current_status(&self) -> &ResolvedStatus {
        &self.current
    }

    /// The quota tier implied by the current status. A status whose expiry
    /// has passed since the last refresh counts as free.
    pub fn current_tier(&self) -> Tier {
        if self.current.status.is_expired(self.clock.now()) {
            Tier::Free
        } else {
            self.current.status.tier()
        }
    }

    /// Re-resolves the subscription status through the precedence chain and
    /// caches the result in memory.
    pub fn refresh_status(&mut self) -> ResolvedStatus {
        let resolved = self.resolve();
        self.current = resolved.clone();
        resolved
    }

    fn resolve(&self) -> ResolvedStatus {
        // 1. Billing provider: the only source that can grant entitlement.
        match self.billing.active_entitlements(&self.device_attributes()) {
            Ok(entitlements) => {
                if let Some(entitlement) = entitlements.first() {
                    let status = self.status_from_entitlement(entitlement);
                    self.replicate_to_db(&status, entitlement);
                    self.cache_status(&status);
                    return ResolvedStatus {
                        status,
                        origin: StatusOrigin::Billing,
                    };
                }
                tracing::debug!("Billing provider reports no active entitlement");
            }
            Err(e) => {
                tracing::warn!("Billing provider unavailable: {}", e);
            }
        }

        // 2. Replicated database record.
        match self.db.latest_active_for_device(&self.device_id) {
            Ok(Some(record)) => {
                let status = if record.is_expired(self.clock.now()) {
                    if let Err(e) = self.db.deactivate_record(&record.id) {
                        tracing::warn!("Failed to deactivate expired record: {:#}", e);
                    }
                    SubscriptionStatus::free_default(&self.device_id)
                } else {
                    SubscriptionStatus {
                        is_active: record.is_active,
                        plan_type: record.plan_type,
                        expires_at: record.expires_at,
                        device_id: self.device_id.clone(),
                    }
                };
                self.cache_status(&status);
                return ResolvedStatus {
                    status,
                    origin: StatusOrigin::Database,
                };
            }
            Ok(None) => {
                tracing::debug!("No active database record for device");
            }
            Err(e) => {
                tracing::warn!("Subscription database unavailable: {:#}", e);
            }
        }

        // 3. Last locally cached status, for continuity when both networks
        //    are down. A cached status past its expiry is demoted to free,
        //    the same rule applied to database records above.
        if let Some(status) = self.cached_status() {
            return ResolvedStatus {
                status,
                origin: StatusOrigin::Cache,
            };
        }

        // 4. Hardcoded free default.
        ResolvedStatus {
            status: SubscriptionStatus::free_default(&self.device_id),
            origin: StatusOrigin::Default,
        }
    }

    /// Runs the purchase flow for a plan, then reconciles via refresh.
    /// Cancellation is suppressed; other failures are surfaced so the user
    /// can retry or pick another plan.
    pub fn purchase(&mut self, plan_id: &str) -> Result<PurchaseOutcome> {
        match self.billing.purchase(plan_id) {
            Ok(_) => Ok(PurchaseOutcome::Completed(self.refresh_status())),
            Err(BillingError::Cancelled) => {
                tracing::debug!("Purchase of '{}' cancelled by user", plan_id);
                Ok(PurchaseOutcome::Cancelled)
            }
            Err(e) => Err(anyhow::Error::new(e))
                .with_context(|| format!("Purchase failed for plan '{}'", plan_id)),
        }
    }

    /// Runs the restore-purchases flow, then reconciles via refresh.
    pub fn restore(&mut self) -> Result<PurchaseOutcome> {
        match self.billing.restore() {
            Ok(_) => Ok(PurchaseOutcome::Completed(self.refresh_status())),
            Err(BillingError::Cancelled) => {
                tracing::debug!("Restore cancelled by user");
                Ok(PurchaseOutcome::Cancelled)
            }
            Err(e) => Err(anyhow::Error::new(e)).context("Restore purchases failed"),
        }
    }

    /// Probes each dependency independently without mutating state.
    pub fn health_check(&self) -> HealthReport {
        HealthReport {
            billing_connected: self.billing.ping(),
            db_connected: self.db.ping(),
            device_id_valid: !self.device_id.is_empty(),
            cache_available: matches!(self.store.get(SUBSCRIPTION_STATUS_KEY), Ok(Some(_))),
        }
    }

    fn ensure_device_id(&self) -> String {
        match self.store.get(DEVICE_ID_KEY) {
            Ok(Some(id)) if !id.is_empty() => return id,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to read device id: {:#}", e);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self.store.set(DEVICE_ID_KEY, &id) {
            tracing::warn!("Failed to persist device id: {:#}", e);
        }
        id
    }

    fn device_attributes(&self) -> DeviceAttributes {
        let region = pricing::stored_region_override(self.store.as_ref());
        DeviceAttributes {
            device_id: self.device_id.clone(),
            country: region.map(|r| r.code().to_string()),
            currency: region.map(|r| r.currency().to_string()),
        }
    }

    fn status_from_entitlement(&self, entitlement: &Entitlement) -> SubscriptionStatus {
        SubscriptionStatus {
            is_active: true,
            plan_type: super::types::PlanType::from_identifier(&entitlement.identifier),
            expires_at: entitlement.expires_at,
            device_id: self.device_id.clone(),
        }
    }

    /// Write-behind replication of a billing-confirmed status: the old
    /// active record is deactivated, then a fresh one inserted. Not
    /// transactional; failures are logged and never affect the result.
    fn replicate_to_db(&self, status: &SubscriptionStatus, entitlement: &Entitlement) {
        if let Err(e) = self.db.deactivate_all_for_device(&self.device_id) {
            tracing::warn!("Failed to deactivate previous records: {:#}", e);
            return;
        }

        let attributes = self.device_attributes();
        let row = NewSubscription {
            device_id: self.device_id.clone(),
            plan_type: status.plan_type,
            is_active: true,
            expires_at: status.expires_at,
            purchase_token: Some(entitlement.identifier.clone()),
            country_code: attributes.country,
            currency_code: attributes.currency,
        };
        if let Err(e) = self.db.insert_active(&row) {
            tracing::warn!("Failed to replicate subscription record: {:#}", e);
        }
    }

    fn cache_status(&self, status: &SubscriptionStatus) {
        match serde_json::to_string(status) {
            Ok(raw) => {
                if let Err(e) = self.store.set(SUBSCRIPTION_STATUS_KEY, &raw) {
                    tracing::warn!("Failed to cache subscription status: {:#}", e);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to serialize subscription status: {}", e);
            }
        }
    }

    fn cached_status(&self) -> Option<SubscriptionStatus> {
        let raw = self.store.get(SUBSCRIPTION_STATUS_KEY).ok().flatten()?;
        match serde_json::from_str::<SubscriptionStatus>(&raw) {
            Ok(status) if status.is_expired(self.clock.now()) => {
                tracing::debug!("Cached subscription status expired; demoting to free");
                Some(SubscriptionStatus::free_default(&self.device_id))
            }
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!("Discarding unparseable cached status: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
