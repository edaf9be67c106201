//! Coordination of one billable AI operation.
//!
//! Flow: resolve the current tier, check the quota, let the caller run the
//! external AI call, and record usage only after that call succeeded.
//! Failed calls never consume quota.

use crate::entitlements::resolver::EntitlementResolver;
use crate::quota::{QuotaDecision, QuotaTracker};

/// Short-lived gate a screen wraps around a single recipe-generation or
/// photo-analysis request.
pub struct BillableGate<'a> {
    resolver: &'a EntitlementResolver,
    tracker: &'a mut QuotaTracker,
}

impl<'a> BillableGate<'a> {
    pub fn new(resolver: &'a EntitlementResolver, tracker: &'a mut QuotaTracker) -> Self {
        Self { resolver, tracker }
    }

    /// Syncs the tracker to the resolver's current tier, then evaluates the
    /// quota. A denied decision is the caller's cue for an upsell prompt.
    pub fn check(&mut self) -> QuotaDecision {
        self.tracker.set_tier(self.resolver.current_tier());
        self.tracker.can_use()
    }

    /// Records the operation against the quota. Call exactly once, after
    /// the AI call returned successfully.
    pub fn commit(&mut self) {
        self.tracker.record_usage();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::entitlements::billing::{BillingClient, BillingError, DeviceAttributes};
    use crate::entitlements::db::SubscriptionDb;
    use crate::entitlements::types::{
        DeviceSubscriptionRecord, Entitlement, NewSubscription, PlanType, SubscriptionStatus,
    };
    use crate::kv_store::{KvStore, MemoryKvStore, SUBSCRIPTION_STATUS_KEY};
    use anyhow::Result;
    use std::sync::Arc;

    /// Billing provider that is always unreachable.
    struct OfflineBilling;

    impl BillingClient for OfflineBilling {
        fn active_entitlements(
            &self,
            _attributes: &DeviceAttributes,
        ) -> Result<Vec<Entitlement>, BillingError> {
            Err(BillingError::Provider("offline".to_string()))
        }
        fn purchase(&self, _plan_id: &str) -> Result<Vec<Entitlement>, BillingError> {
            Err(BillingError::Provider("offline".to_string()))
        }
        fn restore(&self) -> Result<Vec<Entitlement>, BillingError> {
            Err(BillingError::Provider("offline".to_string()))
        }
        fn ping(&self) -> bool {
            false
        }
    }

    /// Database that is always unreachable.
    struct OfflineDb;

    impl SubscriptionDb for OfflineDb {
        fn latest_active_for_device(
            &self,
            _device_id: &str,
        ) -> Result<Option<DeviceSubscriptionRecord>> {
            anyhow::bail!("offline")
        }
        fn insert_active(&self, _subscription: &NewSubscription) -> Result<()> {
            anyhow::bail!("offline")
        }
        fn deactivate_all_for_device(&self, _device_id: &str) -> Result<()> {
            anyhow::bail!("offline")
        }
        fn deactivate_record(&self, _record_id: &str) -> Result<()> {
            anyhow::bail!("offline")
        }
        fn ping(&self) -> bool {
            false
        }
    }

    fn offline_resolver(store: Arc<dyn KvStore>) -> EntitlementResolver {
        let mut resolver = EntitlementResolver::new(
            Box::new(OfflineBilling),
            Box::new(OfflineDb),
            store,
            Arc::new(SystemClock),
        );
        resolver.initialize();
        resolver
    }

    #[test]
    fn test_free_tier_gates_after_single_commit() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let resolver = offline_resolver(store.clone());
        let mut tracker = QuotaTracker::open(store, Arc::new(SystemClock));

        let mut gate = BillableGate::new(&resolver, &mut tracker);
        assert!(gate.check().allowed);
        gate.commit();

        let decision = gate.check();
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after_hours, Some(24));
    }

    #[test]
    fn test_failed_ai_call_consumes_no_quota() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let resolver = offline_resolver(store.clone());
        let mut tracker = QuotaTracker::open(store, Arc::new(SystemClock));

        let mut gate = BillableGate::new(&resolver, &mut tracker);
        assert!(gate.check().allowed);
        // The AI call failed, so commit is never reached.
        assert!(gate.check().allowed);
    }

    #[test]
    fn test_gate_picks_up_cached_premium_tier() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let cached = SubscriptionStatus {
            is_active: true,
            plan_type: PlanType::Weekly,
            expires_at: None,
            device_id: "device-1".to_string(),
        };
        store
            .set(
                SUBSCRIPTION_STATUS_KEY,
                &serde_json::to_string(&cached).unwrap(),
            )
            .unwrap();

        let resolver = offline_resolver(store.clone());
        let mut tracker = QuotaTracker::open(store, Arc::new(SystemClock));

        // Weekly tier allows three operations per day.
        let mut gate = BillableGate::new(&resolver, &mut tracker);
        for _ in 0..3 {
            assert!(gate.check().allowed);
            gate.commit();
        }
        assert!(!gate.check().allowed);
    }
}
