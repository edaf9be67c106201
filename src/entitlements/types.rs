//! Data types for subscription entitlement tracking.

use crate::quota::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription plan, `free` when no active entitlement exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Free,
    Weekly,
    Monthly,
}

impl PlanType {
    /// Derives the plan from a billing-provider entitlement or package
    /// identifier. Ambiguous identifiers default to monthly.
    pub fn from_identifier(identifier: &str) -> Self {
        let lower = identifier.to_lowercase();
        if lower.contains("weekly") {
            PlanType::Weekly
        } else {
            PlanType::Monthly
        }
    }
}

impl From<PlanType> for Tier {
    fn from(plan: PlanType) -> Self {
        match plan {
            PlanType::Free => Tier::Free,
            PlanType::Weekly => Tier::Weekly,
            PlanType::Monthly => Tier::Monthly,
        }
    }
}

/// Resolved subscription state for one device.
///
/// Invariant: `is_active` implies `plan_type != Free`. A status whose
/// `expires_at` is in the past is treated as inactive and demoted to free
/// on the next read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub is_active: bool,
    pub plan_type: PlanType,
    pub expires_at: Option<DateTime<Utc>>,
    pub device_id: String,
}

impl SubscriptionStatus {
    /// The hardcoded last-resort default: free tier, nothing active.
    pub fn free_default(device_id: &str) -> Self {
        Self {
            is_active: false,
            plan_type: PlanType::Free,
            expires_at: None,
            device_id: device_id.to_string(),
        }
    }

    pub fn tier(&self) -> Tier {
        if self.is_active {
            self.plan_type.into()
        } else {
            Tier::Free
        }
    }

    /// True when the status carries an expiry that has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// A billing-provider grant indicating the user paid for a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Provider-side identifier, e.g. "weekly_premium".
    pub identifier: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A `device_subscriptions` row as stored in the remote database.
///
/// Rows are superseded, never mutated in place: a new purchase deactivates
/// the old record and inserts a fresh active one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSubscriptionRecord {
    pub id: String,
    pub device_id: String,
    pub plan_type: PlanType,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub purchase_token: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub local_price: Option<String>,
}

impl DeviceSubscriptionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// Fields for inserting a new active subscription row.
#[derive(Debug, Clone, Serialize)]
pub struct NewSubscription {
    pub device_id: String,
    pub plan_type: PlanType,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

/// Which source of truth produced a resolved status.
///
/// `Billing` and `Database` mean the answer was determined; `Cache` and
/// `Default` mean both remote sources were unavailable and the answer is a
/// continuity fallback, so "free" from those origins may mask an outage
/// rather than mean "no entitlement".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusOrigin {
    Billing,
    Database,
    Cache,
    Default,
}

impl StatusOrigin {
    /// True when the status came from an authoritative remote source.
    pub fn is_determined(&self) -> bool {
        matches!(self, StatusOrigin::Billing | StatusOrigin::Database)
    }
}

/// A subscription status together with the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStatus {
    pub status: SubscriptionStatus,
    pub origin: StatusOrigin,
}
