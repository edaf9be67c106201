//! Core business logic for FridgeChef: usage-quota tracking and
//! subscription entitlement resolution.
//!
//! This crate is a pure in-process layer between the app's screens and its
//! remote collaborators (billing provider, subscription database, AI
//! services). It owns no wire format and no CLI surface. The two service
//! objects, [`quota::QuotaTracker`] and
//! [`entitlements::resolver::EntitlementResolver`], are constructed once
//! per app session and handed to screens by reference.
//!
//! Control flow for a billable action: the resolver supplies the current
//! tier, the tracker checks the daily allowance, the caller runs the
//! external AI call, and only a successful call is recorded against the
//! quota (see [`gate::BillableGate`]).

pub mod clock;
pub mod config;
pub mod entitlements;
pub mod gate;
pub mod kv_store;
pub mod pricing;
pub mod quota;
pub mod storage_paths;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use entitlements::resolver::{EntitlementResolver, HealthReport, PurchaseOutcome};
pub use entitlements::types::{PlanType, ResolvedStatus, StatusOrigin, SubscriptionStatus};
pub use gate::BillableGate;
pub use kv_store::{FileKvStore, KvStore, MemoryKvStore};
pub use quota::{QuotaDecision, QuotaTracker, Tier, UsageStats};
