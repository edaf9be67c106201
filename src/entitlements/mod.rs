//! Subscription entitlement resolution.
//!
//! Answers "is this device entitled to premium features right now" by
//! reconciling three sources with fixed precedence: the billing provider
//! (the only source that can grant entitlement, since it represents money
//! actually paid), a replicated database record (cross-device / offline
//! convenience), and a last-resort local cache.

pub mod billing;
pub mod db;
pub mod resolver;
pub mod types;
