//! Billing provider collaborator interface.
//!
//! Concrete implementations wrap the platform's purchase SDK and are out of
//! scope for this crate; the resolver only depends on this trait. Test
//! doubles live next to the resolver tests.

use super::types::Entitlement;
use std::fmt;

/// Installation attributes forwarded to the billing provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceAttributes {
    pub device_id: String,
    pub country: Option<String>,
    pub currency: Option<String>,
}

/// Billing provider failure modes.
///
/// `Cancelled` is the user backing out of the purchase dialog: a non-error
/// outcome that callers suppress rather than report.
#[derive(Debug)]
pub enum BillingError {
    Cancelled,
    Provider(String),
}

impl fmt::Display for BillingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingError::Cancelled => write!(f, "purchase cancelled by user"),
            BillingError::Provider(msg) => write!(f, "billing provider error: {}", msg),
        }
    }
}

impl std::error::Error for BillingError {}

/// Client for the remote billing provider.
pub trait BillingClient: Send + Sync {
    /// Returns the currently active entitlements for this installation.
    /// An empty list means the provider answered and found nothing active.
    fn active_entitlements(
        &self,
        attributes: &DeviceAttributes,
    ) -> Result<Vec<Entitlement>, BillingError>;

    /// Runs the purchase flow for the given plan identifier, returning the
    /// entitlements active after the purchase.
    fn purchase(&self, plan_id: &str) -> Result<Vec<Entitlement>, BillingError>;

    /// Runs the restore-purchases flow.
    fn restore(&self) -> Result<Vec<Entitlement>, BillingError>;

    /// Lightweight connectivity probe for diagnostics.
    fn ping(&self) -> bool;
}
