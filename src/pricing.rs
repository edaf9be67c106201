//! Region-based fallback pricing for subscription offerings.
//!
//! The billing provider's catalog is the normal source of localized prices;
//! this module supplies the offline fallback packages and the manual region
//! override a user can set to change their pricing region.

use crate::entitlements::types::PlanType;
use crate::kv_store::{KvStore, REGION_OVERRIDE_KEY};

/// Pricing region. Everything outside the explicitly priced countries gets
/// the euro fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Turkey,
    UnitedStates,
    Canada,
    Rest,
}

impl Region {
    /// Stable code used for persistence and billing-provider attributes.
    pub fn code(&self) -> &'static str {
        match self {
            Region::Turkey => "TR",
            Region::UnitedStates => "US",
            Region::Canada => "CA",
            Region::Rest => "DEFAULT",
        }
    }

    /// Currency used for this region's fallback pricing. Canada shares US
    /// dollar pricing.
    pub fn currency(&self) -> &'static str {
        match self {
            Region::Turkey => "TRY",
            Region::UnitedStates | Region::Canada => "USD",
            Region::Rest => "EUR",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "TR" => Some(Region::Turkey),
            "US" => Some(Region::UnitedStates),
            "CA" => Some(Region::Canada),
            "DEFAULT" => Some(Region::Rest),
            _ => None,
        }
    }

    /// Detects the pricing region from locale data, preferring a stored
    /// override. Turkish-language users get Turkish pricing regardless of
    /// where they are; US and Canada get dollar pricing; everyone else gets
    /// the euro fallback.
    pub fn detect(language: &str, region_code: Option<&str>, override_code: Option<&str>) -> Self {
        if let Some(region) = override_code.and_then(Region::from_code) {
            return region;
        }

        if language.eq_ignore_ascii_case("tr") {
            return Region::Turkey;
        }
        match region_code {
            Some("TR") => Region::Turkey,
            Some("US") => Region::UnitedStates,
            Some("CA") => Region::Canada,
            _ => Region::Rest,
        }
    }
}

/// Price point for one plan in one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanPricing {
    pub price: &'static str,
    pub currency: &'static str,
}

/// Returns the fallback price for a plan in a region.
pub fn pricing_for(region: Region, plan: PlanType) -> PlanPricing {
    let (weekly, monthly) = match region {
        Region::Turkey => ("19.99", "49.99"),
        Region::UnitedStates | Region::Canada => ("1.99", "4.99"),
        Region::Rest => ("1.99", "4.99"),
    };
    let price = match plan {
        // The free plan has no price; callers only ask for paid plans.
        PlanType::Free => "0.00",
        PlanType::Weekly => weekly,
        PlanType::Monthly => monthly,
    };
    PlanPricing {
        price,
        currency: region.currency(),
    }
}

/// A purchasable subscription offering shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPackage {
    pub identifier: &'static str,
    pub plan_type: PlanType,
    pub price: String,
    pub currency: &'static str,
}

/// Offline fallback offerings used when the billing provider's catalog is
/// unreachable.
pub fn fallback_packages(region: Region) -> Vec<SubscriptionPackage> {
    [
        ("weekly_premium", PlanType::Weekly),
        ("monthly_premium", PlanType::Monthly),
    ]
    .into_iter()
    .map(|(identifier, plan_type)| {
        let pricing = pricing_for(region, plan_type);
        SubscriptionPackage {
            identifier,
            plan_type,
            price: pricing.price.to_string(),
            currency: pricing.currency,
        }
    })
    .collect()
}

/// Persists a manual region override.
pub fn set_region_override(store: &dyn KvStore, region: Region) -> anyhow::Result<()> {
    store.set(REGION_OVERRIDE_KEY, region.code())
}

/// Reads the stored region override, if any. Unknown codes are ignored.
pub fn stored_region_override(store: &dyn KvStore) -> Option<Region> {
    match store.get(REGION_OVERRIDE_KEY) {
        Ok(code) => code.as_deref().and_then(Region::from_code),
        Err(e) => {
            tracing::warn!("Failed to read region override: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_store::MemoryKvStore;

    #[test]
    fn test_detect_turkish_language_wins_over_region() {
        assert_eq!(Region::detect("tr", Some("US"), None), Region::Turkey);
        assert_eq!(Region::detect("TR", None, None), Region::Turkey);
    }

    #[test]
    fn test_detect_by_region_code() {
        assert_eq!(Region::detect("en", Some("TR"), None), Region::Turkey);
        assert_eq!(Region::detect("en", Some("US"), None), Region::UnitedStates);
        assert_eq!(Region::detect("fr", Some("CA"), None), Region::Canada);
        assert_eq!(Region::detect("de", Some("DE"), None), Region::Rest);
        assert_eq!(Region::detect("en", None, None), Region::Rest);
    }

    #[test]
    fn test_detect_override_beats_everything() {
        assert_eq!(Region::detect("tr", Some("TR"), Some("US")), Region::UnitedStates);
        // Unknown override codes fall through to detection.
        assert_eq!(Region::detect("tr", None, Some("XX")), Region::Turkey);
    }

    #[test]
    fn test_region_currency() {
        assert_eq!(Region::Turkey.currency(), "TRY");
        assert_eq!(Region::Canada.currency(), "USD");
        assert_eq!(Region::Rest.currency(), "EUR");
    }

    #[test]
    fn test_pricing_table() {
        assert_eq!(
            pricing_for(Region::Turkey, PlanType::Weekly),
            PlanPricing { price: "19.99", currency: "TRY" }
        );
        assert_eq!(
            pricing_for(Region::Canada, PlanType::Monthly),
            PlanPricing { price: "4.99", currency: "USD" }
        );
        assert_eq!(
            pricing_for(Region::Rest, PlanType::Weekly),
            PlanPricing { price: "1.99", currency: "EUR" }
        );
    }

    #[test]
    fn test_fallback_packages() {
        let packages = fallback_packages(Region::Turkey);
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].identifier, "weekly_premium");
        assert_eq!(packages[0].price, "19.99");
        assert_eq!(packages[1].plan_type, PlanType::Monthly);
        assert_eq!(packages[1].currency, "TRY");
    }

    #[test]
    fn test_region_override_roundtrip() {
        let store = MemoryKvStore::new();
        assert_eq!(stored_region_override(&store), None);

        set_region_override(&store, Region::Turkey).unwrap();
        assert_eq!(stored_region_override(&store), Some(Region::Turkey));
    }
}
