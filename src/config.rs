//! Environment-driven configuration for the remote collaborators.
//!
//! Missing credentials never abort startup: they are reported once as
//! visible issues and the app continues in degraded free-tier mode.

use crate::entitlements::db::PostgrestSubscriptionDb;

const BILLING_KEY_VAR: &str = "FRIDGECHEF_BILLING_KEY";
const DB_URL_VAR: &str = "FRIDGECHEF_DB_URL";
const DB_KEY_VAR: &str = "FRIDGECHEF_DB_KEY";

/// Credentials and endpoints read from the environment at startup.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub billing_api_key: Option<String>,
    pub db_url: Option<String>,
    pub db_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            billing_api_key: env_non_empty(BILLING_KEY_VAR),
            db_url: env_non_empty(DB_URL_VAR),
            db_key: env_non_empty(DB_KEY_VAR),
        }
    }

    /// Human-readable problems to surface once at startup. Non-blocking;
    /// each missing credential degrades one precedence link.
    pub fn startup_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.billing_api_key.is_none() {
            issues.push(format!(
                "Billing API key not set ({}); purchases disabled",
                BILLING_KEY_VAR
            ));
        }
        if self.db_url.is_none() || self.db_key.is_none() {
            issues.push(format!(
                "Subscription database not configured ({}, {}); running on local cache only",
                DB_URL_VAR, DB_KEY_VAR
            ));
        }
        issues
    }

    pub fn is_degraded(&self) -> bool {
        !self.startup_issues().is_empty()
    }

    /// Builds the PostgREST subscription database client when configured.
    pub fn subscription_db(&self) -> Option<PostgrestSubscriptionDb> {
        match (&self.db_url, &self.db_key) {
            (Some(url), Some(key)) => Some(PostgrestSubscriptionDb::new(url, key)),
            _ => None,
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
