//! Remote subscription database access.
//!
//! The database holds denormalized `device_subscriptions` rows replicated
//! from the billing provider (write-behind, not transactional). It serves
//! as the second link in the resolver's precedence chain when the billing
//! provider is unreachable or reports nothing active.

use super::types::{DeviceSubscriptionRecord, NewSubscription};
use anyhow::{Context, Result};
use std::time::Duration;

const API_TIMEOUT: Duration = Duration::from_secs(15);
const TABLE: &str = "device_subscriptions";

/// Remote store of `device_subscriptions` rows.
pub trait SubscriptionDb: Send + Sync {
    /// Most recent active row for the device, if any.
    fn latest_active_for_device(&self, device_id: &str)
        -> Result<Option<DeviceSubscriptionRecord>>;

    /// Inserts a fresh active row.
    fn insert_active(&self, subscription: &NewSubscription) -> Result<()>;

    /// Flips `is_active` off for every active row of the device. Run before
    /// inserting the replacement row so old records are superseded, never
    /// mutated in place.
    fn deactivate_all_for_device(&self, device_id: &str) -> Result<()>;

    /// Flips `is_active` off for a single row, used when a read finds the
    /// row expired.
    fn deactivate_record(&self, record_id: &str) -> Result<()>;

    /// Lightweight connectivity probe for diagnostics.
    fn ping(&self) -> bool;
}

/// PostgREST-backed implementation.
pub struct PostgrestSubscriptionDb {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl PostgrestSubscriptionDb {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(API_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, query: &str) -> String {
        if query.is_empty() {
            format!("{}/rest/v1/{}", self.base_url, TABLE)
        } else {
            format!("{}/rest/v1/{}?{}", self.base_url, TABLE, query)
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    fn patch_inactive(&self, url: &str) -> Result<()> {
        let payload = serde_json::json!({
            "is_active": false,
            "updated_at": chrono::Utc::now().to_rfc3339(),
        })
        .to_string();
        self.agent
            .patch(url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .send(payload.as_bytes())?;
        Ok(())
    }
}

impl SubscriptionDb for PostgrestSubscriptionDb {
    fn latest_active_for_device(
        &self,
        device_id: &str,
    ) -> Result<Option<DeviceSubscriptionRecord>> {
        let url = self.table_url(&format!(
            "device_id=eq.{}&is_active=eq.true&order=created_at.desc&limit=1",
            device_id
        ));
        let body: String = self
            .agent
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .call()
            .context("Failed to query device subscriptions")?
            .body_mut()
            .read_to_string()
            .context("Failed to read subscription query response")?;

        let rows = parse_rows(&body)?;
        Ok(rows.into_iter().next())
    }

    fn insert_active(&self, subscription: &NewSubscription) -> Result<()> {
        let payload = serde_json::to_string(subscription)
            .context("Failed to serialize subscription row")?;
        self.agent
            .post(&self.table_url(""))
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .send(payload.as_bytes())
            .context("Failed to insert subscription row")?;
        Ok(())
    }

    fn deactivate_all_for_device(&self, device_id: &str) -> Result<()> {
        let url = self.table_url(&format!("device_id=eq.{}&is_active=eq.true", device_id));
        self.patch_inactive(&url)
            .context("Failed to deactivate device subscriptions")
    }

    fn deactivate_record(&self, record_id: &str) -> Result<()> {
        let url = self.table_url(&format!("id=eq.{}", record_id));
        self.patch_inactive(&url)
            .context("Failed to deactivate subscription record")
    }

    fn ping(&self) -> bool {
        let url = self.table_url("limit=1&select=id");
        self.agent
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .call()
            .is_ok()
    }
}

fn parse_rows(body: &str) -> Result<Vec<DeviceSubscriptionRecord>> {
    serde_json::from_str(body).context("Failed to parse subscription rows")
}
