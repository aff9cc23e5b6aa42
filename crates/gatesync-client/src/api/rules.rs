//! Filtering rule API endpoints.

use super::require_result;
use crate::GatewayClient;
use gatesync_core::{GatewayRule, Result, RuleRequest};

/// Filtering rule API endpoints
pub struct RulesApi<'a> {
    client: &'a GatewayClient,
}

impl<'a> RulesApi<'a> {
    pub(crate) const fn new(client: &'a GatewayClient) -> Self {
        Self { client }
    }

    /// List every rule in the account
    pub async fn list(&self) -> Result<Vec<GatewayRule>> {
        let envelope = self.client.get::<Vec<GatewayRule>>("/rules").await?;
        Ok(envelope.result.unwrap_or_default())
    }

    /// Create a rule
    pub async fn create(&self, request: &RuleRequest) -> Result<GatewayRule> {
        let envelope = self.client.post("/rules", request).await?;
        require_result(envelope, "create rule")
    }

    /// Replace an existing rule
    pub async fn update(&self, rule_id: &str, request: &RuleRequest) -> Result<GatewayRule> {
        let envelope = self
            .client
            .put(&format!("/rules/{rule_id}"), request)
            .await?;
        require_result(envelope, "update rule")
    }

    /// Delete a rule
    pub async fn delete(&self, rule_id: &str) -> Result<()> {
        self.client.delete(&format!("/rules/{rule_id}")).await
    }
}
