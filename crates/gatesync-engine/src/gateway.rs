//! The seam between the engine and the remote gateway.

use async_trait::async_trait;
use gatesync_client::GatewayClient;
use gatesync_core::{GatewayList, GatewayRule, Result, RuleRequest};

/// Remote operations the engine needs from the gateway.
///
/// Implementations are expected to apply retry and rate limiting themselves;
/// [`GatewayClient`] does both uniformly.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// All lists in the account
    async fn lists(&self) -> Result<Vec<GatewayList>>;

    /// Every item value of one list
    async fn list_items(&self, list_id: &str) -> Result<Vec<String>>;

    /// All rules in the account
    async fn rules(&self) -> Result<Vec<GatewayRule>>;

    /// Create a domain list
    async fn create_list(&self, name: &str, items: &[String]) -> Result<GatewayList>;

    /// Append and remove items of a list
    async fn update_list(&self, list_id: &str, append: &[String], remove: &[String])
        -> Result<()>;

    /// Delete a list
    async fn delete_list(&self, list_id: &str) -> Result<()>;

    /// Create a rule
    async fn create_rule(&self, request: &RuleRequest) -> Result<GatewayRule>;

    /// Replace a rule
    async fn update_rule(&self, rule_id: &str, request: &RuleRequest) -> Result<GatewayRule>;

    /// Delete a rule
    async fn delete_rule(&self, rule_id: &str) -> Result<()>;
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn lists(&self) -> Result<Vec<GatewayList>> {
        GatewayClient::lists(self).list().await
    }

    async fn list_items(&self, list_id: &str) -> Result<Vec<String>> {
        GatewayClient::lists(self).items(list_id).await
    }

    async fn rules(&self) -> Result<Vec<GatewayRule>> {
        GatewayClient::rules(self).list().await
    }

    async fn create_list(&self, name: &str, items: &[String]) -> Result<GatewayList> {
        GatewayClient::lists(self).create(name, items).await
    }

    async fn update_list(
        &self,
        list_id: &str,
        append: &[String],
        remove: &[String],
    ) -> Result<()> {
        GatewayClient::lists(self).patch(list_id, append, remove).await
    }

    async fn delete_list(&self, list_id: &str) -> Result<()> {
        GatewayClient::lists(self).delete(list_id).await
    }

    async fn create_rule(&self, request: &RuleRequest) -> Result<GatewayRule> {
        GatewayClient::rules(self).create(request).await
    }

    async fn update_rule(&self, rule_id: &str, request: &RuleRequest) -> Result<GatewayRule> {
        GatewayClient::rules(self).update(rule_id, request).await
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<()> {
        GatewayClient::rules(self).delete(rule_id).await
    }
}
