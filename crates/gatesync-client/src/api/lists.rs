//! Domain list API endpoints.

use super::require_result;
use crate::GatewayClient;
use gatesync_core::{CreateListRequest, GatewayList, ListItem, PatchListRequest, Result};

/// Page size used when reading list items
pub const ITEMS_PAGE_SIZE: u32 = 1000;

/// Domain list API endpoints
pub struct ListsApi<'a> {
    client: &'a GatewayClient,
}

impl<'a> ListsApi<'a> {
    pub(crate) const fn new(client: &'a GatewayClient) -> Self {
        Self { client }
    }

    /// List every list in the account (items not included)
    pub async fn list(&self) -> Result<Vec<GatewayList>> {
        let envelope = self.client.get::<Vec<GatewayList>>("/lists").await?;
        Ok(envelope.result.unwrap_or_default())
    }

    /// Fetch all item values of a list, following pagination
    pub async fn items(&self, list_id: &str) -> Result<Vec<String>> {
        let path = format!("/lists/{list_id}/items");
        let mut values = Vec::new();
        let mut page = 1u32;

        loop {
            let envelope = self
                .client
                .get_with_query::<Vec<ListItem>>(
                    &path,
                    &[
                        ("page", page.to_string()),
                        ("per_page", ITEMS_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let total = envelope.result_info.as_ref().and_then(|info| info.total_count);
            let items = envelope.result.unwrap_or_default();
            let fetched = items.len();
            values.extend(items.into_iter().map(|item| item.value));

            let short_page = fetched < ITEMS_PAGE_SIZE as usize;
            let reached_total = total.is_some_and(|t| values.len() >= t as usize);
            if fetched == 0 || short_page || reached_total {
                return Ok(values);
            }
            page += 1;
        }
    }

    /// Create a `DOMAIN` list holding the given domains
    pub async fn create(&self, name: &str, domains: &[String]) -> Result<GatewayList> {
        let request = CreateListRequest::domains(name, domains.iter().cloned());
        let envelope = self.client.post("/lists", &request).await?;
        require_result(envelope, "create list")
    }

    /// Append and remove items in one call
    pub async fn patch(&self, list_id: &str, append: &[String], remove: &[String]) -> Result<()> {
        let request = PatchListRequest::new(append, remove);
        self.client
            .patch::<serde_json::Value, _>(&format!("/lists/{list_id}"), &request)
            .await
            .map(|_| ())
    }

    /// Delete a list
    pub async fn delete(&self, list_id: &str) -> Result<()> {
        self.client.delete(&format!("/lists/{list_id}")).await
    }
}
