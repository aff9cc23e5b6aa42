//! Remote state reader: managed lists and rules currently in the gateway.

use crate::gateway::Gateway;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use gatesync_core::{list_ordinal, rule_name, GatewayList, GatewayRule, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Maximum concurrent item fetches
const FETCH_CONCURRENCY: usize = 8;

/// A managed list with its current contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteList {
    /// Gateway-assigned ID
    pub id: String,
    /// List name
    pub name: String,
    /// Ordinal parsed from the name, if any
    pub ordinal: Option<u32>,
    /// Current item values
    pub items: BTreeSet<String>,
}

/// A managed rule and the list IDs it references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRule {
    /// Gateway-assigned ID
    pub id: String,
    /// Rule name
    pub name: String,
    /// List IDs parsed from the traffic expression
    pub list_ids: BTreeSet<String>,
    /// Whether the rule is active
    pub enabled: bool,
}

impl From<GatewayRule> for RemoteRule {
    fn from(rule: GatewayRule) -> Self {
        Self {
            list_ids: rule.list_ids(),
            id: rule.id,
            name: rule.name,
            enabled: rule.enabled,
        }
    }
}

/// Snapshot of everything under a name prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteState {
    /// Lists sorted by ordinal; lists without one come last
    pub lists: Vec<RemoteList>,
    /// Rules, the primary one first
    pub rules: Vec<RemoteRule>,
}

impl RemoteState {
    /// The rule to reconcile, if any exists
    #[must_use]
    pub fn rule(&self) -> Option<&RemoteRule> {
        self.rules.first()
    }

    /// Extra rules beyond the primary one
    #[must_use]
    pub fn surplus_rules(&self) -> &[RemoteRule] {
        self.rules.get(1..).unwrap_or_default()
    }

    /// Total items across all lists
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.lists.iter().map(|l| l.items.len()).sum()
    }
}

/// Read every list and rule whose name starts with `prefix`.
///
/// List items are fetched concurrently; the result order does not depend on
/// fetch completion order. No match is an empty state, not an error.
pub async fn read_remote_state<G>(gateway: &G, prefix: &str) -> Result<RemoteState>
where
    G: Gateway + ?Sized,
{
    let mut lists: Vec<GatewayList> = gateway
        .lists()
        .await?
        .into_iter()
        .filter(|l| l.name.starts_with(prefix))
        .collect();
    sort_lists(&mut lists, prefix);

    let items: Vec<Vec<String>> = stream::iter(lists.iter().map(|l| gateway.list_items(&l.id)))
        .buffered(FETCH_CONCURRENCY)
        .try_collect()
        .await?;

    let lists: Vec<RemoteList> = lists
        .into_iter()
        .zip(items)
        .map(|(list, items)| {
            debug!(list = %list.name, items = items.len(), "fetched list items");
            RemoteList {
                ordinal: list_ordinal(&list.name, prefix),
                id: list.id,
                name: list.name,
                items: items.into_iter().collect(),
            }
        })
        .collect();

    let mut rules: Vec<RemoteRule> = gateway
        .rules()
        .await?
        .into_iter()
        .filter(|r| r.name.starts_with(prefix))
        .map(RemoteRule::from)
        .collect();
    let primary = rule_name(prefix);
    rules.sort_by(|a, b| {
        (a.name != primary, &a.name, &a.id).cmp(&(b.name != primary, &b.name, &b.id))
    });

    let state = RemoteState { lists, rules };
    info!(
        prefix,
        lists = state.lists.len(),
        items = state.item_count(),
        rules = state.rules.len(),
        "read remote state"
    );
    Ok(state)
}

/// Sort by parsed ordinal, unnumbered lists last, ties broken by name and ID.
fn sort_lists(lists: &mut [GatewayList], prefix: &str) {
    lists.sort_by_cached_key(|l| {
        let ordinal = list_ordinal(&l.name, prefix);
        (ordinal.is_none(), ordinal, l.name.clone(), l.id.clone())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGateway;

    const PREFIX: &str = "AdBlock-DNS-Filters";

    #[tokio::test]
    async fn test_empty_gateway_is_empty_state() {
        let gateway = FakeGateway::new();
        let state = read_remote_state(&gateway, PREFIX).await.unwrap();
        assert_eq!(state, RemoteState::default());
        assert!(state.rule().is_none());
    }

    #[tokio::test]
    async fn test_filters_by_prefix_and_sorts_by_ordinal() {
        let gateway = FakeGateway::new();
        gateway.add_list("AdBlock-DNS-Filters - 010", &["j.com"]);
        gateway.add_list("AdBlock-DNS-Filters - legacy", &["z.com"]);
        gateway.add_list("Other list - 001", &["x.com"]);
        gateway.add_list("AdBlock-DNS-Filters - 002", &["b.com", "a.com"]);
        gateway.add_list("AdBlock-DNS-Filters - 001", &["c.com"]);

        let state = read_remote_state(&gateway, PREFIX).await.unwrap();
        let names: Vec<_> = state.lists.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "AdBlock-DNS-Filters - 001",
                "AdBlock-DNS-Filters - 002",
                "AdBlock-DNS-Filters - 010",
                "AdBlock-DNS-Filters - legacy",
            ]
        );
        assert_eq!(state.lists[1].ordinal, Some(2));
        assert_eq!(state.lists[3].ordinal, None);
        assert!(state.lists[1].items.contains("a.com"));
        assert_eq!(state.item_count(), 5);
    }

    #[tokio::test]
    async fn test_rules_parse_referenced_ids() {
        let gateway = FakeGateway::new();
        let a = gateway.add_list("AdBlock-DNS-Filters - 001", &["a.com"]);
        let b = gateway.add_list("AdBlock-DNS-Filters - 002", &["b.com"]);
        gateway.add_rule("AdBlock-DNS-Filters old copy", &[&a]);
        gateway.add_rule("AdBlock-DNS-Filters Block Ads", &[&a, &b]);
        gateway.add_rule("Unrelated rule", &[&a]);

        let state = read_remote_state(&gateway, PREFIX).await.unwrap();
        assert_eq!(state.rules.len(), 2);
        let rule = state.rule().unwrap();
        assert_eq!(rule.name, "AdBlock-DNS-Filters Block Ads");
        assert_eq!(rule.list_ids, BTreeSet::from([a, b]));
        assert!(rule.enabled);
        assert_eq!(state.surplus_rules().len(), 1);
    }

    #[tokio::test]
    async fn test_read_failure_propagates() {
        let gateway = FakeGateway::new();
        gateway.add_list("AdBlock-DNS-Filters - 001", &["a.com"]);
        gateway.fail("lists");
        assert!(read_remote_state(&gateway, PREFIX).await.is_err());
    }
}
