//! In-memory gateway used by the engine's unit tests.

use crate::gateway::Gateway;
use async_trait::async_trait;
use gatesync_core::{
    traffic_expression, GatewayError, GatewayList, GatewayRule, Result, RuleRequest,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    lists: Vec<(GatewayList, Vec<String>)>,
    rules: Vec<GatewayRule>,
    next_id: u64,
    failing: HashSet<String>,
    guard_referenced: bool,
    calls: Vec<String>,
}

impl Inner {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("00000000-0000-4000-8000-{:012}", self.next_id)
    }

    /// Record a call and fail it if `key` was registered with `fail`.
    fn call(&mut self, key: String) -> Result<()> {
        let failing = self.failing.contains(&key);
        self.calls.push(key.clone());
        if failing {
            return Err(GatewayError::Api {
                code: 503,
                message: format!("injected failure for {key}"),
            });
        }
        Ok(())
    }
}

/// Gateway double holding lists and rules in memory
#[derive(Default)]
pub(crate) struct FakeGateway {
    inner: Mutex<Inner>,
}

impl FakeGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seed a list, returning its ID
    pub(crate) fn add_list(&self, name: &str, items: &[&str]) -> String {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        inner.lists.push((
            list(&id, name),
            items.iter().map(ToString::to_string).collect(),
        ));
        id
    }

    /// Seed a rule referencing the given list IDs, returning its ID
    pub(crate) fn add_rule(&self, name: &str, list_ids: &[&str]) -> String {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let ids: Vec<String> = list_ids.iter().map(ToString::to_string).collect();
        inner.rules.push(GatewayRule {
            id: id.clone(),
            name: name.to_string(),
            description: None,
            action: Some("block".to_string()),
            enabled: true,
            traffic: traffic_expression(&ids),
            created_at: None,
        });
        id
    }

    /// Make every call with this key fail, e.g. `create_list:<name>` or `lists`
    pub(crate) fn fail(&self, key: &str) {
        self.inner.lock().unwrap().failing.insert(key.to_string());
    }

    /// Reject deletes of lists that a rule still references
    pub(crate) fn guard_referenced_lists(&self) {
        self.inner.lock().unwrap().guard_referenced = true;
    }

    /// Keys of every call made so far, in order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Names of all lists, in creation order
    pub(crate) fn list_names(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.lists.iter().map(|(l, _)| l.name.clone()).collect()
    }

    /// Items of the list with the given name
    pub(crate) fn items_of(&self, name: &str) -> BTreeSet<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .lists
            .iter()
            .find(|(l, _)| l.name == name)
            .map(|(_, items)| items.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All list IDs
    pub(crate) fn list_ids(&self) -> BTreeSet<String> {
        let inner = self.inner.lock().unwrap();
        inner.lists.iter().map(|(l, _)| l.id.clone()).collect()
    }

    /// All rules
    pub(crate) fn rules_snapshot(&self) -> Vec<GatewayRule> {
        self.inner.lock().unwrap().rules.clone()
    }
}

fn list(id: &str, name: &str) -> GatewayList {
    GatewayList {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        kind: Some("DOMAIN".to_string()),
        count: None,
        created_at: None,
        updated_at: None,
    }
}

fn not_found(resource: String) -> GatewayError {
    GatewayError::NotFound { resource }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn lists(&self) -> Result<Vec<GatewayList>> {
        let mut inner = self.inner.lock().unwrap();
        inner.call("lists".to_string())?;
        Ok(inner.lists.iter().map(|(l, _)| l.clone()).collect())
    }

    async fn list_items(&self, list_id: &str) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().unwrap();
        inner.call(format!("list_items:{list_id}"))?;
        inner
            .lists
            .iter()
            .find(|(l, _)| l.id == list_id)
            .map(|(_, items)| items.clone())
            .ok_or_else(|| not_found(list_id.to_string()))
    }

    async fn rules(&self) -> Result<Vec<GatewayRule>> {
        let mut inner = self.inner.lock().unwrap();
        inner.call("rules".to_string())?;
        Ok(inner.rules.clone())
    }

    async fn create_list(&self, name: &str, items: &[String]) -> Result<GatewayList> {
        let mut inner = self.inner.lock().unwrap();
        inner.call(format!("create_list:{name}"))?;
        let id = inner.next_id();
        let created = list(&id, name);
        inner.lists.push((created.clone(), items.to_vec()));
        Ok(created)
    }

    async fn update_list(
        &self,
        list_id: &str,
        append: &[String],
        remove: &[String],
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.call(format!("update_list:{list_id}"))?;
        let (_, items) = inner
            .lists
            .iter_mut()
            .find(|(l, _)| l.id == list_id)
            .ok_or_else(|| not_found(list_id.to_string()))?;
        items.retain(|item| !remove.contains(item));
        items.extend(append.iter().cloned());
        Ok(())
    }

    async fn delete_list(&self, list_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.call(format!("delete_list:{list_id}"))?;
        let referenced = inner.rules.iter().any(|r| r.list_ids().contains(list_id));
        if inner.guard_referenced && referenced {
            return Err(GatewayError::Api {
                code: 400,
                message: format!("list {list_id} is referenced by a rule"),
            });
        }
        let before = inner.lists.len();
        inner.lists.retain(|(l, _)| l.id != list_id);
        if inner.lists.len() == before {
            return Err(not_found(list_id.to_string()));
        }
        Ok(())
    }

    async fn create_rule(&self, request: &RuleRequest) -> Result<GatewayRule> {
        let mut inner = self.inner.lock().unwrap();
        inner.call(format!("create_rule:{}", request.name))?;
        let rule = GatewayRule {
            id: inner.next_id(),
            name: request.name.clone(),
            description: Some(request.description.clone()),
            action: Some(request.action.clone()),
            enabled: request.enabled,
            traffic: request.traffic.clone(),
            created_at: None,
        };
        inner.rules.push(rule.clone());
        Ok(rule)
    }

    async fn update_rule(&self, rule_id: &str, request: &RuleRequest) -> Result<GatewayRule> {
        let mut inner = self.inner.lock().unwrap();
        inner.call(format!("update_rule:{rule_id}"))?;
        let rule = inner
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| not_found(rule_id.to_string()))?;
        rule.name.clone_from(&request.name);
        rule.traffic.clone_from(&request.traffic);
        rule.enabled = request.enabled;
        Ok(rule.clone())
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.call(format!("delete_rule:{rule_id}"))?;
        inner.rules.retain(|r| r.id != rule_id);
        Ok(())
    }
}
