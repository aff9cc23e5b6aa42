//! Operation executor: applies a plan against the gateway.
//!
//! List operations always run before rule operations. A failed operation is
//! recorded and the run continues; a rule operation that references a list
//! whose create failed is skipped instead of being sent with a partial set.

use crate::gateway::Gateway;
use crate::plan::{ListRef, Operation, OperationPlan};
use gatesync_core::{GatewayError, RuleRequest};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

/// How one operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed,
    /// Not attempted because an operation it depends on failed
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "ok",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        })
    }
}

/// Result log entry for one operation
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub operation: Operation,
    pub outcome: Outcome,
    /// Created ID on success, error or dependency on failure
    pub detail: Option<String>,
    pub elapsed_ms: u64,
}

/// Per-operation results of one execution, in execution order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub results: Vec<OperationResult>,
}

impl ExecutionReport {
    fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(Outcome::Success)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    /// Whether every operation succeeded
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|r| r.outcome == Outcome::Success)
    }
}

/// Applies operation plans through a [`Gateway`]
pub struct Executor<'a, G: Gateway + ?Sized> {
    gateway: &'a G,
}

impl<'a, G: Gateway + ?Sized> Executor<'a, G> {
    #[must_use]
    pub const fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    /// Execute every operation in `plan`, never stopping at the first failure.
    pub async fn execute(&self, plan: &OperationPlan) -> ExecutionReport {
        let (list_ops, rule_ops): (Vec<&Operation>, Vec<&Operation>) =
            plan.iter().partition(|op| op.kind().is_list());

        let mut report = ExecutionReport {
            results: Vec::with_capacity(plan.len()),
        };
        let mut created: HashMap<usize, String> = HashMap::new();

        for op in list_ops {
            let started = Instant::now();
            let result = self.apply_list(op).await;
            if let (Operation::CreateList { index, .. }, Ok(Some(id))) = (op, &result) {
                created.insert(*index, id.clone());
            }
            report.results.push(finish(op, result, started));
        }

        for op in rule_ops {
            let started = Instant::now();
            let entry = match resolve(op, &created) {
                Ok(ids) => {
                    let result = self.apply_rule(op, &ids).await;
                    finish(op, result, started)
                }
                Err(missing) => skip(op, &missing),
            };
            report.results.push(entry);
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            "execution finished"
        );
        report
    }

    /// Apply a list operation, returning the new list ID for creates
    async fn apply_list(&self, op: &Operation) -> Result<Option<String>, GatewayError> {
        match op {
            Operation::CreateList { name, items, .. } => self
                .gateway
                .create_list(name, items)
                .await
                .map(|list| Some(list.id)),
            Operation::UpdateList {
                id, append, remove, ..
            } => self
                .gateway
                .update_list(id, append, remove)
                .await
                .map(|()| None),
            Operation::DeleteList { id, .. } => {
                self.gateway.delete_list(id).await.map(|()| None)
            }
            _ => Err(GatewayError::Internal(format!("not a list operation: {op}"))),
        }
    }

    async fn apply_rule(
        &self,
        op: &Operation,
        list_ids: &[String],
    ) -> Result<Option<String>, GatewayError> {
        match op {
            Operation::CreateRule { name, .. } => self
                .gateway
                .create_rule(&RuleRequest::block(name.as_str(), list_ids))
                .await
                .map(|rule| Some(rule.id)),
            Operation::UpdateRule { id, name, .. } => self
                .gateway
                .update_rule(id, &RuleRequest::block(name.as_str(), list_ids))
                .await
                .map(|_| None),
            Operation::DeleteRule { id, .. } => {
                self.gateway.delete_rule(id).await.map(|()| None)
            }
            _ => Err(GatewayError::Internal(format!("not a rule operation: {op}"))),
        }
    }
}

/// Turn list references into real IDs, or the chunk indices that never got one
fn resolve(op: &Operation, created: &HashMap<usize, String>) -> Result<Vec<String>, Vec<usize>> {
    let refs: &[ListRef] = match op {
        Operation::CreateRule { lists, .. } | Operation::UpdateRule { lists, .. } => lists,
        _ => return Ok(Vec::new()),
    };

    let mut ids = Vec::with_capacity(refs.len());
    let mut missing = Vec::new();
    for r in refs {
        match r {
            ListRef::Existing(id) => ids.push(id.clone()),
            ListRef::Pending(index) => match created.get(index) {
                Some(id) => ids.push(id.clone()),
                None => missing.push(*index),
            },
        }
    }
    if missing.is_empty() {
        Ok(ids)
    } else {
        Err(missing)
    }
}

fn finish(
    op: &Operation,
    result: Result<Option<String>, GatewayError>,
    started: Instant,
) -> OperationResult {
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(detail) => {
            info!(operation = %op, elapsed_ms, "operation succeeded");
            OperationResult {
                operation: op.clone(),
                outcome: Outcome::Success,
                detail,
                elapsed_ms,
            }
        }
        Err(e) => {
            warn!(operation = %op, elapsed_ms, error = %e, "operation failed");
            OperationResult {
                operation: op.clone(),
                outcome: Outcome::Failed,
                detail: Some(e.to_string()),
                elapsed_ms,
            }
        }
    }
}

fn skip(op: &Operation, missing: &[usize]) -> OperationResult {
    let chunks = missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    warn!(operation = %op, chunks = %chunks, "skipped, list create failed");
    OperationResult {
        operation: op.clone(),
        outcome: Outcome::Skipped,
        detail: Some(format!("depends on failed list create for chunk {chunks}")),
        elapsed_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk;
    use crate::plan::Reconciler;
    use crate::state::read_remote_state;
    use crate::testing::FakeGateway;
    use gatesync_core::{list_name, parse_list_ids, rule_name};
    use std::num::NonZeroUsize;

    const PREFIX: &str = "AdBlock-DNS-Filters";

    fn domains(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("d{i:05}.example.com")).collect()
    }

    async fn plan_for(gateway: &FakeGateway, n: usize) -> OperationPlan {
        let state = read_remote_state(gateway, PREFIX).await.unwrap();
        let chunks = chunk(&domains(n), NonZeroUsize::new(1000).unwrap());
        Reconciler::new(PREFIX).plan_state(&chunks, &state)
    }

    #[tokio::test]
    async fn test_creates_resolve_placeholders_for_rule() {
        let gateway = FakeGateway::new();
        let plan = plan_for(&gateway, 2500).await;

        let report = Executor::new(&gateway).execute(&plan).await;
        assert!(report.is_complete());
        assert_eq!(report.succeeded(), 4);

        let rules = gateway.rules_snapshot();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, rule_name(PREFIX));
        assert_eq!(parse_list_ids(&rules[0].traffic), gateway.list_ids());
        assert_eq!(gateway.items_of(&list_name(PREFIX, 3)).len(), 500);
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let gateway = FakeGateway::new();
        let first = plan_for(&gateway, 1500).await;
        Executor::new(&gateway).execute(&first).await;

        let second = plan_for(&gateway, 1500).await;
        assert!(second.is_empty(), "unexpected plan: {second:?}");
    }

    #[tokio::test]
    async fn test_failed_create_skips_dependent_rule() {
        let gateway = FakeGateway::new();
        gateway.fail(&format!("create_list:{}", list_name(PREFIX, 2)));
        let plan = plan_for(&gateway, 1500).await;

        let report = Executor::new(&gateway).execute(&plan).await;
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(!report.is_complete());

        let skipped = report.results.last().unwrap();
        assert_eq!(skipped.outcome, Outcome::Skipped);
        assert!(skipped.detail.as_deref().unwrap().contains("chunk 1"));
        assert!(gateway.rules_snapshot().is_empty());
        assert!(!gateway.calls().iter().any(|c| c.starts_with("create_rule")));
    }

    #[tokio::test]
    async fn test_failed_update_does_not_stop_others() {
        let gateway = FakeGateway::new();
        let first = gateway.add_list(&list_name(PREFIX, 1), &["old.example.com"]);
        let second = gateway.add_list(&list_name(PREFIX, 2), &["old2.example.com"]);
        gateway.add_rule(&rule_name(PREFIX), &[first.as_str(), second.as_str()]);
        gateway.fail(&format!("update_list:{first}"));

        let plan = plan_for(&gateway, 1200).await;
        let report = Executor::new(&gateway).execute(&plan).await;

        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(gateway.items_of(&list_name(PREFIX, 2)).len(), 200);
    }

    #[tokio::test]
    async fn test_shrink_deletes_list_and_repoints_rule() {
        let gateway = FakeGateway::new();
        let first = gateway.add_list(&list_name(PREFIX, 1), &["a.example.com"]);
        let second = gateway.add_list(&list_name(PREFIX, 2), &["b.example.com"]);
        let rule = gateway.add_rule(&rule_name(PREFIX), &[first.as_str(), second.as_str()]);

        let plan = plan_for(&gateway, 10).await;
        let report = Executor::new(&gateway).execute(&plan).await;
        assert!(report.is_complete());

        assert_eq!(gateway.list_names(), vec![list_name(PREFIX, 1)]);
        let rules = gateway.rules_snapshot();
        assert_eq!(rules[0].id, rule);
        assert_eq!(
            parse_list_ids(&rules[0].traffic).into_iter().collect::<Vec<_>>(),
            vec![first]
        );
    }

    #[tokio::test]
    async fn test_list_operations_run_before_rule_operations() {
        let gateway = FakeGateway::new();
        let plan: OperationPlan = [
            Operation::CreateRule {
                name: rule_name(PREFIX),
                lists: vec![ListRef::Pending(0)],
            },
            Operation::CreateList {
                index: 0,
                name: list_name(PREFIX, 1),
                items: vec!["a.example.com".to_string()],
            },
        ]
        .into_iter()
        .collect();

        let report = Executor::new(&gateway).execute(&plan).await;
        assert!(report.is_complete());
        let calls = gateway.calls();
        assert!(calls[0].starts_with("create_list"));
        assert!(calls[1].starts_with("create_rule"));
    }

    #[tokio::test]
    async fn test_empty_plan_reports_complete() {
        let gateway = FakeGateway::new();
        let report = Executor::new(&gateway).execute(&OperationPlan::default()).await;
        assert!(report.is_complete());
        assert!(gateway.calls().is_empty());
    }
}
