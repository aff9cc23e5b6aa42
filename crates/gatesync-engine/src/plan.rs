//! Reconciler: diff desired chunks against remote state into an operation plan.
//!
//! Planning is pure. It reads two snapshots and never calls the gateway, so a
//! plan can be printed as a dry run or handed to the executor unchanged.
//!
//! Chunks pair with existing lists by position: chunk `i` maps to the list
//! with the `i`-th lowest ordinal. Content identity is not tracked across runs.

use crate::chunk::Chunk;
use crate::state::{RemoteList, RemoteRule, RemoteState};
use gatesync_core::{list_name, rule_name};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Reference to a list that will exist once the plan has run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ListRef {
    /// A list that exists now and is kept
    Existing(String),
    /// Placeholder for the list created for the chunk at this index
    Pending(usize),
}

/// Operation kinds, in the order the executor runs their groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateList,
    UpdateList,
    DeleteList,
    CreateRule,
    UpdateRule,
    DeleteRule,
}

impl OperationKind {
    /// Whether this kind mutates a list (as opposed to a rule)
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(self, Self::CreateList | Self::UpdateList | Self::DeleteList)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateList => "create list",
            Self::UpdateList => "update list",
            Self::DeleteList => "delete list",
            Self::CreateRule => "create rule",
            Self::UpdateRule => "update rule",
            Self::DeleteRule => "delete rule",
        };
        f.write_str(name)
    }
}

/// One planned mutation of remote state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Create a list for a chunk with no existing counterpart
    CreateList {
        index: usize,
        name: String,
        items: Vec<String>,
    },
    /// Bring an existing list's items in line with its chunk
    UpdateList {
        index: usize,
        id: String,
        name: String,
        append: Vec<String>,
        remove: Vec<String>,
    },
    /// Remove a list that no longer has a chunk
    DeleteList { id: String, name: String },
    /// Create the blocking rule
    CreateRule { name: String, lists: Vec<ListRef> },
    /// Point the existing rule at a new set of lists
    UpdateRule {
        id: String,
        name: String,
        lists: Vec<ListRef>,
    },
    /// Remove a rule
    DeleteRule { id: String, name: String },
}

impl Operation {
    /// Kind of this operation
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::CreateList { .. } => OperationKind::CreateList,
            Self::UpdateList { .. } => OperationKind::UpdateList,
            Self::DeleteList { .. } => OperationKind::DeleteList,
            Self::CreateRule { .. } => OperationKind::CreateRule,
            Self::UpdateRule { .. } => OperationKind::UpdateRule,
            Self::DeleteRule { .. } => OperationKind::DeleteRule,
        }
    }

    /// Name of the list or rule the operation targets
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::CreateList { name, .. }
            | Self::UpdateList { name, .. }
            | Self::DeleteList { name, .. }
            | Self::CreateRule { name, .. }
            | Self::UpdateRule { name, .. }
            | Self::DeleteRule { name, .. } => name,
        }
    }

    /// Placeholder indices a rule operation depends on
    #[must_use]
    pub fn pending_refs(&self) -> Vec<usize> {
        match self {
            Self::CreateRule { lists, .. } | Self::UpdateRule { lists, .. } => lists
                .iter()
                .filter_map(|r| match r {
                    ListRef::Pending(index) => Some(*index),
                    ListRef::Existing(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateList { name, items, .. } => {
                write!(f, "create list {name} ({} items)", items.len())
            }
            Self::UpdateList {
                name,
                append,
                remove,
                ..
            } => write!(f, "update list {name} (+{} -{})", append.len(), remove.len()),
            Self::DeleteList { name, .. } => write!(f, "delete list {name}"),
            Self::CreateRule { name, lists } => {
                write!(f, "create rule {name} ({} lists)", lists.len())
            }
            Self::UpdateRule { name, lists, .. } => {
                write!(f, "update rule {name} ({} lists)", lists.len())
            }
            Self::DeleteRule { name, .. } => write!(f, "delete rule {name}"),
        }
    }
}

/// Ordered operations converging remote state; list operations come first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OperationPlan {
    operations: Vec<Operation>,
}

impl OperationPlan {
    /// Operations in execution order
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Number of operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether remote state already matches
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations of the given kind
    #[must_use]
    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind() == kind).count()
    }

    /// Iterate over operations
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    /// Consume into operations
    #[must_use]
    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

impl FromIterator<Operation> for OperationPlan {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a OperationPlan {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

/// Plans list and rule operations for one policy prefix
#[derive(Debug, Clone)]
pub struct Reconciler {
    prefix: String,
}

impl Reconciler {
    /// Reconciler for lists and rules named with `prefix`
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Name prefix this reconciler manages
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Plan against a full remote snapshot, also removing duplicate rules.
    #[must_use]
    pub fn plan_state(&self, desired: &[Chunk], state: &RemoteState) -> OperationPlan {
        let mut plan = self.plan(desired, &state.lists, state.rule());
        plan.operations
            .extend(state.surplus_rules().iter().map(|rule| Operation::DeleteRule {
                id: rule.id.clone(),
                name: rule.name.clone(),
            }));
        plan
    }

    /// Compute the operations that turn `existing` into `desired`.
    ///
    /// `existing` must already be in ordinal order. With no desired chunks
    /// every list and the rule are deleted.
    #[must_use]
    pub fn plan(
        &self,
        desired: &[Chunk],
        existing: &[RemoteList],
        rule: Option<&RemoteRule>,
    ) -> OperationPlan {
        let mut operations = Vec::new();
        let paired = desired.len().min(existing.len());

        for (chunk, list) in desired.iter().zip(existing) {
            if let Some(op) = diff_list(chunk, list) {
                operations.push(op);
            }
        }

        // Highest positions first.
        for list in existing[paired..].iter().rev() {
            operations.push(Operation::DeleteList {
                id: list.id.clone(),
                name: list.name.clone(),
            });
        }

        let mut next_ordinal = existing
            .iter()
            .filter_map(|l| l.ordinal)
            .max()
            .unwrap_or(0);
        for chunk in &desired[paired..] {
            next_ordinal += 1;
            operations.push(Operation::CreateList {
                index: chunk.index,
                name: list_name(&self.prefix, next_ordinal),
                items: chunk.items.clone(),
            });
        }

        let refs: Vec<ListRef> = desired
            .iter()
            .enumerate()
            .map(|(i, chunk)| match existing.get(i) {
                Some(list) => ListRef::Existing(list.id.clone()),
                None => ListRef::Pending(chunk.index),
            })
            .collect();

        if let Some(op) = self.plan_rule(rule, refs) {
            operations.push(op);
        }

        OperationPlan { operations }
    }

    fn plan_rule(&self, rule: Option<&RemoteRule>, refs: Vec<ListRef>) -> Option<Operation> {
        match rule {
            None if refs.is_empty() => None,
            None => Some(Operation::CreateRule {
                name: rule_name(&self.prefix),
                lists: refs,
            }),
            Some(rule) if refs.is_empty() => Some(Operation::DeleteRule {
                id: rule.id.clone(),
                name: rule.name.clone(),
            }),
            Some(rule) => {
                // Any pending list is new, so the referenced set must change.
                let kept: Option<BTreeSet<&str>> = refs
                    .iter()
                    .map(|r| match r {
                        ListRef::Existing(id) => Some(id.as_str()),
                        ListRef::Pending(_) => None,
                    })
                    .collect();
                let current: BTreeSet<&str> = rule.list_ids.iter().map(String::as_str).collect();
                let unchanged = kept.is_some_and(|ids| ids == current);
                (!unchanged).then(|| Operation::UpdateRule {
                    id: rule.id.clone(),
                    name: rule.name.clone(),
                    lists: refs,
                })
            }
        }
    }
}

/// Item-level diff of one chunk against its paired list
fn diff_list(chunk: &Chunk, list: &RemoteList) -> Option<Operation> {
    let wanted: BTreeSet<&String> = chunk.items.iter().collect();
    let remove: Vec<String> = list
        .items
        .iter()
        .filter(|item| !wanted.contains(item))
        .cloned()
        .collect();
    let mut append: Vec<String> = chunk
        .items
        .iter()
        .filter(|item| !list.items.contains(*item))
        .cloned()
        .collect();
    append.sort();
    append.dedup();

    if remove.is_empty() && append.is_empty() {
        return None;
    }
    Some(Operation::UpdateList {
        index: chunk.index,
        id: list.id.clone(),
        name: list.name.clone(),
        append,
        remove,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk;
    use gatesync_core::list_ordinal;
    use std::num::NonZeroUsize;

    const PREFIX: &str = "AdBlock-DNS-Filters";

    fn domains(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("d{i:05}.example.com")).collect()
    }

    fn chunks(range: std::ops::Range<usize>) -> Vec<Chunk> {
        chunk(&domains(range), NonZeroUsize::new(1000).unwrap())
    }

    fn remote(ordinal: u32, items: &[String]) -> RemoteList {
        let name = list_name(PREFIX, ordinal);
        RemoteList {
            id: format!("00000000-0000-4000-8000-{ordinal:012}"),
            ordinal: list_ordinal(&name, PREFIX),
            name,
            items: items.iter().cloned().collect(),
        }
    }

    fn rule_for(lists: &[RemoteList]) -> RemoteRule {
        RemoteRule {
            id: "rule-1".to_string(),
            name: rule_name(PREFIX),
            list_ids: lists.iter().map(|l| l.id.clone()).collect(),
            enabled: true,
        }
    }

    fn kinds(plan: &OperationPlan) -> Vec<OperationKind> {
        plan.iter().map(Operation::kind).collect()
    }

    #[test]
    fn test_fresh_account_creates_lists_and_rule() {
        let reconciler = Reconciler::new(PREFIX);
        let desired = chunks(0..2500);
        let plan = reconciler.plan(&desired, &[], None);

        assert_eq!(
            kinds(&plan),
            vec![
                OperationKind::CreateList,
                OperationKind::CreateList,
                OperationKind::CreateList,
                OperationKind::CreateRule,
            ]
        );
        let sizes: Vec<usize> = plan
            .iter()
            .filter_map(|op| match op {
                Operation::CreateList { items, .. } => Some(items.len()),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
        assert_eq!(plan.operations()[0].target(), "AdBlock-DNS-Filters - 001");
        assert_eq!(plan.operations()[2].target(), "AdBlock-DNS-Filters - 003");
        assert_eq!(
            plan.operations()[3],
            Operation::CreateRule {
                name: rule_name(PREFIX),
                lists: vec![ListRef::Pending(0), ListRef::Pending(1), ListRef::Pending(2)],
            }
        );
    }

    #[test]
    fn test_shrinking_updates_deletes_and_repoints_rule() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![
            remote(1, &domains(0..1000)),
            remote(2, &domains(1000..1300)),
        ];
        let rule = rule_for(&existing);
        let desired = chunks(0..500);

        let plan = reconciler.plan(&desired, &existing, Some(&rule));
        assert_eq!(
            kinds(&plan),
            vec![
                OperationKind::UpdateList,
                OperationKind::DeleteList,
                OperationKind::UpdateRule,
            ]
        );
        match &plan.operations()[0] {
            Operation::UpdateList { append, remove, id, .. } => {
                assert_eq!(id, &existing[0].id);
                assert!(append.is_empty());
                assert_eq!(remove, &domains(500..1000));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            plan.operations()[1],
            Operation::DeleteList {
                id: existing[1].id.clone(),
                name: existing[1].name.clone(),
            }
        );
        assert_eq!(
            plan.operations()[2],
            Operation::UpdateRule {
                id: "rule-1".to_string(),
                name: rule_name(PREFIX),
                lists: vec![ListRef::Existing(existing[0].id.clone())],
            }
        );
    }

    #[test]
    fn test_matching_state_needs_no_operations() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![
            remote(1, &domains(0..1000)),
            remote(2, &domains(1000..1700)),
        ];
        let rule = rule_for(&existing);
        let plan = reconciler.plan(&chunks(0..1700), &existing, Some(&rule));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_item_changes_never_touch_the_rule() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![
            remote(1, &domains(0..1000)),
            remote(2, &domains(1000..1700)),
        ];
        let rule = rule_for(&existing);
        // Same chunk count, shifted contents.
        let plan = reconciler.plan(&chunks(5..1705), &existing, Some(&rule));
        assert_eq!(plan.count(OperationKind::UpdateList), 2);
        assert!(plan.iter().all(|op| op.kind().is_list()));
    }

    #[test]
    fn test_planning_is_deterministic() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![
            remote(1, &domains(0..900)),
            remote(2, &domains(900..1000)),
            remote(3, &domains(3000..3100)),
        ];
        let rule = rule_for(&existing[..1]);
        let desired = chunks(100..1350);
        let first = reconciler.plan(&desired, &existing, Some(&rule));
        let second = reconciler.plan(&desired, &existing, Some(&rule));
        assert_eq!(first, second);
    }

    #[test]
    fn test_surplus_lists_deleted_highest_first() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![
            remote(1, &domains(0..1000)),
            remote(2, &domains(1000..2000)),
            remote(3, &domains(2000..2500)),
        ];
        let rule = rule_for(&existing);
        let plan = reconciler.plan(&chunks(0..1000), &existing, Some(&rule));
        let deleted: Vec<&str> = plan
            .iter()
            .filter(|op| op.kind() == OperationKind::DeleteList)
            .map(Operation::target)
            .collect();
        assert_eq!(
            deleted,
            vec!["AdBlock-DNS-Filters - 003", "AdBlock-DNS-Filters - 002"]
        );
    }

    #[test]
    fn test_new_lists_take_ordinals_after_existing() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![remote(4, &domains(0..1000))];
        let rule = rule_for(&existing);
        let plan = reconciler.plan(&chunks(0..1200), &existing, Some(&rule));
        assert_eq!(
            plan.operations()[0],
            Operation::CreateList {
                index: 1,
                name: "AdBlock-DNS-Filters - 005".to_string(),
                items: domains(1000..1200),
            }
        );
        assert_eq!(
            plan.operations()[1].pending_refs(),
            vec![1],
            "rule update must wait for the new list"
        );
    }

    #[test]
    fn test_stale_rule_references_are_repaired() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![remote(1, &domains(0..10))];
        let mut rule = rule_for(&existing);
        rule.list_ids.insert("deadbeef-0000-4000-8000-000000000000".to_string());
        let plan = reconciler.plan(&chunks(0..10), &existing, Some(&rule));
        assert_eq!(kinds(&plan), vec![OperationKind::UpdateRule]);
    }

    #[test]
    fn test_empty_desired_deletes_everything() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![remote(1, &domains(0..10)), remote(2, &domains(10..20))];
        let rule = rule_for(&existing);
        let plan = reconciler.plan(&[], &existing, Some(&rule));
        assert_eq!(
            kinds(&plan),
            vec![
                OperationKind::DeleteList,
                OperationKind::DeleteList,
                OperationKind::DeleteRule,
            ]
        );
        assert!(reconciler.plan(&[], &[], None).is_empty());
    }

    #[test]
    fn test_plan_state_removes_duplicate_rules() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![remote(1, &domains(0..10))];
        let primary = rule_for(&existing);
        let mut duplicate = rule_for(&existing);
        duplicate.id = "rule-2".to_string();
        duplicate.name = format!("{PREFIX} copy");
        let state = RemoteState {
            lists: existing,
            rules: vec![primary, duplicate],
        };
        let plan = reconciler.plan_state(&chunks(0..10), &state);
        assert_eq!(
            plan.operations(),
            &[Operation::DeleteRule {
                id: "rule-2".to_string(),
                name: format!("{PREFIX} copy"),
            }]
        );
    }

    #[test]
    fn test_list_operations_precede_rule_operations() {
        let reconciler = Reconciler::new(PREFIX);
        let existing = vec![remote(1, &domains(0..10))];
        let rule = rule_for(&existing);
        let plan = reconciler.plan(&chunks(0..2100), &existing, Some(&rule));
        let first_rule = plan.iter().position(|op| !op.kind().is_list()).unwrap();
        assert!(plan.operations()[first_rule..]
            .iter()
            .all(|op| !op.kind().is_list()));
        assert_eq!(first_rule, plan.len() - 1);
    }
}
