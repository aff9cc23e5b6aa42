use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Description attached to the managed blocking rule
pub const RULE_DESCRIPTION: &str = "Block Ads & Tracking";

/// Matches a `$<uuid>` list reference inside a traffic expression.
static LIST_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\w{8}-\w{4}-\w{4}-\w{4}-\w{12})").unwrap());

/// A filtering rule stored in the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRule {
    /// Opaque rule ID assigned by the gateway
    pub id: String,

    /// Rule name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Action taken on match (`block`, `allow`, ...)
    #[serde(default)]
    pub action: Option<String>,

    /// Whether the rule is active
    #[serde(default)]
    pub enabled: bool,

    /// Traffic expression, embedding list IDs as `$<id>`
    #[serde(default)]
    pub traffic: String,

    /// When the rule was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl GatewayRule {
    /// IDs of the lists this rule references
    #[must_use]
    pub fn list_ids(&self) -> BTreeSet<String> {
        parse_list_ids(&self.traffic)
    }
}

/// Request body for `POST /rules` and `PUT /rules/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRequest {
    /// Rule name
    pub name: String,

    /// Rule description
    pub description: String,

    /// Action on match
    pub action: String,

    /// Traffic filters the rule applies to
    pub filters: Vec<String>,

    /// Traffic expression
    pub traffic: String,

    /// Whether the rule is active
    pub enabled: bool,
}

impl RuleRequest {
    /// An enabled DNS block rule matching any domain in the given lists
    #[must_use]
    pub fn block(name: impl Into<String>, list_ids: &[String]) -> Self {
        Self {
            name: name.into(),
            description: RULE_DESCRIPTION.to_string(),
            action: "block".to_string(),
            filters: vec!["dns".to_string()],
            traffic: traffic_expression(list_ids),
            enabled: true,
        }
    }
}

/// Name of the managed rule for a policy prefix
#[must_use]
pub fn rule_name(prefix: &str) -> String {
    format!("{prefix} Block Ads")
}

/// Build the disjunctive "domain in list" expression for the given list IDs
#[must_use]
pub fn traffic_expression(list_ids: &[String]) -> String {
    list_ids
        .iter()
        .map(|id| format!("any(dns.domains[*] in ${id})"))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Extract every list ID referenced by a traffic expression
#[must_use]
pub fn parse_list_ids(traffic: &str) -> BTreeSet<String> {
    LIST_ID_PATTERN
        .captures_iter(traffic)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
