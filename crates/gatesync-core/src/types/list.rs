use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of items the gateway accepts in a single list
pub const MAX_LIST_ITEMS: usize = 1000;

/// Description attached to every list this tool creates
pub const LIST_DESCRIPTION: &str = "Ads & Tracking Domains";

/// A domain list stored in the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayList {
    /// Opaque list ID assigned by the gateway
    pub id: String,

    /// List name (prefix + ordinal suffix for managed lists)
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// List type, `DOMAIN` for managed lists
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Number of items the gateway reports for the list
    #[serde(default)]
    pub count: Option<u32>,

    /// When the list was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// When the list was last updated
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A single entry of a gateway list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    /// The domain value
    pub value: String,

    /// When the item was added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ListItem {
    /// Create an item for the given domain
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            created_at: None,
        }
    }
}

/// Request body for `POST /lists`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListRequest {
    /// List name
    pub name: String,

    /// List description
    pub description: String,

    /// List type
    #[serde(rename = "type")]
    pub kind: String,

    /// Initial items
    pub items: Vec<ListItem>,
}

impl CreateListRequest {
    /// Build a `DOMAIN` list request holding the given domains
    #[must_use]
    pub fn domains<I, S>(name: impl Into<String>, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: LIST_DESCRIPTION.to_string(),
            kind: "DOMAIN".to_string(),
            items: domains.into_iter().map(ListItem::new).collect(),
        }
    }
}

/// Request body for `PATCH /lists/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchListRequest {
    /// Values to remove
    pub remove: Vec<String>,

    /// Items to append
    pub append: Vec<ListItem>,
}

impl PatchListRequest {
    /// Build a patch from plain domain values
    #[must_use]
    pub fn new(append: &[String], remove: &[String]) -> Self {
        Self {
            remove: remove.to_vec(),
            append: append.iter().map(ListItem::new).collect(),
        }
    }
}

/// Name of the managed list at `ordinal` (1-based)
#[must_use]
pub fn list_name(prefix: &str, ordinal: u32) -> String {
    format!("{prefix} - {ordinal:03}")
}

/// Extract the numeric ordinal from a managed list name.
///
/// The prefix is stripped first so digits inside it are ignored; the first
/// run of digits that follows is the ordinal. Names without one yield `None`
/// and sort after every numbered list.
#[must_use]
pub fn list_ordinal(name: &str, prefix: &str) -> Option<u32> {
    let rest = name.strip_prefix(prefix).unwrap_or(name);
    let start = rest.find(|c: char| c.is_ascii_digit())?;
    let digits: String = rest[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
