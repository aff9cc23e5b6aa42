//! Domain normalization: raw block/allow list text to a canonical domain set.
//!
//! Accepted input formats are plain domain lists, hosts files
//! (`0.0.0.0 ads.example.com`) and the host-only subset of adblock syntax
//! (`||ads.example.com^`, `@@||`, `*.`). Everything that does not reduce to a
//! valid hostname is dropped without error; only aggregate counts are kept.

use serde::Serialize;
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Maximum length of a full hostname
const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label
const MAX_LABEL_LEN: usize = 63;

/// Syntactic markers stripped from the start of a line, longest first.
const MARKERS: [&str; 4] = ["@@||", "||", "*.", "*"];

/// A deduplicated, lexicographically ordered set of validated hostnames
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DomainSet(BTreeSet<String>);

impl DomainSet {
    /// Create an empty set
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parse raw list text, returning the set and the number of discarded lines
    #[must_use]
    pub fn parse(text: &str) -> (Self, usize) {
        let mut set = BTreeSet::new();
        let mut discarded = 0;
        for line in text.lines() {
            match normalize_line(line) {
                Some(domain) => {
                    set.insert(domain);
                }
                None if is_noise(line) => {}
                None => discarded += 1,
            }
        }
        (Self(set), discarded)
    }

    /// Number of domains
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the set contains `domain` (already normalized)
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        self.0.contains(domain)
    }

    /// Domains in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Remove every domain present in `other`, returning how many were removed
    pub fn subtract(&mut self, other: &Self) -> usize {
        let before = self.0.len();
        self.0.retain(|domain| !other.0.contains(domain));
        before - self.0.len()
    }

    /// Ordered domains as a vector
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a DomainSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Counts gathered while normalizing, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    /// Distinct valid domains parsed from block sources
    pub blocked: usize,
    /// Distinct valid domains parsed from allow sources
    pub allowed: usize,
    /// Block domains removed because they are allow-listed
    pub allow_listed: usize,
    /// Non-blank, non-comment lines that failed validation
    pub discarded: usize,
    /// Domains in the final set
    pub total: usize,
}

/// Result of normalizing block and allow text
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Final domain set
    pub domains: DomainSet,
    /// Aggregate counts
    pub stats: NormalizeStats,
}

/// Normalize block and allow text into the final domain set.
///
/// Both sides are normalized independently before the allow set is
/// subtracted, so `||ads.example.com^` in an allow list cancels
/// `0.0.0.0 ads.example.com` in a block list.
#[must_use]
pub fn normalize(block_text: &str, allow_text: &str) -> Normalized {
    let (mut domains, block_discarded) = DomainSet::parse(block_text);
    let (allow, allow_discarded) = DomainSet::parse(allow_text);
    let blocked = domains.len();
    let allow_listed = domains.subtract(&allow);

    let stats = NormalizeStats {
        blocked,
        allowed: allow.len(),
        allow_listed,
        discarded: block_discarded + allow_discarded,
        total: domains.len(),
    };
    Normalized { domains, stats }
}

/// Reduce one raw line to a canonical lowercase hostname, if it holds one
#[must_use]
pub fn normalize_line(line: &str) -> Option<String> {
    let line = strip_inline_comment(line.trim());
    if is_noise(line) {
        return None;
    }

    let host = strip_prefix(line);
    let host = host.strip_suffix('^').unwrap_or(host);
    let host = host.strip_suffix('.').unwrap_or(host);

    is_valid_domain(host).then(|| host.to_ascii_lowercase())
}

/// Strict hostname grammar: dot-separated labels of ASCII alphanumerics and
/// hyphens, no leading or trailing hyphen, at least one label.
///
/// Dotted-quad IPv4 literals are accepted too; they satisfy the same grammar.
#[must_use]
pub fn is_valid_domain(host: &str) -> bool {
    if host.is_empty() || host.len() > MAX_DOMAIN_LEN {
        return false;
    }
    host.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn is_noise(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#') || line.starts_with('!')
}

/// Drop a trailing `# comment` preceded by whitespace.
fn strip_inline_comment(line: &str) -> &str {
    line.find(" #")
        .or_else(|| line.find("\t#"))
        .map_or(line, |idx| line[..idx].trim_end())
}

/// Strip a hosts-file address or one adblock marker from the start of a line.
fn strip_prefix(line: &str) -> &str {
    if let Some((first, rest)) = line.split_once(char::is_whitespace) {
        if first.parse::<IpAddr>().is_ok() {
            return rest.trim();
        }
    }
    MARKERS
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .unwrap_or(line)
}
