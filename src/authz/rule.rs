//! Compiled authorization rules.
//!
//! # Design Decisions
//! - Rules are compiled once (regexes, globs, verbs) when a rule set is
//!   built; evaluation never touches the textual configuration.
//! - A [`RuleSet`] is an immutable snapshot. Reload builds a whole new set
//!   and swaps it in; nothing mutates a live set.
//! - Ordering is `(sort_order ascending, declaration order)` via a stable
//!   sort, so ties keep their file order.

use regex::Regex;

use crate::authz::pattern::NodePattern;
use crate::http::request::HttpMethod;

/// Path predicate of a rule.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Literal prefix, trailing-slash-insensitive on both sides.
    Prefix(String),
    Regex(Regex),
}

impl PathMatcher {
    /// Match a request path. `Some` carries the regex capture groups (empty
    /// for prefix matches) for backreference patterns.
    pub fn matches(&self, path: &str) -> Option<Vec<String>> {
        match self {
            PathMatcher::Prefix(prefix) => {
                let prefix = prefix.trim_end_matches('/');
                let path = path.trim_end_matches('/');
                path.starts_with(prefix).then(Vec::new)
            }
            PathMatcher::Regex(re) => re.captures(path).map(|caps| {
                caps.iter()
                    .skip(1)
                    .map(|c| c.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            }),
        }
    }
}

/// One compiled authorization directive.
///
/// A rule may legally carry `allow`, `allow_unauthenticated`, and `deny`
/// simultaneously; the configuration format does not forbid it. The engine
/// resolves the ambiguity with a fixed precedence (deny first), it does not
/// reject or reinterpret such rules.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Diagnostic name, echoed in denial reasons.
    pub name: String,
    pub matcher: PathMatcher,
    /// Verbs this rule applies to; empty applies to all.
    pub methods: Vec<HttpMethod>,
    /// Lower values evaluate first.
    pub sort_order: i64,
    pub allow: Vec<NodePattern>,
    pub deny: Vec<NodePattern>,
    pub allow_unauthenticated: bool,
}

impl Rule {
    /// Whether this rule is a candidate for the given method and path.
    /// `Some` carries the path captures.
    pub fn candidate(&self, method: HttpMethod, path: &str) -> Option<Vec<String>> {
        if !self.methods.is_empty() && !self.methods.contains(&method) {
            return None;
        }
        self.matcher.matches(path)
    }
}

/// An ordered, immutable rule snapshot.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a snapshot from rules in declaration order. The stable sort
    /// preserves declaration order among equal `sort_order` values.
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|r| r.sort_order);
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
