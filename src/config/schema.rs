//! Authorization configuration schema.
//!
//! The on-disk shape mirrors the conceptual rule format: an
//! `authorization.rules` list where each rule carries a `match-request`
//! predicate, a `sort-order`, a diagnostic `name`, and any combination of
//! `allow`, `allow-unauthenticated`, and `deny`. All three permission
//! clauses on one rule is legal; evaluation precedence is fixed downstream.
//!
//! ```toml
//! [[authorization.rules]]
//! name = "puppetlabs environments"
//! sort-order = 500
//! allow = "*"
//!
//! [authorization.rules.match-request]
//! path = "/puppet/v3/environments"
//! type = "path"
//! method = ["get"]
//! ```

use serde::{Deserialize, Serialize};

/// Root of the rules file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub authorization: AuthorizationSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthorizationSection {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One rule as written in the file. No uniqueness constraint exists on
/// `name` or `sort-order`; ties are resolved by declaration order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleConfig {
    pub name: String,
    pub match_request: MatchRequestConfig,
    pub sort_order: i64,
    #[serde(default)]
    pub allow: Option<OneOrMany>,
    #[serde(default)]
    pub allow_unauthenticated: Option<bool>,
    #[serde(default)]
    pub deny: Option<OneOrMany>,
}

/// The path/type/method predicate of a rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MatchRequestConfig {
    pub path: String,
    #[serde(rename = "type", default)]
    pub match_type: MatchType,
    /// Verbs the rule applies to; absent or empty means all.
    #[serde(default)]
    pub method: Option<OneOrMany>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    #[default]
    Path,
    Regex,
}

/// A value that may be written as a bare string or a list of strings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn values(&self) -> &[String] {
        match self {
            OneOrMany::One(v) => std::slice::from_ref(v),
            OneOrMany::Many(vs) => vs,
        }
    }
}
