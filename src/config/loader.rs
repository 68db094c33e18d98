//! Rule loading and compilation.
//!
//! A load either yields a fully-compiled, sorted [`RuleSet`] or fails as a
//! whole. A regex that does not compile, an unknown verb, or an unreadable
//! file all reject the load; the caller keeps whatever snapshot it already
//! had, so a bad reload can never leave the server running with a partial
//! or empty rule list.

use std::path::Path;

use regex::Regex;

use crate::authz::pattern::NodePattern;
use crate::authz::rule::{PathMatcher, Rule, RuleSet};
use crate::config::schema::{AuthConfig, MatchType, OneOrMany, RuleConfig};
use crate::http::request::HttpMethod;

/// Error type for rule loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid rule '{rule}': {message}")]
    Invalid { rule: String, message: String },
}

/// Load and compile a rule set from a TOML file.
pub fn load_rules(path: &Path) -> Result<RuleSet, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_rules(&content)
}

/// Parse and compile a rule set from TOML text.
pub fn parse_rules(content: &str) -> Result<RuleSet, ConfigError> {
    let config: AuthConfig = toml::from_str(content)?;
    let rules = config
        .authorization
        .rules
        .iter()
        .map(compile_rule)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuleSet::new(rules))
}

fn compile_rule(cfg: &RuleConfig) -> Result<Rule, ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        rule: cfg.name.clone(),
        message,
    };

    let matcher = match cfg.match_request.match_type {
        MatchType::Path => PathMatcher::Prefix(cfg.match_request.path.clone()),
        MatchType::Regex => PathMatcher::Regex(
            Regex::new(&cfg.match_request.path)
                .map_err(|e| invalid(format!("path regex does not compile: {e}")))?,
        ),
    };

    let methods = match &cfg.match_request.method {
        Some(m) => m
            .values()
            .iter()
            .map(|v| HttpMethod::parse(v).map_err(|e| invalid(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let compile_patterns = |values: Option<&OneOrMany>| {
        values
            .map(|v| v.values())
            .unwrap_or_default()
            .iter()
            .map(|p| NodePattern::compile(p).map_err(invalid))
            .collect::<Result<Vec<_>, _>>()
    };
    let allow = compile_patterns(cfg.allow.as_ref())?;
    let deny = compile_patterns(cfg.deny.as_ref())?;

    Ok(Rule {
        name: cfg.name.clone(),
        matcher,
        methods,
        sort_order: cfg.sort_order,
        allow,
        deny,
        allow_unauthenticated: cfg.allow_unauthenticated.unwrap_or(false),
    })
}
