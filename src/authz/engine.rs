//! Rule evaluation.
//!
//! # Responsibilities
//! - Find the first candidate rule for a request (first match wins)
//! - Resolve that rule's directives against the caller identity
//! - Default-deny when nothing matches
//!
//! # Design Decisions
//! - Pure in-memory evaluation: no I/O, no suspension points, idempotent
//!   for identical inputs.
//! - Directive precedence on a single rule is fixed: `deny`, then
//!   `allow-unauthenticated`, then `allow`, then implicit deny. The format
//!   allows all three on one rule; the engine guarantees determinism, not
//!   intent.
//! - Specificity does not exist here. Evaluation order is exactly the rule
//!   set order; configuration authors own their `sort-order` values.

use crate::authz::rule::{Rule, RuleSet};
use crate::http::request::Request;
use crate::identity::Identity;

/// Outcome of evaluating one request against a rule set snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub matched_rule: Option<String>,
    /// Human-readable reason, echoed in denial responses and logs. Denials
    /// always contain the stable phrase `denied by rule '<name>'` or
    /// `default deny`.
    pub reason: String,
}

/// Evaluate a request and its identity against a rule set snapshot.
pub fn evaluate(request: &Request, identity: &Identity, rules: &RuleSet) -> Decision {
    for rule in rules.rules() {
        if let Some(captures) = rule.candidate(request.method, &request.path) {
            let decision = decide(rule, &captures, request, identity);
            if decision.allowed {
                tracing::debug!(
                    node = %identity.node,
                    path = %request.path,
                    rule = %rule.name,
                    "request allowed"
                );
            } else {
                tracing::warn!(
                    node = %identity.node,
                    path = %request.path,
                    rule = %rule.name,
                    "request denied"
                );
            }
            return decision;
        }
    }

    tracing::warn!(
        node = %identity.node,
        path = %request.path,
        "request denied, no matching rule"
    );
    Decision {
        allowed: false,
        matched_rule: None,
        reason: format!(
            "{} access to {} (method :{}) (authenticated: {}) denied: \
             no matching rule; default deny.",
            identity.node,
            request.path,
            request.method.as_str().to_lowercase(),
            identity.authenticated
        ),
    }
}

/// Resolve the directives of the first candidate rule. No further rules are
/// consulted once this runs.
fn decide(rule: &Rule, captures: &[String], request: &Request, identity: &Identity) -> Decision {
    if rule.deny.iter().any(|p| p.matches(&identity.node, captures)) {
        return denial(rule, request, identity);
    }

    if rule.allow_unauthenticated {
        return Decision {
            allowed: true,
            matched_rule: Some(rule.name.clone()),
            reason: format!("allowed by rule '{}'", rule.name),
        };
    }

    if identity.authenticated
        && rule.allow.iter().any(|p| p.matches(&identity.node, captures))
    {
        return Decision {
            allowed: true,
            matched_rule: Some(rule.name.clone()),
            reason: format!("allowed by rule '{}'", rule.name),
        };
    }

    // The rule matched path and method but the caller satisfied none of its
    // permission clauses.
    denial(rule, request, identity)
}

fn denial(rule: &Rule, request: &Request, identity: &Identity) -> Decision {
    Decision {
        allowed: false,
        matched_rule: Some(rule.name.clone()),
        reason: format!(
            "{} access to {} (method :{}) (authenticated: {}) denied by rule '{}'.",
            identity.node,
            request.path,
            request.method.as_str().to_lowercase(),
            identity.authenticated,
            rule.name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::pattern::NodePattern;
    use crate::authz::rule::PathMatcher;
    use crate::http::request::{Body, HttpMethod, TransportRequest};

    fn request(method: &str, uri: &str) -> Request {
        Request::adapt(TransportRequest {
            method: method.into(),
            uri: uri.into(),
            headers: vec![],
            body: Body::empty(),
            remote_addr: "192.0.2.10".into(),
            client_cert_cn: None,
            authenticated: false,
        })
        .unwrap()
    }

    fn identity(node: &str, authenticated: bool) -> Identity {
        Identity { node: node.into(), authenticated }
    }

    fn base_rule(name: &str, prefix: &str, sort_order: i64) -> Rule {
        Rule {
            name: name.into(),
            matcher: PathMatcher::Prefix(prefix.into()),
            methods: vec![],
            sort_order,
            allow: vec![],
            deny: vec![],
            allow_unauthenticated: false,
        }
    }

    fn allow_all(name: &str, prefix: &str, sort_order: i64) -> Rule {
        let mut r = base_rule(name, prefix, sort_order);
        r.allow = vec![NodePattern::compile("*").unwrap()];
        r
    }

    #[test]
    fn test_first_match_wins_even_when_later_rule_would_allow() {
        let deny_rule = base_rule("strict", "/puppet/v3/catalog", 10);
        let permissive = allow_all("loose", "/puppet", 20);
        let set = RuleSet::new(vec![deny_rule, permissive]);

        let d = evaluate(
            &request("GET", "/puppet/v3/catalog/agent1"),
            &identity("agent1", true),
            &set,
        );
        assert!(!d.allowed);
        assert!(d.reason.contains("denied by rule 'strict'"));
    }

    #[test]
    fn test_tie_broken_by_declaration_order() {
        let first = allow_all("declared-first", "/puppet", 100);
        let mut second = base_rule("declared-second", "/puppet", 100);
        second.deny = vec![NodePattern::compile("*").unwrap()];
        let set = RuleSet::new(vec![first, second]);

        let d = evaluate(&request("GET", "/puppet/v3/status"), &identity("n", true), &set);
        assert!(d.allowed);
        assert_eq!(d.matched_rule.as_deref(), Some("declared-first"));
    }

    #[test]
    fn test_deny_beats_allow_unauthenticated_and_allow() {
        let mut r = allow_all("ambiguous", "/puppet", 1);
        r.allow_unauthenticated = true;
        r.deny = vec![NodePattern::compile("badnode").unwrap()];
        let set = RuleSet::new(vec![r]);

        let denied = evaluate(&request("GET", "/puppet/x"), &identity("badnode", true), &set);
        assert!(!denied.allowed);
        assert!(denied.reason.contains("denied by rule 'ambiguous'"));

        // Everyone else rides the allow-unauthenticated clause.
        let allowed = evaluate(&request("GET", "/puppet/x"), &identity("other", false), &set);
        assert!(allowed.allowed);
    }

    #[test]
    fn test_allow_requires_authentication() {
        let mut r = base_rule("authenticated-only", "/puppet", 1);
        r.allow = vec![NodePattern::compile("agent1").unwrap()];
        let set = RuleSet::new(vec![r]);

        assert!(evaluate(&request("GET", "/puppet/x"), &identity("agent1", true), &set).allowed);
        assert!(!evaluate(&request("GET", "/puppet/x"), &identity("agent1", false), &set).allowed);
    }

    #[test]
    fn test_no_clause_satisfied_denies_with_rule_name() {
        let r = base_rule("no-clauses", "/puppet", 1);
        let set = RuleSet::new(vec![r]);
        let d = evaluate(&request("GET", "/puppet/x"), &identity("agent1", true), &set);
        assert!(!d.allowed);
        assert!(d.reason.contains("denied by rule 'no-clauses'"));
    }

    #[test]
    fn test_empty_rule_set_is_default_deny() {
        let set = RuleSet::new(vec![]);
        let d = evaluate(&request("GET", "/anything"), &identity("agent1", true), &set);
        assert!(!d.allowed);
        assert!(d.matched_rule.is_none());
        assert!(d.reason.contains("default deny"));
    }

    #[test]
    fn test_idempotent_evaluation() {
        let set = RuleSet::new(vec![allow_all("r", "/puppet", 1)]);
        let req = request("GET", "/puppet/v3/status");
        let id = identity("agent1", true);
        let first = evaluate(&req, &id, &set);
        for _ in 0..3 {
            assert_eq!(evaluate(&req, &id, &set), first);
        }
    }

    #[test]
    fn test_backref_allows_matching_certname_segment() {
        let mut r = base_rule("catalog", "x", 1);
        r.matcher = PathMatcher::Regex(
            regex::Regex::new("^/puppet/v3/catalog/([^/]+)$").unwrap(),
        );
        r.allow = vec![NodePattern::compile("$1").unwrap()];
        let set = RuleSet::new(vec![r]);

        let own = evaluate(
            &request("GET", "/puppet/v3/catalog/agent1"),
            &identity("agent1", true),
            &set,
        );
        assert!(own.allowed);

        let other = evaluate(
            &request("GET", "/puppet/v3/catalog/agent2"),
            &identity("agent1", true),
            &set,
        );
        assert!(!other.allowed);
        assert!(other.reason.contains("denied by rule 'catalog'"));
    }

    #[test]
    fn test_method_restricted_rule_skipped_for_other_verbs() {
        let mut get_only = base_rule("get-only", "/puppet", 1);
        get_only.methods = vec![HttpMethod::Get];
        get_only.deny = vec![NodePattern::compile("*").unwrap()];
        let fallback = allow_all("fallback", "/puppet", 2);
        let set = RuleSet::new(vec![get_only, fallback]);

        assert!(!evaluate(&request("GET", "/puppet/x"), &identity("n", true), &set).allowed);
        assert!(evaluate(&request("PUT", "/puppet/x"), &identity("n", true), &set).allowed);
    }
}
