//! Identity patterns for `allow` / `deny` directives.
//!
//! Three pattern families, classified once at rule-compile time:
//! - exact hostname equality,
//! - glob (`*` wildcard, compiled to an anchored regex),
//! - backreference (`$1`, `$2`, ...) substituted from the path match's
//!   capture groups and then compared literally.

use regex::Regex;

#[derive(Debug, Clone)]
pub enum NodePattern {
    Exact(String),
    Glob(Regex),
    Backref(String),
}

impl NodePattern {
    /// Classify and compile a pattern from a rule's `allow`/`deny` entry.
    pub fn compile(pattern: &str) -> Result<Self, String> {
        if pattern.contains('$') {
            return Ok(NodePattern::Backref(pattern.to_string()));
        }
        if pattern.contains('*') {
            let mut anchored = String::from("^");
            let mut parts = pattern.split('*').peekable();
            while let Some(part) = parts.next() {
                anchored.push_str(&regex::escape(part));
                if parts.peek().is_some() {
                    anchored.push_str(".*");
                }
            }
            anchored.push('$');
            let re = Regex::new(&anchored)
                .map_err(|e| format!("invalid glob pattern {pattern:?}: {e}"))?;
            return Ok(NodePattern::Glob(re));
        }
        Ok(NodePattern::Exact(pattern.to_string()))
    }

    /// Match a resolved node name. `captures` are the path matcher's capture
    /// groups, `captures[0]` corresponding to `$1`.
    pub fn matches(&self, node: &str, captures: &[String]) -> bool {
        match self {
            NodePattern::Exact(name) => name == node,
            NodePattern::Glob(re) => re.is_match(node),
            NodePattern::Backref(template) => match substitute(template, captures) {
                Some(expected) => expected == node,
                // Referencing a group the path match did not capture can
                // never match anything.
                None => false,
            },
        }
    }
}

/// Replace `$N` references with capture values; `None` if any referenced
/// group is out of range.
fn substitute(template: &str, captures: &[String]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let mut index = 0usize;
        let mut digits = 0;
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            index = index * 10 + d as usize;
            digits += 1;
            chars.next();
        }
        if digits == 0 || index == 0 {
            // A bare '$' stays literal.
            out.push('$');
            continue;
        }
        out.push_str(captures.get(index - 1)?);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let p = NodePattern::compile("agent1.example.org").unwrap();
        assert!(p.matches("agent1.example.org", &[]));
        assert!(!p.matches("agent2.example.org", &[]));
    }

    #[test]
    fn test_glob_match() {
        let p = NodePattern::compile("*.example.org").unwrap();
        assert!(p.matches("agent1.example.org", &[]));
        assert!(p.matches("a.b.example.org", &[]));
        assert!(!p.matches("example.org", &[]));
        assert!(!p.matches("agent1.example.com", &[]));
    }

    #[test]
    fn test_star_matches_everything() {
        let p = NodePattern::compile("*").unwrap();
        assert!(p.matches("anything-at-all", &[]));
    }

    #[test]
    fn test_glob_escapes_regex_metachars() {
        let p = NodePattern::compile("agent.*").unwrap();
        assert!(p.matches("agent.one", &[]));
        assert!(!p.matches("agentXone", &[]));
    }

    #[test]
    fn test_backref_substitution() {
        let p = NodePattern::compile("$1").unwrap();
        assert!(p.matches("agent1", &["agent1".to_string()]));
        assert!(!p.matches("agent1", &["agent2".to_string()]));
    }

    #[test]
    fn test_backref_out_of_range_never_matches() {
        let p = NodePattern::compile("$2").unwrap();
        assert!(!p.matches("agent1", &["agent1".to_string()]));
    }
}
