//! Authorization rule engine: compiled rules, identity patterns, and the
//! ordered first-match-wins evaluator.

pub mod engine;
pub mod pattern;
pub mod rule;

pub use engine::{evaluate, Decision};
pub use pattern::NodePattern;
pub use rule::{PathMatcher, Rule, RuleSet};
