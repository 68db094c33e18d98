//! Rule configuration: schema, loading/compilation, and the hot-reload
//! watcher.

pub mod loader;
pub mod schema;
pub mod watcher;

pub use loader::{load_rules, parse_rules, ConfigError};
pub use schema::AuthConfig;
pub use watcher::RuleWatcher;
