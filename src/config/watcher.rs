//! Rules file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::authz::rule::RuleSet;
use crate::config::loader::load_rules;

/// Watches the rules file and emits compiled [`RuleSet`] snapshots.
///
/// Only successful loads are emitted. A reload that fails to read, parse,
/// or compile is logged and dropped, so the consumer's current snapshot
/// stays active and the server never observes a partial rule list.
pub struct RuleWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RuleSet>,
}

impl RuleWatcher {
    /// Create a new RuleWatcher.
    ///
    /// Returns the watcher and a receiver for rule set updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RuleSet>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread. The returned watcher
    /// handle must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Rules file change detected, reloading...");
                        match load_rules(&path) {
                            Ok(rules) => {
                                tracing::info!(rules = rules.len(), "Rule set reloaded");
                                let _ = tx.send(rules);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload rules: {}. Keeping current rule set.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Rule watcher started");
        Ok(watcher)
    }
}
