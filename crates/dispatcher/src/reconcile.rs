//! Reconciliation - diff newly produced keys against prior artifacts
//!
//! Stale keys (previously produced, not reproduced this run) are always
//! computed and logged; actual deletion is a policy hook, off by default.

use std::collections::BTreeSet;

use tracing::info;

use contracts::ContractError;

use crate::registry::Action;

/// Key sets for one action's run against one source key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Keys previously produced for this source prefix
    pub old_keys: BTreeSet<String>,
    /// Keys produced by the current run
    pub new_keys: BTreeSet<String>,
}

impl Reconciliation {
    pub fn new(old_keys: BTreeSet<String>, new_keys: BTreeSet<String>) -> Self {
        Self { old_keys, new_keys }
    }

    /// Previously produced keys the current run did not reproduce.
    pub fn stale_keys(&self) -> BTreeSet<String> {
        self.old_keys.difference(&self.new_keys).cloned().collect()
    }

    /// Everything downstream stages should (re)consider: old ∪ new.
    pub fn fanout_keys(&self) -> BTreeSet<String> {
        self.old_keys.union(&self.new_keys).cloned().collect()
    }

    /// No new keys were produced - alert-worthy whether or not old keys exist.
    pub fn is_anomalous(&self) -> bool {
        self.new_keys.is_empty()
    }
}

/// Query the destination for prior keys and pair them with this run's output.
pub async fn reconcile(
    action: &Action,
    source_key: &str,
    new_keys: BTreeSet<String>,
) -> Result<Reconciliation, ContractError> {
    let old_keys = action.destination.keys(source_key).await?;
    Ok(Reconciliation::new(old_keys, new_keys))
}

/// Apply the stale-key policy: log always, delete only when enabled.
/// Returns the number of keys deleted.
pub async fn apply_stale_policy(
    action: &Action,
    reconciliation: &Reconciliation,
) -> Result<usize, ContractError> {
    let stale = reconciliation.stale_keys();
    if stale.is_empty() {
        return Ok(0);
    }

    info!(
        action = %action.name,
        count = stale.len(),
        keys = ?stale,
        delete = action.delete_stale,
        "stale destination keys"
    );

    if !action.delete_stale {
        return Ok(0);
    }

    for key in &stale {
        action.destination.delete(key).await?;
    }
    Ok(stale.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_stale_is_old_minus_new() {
        let recon = Reconciliation::new(keys(&["a.1", "a.2", "a.3"]), keys(&["a.2", "a.4"]));
        assert_eq!(recon.stale_keys(), keys(&["a.1", "a.3"]));
        assert_eq!(recon.fanout_keys(), keys(&["a.1", "a.2", "a.3", "a.4"]));
        assert!(!recon.is_anomalous());
    }

    #[test]
    fn test_identical_runs_have_no_stale_keys() {
        let recon = Reconciliation::new(keys(&["a.1"]), keys(&["a.1"]));
        assert!(recon.stale_keys().is_empty());
        assert_eq!(recon.fanout_keys(), keys(&["a.1"]));
    }

    #[test]
    fn test_empty_new_keys_is_anomalous() {
        assert!(Reconciliation::new(keys(&["a.1"]), keys(&[])).is_anomalous());
        assert!(Reconciliation::new(keys(&[]), keys(&[])).is_anomalous());
        assert!(!Reconciliation::new(keys(&[]), keys(&["a.1"])).is_anomalous());
    }
}
