//! Per-entry results of a load pass.

use std::collections::BTreeMap;

use crate::error::ScriptError;

/// What happened to one script entry during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// The existence check found the script already cached.
    AlreadyPresent { hash: String },
    /// The script was uploaded and the store returned `hash`.
    Uploaded { hash: String },
    Failed(ScriptError),
}

impl EntryOutcome {
    /// The confirmed hash, if the entry succeeded.
    pub fn hash(&self) -> Option<&str> {
        match self {
            EntryOutcome::AlreadyPresent { hash } | EntryOutcome::Uploaded { hash } => Some(hash),
            EntryOutcome::Failed(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EntryOutcome::Failed(_))
    }
}

/// Outcomes of one pass, keyed by script name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    outcomes: BTreeMap<String, EntryOutcome>,
}

impl LoadReport {
    pub(crate) fn record(&mut self, name: String, outcome: EntryOutcome) {
        self.outcomes.insert(name, outcome);
    }

    pub fn get(&self, name: &str) -> Option<&EntryOutcome> {
        self.outcomes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryOutcome)> {
        self.outcomes.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of entries that were uploaded in this pass.
    pub fn uploaded(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, EntryOutcome::Uploaded { .. }))
            .count()
    }

    /// Number of entries found already cached.
    pub fn already_present(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, EntryOutcome::AlreadyPresent { .. }))
            .count()
    }

    /// Failed entries with their errors, in name order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ScriptError)> {
        self.iter().filter_map(|(name, outcome)| match outcome {
            EntryOutcome::Failed(err) => Some((name, err)),
            _ => None,
        })
    }

    pub fn failed(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_failure()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn counts_by_outcome_kind() {
        let mut report = LoadReport::default();
        report.record("a".into(), EntryOutcome::Uploaded { hash: "h1".into() });
        report.record("b".into(), EntryOutcome::AlreadyPresent { hash: "h2".into() });
        report.record(
            "c".into(),
            EntryOutcome::Failed(ScriptError::Transport(TransportError::NotConnected)),
        );

        assert_eq!(report.len(), 3);
        assert_eq!(report.uploaded(), 1);
        assert_eq!(report.already_present(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(report.failures().next().map(|(name, _)| name), Some("c"));
    }

    #[test]
    fn only_successful_outcomes_expose_hash() {
        assert_eq!(EntryOutcome::Uploaded { hash: "h".into() }.hash(), Some("h"));
        assert_eq!(
            EntryOutcome::Failed(ScriptError::Rejected("ERR".into())).hash(),
            None
        );
    }

    #[test]
    fn empty_report_is_success() {
        let report = LoadReport::default();
        assert!(report.is_empty());
        assert!(report.is_success());
    }
}
