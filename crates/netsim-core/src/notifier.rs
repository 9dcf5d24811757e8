use crate::id::Time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Decides which turns get a textual report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportNotifier {
    /// Report on turns `t` where `(t - 1) % n == 0`, i.e. 1, 1+n, 1+2n, ...
    Interval(Time),
    /// Report exactly on the listed turns.
    SpecificTurns(BTreeSet<Time>),
}

impl ReportNotifier {
    pub fn should_report(&self, t: Time) -> bool {
        match self {
            ReportNotifier::Interval(n) => (t - 1) % n == 0,
            ReportNotifier::SpecificTurns(turns) => turns.contains(&t),
        }
    }
}
