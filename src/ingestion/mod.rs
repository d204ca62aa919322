use serde::Serialize;
use crate::events::snapshot::AggregateSnapshot;

pub mod gate;
pub mod validator;

pub use gate::IngestionGate;
pub use validator::ObservationValidator;

/// What happened to a submitted observation that was not rejected.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Accepted {
        sequence: u64,
        snapshot: AggregateSnapshot,
    },
    /// Replaced an earlier version of the same key; fanned out as a correction.
    Corrected {
        sequence: u64,
        snapshot: AggregateSnapshot,
    },
    /// Identical to the stored version; nothing changed and nothing was sent.
    Duplicate,
}

impl SubmitOutcome {
    pub fn snapshot(&self) -> Option<&AggregateSnapshot> {
        match self {
            SubmitOutcome::Accepted { snapshot, .. } | SubmitOutcome::Corrected { snapshot, .. } => Some(snapshot),
            SubmitOutcome::Duplicate => None,
        }
    }
}
