use serde::{Deserialize, Serialize};

/// Round counters of one session.
///
/// Counters only ever grow, and `invalid_rounds <= total_rounds` always holds:
/// the fields are private and [`record`](AttemptLedger::record) is the only
/// mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptLedger {
    total_rounds: u32,
    invalid_rounds: u32,
}

impl AttemptLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one verified round.
    pub fn record(&mut self, valid: bool) {
        if self.total_rounds == u32::MAX {
            return;
        }
        self.total_rounds += 1;
        if !valid {
            self.invalid_rounds += 1;
        }
    }

    /// Rounds verified so far.
    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    /// Rounds whose proof the verifier rejected.
    pub fn invalid_rounds(&self) -> u32 {
        self.invalid_rounds
    }

    /// Rounds whose proof the verifier accepted.
    pub fn valid_rounds(&self) -> u32 {
        self.total_rounds - self.invalid_rounds
    }
}
