use serde::{Deserialize, Serialize};

use crate::AttemptLedger;

/// Verifier-side stopping rule and decision threshold.
///
/// With a binary challenge an impostor survives a round with probability 1/2,
/// so `required_valid_rounds = k` bounds forgery by `2^-k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundPolicy {
    /// Valid rounds needed for a positive decision.
    pub required_valid_rounds: u32,
    /// Rounds after which the loop ends regardless of outcome.
    pub max_rounds: u32,
    /// Invalid rounds still compatible with a positive decision.
    pub tolerated_invalid: u32,
}

impl Default for RoundPolicy {
    fn default() -> Self {
        Self {
            required_valid_rounds: 10,
            max_rounds: 40,
            tolerated_invalid: 0,
        }
    }
}

impl RoundPolicy {
    /// Whether the verifier asks for another round after `ledger`.
    pub fn should_continue(&self, ledger: &AttemptLedger) -> bool {
        ledger.valid_rounds() < self.required_valid_rounds
            && ledger.total_rounds() < self.max_rounds
            && ledger.invalid_rounds() <= self.tolerated_invalid
    }

    /// Final decision for a finished loop.
    pub fn decide(&self, ledger: &AttemptLedger) -> bool {
        ledger.valid_rounds() >= self.required_valid_rounds
            && ledger.invalid_rounds() <= self.tolerated_invalid
    }

    /// Validates the policy.
    ///
    /// # Errors
    /// Returns an error message if the policy can never authenticate.
    pub fn validate(&self) -> Result<(), String> {
        if self.required_valid_rounds == 0 {
            return Err("Policy required_valid_rounds cannot be zero".to_string());
        }

        if self.max_rounds < self.required_valid_rounds {
            return Err(format!(
                "Policy max_rounds ({}) is below required_valid_rounds ({})",
                self.max_rounds, self.required_valid_rounds
            ));
        }

        Ok(())
    }
}
