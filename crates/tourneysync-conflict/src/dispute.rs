//! Dispute detection for merged match results
//!
//! A dispute means the two players reported scores that cannot both be
//! true. What "cannot both be true" means depends on the game, so the
//! check is a trait object the resolver is constructed with.

use serde_json::Value;

use tourneysync_core::config::ConflictsConfig;

/// Decides whether two per-player score maps contradict each other
pub trait DisputePredicate: Send + Sync {
    /// `player1` and `player2` are the merged score maps (or `Null`)
    fn is_disputed(&self, player1: &Value, player2: &Value) -> bool;
}

/// Disputed when both players report the score field and the sum exceeds
/// the game's expected total
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSumExceeds {
    pub field: String,
    pub expected_total: f64,
}

impl ScoreSumExceeds {
    pub fn new(field: impl Into<String>, expected_total: f64) -> Self {
        Self {
            field: field.into(),
            expected_total,
        }
    }

    pub fn from_config(config: &ConflictsConfig) -> Self {
        Self::new(config.match_score_field.clone(), config.match_expected_total)
    }

    fn score(&self, scores: &Value) -> Option<f64> {
        scores.get(&self.field).and_then(Value::as_f64)
    }
}

impl Default for ScoreSumExceeds {
    fn default() -> Self {
        Self::new("op", 10.0)
    }
}

impl DisputePredicate for ScoreSumExceeds {
    fn is_disputed(&self, player1: &Value, player2: &Value) -> bool {
        match (self.score(player1), self.score(player2)) {
            (Some(a), Some(b)) => a + b > self.expected_total,
            _ => false,
        }
    }
}
