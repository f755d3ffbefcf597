use serde::{Deserialize, Serialize};

/// A set of rewritten candidates and the judge's pick among them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    /// Candidate instructions in generation order
    pub candidates: Vec<String>,
    /// Zero-based index of the preferred candidate, if the judge produced a usable verdict
    pub winner: Option<usize>,
}

impl Tournament {
    /// A single candidate that wins by default
    pub fn single(candidate: String) -> Self {
        Self {
            candidates: vec![candidate],
            winner: Some(0),
        }
    }

    pub fn is_winner(&self, index: usize) -> bool {
        self.winner == Some(index)
    }

    /// The preferred candidate text
    pub fn best(&self) -> Option<&str> {
        self.winner
            .and_then(|i| self.candidates.get(i))
            .map(String::as_str)
    }
}
