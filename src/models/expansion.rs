use serde::{Deserialize, Serialize};

/// Output of the meta-prompt expander
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    /// The generated instruction template
    pub template: String,
    /// Placeholder names found in the model response, sorted
    pub variables: Vec<String>,
}

impl Expansion {
    /// Variables one per line, the way an operator pastes them back in
    pub fn variables_text(&self) -> String {
        self.variables.join("\n")
    }
}
