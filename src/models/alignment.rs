use serde::{Deserialize, Serialize};

/// The two prompts to run side by side
///
/// Each side has a raw prompt and an optional filled version (placeholders
/// substituted). The filled version wins when it is non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Invocation {
    pub prompt_a: String,
    #[serde(default)]
    pub filled_a: String,
    pub prompt_b: String,
    #[serde(default)]
    pub filled_b: String,
}

impl Invocation {
    /// Same prompt on both sides
    pub fn mirrored(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        Self {
            prompt_a: prompt.clone(),
            prompt_b: prompt,
            ..Default::default()
        }
    }

    pub fn effective_a(&self) -> &str {
        pick(&self.filled_a, &self.prompt_a)
    }

    pub fn effective_b(&self) -> &str {
        pick(&self.filled_b, &self.prompt_b)
    }
}

fn pick<'a>(filled: &'a str, raw: &'a str) -> &'a str {
    if filled.is_empty() { raw } else { filled }
}

/// Outputs of both models for one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationOutputs {
    pub model_a: String,
    pub output_a: String,
    pub model_b: String,
    pub output_b: String,
}

/// Critique of model B's output relative to model A's
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Bullet-point differences
    pub feedback: String,
    /// Bullet-point advice for bringing B closer to A
    pub recommendation: String,
}

impl Evaluation {
    /// Feedback followed by the recommendation wrapped in its tag
    ///
    /// This is the form fed back into the reviser, which picks the
    /// recommendation out again.
    pub fn render(&self) -> String {
        format!(
            "{}\n<recommendation>{}</recommendation>",
            self.feedback, self.recommendation
        )
    }
}

/// One pass of the evaluate/critique/revise cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentRound {
    pub round: usize,
    pub prompt_b: String,
    pub outputs: InvocationOutputs,
    pub evaluation: Evaluation,
    pub revised_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_prompt_takes_precedence() {
        let invocation = Invocation {
            prompt_a: "Summarize {text}".to_string(),
            filled_a: "Summarize hello".to_string(),
            prompt_b: "Summarize {text}".to_string(),
            filled_b: String::new(),
        };

        assert_eq!(invocation.effective_a(), "Summarize hello");
        assert_eq!(invocation.effective_b(), "Summarize {text}");
    }

    #[test]
    fn test_evaluation_render() {
        let evaluation = Evaluation {
            feedback: "- B is shorter".to_string(),
            recommendation: "- add detail".to_string(),
        };

        assert_eq!(
            evaluation.render(),
            "- B is shorter\n<recommendation>- add detail</recommendation>"
        );
    }
}
