use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{AlignmentRound, Evaluation, Expansion, InvocationOutputs, Tournament};

/// Result of one command, renderable as text or JSON
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: ReportBody,
}

/// Command-specific payload
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportBody {
    Expansion(Expansion),
    Tournament(Tournament),
    Invocation(InvocationOutputs),
    Evaluation {
        feedback: String,
        recommendation: String,
        rendered: String,
    },
    Revision {
        revised_prompt: String,
    },
    Alignment {
        rounds: Vec<AlignmentRound>,
    },
    Fill {
        prompt: String,
    },
    Models {
        models: Vec<String>,
    },
}

impl Report {
    pub fn new(body: ReportBody) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            body,
        }
    }

    pub fn evaluation(evaluation: Evaluation) -> Self {
        let rendered = evaluation.render();
        Self::new(ReportBody::Evaluation {
            feedback: evaluation.feedback,
            recommendation: evaluation.recommendation,
            rendered,
        })
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }

    /// Render as plain text for the terminal
    pub fn to_text(&self) -> String {
        match &self.body {
            ReportBody::Expansion(expansion) => {
                let mut out = section("Prompt Template", &expansion.template);
                out.push_str(&section("Variables", &expansion.variables_text()));
                out
            }
            ReportBody::Tournament(tournament) => {
                if tournament.candidates.len() == 1 {
                    return section("Rewritten Prompt", &tournament.candidates[0]);
                }
                let mut out = String::new();
                for (i, candidate) in tournament.candidates.iter().enumerate() {
                    let mark = if tournament.is_winner(i) { "Y" } else { "N" };
                    out.push_str(&section(&format!("Candidate #{} {}", i + 1, mark), candidate));
                }
                if tournament.winner.is_none() {
                    out.push_str("(judge gave no usable verdict)\n");
                }
                out
            }
            ReportBody::Invocation(outputs) => {
                let mut out = section(&format!("Model A: {}", outputs.model_a), &outputs.output_a);
                out.push_str(&section(
                    &format!("Model B: {}", outputs.model_b),
                    &outputs.output_b,
                ));
                out
            }
            ReportBody::Evaluation { rendered, .. } => section("Evaluation", rendered),
            ReportBody::Revision { revised_prompt } => section("Revised Prompt", revised_prompt),
            ReportBody::Alignment { rounds } => {
                let mut out = String::new();
                for round in rounds {
                    out.push_str(&format!("===== Round {} =====\n\n", round.round));
                    out.push_str(&section("Prompt B", &round.prompt_b));
                    out.push_str(&section(
                        &format!("Output A ({})", round.outputs.model_a),
                        &round.outputs.output_a,
                    ));
                    out.push_str(&section(
                        &format!("Output B ({})", round.outputs.model_b),
                        &round.outputs.output_b,
                    ));
                    out.push_str(&section("Evaluation", &round.evaluation.render()));
                    out.push_str(&section("Revised Prompt", &round.revised_prompt));
                }
                out
            }
            ReportBody::Fill { prompt } => format!("{}\n", prompt),
            ReportBody::Models { models } => {
                let mut out = models.join("\n");
                out.push('\n');
                out
            }
        }
    }

    /// Print to stdout, or write to `path` when given
    pub fn emit(&self, json: bool, path: Option<&Path>) -> Result<()> {
        let rendered = if json {
            let mut s = self.to_json()?;
            s.push('\n');
            s
        } else {
            self.to_text()
        };

        match path {
            Some(path) => {
                let mut file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create file: {:?}", path))?;
                write!(file, "{}", rendered)?;
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                write!(stdout, "{}", rendered)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

/// A titled block with a dashed underline
fn section(title: &str, body: &str) -> String {
    format!(
        "{}\n{}\n{}\n\n",
        title,
        "-".repeat(title.chars().count()),
        body.trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section() {
        assert_eq!(section("Title", "body\n"), "Title\n-----\nbody\n\n");
    }

    #[test]
    fn test_tournament_text_marks_winner() {
        let report = Report::new(ReportBody::Tournament(Tournament {
            candidates: vec!["one".to_string(), "two".to_string()],
            winner: Some(1),
        }));
        let text = report.to_text();

        assert!(text.contains("Candidate #1 N\n"));
        assert!(text.contains("Candidate #2 Y\n"));
    }

    #[test]
    fn test_tournament_text_without_verdict() {
        let report = Report::new(ReportBody::Tournament(Tournament {
            candidates: vec!["one".to_string(), "two".to_string()],
            winner: None,
        }));
        assert!(report.to_text().contains("no usable verdict"));
    }

    #[test]
    fn test_json_carries_kind_and_run_id() {
        let report = Report::new(ReportBody::Revision {
            revised_prompt: "better".to_string(),
        });
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["kind"], "revision");
        assert_eq!(value["revised_prompt"], "better");
        assert!(value["run_id"].is_string());
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_evaluation_json_flattens_fields() {
        let report = Report::evaluation(Evaluation {
            feedback: "- diff".to_string(),
            recommendation: "- fix".to_string(),
        });
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["kind"], "evaluation");
        assert_eq!(value["feedback"], "- diff");
        assert_eq!(value["recommendation"], "- fix");
        assert_eq!(value["rendered"], "- diff\n<recommendation>- fix</recommendation>");
    }

    #[test]
    fn test_emit_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let report = Report::new(ReportBody::Fill {
            prompt: "Hello Ada".to_string(),
        });

        report.emit(false, Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Hello Ada\n");
    }
}
