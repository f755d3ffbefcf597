use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::llm::{build_judge_prompt, parse_verdict, ChatClient, ChatParams};
use crate::models::{ChatMessage, Tournament};
use crate::stages::rewrite::{rewrite, RewriteConfig};

/// Configuration for the candidate judge
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Model that picks the winner
    pub model: String,
    /// Sampling parameters
    pub params: ChatParams,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            params: ChatParams::new(0.1, 128),
        }
    }
}

/// Ask the judge model which candidate best follows the guide
///
/// Returns the zero-based index of the winner. An answer that cannot be
/// parsed, or names a candidate that does not exist, yields `None`.
pub async fn judge(
    client: &ChatClient,
    guide: &str,
    candidates: &[String],
    config: &JudgeConfig,
) -> Result<Option<usize>> {
    if candidates.is_empty() {
        return Ok(None);
    }

    let prompt = build_judge_prompt(guide, candidates);
    let messages = [ChatMessage::user(prompt), ChatMessage::assistant("{")];

    info!(
        "Judging {} candidates with {}",
        candidates.len(),
        config.model
    );

    let response = client
        .chat(&config.model, &messages, config.params)
        .await
        .context("Judge request failed")?;

    let verdict = parse_verdict(&response, candidates.len());
    match verdict {
        Some(index) => info!("Judge prefers candidate {}", index + 1),
        None => warn!("Judge answer not usable: {:?}", response),
    }
    Ok(verdict)
}

/// Generate `count` rewrites and have the judge pick one
///
/// With a single candidate the judge is skipped and that candidate wins.
pub async fn tournament(
    client: &ChatClient,
    guide: &str,
    initial: &str,
    count: usize,
    rewrite_config: &RewriteConfig,
    judge_config: &JudgeConfig,
) -> Result<Tournament> {
    anyhow::ensure!(count > 0, "At least one candidate is required");

    let mut candidates = Vec::with_capacity(count);
    for i in 0..count {
        info!("Generating candidate {} of {}", i + 1, count);
        let candidate = rewrite(client, guide, initial, rewrite_config)
            .await
            .with_context(|| format!("Failed to generate candidate {}", i + 1))?;
        candidates.push(candidate);
    }

    if count == 1 {
        return Ok(Tournament::single(candidates.remove(0)));
    }

    let winner = judge(client, guide, &candidates, judge_config).await?;
    Ok(Tournament { candidates, winner })
}
