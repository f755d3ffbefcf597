use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::llm::{
    build_rewrite_prompt, extract_rewritten, ChatClient, ChatParams, RewriteLanguage, REWRITE_OPEN,
};
use crate::models::ChatMessage;

/// Configuration for the guide-based rewriter
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Model that performs the rewrite
    pub model: String,
    /// Sampling parameters
    pub params: ChatParams,
    /// Language of the rewritten instruction
    pub language: RewriteLanguage,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            params: ChatParams::new(0.8, 4096),
            language: RewriteLanguage::English,
        }
    }
}

/// Rewrite a draft instruction following the guide
///
/// The guide, the rules and a worked example go in the system message; the
/// user turn is just the opening sentinel so the model answers inside it.
pub async fn rewrite(
    client: &ChatClient,
    guide: &str,
    initial: &str,
    config: &RewriteConfig,
) -> Result<String> {
    let system = build_rewrite_prompt(guide, initial, config.language);
    let messages = [ChatMessage::system(system), ChatMessage::user(REWRITE_OPEN)];

    info!(
        "Rewriting instruction ({} chars) with {}",
        initial.len(),
        config.model
    );

    let response = client
        .chat(&config.model, &messages, config.params)
        .await
        .context("Rewrite request failed")?;
    debug!("Rewrite response: {} chars", response.len());

    let rewritten = extract_rewritten(&response);
    info!("Rewritten instruction: {} chars", rewritten.len());
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_config_default() {
        let config = RewriteConfig::default();
        assert_eq!(config.params.temperature, Some(0.8));
        assert_eq!(config.params.max_tokens, Some(4096));
        assert_eq!(config.language, RewriteLanguage::English);
    }
}
