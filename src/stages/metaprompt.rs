use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::llm::{extract_template, extract_variables, ChatClient, ChatParams, TASK_PLACEHOLDER};
use crate::models::{ChatMessage, Expansion};

/// Configuration for the meta-prompt expander
#[derive(Debug, Clone)]
pub struct MetaPromptConfig {
    /// Model that writes the template
    pub model: String,
    /// Sampling parameters
    pub params: ChatParams,
}

impl Default for MetaPromptConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            params: ChatParams::new(0.0, 4096),
        }
    }
}

/// Expand a task description into an instruction template
///
/// `variables` holds one variable name per line; blank lines are ignored.
/// The model is primed with the `<Inputs>` section so it only has to plan
/// the structure and write the `<Instructions>` block.
pub async fn expand(
    client: &ChatClient,
    metaprompt: &str,
    task: &str,
    variables: &str,
    config: &MetaPromptConfig,
) -> Result<Expansion> {
    let prompt = metaprompt.replace(TASK_PLACEHOLDER, task);
    let prefill = build_prefill(variables);

    info!(
        "Expanding task ({} chars) with {}",
        task.len(),
        config.model
    );
    debug!("Prefill: {:?}", prefill);

    let messages = [ChatMessage::user(prompt), ChatMessage::assistant(prefill)];
    let response = client
        .chat(&config.model, &messages, config.params)
        .await
        .context("Meta-prompt request failed")?;

    let template =
        extract_template(&response).context("Meta-prompt response had no instructions")?;
    let variables: Vec<String> = extract_variables(&response).into_iter().collect();

    info!(
        "Template: {} chars, {} variables",
        template.len(),
        variables.len()
    );

    Ok(Expansion {
        template,
        variables,
    })
}

/// Assistant prefill listing the requested input variables
fn build_prefill(variables: &str) -> String {
    let variable_block: String = variables
        .split('\n')
        .filter(|v| !v.is_empty())
        .map(|v| format!("\n{{${}}}", v.to_uppercase()))
        .collect();

    let mut prefill = "<Inputs>".to_string();
    if !variable_block.is_empty() {
        prefill.push_str(&variable_block);
        prefill.push_str("\n</Inputs>\n<Instructions Structure>");
    }
    prefill
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefill_without_variables() {
        assert_eq!(build_prefill(""), "<Inputs>");
        assert_eq!(build_prefill("\n\n"), "<Inputs>");
    }

    #[test]
    fn test_prefill_with_variables() {
        assert_eq!(
            build_prefill("customer_complaint\n\ncompany_name"),
            "<Inputs>\n{$CUSTOMER_COMPLAINT}\n{$COMPANY_NAME}\n</Inputs>\n<Instructions Structure>"
        );
    }

    #[test]
    fn test_metaprompt_config_default() {
        let config = MetaPromptConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.params.temperature, Some(0.0));
    }
}
