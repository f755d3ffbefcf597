use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::llm::{
    build_evaluation_prompt, build_revision_prompt, extract_sections, first_section, ChatClient,
    ChatParams, DEFAULT_SYSTEM_PROMPT,
};
use crate::models::{AlignmentRound, ChatMessage, Evaluation, Invocation, InvocationOutputs};

/// Configuration for the alignment loop
#[derive(Debug, Clone)]
pub struct AlignmentConfig {
    /// Reference model whose output is the target
    pub model_a: String,
    /// Model whose prompt is being tuned
    pub model_b: String,
    /// Model that critiques and revises
    pub eval_model: String,
    /// System message sent with every executed instruction
    pub system_prompt: String,
    /// Sampling parameters for executed instructions
    pub params: ChatParams,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            model_a: "gpt-4o".to_string(),
            model_b: "gpt-4o-mini".to_string(),
            eval_model: "gpt-4o".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            params: ChatParams::default(),
        }
    }
}

/// Which side of the comparison a streamed fragment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// Substitute `{key}` placeholders from a `key:value;key:value` string
///
/// Pairs without a colon are skipped. Only the first colon splits, so values
/// may contain colons. Keys and values are used as written.
pub fn insert_kv(prompt: &str, kv: &str) -> String {
    kv.split(';')
        .filter_map(|pair| pair.split_once(':'))
        .fold(prompt.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{}}}", key), value)
        })
}

/// Run the instruction against model A, then model B
pub async fn invoke(
    client: &ChatClient,
    invocation: &Invocation,
    config: &AlignmentConfig,
) -> Result<InvocationOutputs> {
    let messages_a = execution_messages(config, invocation.effective_a());
    let messages_b = execution_messages(config, invocation.effective_b());

    info!("Invoking {} and {}", config.model_a, config.model_b);

    let output_a = client
        .chat(&config.model_a, &messages_a, config.params)
        .await
        .with_context(|| format!("Model A ({}) request failed", config.model_a))?;
    let output_b = client
        .chat(&config.model_b, &messages_b, config.params)
        .await
        .with_context(|| format!("Model B ({}) request failed", config.model_b))?;

    debug!(
        "Outputs: A {} chars, B {} chars",
        output_a.len(),
        output_b.len()
    );

    Ok(InvocationOutputs {
        model_a: config.model_a.clone(),
        output_a,
        model_b: config.model_b.clone(),
        output_b,
    })
}

/// Run the instruction against both models, streaming each answer in turn
pub async fn invoke_stream<F>(
    client: &ChatClient,
    invocation: &Invocation,
    config: &AlignmentConfig,
    mut on_delta: F,
) -> Result<InvocationOutputs>
where
    F: FnMut(Side, &str),
{
    let messages_a = execution_messages(config, invocation.effective_a());
    let output_a = client
        .chat_stream(&config.model_a, &messages_a, config.params, |d| {
            on_delta(Side::A, d)
        })
        .await
        .with_context(|| format!("Model A ({}) stream failed", config.model_a))?;

    let messages_b = execution_messages(config, invocation.effective_b());
    let output_b = client
        .chat_stream(&config.model_b, &messages_b, config.params, |d| {
            on_delta(Side::B, d)
        })
        .await
        .with_context(|| format!("Model B ({}) stream failed", config.model_b))?;

    Ok(InvocationOutputs {
        model_a: config.model_a.clone(),
        output_a,
        model_b: config.model_b.clone(),
        output_b,
    })
}

/// Have the evaluation model describe how B's output differs from A's
pub async fn evaluate(
    client: &ChatClient,
    output_a: &str,
    output_b: &str,
    config: &AlignmentConfig,
) -> Result<Evaluation> {
    let prompt = build_evaluation_prompt(output_a, output_b);
    let messages = execution_messages(config, &prompt);

    info!("Evaluating outputs with {}", config.eval_model);

    let response = client
        .chat(&config.eval_model, &messages, ChatParams::default())
        .await
        .context("Evaluation request failed")?;

    let feedback = first_section("auto_feedback", &response)
        .context("Evaluation response missing feedback")?;
    let recommendation = first_section("recommendation", &response)
        .context("Evaluation response missing recommendation")?;

    Ok(Evaluation {
        feedback,
        recommendation,
    })
}

/// Have the evaluation model lightly revise model B's prompt
///
/// When `feedback` carries a `<recommendation>` block only that block is
/// passed on.
pub async fn revise(
    client: &ChatClient,
    feedback: &str,
    prompt: &str,
    output_a: &str,
    output_b: &str,
    config: &AlignmentConfig,
) -> Result<String> {
    let feedback = extract_sections("recommendation", feedback)
        .into_iter()
        .next()
        .unwrap_or_else(|| feedback.to_string());

    let request = build_revision_prompt(prompt, output_a, output_b, &feedback);
    let messages = execution_messages(config, &request);

    info!("Revising prompt ({} chars) with {}", prompt.len(), config.eval_model);

    let response = client
        .chat(&config.eval_model, &messages, ChatParams::default())
        .await
        .context("Revision request failed")?;

    let revised = first_section("revised_prompt", &response)
        .context("Revision response missing revised prompt")?;
    Ok(revised.trim().to_string())
}

/// Run invoke, evaluate and revise `rounds` times
///
/// Model A's prompt stays fixed; model B's prompt is replaced by each
/// revision before the next round.
pub async fn align(
    client: &ChatClient,
    prompt_a: &str,
    prompt_b: &str,
    rounds: usize,
    config: &AlignmentConfig,
) -> Result<Vec<AlignmentRound>> {
    let mut history = Vec::with_capacity(rounds);
    let mut current_b = prompt_b.to_string();

    for round in 1..=rounds {
        info!("Alignment round {} of {}", round, rounds);

        let invocation = Invocation {
            prompt_a: prompt_a.to_string(),
            prompt_b: current_b.clone(),
            ..Default::default()
        };
        let outputs = invoke(client, &invocation, config).await?;
        let evaluation = evaluate(client, &outputs.output_a, &outputs.output_b, config).await?;
        let revised_prompt = revise(
            client,
            &evaluation.render(),
            &current_b,
            &outputs.output_a,
            &outputs.output_b,
            config,
        )
        .await?;

        history.push(AlignmentRound {
            round,
            prompt_b: std::mem::replace(&mut current_b, revised_prompt.clone()),
            outputs,
            evaluation,
            revised_prompt,
        });
    }

    Ok(history)
}

fn execution_messages(config: &AlignmentConfig, prompt: &str) -> [ChatMessage; 2] {
    [
        ChatMessage::system(config.system_prompt.as_str()),
        ChatMessage::user(prompt),
    ]
}
