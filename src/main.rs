use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use promptsmith::io::{read_or_default, ReportBody};
use promptsmith::llm::{INSTRUCTION_GUIDE, METAPROMPT};
use promptsmith::{
    align, evaluate, expand, insert_kv, invoke, invoke_stream, read_text, revise, tournament,
    AlignmentConfig, ChatClient, ClientConfig, Invocation, JudgeConfig, MetaPromptConfig, Report,
    RewriteConfig, RewriteLanguage,
};

#[derive(Parser)]
#[command(name = "promptsmith")]
#[command(author, version, about = "Rewrite, judge and align LLM prompts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand
#[derive(Args)]
struct CommonArgs {
    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Write the result to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

// Text arguments accept literal text, a file path, @path, or - for stdin.
#[derive(Subcommand)]
enum Commands {
    /// Expand a task description into a structured prompt template
    Metaprompt {
        /// Task description
        #[arg(short, long)]
        task: String,

        /// Input variable names, one per line
        #[arg(long, default_value = "")]
        variables: String,

        /// Model that writes the template
        #[arg(long, default_value = "gpt-4o")]
        model: String,

        /// Replace the built-in meta-prompt (must contain {{TASK}})
        #[arg(long)]
        metaprompt_file: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Rewrite a prompt following the instruction guide
    Rewrite {
        /// The prompt to rewrite
        #[arg(short, long)]
        prompt: String,

        /// Number of candidates to generate; more than one runs the judge
        #[arg(long, default_value = "1")]
        candidates: usize,

        /// Model that rewrites
        #[arg(long, default_value = "gpt-4o")]
        model: String,

        /// Model that picks the best candidate
        #[arg(long, default_value = "gpt-4o")]
        judge_model: String,

        /// Language of the rewritten prompt
        #[arg(long, value_enum, default_value_t = RewriteLanguage::English)]
        lang: RewriteLanguage,

        /// Replace the built-in instruction guide
        #[arg(long)]
        guide_file: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Run prompts against two models side by side
    Invoke {
        /// Prompt for model A
        #[arg(long)]
        prompt_a: String,

        /// Prompt for model B (defaults to prompt A)
        #[arg(long)]
        prompt_b: Option<String>,

        /// Placeholder values for prompt A, as key:value;key:value
        #[arg(long, default_value = "")]
        fill_a: String,

        /// Placeholder values for prompt B, as key:value;key:value
        #[arg(long, default_value = "")]
        fill_b: String,

        /// Reference model
        #[arg(long, default_value = "gpt-4o")]
        model_a: String,

        /// Model being tuned
        #[arg(long, default_value = "gpt-4o-mini")]
        model_b: String,

        /// Stream answers to stderr as they arrive
        #[arg(long)]
        stream: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Critique how output B differs from output A
    Evaluate {
        /// Output of the reference model
        #[arg(long)]
        output_a: String,

        /// Output of the model being tuned
        #[arg(long)]
        output_b: String,

        /// Model that critiques
        #[arg(long, default_value = "gpt-4o")]
        model: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Revise model B's prompt from feedback
    Revise {
        /// Model B's current prompt
        #[arg(short, long)]
        prompt: String,

        /// Output of the reference model
        #[arg(long)]
        output_a: String,

        /// Output of the model being tuned
        #[arg(long)]
        output_b: String,

        /// Human or evaluation feedback
        #[arg(long)]
        feedback: String,

        /// Model that revises
        #[arg(long, default_value = "gpt-4o")]
        model: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Run the invoke, evaluate, revise loop end to end
    Align {
        /// Prompt for model A
        #[arg(short, long)]
        prompt: String,

        /// Starting prompt for model B (defaults to the model A prompt)
        #[arg(long)]
        prompt_b: Option<String>,

        /// Reference model
        #[arg(long, default_value = "gpt-4o")]
        model_a: String,

        /// Model being tuned
        #[arg(long, default_value = "gpt-4o-mini")]
        model_b: String,

        /// Model that critiques and revises
        #[arg(long, default_value = "gpt-4o")]
        eval_model: String,

        /// Number of rounds
        #[arg(long, default_value = "1")]
        rounds: usize,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Substitute placeholder values into a prompt (no API call)
    Fill {
        /// Prompt containing {key} placeholders
        #[arg(short, long)]
        prompt: String,

        /// Values as key:value;key:value
        #[arg(long)]
        kv: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List the models the endpoint serves
    Models {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Metaprompt {
            task,
            variables,
            model,
            metaprompt_file,
            common,
        } => {
            setup_logging(common.verbose);
            let metaprompt = read_or_default(metaprompt_file.as_deref(), METAPROMPT)?;
            let config = MetaPromptConfig {
                model,
                ..Default::default()
            };
            let client = build_client()?;
            let expansion = expand(
                &client,
                &metaprompt,
                &read_text(&task)?,
                &read_text(&variables)?,
                &config,
            )
            .await?;
            emit(Report::new(ReportBody::Expansion(expansion)), &common)
        }
        Commands::Rewrite {
            prompt,
            candidates,
            model,
            judge_model,
            lang,
            guide_file,
            common,
        } => {
            setup_logging(common.verbose);
            let guide = read_or_default(guide_file.as_deref(), INSTRUCTION_GUIDE)?;
            let rewrite_config = RewriteConfig {
                model,
                language: lang,
                ..Default::default()
            };
            let judge_config = JudgeConfig {
                model: judge_model,
                ..Default::default()
            };
            let client = build_client()?;
            let result = tournament(
                &client,
                &guide,
                &read_text(&prompt)?,
                candidates,
                &rewrite_config,
                &judge_config,
            )
            .await?;
            emit(Report::new(ReportBody::Tournament(result)), &common)
        }
        Commands::Invoke {
            prompt_a,
            prompt_b,
            fill_a,
            fill_b,
            model_a,
            model_b,
            stream,
            common,
        } => {
            setup_logging(common.verbose);
            let prompt_a = read_text(&prompt_a)?;
            let prompt_b = match prompt_b {
                Some(p) => read_text(&p)?,
                None => prompt_a.clone(),
            };
            let invocation = Invocation {
                filled_a: fill_prompt(&prompt_a, &fill_a),
                filled_b: fill_prompt(&prompt_b, &fill_b),
                prompt_a,
                prompt_b,
            };
            let config = AlignmentConfig {
                model_a,
                model_b,
                ..Default::default()
            };
            let client = build_client()?;

            let outputs = if stream {
                let mut last = None;
                let outputs = invoke_stream(&client, &invocation, &config, |side, delta| {
                    let mut stderr = std::io::stderr().lock();
                    if last != Some(side) {
                        let _ = writeln!(stderr, "\n--- model {:?} ---", side);
                        last = Some(side);
                    }
                    let _ = write!(stderr, "{}", delta);
                    let _ = stderr.flush();
                })
                .await?;
                eprintln!();
                outputs
            } else {
                invoke(&client, &invocation, &config).await?
            };
            emit(Report::new(ReportBody::Invocation(outputs)), &common)
        }
        Commands::Evaluate {
            output_a,
            output_b,
            model,
            common,
        } => {
            setup_logging(common.verbose);
            let config = AlignmentConfig {
                eval_model: model,
                ..Default::default()
            };
            let client = build_client()?;
            let evaluation = evaluate(
                &client,
                &read_text(&output_a)?,
                &read_text(&output_b)?,
                &config,
            )
            .await?;
            emit(Report::evaluation(evaluation), &common)
        }
        Commands::Revise {
            prompt,
            output_a,
            output_b,
            feedback,
            model,
            common,
        } => {
            setup_logging(common.verbose);
            let config = AlignmentConfig {
                eval_model: model,
                ..Default::default()
            };
            let client = build_client()?;
            let revised_prompt = revise(
                &client,
                &read_text(&feedback)?,
                &read_text(&prompt)?,
                &read_text(&output_a)?,
                &read_text(&output_b)?,
                &config,
            )
            .await?;
            emit(
                Report::new(ReportBody::Revision { revised_prompt }),
                &common,
            )
        }
        Commands::Align {
            prompt,
            prompt_b,
            model_a,
            model_b,
            eval_model,
            rounds,
            common,
        } => {
            setup_logging(common.verbose);
            anyhow::ensure!(rounds > 0, "--rounds must be at least 1");
            let prompt_a = read_text(&prompt)?;
            let prompt_b = match prompt_b {
                Some(p) => read_text(&p)?,
                None => prompt_a.clone(),
            };
            let config = AlignmentConfig {
                model_a,
                model_b,
                eval_model,
                ..Default::default()
            };
            let client = build_client()?;
            let rounds = align(&client, &prompt_a, &prompt_b, rounds, &config).await?;
            if let Some(last) = rounds.last() {
                info!("Final prompt B: {} chars", last.revised_prompt.len());
            }
            emit(Report::new(ReportBody::Alignment { rounds }), &common)
        }
        Commands::Fill {
            prompt,
            kv,
            common,
        } => {
            setup_logging(common.verbose);
            let prompt = insert_kv(&read_text(&prompt)?, &kv);
            emit(Report::new(ReportBody::Fill { prompt }), &common)
        }
        Commands::Models { common } => {
            setup_logging(common.verbose);
            let client = build_client()?;
            let mut models = client
                .list_models()
                .await
                .context("Failed to list models")?;
            models.sort();
            emit(Report::new(ReportBody::Models { models }), &common)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn build_client() -> Result<ChatClient> {
    let config = ClientConfig::from_env()?;
    info!("Using endpoint {}", config.base_url);
    ChatClient::new(config)
}

fn fill_prompt(prompt: &str, kv: &str) -> String {
    if kv.is_empty() {
        String::new()
    } else {
        insert_kv(prompt, kv)
    }
}

fn emit(report: Report, common: &CommonArgs) -> Result<()> {
    report.emit(common.json, common.output.as_deref())?;
    if let Some(path) = &common.output {
        info!("Output written to {:?}", path);
    }
    Ok(())
}
