use serde::{Deserialize, Serialize};

use crate::llm::extract::{REWRITE_CLOSE, REWRITE_OPEN};

/// Meta-prompt used to expand a task into an instruction template.
/// Contains a `{{TASK}}` placeholder.
pub const METAPROMPT: &str = include_str!("../../assets/metaprompt.txt");

/// Style guide the rewriter and the judge both work from
pub const INSTRUCTION_GUIDE: &str = include_str!("../../assets/instruction_guide.md");

/// Placeholder in the meta-prompt replaced by the operator's task
pub const TASK_PLACEHOLDER: &str = "{{TASK}}";

/// System prompt both models get when an instruction is executed
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful and knowledgeable assistant who is able to provide detailed and accurate information on a wide range of topics. You are also able to provide clear and concise answers to questions and are always willing to go the extra mile to help others.";

/// Language the rewriter should answer in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RewriteLanguage {
    #[default]
    English,
    Chinese,
    SameAsInput,
}

impl RewriteLanguage {
    pub fn instruction(self) -> &'static str {
        match self {
            RewriteLanguage::English => "Please use English for rewriting.",
            RewriteLanguage::Chinese => {
                "Please use Chinese for rewriting. The xml tag name is still in English."
            }
            RewriteLanguage::SameAsInput => {
                "Please use same language as the initial instruction for rewriting. The xml tag name is still in English."
            }
        }
    }
}

const REWRITE_ROLE: &str = "You are an instruction engineer. Your task is to rewrite the initial instruction in <initial_instruction></initial_instruction> xml tag based on the suggestions in the instruction guide in <instruction_guide></instruction_guide> xml tag.
This instruction is then sent to an LLM to get the expected output.";

const REWRITE_TEMPLATE: &str = r#"{role}

<instruction_guide>
{guide}
</instruction_guide>

{role}

Here are some important rules for rewrite:
1. Something like `{{variable}}` is customizable text that will be replaced when sent to the LLM. It needs to be retained in the rewrite.
2. {lang_prompt}
3. Only output the rewritten instruction and return it in {open}{close} XML tags
4. If examples are already included in the initial prompt, do not remove the examples after the rewrite.

{role}

Example:
<initial_instruction>
You are a research assistant. You will answer the following question based on the document in triple quotes, if the question cannot be answered please output "Cannot answer the question from the document"
```
{{full_text}}
```
You will also need to find the original quote from the document that is most relevant to answering the question. If there is no relevant citation, output "No relevant quotes".
Your output should start by listing all the quotes, putting one quote per line and starting with a numerical index. Then answer the question by adding the index of the quote where it is needed.

The question is:
{{question}}
</initial_instruction>

{open}
You are an expert research assistant. Here is a document you will answer questions about:
<doc>
{{full_text}}
</doc>

First, find the quotes from the document that are most relevant to answering the question, and then print them in numbered order. Quotes should be relatively short.

If there are no relevant quotes, write "No relevant quotes" instead.

Then, answer the question, starting with "Answer:". Do not include or reference quoted content verbatim in the answer. Don't say "According to Quote [1]" when answering. Instead make references to quotes relevant to each section of the answer solely by adding their bracketed numbers at the end of relevant sentences.

Thus, the format of your overall response should look like what's shown between the <example></example> tags. Make sure to follow the formatting and spacing exactly.
<example>
Quotes:
[1] "Company X reported revenue of $12 million in 2021."
[2] "Almost 90% of revenue came from widget sales, with gadget sales making up the remaining 10%."

Answer:
Company X earned $12 million. [1] Almost 90% of it was from widget sales. [2]
</example>

If the question cannot be answered by the document, say "Cannot answer the question from the document".

<question>
{{question}}
</question>
{close}

<initial_instruction>
{initial}
</initial_instruction>"#;

const JUDGE_ROLE: &str = "You are an instruction engineer. Your task is to evaluate which of the instructions given below is better based on guide in <guide> xml tag.";

const JUDGE_TEMPLATE: &str = r#"{role}

Instruction guide:
<guide>
{guide}
</guide>

{role}

{instruction_prompts}

Use JSON format when returning results. Please only output the result in json format, and do the json format check and return, don't include other extra text! An example of output is as follows:
{example}"#;

const EVALUATION_TEMPLATE: &str = r#"You are an expert in linguistics and able to observe subtle differences in content between two paragraphs. Your task is to analyze responses from two models, model A and model B, and provide detailed feedback.

Here is the model A response:
<response>
{output_a}
</response>

Here is the model B response:
<response>
{output_b}
</response>

Please follow these steps:
1. Carefully analyze both responses in terms of content accuracy, logical organization, and expression style.
2. Summarize the differences between the model B response and the model A response.
3. Provide recommendations on how the model B response could be refactored to better align with the model A response.
4. Encapsulate your analysis, including the differences, within <auto_feedback></auto_feedback> tags using bullet points.
5. Encapsulate recommendations, within <recommendation></recommendation> tags using bullet points."#;

const REVISION_TEMPLATE: &str = r#"You are an expert in prompt engineering for multiple LLM families and able to follow human feedback to adjust a prompt to attain the optimal effect. You will be given the original model B prompt, the responses from model A and model B, and human feedback, and you will revise the model B prompt.

Here is the original model B prompt:
<prompt>
{prompt}
</prompt>

Here is the model A response:
<response>
{output_a}
</response>

Here is the model B response:
<response>
{output_b}
</response>

Here is the human feedback:
<evaluation_summary>
{feedback}
</evaluation_summary>

Please analyze whether model B's response strictly aligns with model A's response based on the human feedback. Then, consider how the original model B prompt can be improved accordingly. Your revised prompt should only involve slight adjustments and must not drastically change the original prompt. Use the human feedback to guide your revision.

Finally, provide the revised prompt within the following XML tags:

<revised_prompt>
[Your revised prompt]
</revised_prompt>"#;

/// Build the system prompt for the guide-based rewriter
pub fn build_rewrite_prompt(guide: &str, initial: &str, language: RewriteLanguage) -> String {
    render(
        REWRITE_TEMPLATE,
        &[
            ("role", REWRITE_ROLE),
            ("guide", guide),
            ("lang_prompt", language.instruction()),
            ("open", REWRITE_OPEN),
            ("close", REWRITE_CLOSE),
            ("initial", initial),
        ],
    )
}

/// Build the judge prompt listing every candidate
pub fn build_judge_prompt(guide: &str, candidates: &[String]) -> String {
    let instruction_prompts = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("Instruction {}:\n<instruction>\n{}\n</instruction>", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n\n");
    let example = serde_json::json!({ "Preferred": "Instruction 1" }).to_string();

    render(
        JUDGE_TEMPLATE,
        &[
            ("role", JUDGE_ROLE),
            ("guide", guide),
            ("instruction_prompts", &instruction_prompts),
            ("example", &example),
        ],
    )
}

/// Build the critique prompt comparing model B's output to model A's
pub fn build_evaluation_prompt(output_a: &str, output_b: &str) -> String {
    render(
        EVALUATION_TEMPLATE,
        &[("output_a", output_a), ("output_b", output_b)],
    )
}

/// Build the prompt asking for a lightly revised model B prompt
pub fn build_revision_prompt(
    prompt: &str,
    output_a: &str,
    output_b: &str,
    feedback: &str,
) -> String {
    render(
        REVISION_TEMPLATE,
        &[
            ("prompt", prompt),
            ("output_a", output_a),
            ("output_b", output_b),
            ("feedback", feedback),
        ],
    )
}

/// Substitute `{name}` slots in a single pass
///
/// `{{` and `}}` collapse to literal braces, so templates can show
/// `{{variable}}` placeholders. Substituted values are never rescanned.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(after) = rest.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = rest.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if let Some((value, after)) = vars.iter().find_map(|(name, value)| {
            rest.strip_prefix('{')
                .and_then(|r| r.strip_prefix(*name))
                .and_then(|r| r.strip_prefix('}'))
                .map(|after| (*value, after))
        }) {
            out.push_str(value);
            rest = after;
        } else {
            out.push_str(&rest[..1]);
            rest = &rest[1..];
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_pass() {
        let out = render("{a} and {b}", &[("a", "{b}"), ("b", "B")]);
        assert_eq!(out, "{b} and B");
    }

    #[test]
    fn test_render_escapes_and_unknown_slots() {
        let out = render("keep {{variable}} and {unknown}", &[("a", "x")]);
        assert_eq!(out, "keep {variable} and {unknown}");
    }

    #[test]
    fn test_metaprompt_has_task_slot() {
        assert!(METAPROMPT.contains(TASK_PLACEHOLDER));
        assert!(METAPROMPT.contains("<Instructions>"));
    }

    #[test]
    fn test_rewrite_prompt() {
        let prompt = build_rewrite_prompt("GUIDE", "Summarize {{text}}", RewriteLanguage::Chinese);

        assert!(prompt.contains("<instruction_guide>\nGUIDE\n</instruction_guide>"));
        assert!(prompt.contains("<initial_instruction>\nSummarize {{text}}\n</initial_instruction>"));
        assert!(prompt.contains("Please use Chinese for rewriting."));
        assert!(prompt.contains("`{variable}`"));
        assert!(prompt.contains("{full_text}"));
        assert!(prompt.contains(REWRITE_OPEN));
        assert!(!prompt.contains("{role}"));
    }

    #[test]
    fn test_judge_prompt_numbers_candidates() {
        let candidates = vec!["first".to_string(), "second".to_string()];
        let prompt = build_judge_prompt("GUIDE", &candidates);

        assert!(prompt.contains("Instruction 1:\n<instruction>\nfirst\n</instruction>"));
        assert!(prompt.contains(
            "</instruction>\n\nInstruction 2:\n<instruction>\nsecond\n</instruction>"
        ));
        assert!(prompt.contains(r#"{"Preferred":"Instruction 1"}"#));
    }

    #[test]
    fn test_evaluation_prompt_keeps_output_braces() {
        let prompt = build_evaluation_prompt("A {x}", "B }}");
        assert!(prompt.contains("<response>\nA {x}\n</response>"));
        assert!(prompt.contains("<response>\nB }}\n</response>"));
        assert!(prompt.contains("<auto_feedback></auto_feedback>"));
    }

    #[test]
    fn test_revision_prompt() {
        let prompt = build_revision_prompt("P", "A", "B", "F");
        assert!(prompt.contains("<prompt>\nP\n</prompt>"));
        assert!(prompt.contains("<evaluation_summary>\nF\n</evaluation_summary>"));
        assert!(prompt.contains("<revised_prompt>"));
    }
}
