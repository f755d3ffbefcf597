use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Opening sentinel the rewriter wraps its answer in
pub const REWRITE_OPEN: &str = "<rewritten>";
/// Closing sentinel the rewriter wraps its answer in
pub const REWRITE_CLOSE: &str = "</rewritten>";

/// Characters of a generated template kept verbatim before empty-tag cleanup
const TEMPLATE_VERBATIM_PREFIX: usize = 1000;

static EMPTY_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n<(\w+)>\s*</(\w+)>\n").expect("empty-tag pattern is valid")
});

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("variable pattern is valid"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("number pattern is valid"));

/// Failures to find required structure in a model response
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("response has no <{0}> section")]
    MissingTag(String),
}

/// All `<tag>...</tag>` spans in order, matched non-greedily across lines
pub fn extract_between_tags(tag: &str, text: &str, strip: bool) -> Vec<String> {
    let tag = regex::escape(tag);
    let Ok(pattern) = Regex::new(&format!("(?s)<{tag}>(.+?)</{tag}>")) else {
        return Vec::new();
    };

    pattern
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| {
            if strip {
                m.as_str().trim().to_string()
            } else {
                m.as_str().to_string()
            }
        })
        .collect()
}

/// The first `<tag>...</tag>` span, untrimmed
pub fn first_between_tags(tag: &str, text: &str) -> Result<String, ExtractError> {
    extract_between_tags(tag, text, false)
        .into_iter()
        .next()
        .ok_or_else(|| ExtractError::MissingTag(tag.to_string()))
}

/// All `<tag>...</tag>` spans in order, including empty ones
///
/// Unlike [`extract_between_tags`], an empty `<tag></tag>` is its own match
/// and never swallows the next block.
pub fn extract_sections(tag: &str, text: &str) -> Vec<String> {
    let tag = regex::escape(tag);
    let Ok(pattern) = Regex::new(&format!("(?s)<{tag}>(.*?)</{tag}>")) else {
        return Vec::new();
    };

    pattern
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// The first `<tag>...</tag>` span, which may be empty
pub fn first_section(tag: &str, text: &str) -> Result<String, ExtractError> {
    extract_sections(tag, text)
        .into_iter()
        .next()
        .ok_or_else(|| ExtractError::MissingTag(tag.to_string()))
}

/// Drop `\n<name></name>\n` blocks whose body is only whitespace
pub fn remove_empty_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(caps) = EMPTY_TAG.captures_at(text, search) {
        let Some(whole) = caps.get(0) else { break };
        if caps[1] == caps[2] {
            out.push_str(&text[copied..whole.start()]);
            copied = whole.end();
            search = whole.end();
        } else {
            // mismatched names: resume just past the leading newline
            search = whole.start() + 1;
        }
    }

    out.push_str(&text[copied..]);
    out
}

/// Every `{...}` placeholder body in the text
pub fn extract_variables(text: &str) -> BTreeSet<String> {
    VARIABLE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Pull the instruction template out of a meta-prompt response
///
/// The first 1000 characters are kept as-is; the tail has empty tag blocks
/// removed twice, with trimming in between.
pub fn extract_template(response: &str) -> Result<String, ExtractError> {
    let between = first_between_tags("Instructions", response)?;

    let split = between
        .char_indices()
        .nth(TEMPLATE_VERBATIM_PREFIX)
        .map(|(i, _)| i)
        .unwrap_or(between.len());
    let (head, tail) = between.split_at(split);

    let cleaned = remove_empty_tags(remove_empty_tags(tail).trim());
    Ok(format!("{}{}", head, cleaned.trim()).trim().to_string())
}

/// Pull the rewritten instruction out of the rewriter's response
///
/// Missing sentinels are tolerated: a response that never opens the tag is
/// treated as starting inside it, and one that never closes it runs to the end.
pub fn extract_rewritten(response: &str) -> String {
    let mut text = response.trim().to_string();
    if !text.contains(REWRITE_OPEN) {
        text.insert_str(0, REWRITE_OPEN);
    }
    if !text.contains(REWRITE_CLOSE) {
        text.push_str(REWRITE_CLOSE);
    }

    let start = text.find(REWRITE_OPEN).map_or(0, |i| i + REWRITE_OPEN.len());
    let end = text[start..]
        .find(REWRITE_CLOSE)
        .map_or(text.len(), |i| start + i);

    let result = text[start..end].trim();
    let result = result.strip_prefix("<instruction>").unwrap_or(result);
    let result = result.strip_suffix("</instruction>").unwrap_or(result);
    result.trim().to_string()
}

/// Read the judge's pick out of its JSON answer
///
/// Returns the zero-based index of the preferred candidate, or `None` when
/// the answer is not usable.
pub fn parse_verdict(response: &str, candidate_count: usize) -> Option<usize> {
    let mut text = response.trim().to_string();
    if !text.contains('{') {
        text.insert(0, '{');
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(&text[start..=end]).ok()?;
    let preferred = match value.get("Preferred")? {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let number: usize = NUMBER.find(&preferred)?.as_str().parse().ok()?;
    (1..=candidate_count).contains(&number).then(|| number - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_between_tags_multiline() {
        let text = "pre <a>\nfirst\n</a> mid <a>second</a>";
        assert_eq!(
            extract_between_tags("a", text, false),
            vec!["\nfirst\n".to_string(), "second".to_string()]
        );
        assert_eq!(
            extract_between_tags("a", text, true),
            vec!["first".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn test_first_between_tags_missing() {
        assert_eq!(
            first_between_tags("revised_prompt", "no tags here"),
            Err(ExtractError::MissingTag("revised_prompt".to_string()))
        );
    }

    #[test]
    fn test_extract_sections_keeps_empty_spans() {
        let text = "<recommendation></recommendation>\n<recommendation>- fix</recommendation>";
        assert_eq!(
            extract_sections("recommendation", text),
            vec!["".to_string(), "- fix".to_string()]
        );
        assert_eq!(first_section("recommendation", text), Ok(String::new()));
    }

    #[test]
    fn test_first_section_missing() {
        assert_eq!(
            first_section("auto_feedback", "<recommendation>x</recommendation>"),
            Err(ExtractError::MissingTag("auto_feedback".to_string()))
        );
    }

    #[test]
    fn test_remove_empty_tags() {
        let text = "keep\n<notes>  \n </notes>\nmore";
        assert_eq!(remove_empty_tags(text), "keepmore");
    }

    #[test]
    fn test_remove_empty_tags_requires_matching_names() {
        let text = "a\n<x>\n</y>\n<z></z>\nb";
        assert_eq!(remove_empty_tags(text), "a\n<x>\n</y>b");
    }

    #[test]
    fn test_remove_empty_tags_keeps_filled_tags() {
        let text = "a\n<x>content</x>\nb";
        assert_eq!(remove_empty_tags(text), text);
    }

    #[test]
    fn test_extract_variables() {
        let vars = extract_variables("Hi {$NAME}, about {$TOPIC} and {$NAME} again");
        let vars: Vec<_> = vars.into_iter().collect();
        assert_eq!(vars, vec!["$NAME".to_string(), "$TOPIC".to_string()]);
    }

    #[test]
    fn test_extract_template_cleans_tail_only() {
        let head = "x".repeat(1000);
        let response = format!(
            "<Instructions>{head}\n<a></a>\n tail \n<b>\n</b>\n</Instructions>"
        );
        let template = extract_template(&response).unwrap();
        assert_eq!(template, format!("{head}tail"));
    }

    #[test]
    fn test_extract_template_short_body() {
        let response = "<Inputs>{$X}</Inputs><Instructions>\n  Do {$X}.\n</Instructions>";
        assert_eq!(extract_template(response).unwrap(), "Do {$X}.");
    }

    #[test]
    fn test_extract_template_missing() {
        assert!(extract_template("nothing").is_err());
    }

    #[test]
    fn test_extract_rewritten_happy_path() {
        let response = "<rewritten>\nBetter prompt\n</rewritten> trailing";
        assert_eq!(extract_rewritten(response), "Better prompt");
    }

    #[test]
    fn test_extract_rewritten_without_sentinels() {
        assert_eq!(extract_rewritten("  just text  "), "just text");
        assert_eq!(extract_rewritten("text then</rewritten>junk"), "text then");
        assert_eq!(extract_rewritten("<rewritten>open only"), "open only");
    }

    #[test]
    fn test_extract_rewritten_strips_instruction_wrapper() {
        let response = "<rewritten><instruction>\nDo it\n</instruction></rewritten>";
        assert_eq!(extract_rewritten(response), "Do it");
    }

    #[test]
    fn test_parse_verdict() {
        assert_eq!(parse_verdict(r#"{"Preferred": "Instruction 2"}"#, 3), Some(1));
        // prefilled "{" is not echoed back
        assert_eq!(parse_verdict(r#""Preferred": "Instruction 3"}"#, 3), Some(2));
        assert_eq!(
            parse_verdict("Sure! {\"Preferred\": \"Instruction 1\"} hope that helps", 3),
            Some(0)
        );
    }

    #[test]
    fn test_parse_verdict_out_of_range_or_garbage() {
        assert_eq!(parse_verdict(r#"{"Preferred": "Instruction 4"}"#, 3), None);
        assert_eq!(parse_verdict(r#"{"Preferred": "Instruction 0"}"#, 3), None);
        assert_eq!(parse_verdict(r#"{"Preferred": "neither"}"#, 3), None);
        assert_eq!(parse_verdict("not json at all", 3), None);
        assert_eq!(parse_verdict(r#"{"Best": "Instruction 1"}"#, 3), None);
    }

    #[test]
    fn test_parse_verdict_double_digit() {
        assert_eq!(parse_verdict(r#"{"Preferred": "Instruction 10"}"#, 12), Some(9));
    }
}
