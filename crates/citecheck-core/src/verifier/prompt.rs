//! Prompt construction for the relevance judge

use super::JudgeRequest;

/// System prompt shared by single and batched requests
pub const SYSTEM_PROMPT: &str = "You check academic citations. Given a sentence from a paper \
and the cited source, decide whether the source plausibly supports the sentence. \
Judge topical and factual fit, not writing quality.";

const SINGLE_FORMAT: &str = "Answer with a JSON object: \
{\"supported\": true|false, \"rationale\": \"<one sentence>\", \"confidence\": <0.0-1.0>}";

const BATCH_FORMAT: &str = "Answer with a JSON array holding one object per item, in item order: \
[{\"supported\": true|false, \"rationale\": \"<one sentence>\", \"confidence\": <0.0-1.0>}, ...]";

const STRICT_SUFFIX: &str = "Your previous answer could not be read. Reply with the JSON only: \
no prose, no code fence, no extra keys.";

fn push_pair(prompt: &mut String, request: &JudgeRequest) {
    prompt.push_str("Citing sentence: ");
    prompt.push_str(&request.citing_sentence);
    prompt.push_str("\nCited source title: ");
    prompt.push_str(&request.evidence.title);
    if let Some(abstract_text) = &request.evidence.abstract_text {
        prompt.push_str("\nCited source abstract: ");
        prompt.push_str(abstract_text);
    }
    prompt.push('\n');
}

/// User prompt for one (sentence, source) pair
pub fn build_prompt(request: &JudgeRequest) -> String {
    let mut prompt = String::new();
    push_pair(&mut prompt, request);
    prompt.push('\n');
    prompt.push_str(SINGLE_FORMAT);
    if request.strict_format {
        prompt.push('\n');
        prompt.push_str(STRICT_SUFFIX);
    }
    prompt
}

/// User prompt for several pairs answered in one reply
pub fn build_batch_prompt(requests: &[JudgeRequest]) -> String {
    let mut prompt = String::new();
    for (i, request) in requests.iter().enumerate() {
        prompt.push_str(&format!("Item {}:\n", i + 1));
        push_pair(&mut prompt, request);
        prompt.push('\n');
    }
    prompt.push_str(BATCH_FORMAT);
    if requests.iter().any(|r| r.strict_format) {
        prompt.push('\n');
        prompt.push_str(STRICT_SUFFIX);
    }
    prompt
}
