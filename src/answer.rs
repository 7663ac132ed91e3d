//! Answer generation over the evidence map.
//!
//! Thin glue: builds the analyst-briefing prompt from the retained
//! evidence and sends it to an Ollama-compatible `/api/generate`
//! endpoint. No retrieval logic lives here.

use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use crate::config::AnswerConfig;
use crate::models::EvidenceMap;

/// Build the briefing prompt: persona and citation rules, the evidence
/// sources keyed by document name, then the question.
pub fn build_prompt(question: &str, evidence: &EvidenceMap) -> String {
    let mut sources = String::new();
    for (doc_name, text) in evidence {
        sources.push_str(&format!("[{}]\n{}\n\n", doc_name, text));
    }

    format!(
        "You are a senior threat intelligence analyst briefing a client. You possess \
direct knowledge of the threats.\n\
\n\
Rules:\n\
1. Answer directly and confidently; adopt the information as your own knowledge.\n\
2. Never open with meta-talk such as \"Based on the documents\" or \"According to the context\".\n\
3. Follow every factual claim with a citation naming the source document.\n\
4. Use only the sources below. If they do not contain the answer, state: \
\"The provided documents do not contain information to answer this question.\"\n\
\n\
Intelligence sources:\n\
{sources}\
Client question:\n\
{question}\n\
\n\
Your briefing:\n",
        sources = sources,
        question = question.trim(),
    )
}

/// Generate an answer to `question` grounded in `evidence`.
pub async fn generate_answer(
    config: &AnswerConfig,
    question: &str,
    evidence: &EvidenceMap,
) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let url = config.url.trim_end_matches('/');
    let body = serde_json::json!({
        "model": config.model,
        "prompt": build_prompt(question, evidence),
        "stream": false,
    });

    let response = client
        .post(format!("{}/api/generate", url))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            anyhow!(
                "Answer service connection error (is it running at {}?): {}",
                url,
                e
            )
        })?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("Answer API error {}: {}", status, body_text);
    }

    let json: serde_json::Value = response.json().await?;
    let answer = json
        .get("response")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Invalid answer response: missing response field"))?;

    if answer.trim().is_empty() {
        return Ok("Unable to generate an answer from the provided contexts.".to_string());
    }
    Ok(answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_sources_and_question() {
        let mut evidence = EvidenceMap::new();
        evidence.insert(
            "akira-advisory.pdf".to_string(),
            "Akira actors exploit CVE-2020-3259.".to_string(),
        );
        let prompt = build_prompt("What does Akira exploit?", &evidence);
        assert!(prompt.contains("[akira-advisory.pdf]"));
        assert!(prompt.contains("CVE-2020-3259"));
        assert!(prompt.contains("What does Akira exploit?"));
    }

    #[test]
    fn prompt_orders_sources_deterministically() {
        let mut evidence = EvidenceMap::new();
        evidence.insert("b.pdf".to_string(), "second".to_string());
        evidence.insert("a.pdf".to_string(), "first".to_string());
        let prompt = build_prompt("q", &evidence);
        let a = prompt.find("[a.pdf]").unwrap();
        let b = prompt.find("[b.pdf]").unwrap();
        assert!(a < b);
    }
}
