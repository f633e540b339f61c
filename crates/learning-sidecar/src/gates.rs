//! The four validation gates a correction passes through: G1 sanity, G2a
//! local fact-check, G2b external fact-check, G3 human review. G1/G2a/G2b
//! are pure functions of their inputs plus an injected client trait, so the
//! ordering and skip rules in [`crate::pipeline`] can be unit-tested without
//! a network.

use jarvis_domain::json_extract::parse_tolerant;

use crate::llm_client::LlmSidecarClient;
use crate::model::{GateResult, GateStatus};
use crate::personal_info::contains_personal_info;
use crate::vendor_client::VendorClient;

const GATE1_PROMPT: &str = r#"You are a safety and coherence validator for user corrections to a personal assistant.

Evaluate the following correction and respond ONLY with JSON in this exact format:
{"verdict": "pass", "reason": "explanation"}
OR
{"verdict": "reject", "reason": "explanation"}

Evaluate for:
1. Internal coherence - does the correction make logical sense?
2. Safety - is it free of harmful, abusive, or dangerous content?

Correction to evaluate: {content}

Remember: Respond ONLY with valid JSON, no additional text."#;

const GATE2A_PROMPT: &str = r#"You are a fact-checking assistant for user corrections.

Evaluate the factual accuracy of the following statement and respond ONLY with JSON in this exact format:
{"verdict": "pass", "confidence": 0.85, "reason": "explanation"}
OR
{"verdict": "reject", "confidence": 0.90, "reason": "explanation"}

Guidelines:
- "pass" if the statement is factually plausible or likely true
- "reject" if the statement is clearly false or implausible
- confidence: 0.0 to 1.0, how certain you are of your verdict
- Be generous with uncertainty - use lower confidence when unsure

Statement to evaluate: {content}

Remember: Respond ONLY with valid JSON, no additional text."#;

const GATE2B_PROMPT: &str = r#"Is the following statement factually accurate? Answer only with JSON: {"verdict": "pass"|"reject", "reason": "..."}

Statement: {content}"#;

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

/// Gate 1 (sanity check): coherence and safety, via the LLM sidecar.
pub async fn validate_gate1(llm: &LlmSidecarClient, content: &str) -> GateResult {
    let prompt = GATE1_PROMPT.replace("{content}", content);
    let raw = match llm.chat(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            return GateResult {
                status: GateStatus::Error,
                reason: format!("llm sidecar unreachable: {e}"),
                confidence: None,
                processed_at: now(),
            }
        }
    };

    match parse_tolerant(&raw) {
        Ok(value) => {
            let verdict = value.get("verdict").and_then(|v| v.as_str()).unwrap_or("reject");
            let reason = value
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or("No reason provided")
                .to_string();
            let status = match verdict {
                "pass" => GateStatus::Pass,
                "reject" => GateStatus::Reject,
                other => {
                    return GateResult {
                        status: GateStatus::Reject,
                        reason: format!("Invalid LLM response verdict '{other}': {reason}"),
                        confidence: None,
                        processed_at: now(),
                    }
                }
            };
            GateResult {
                status,
                reason,
                confidence: None,
                processed_at: now(),
            }
        }
        Err(e) => GateResult {
            status: GateStatus::Error,
            reason: format!("LLM response parsing error: {e}"),
            confidence: None,
            processed_at: now(),
        },
    }
}

/// Gate 2a (local fact-check): personal-info content auto-passes with
/// confidence 1.0 and never reaches the LLM; otherwise an LLM call with a
/// confidence score, clamped to `[0, 1]`.
pub async fn validate_gate2a(
    llm: &LlmSidecarClient,
    content: &str,
    personal_info_keywords: &[String],
) -> (GateResult, bool) {
    if contains_personal_info(content, personal_info_keywords) {
        return (
            GateResult {
                status: GateStatus::Pass,
                reason: "Personal information - auto-approved".to_string(),
                confidence: Some(1.0),
                processed_at: now(),
            },
            true,
        );
    }

    let prompt = GATE2A_PROMPT.replace("{content}", content);
    let raw = match llm.chat(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            return (
                GateResult {
                    status: GateStatus::Error,
                    reason: format!("llm sidecar unreachable: {e}"),
                    confidence: Some(0.0),
                    processed_at: now(),
                },
                false,
            )
        }
    };

    let result = match parse_tolerant(&raw) {
        Ok(value) => {
            let verdict = value.get("verdict").and_then(|v| v.as_str()).unwrap_or("reject");
            let reason = value
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or("No reason provided")
                .to_string();
            let confidence = value
                .get("confidence")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.5)
                .clamp(0.0, 1.0);

            match verdict {
                "pass" => GateResult {
                    status: GateStatus::Pass,
                    reason,
                    confidence: Some(confidence),
                    processed_at: now(),
                },
                "reject" => GateResult {
                    status: GateStatus::Reject,
                    reason,
                    confidence: Some(confidence),
                    processed_at: now(),
                },
                other => GateResult {
                    status: GateStatus::Reject,
                    reason: format!("Invalid LLM response verdict '{other}': {reason}"),
                    confidence: Some(confidence),
                    processed_at: now(),
                },
            }
        }
        Err(e) => GateResult {
            status: GateStatus::Error,
            reason: format!("LLM response parsing error: {e}"),
            confidence: Some(0.0),
            processed_at: now(),
        },
    };
    (result, false)
}

/// Gate 2b (external fact-check). If the vendor is unconfigured, or any
/// transport/parse failure occurs, auto-passes with a `gate2b_unavailable`
/// reason rather than blocking progress on an external outage.
pub async fn validate_gate2b(vendor: &VendorClient, content: &str) -> GateResult {
    if !vendor.is_configured() {
        return GateResult {
            status: GateStatus::Pass,
            reason: "gate2b_unavailable - API key not configured".to_string(),
            confidence: None,
            processed_at: now(),
        };
    }

    let prompt = GATE2B_PROMPT.replace("{content}", content);
    let raw = match vendor.complete(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            return GateResult {
                status: GateStatus::Pass,
                reason: format!("gate2b_unavailable - {e}"),
                confidence: None,
                processed_at: now(),
            }
        }
    };

    match parse_tolerant(&raw) {
        Ok(value) => {
            let verdict = value.get("verdict").and_then(|v| v.as_str()).unwrap_or("reject");
            let reason = value
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or("No reason provided")
                .to_string();
            match verdict {
                "pass" => GateResult {
                    status: GateStatus::Pass,
                    reason,
                    confidence: None,
                    processed_at: now(),
                },
                "reject" => GateResult {
                    status: GateStatus::Reject,
                    reason,
                    confidence: None,
                    processed_at: now(),
                },
                other => GateResult {
                    status: GateStatus::Reject,
                    reason: format!("Invalid vendor response verdict '{other}': {reason}"),
                    confidence: None,
                    processed_at: now(),
                },
            }
        }
        Err(e) => GateResult {
            status: GateStatus::Pass,
            reason: format!("gate2b_unavailable - response parsing error: {e}"),
            confidence: None,
            processed_at: now(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gate2b_unconfigured_vendor_passes_without_network() {
        let config = crate::config::VendorConfig {
            base_url: "http://127.0.0.1:1".into(),
            api_key_env: "LEARNING_SIDECAR_TEST_UNSET_KEY".into(),
            model: "test".into(),
            max_tokens: 32,
            timeout_ms: 100,
            max_retries: 0,
        };
        let vendor = VendorClient::new(&config);
        let result = validate_gate2b(&vendor, "le ciel est bleu").await;
        assert_eq!(result.status, GateStatus::Pass);
        assert!(result.reason.starts_with("gate2b_unavailable"));
    }
}
